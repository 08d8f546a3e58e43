//! Types shared between the registry backend and its clients.

pub mod jobs;
pub mod model;
pub mod requests;
