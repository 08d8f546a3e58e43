pub mod csv;
pub mod upload;
pub mod user;
