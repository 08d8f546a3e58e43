//! Bulk account provisioning from CSV uploads.
//!
//! `reader` turns raw bytes into rows, `validators` checks each cell,
//! `batch` commits valid rows in fixed-size batches, `report` and `artifacts`
//! produce and store the error file, and `job` ties them together behind
//! `Ingestor::submit`.

pub mod artifacts;
pub mod batch;
pub mod job;
pub mod reader;
pub mod report;
pub mod validators;
