//! File storage under the media root.
//!
//! Uploaded sources and error reports live in `<root>/users/bulk/`. Writes go
//! through a temporary file in the same directory and are renamed into place,
//! so a reader never sees a half-written artifact. Error reports also get a
//! best-effort copy directly under the root.

use crate::error::StorageError;
use crate::ingest::report::ErrorReport;
use log::warn;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const BULK_DIR: &str = "users/bulk";

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    /// Absolute path of a reference returned by one of the `store_*` methods.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        self.root.join(reference)
    }

    /// Stores the raw upload under its content hash and returns the reference.
    pub fn store_source(&self, bytes: &[u8]) -> Result<String, StorageError> {
        let mut hasher = md5::Context::new();
        hasher.consume(bytes);
        let reference = format!("{}/{:x}.csv", BULK_DIR, hasher.finalize());
        self.write_atomic(&reference, bytes)?;
        Ok(reference)
    }

    /// Stores the report and returns the reference of the durable copy.
    pub fn store_report(&self, report: &ErrorReport) -> Result<String, StorageError> {
        let content = report.to_csv()?;
        let reference = format!("{}/{}", BULK_DIR, report.file_name());
        self.write_atomic(&reference, &content)?;

        let local = self.root.join(report.file_name());
        if let Err(e) = fs::write(&local, &content) {
            warn!("Could not write local copy of {}: {}", local.display(), e);
        }
        Ok(reference)
    }

    fn write_atomic(&self, reference: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let target = self.resolve(reference);
        let dir = target
            .parent()
            .ok_or_else(|| StorageError::Corrupt(format!("no parent for {}", reference)))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| StorageError::Io(e.error))?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::csv::{Column, ErrorCode, FieldError};

    #[test]
    fn source_is_named_after_its_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let a = store.store_source(b"same").unwrap();
        let b = store.store_source(b"same").unwrap();
        let c = store.store_source(b"other").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("users/bulk/"));
        assert_eq!(fs::read(store.resolve(&a)).unwrap(), b"same");
    }

    #[test]
    fn report_is_written_durably_and_locally() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let report = ErrorReport::build(
            "abc",
            vec![FieldError::new(1, Column::Email, ErrorCode::InvalidFormat, "x")],
        )
        .unwrap();

        let reference = store.store_report(&report).unwrap();
        assert_eq!(reference, "users/bulk/batch_upload_error_fileabc.csv");
        let durable = fs::read_to_string(store.resolve(&reference)).unwrap();
        let local = fs::read_to_string(dir.path().join("batch_upload_error_fileabc.csv")).unwrap();
        assert_eq!(durable, local);
        assert!(durable.starts_with("Row,Column,Error,Value"));
    }
}
