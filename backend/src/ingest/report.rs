use crate::error::StorageError;
use common::model::csv::FieldError;

pub const REPORT_HEADER: [&str; 4] = ["Row", "Column", "Error", "Value"];

/// Downloadable list of every rejected cell of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    file_name: String,
    errors: Vec<FieldError>,
}

impl ErrorReport {
    /// Returns `None` when nothing was rejected; an upload without errors has
    /// no report at all rather than an empty one.
    pub fn build(job_id: &str, errors: Vec<FieldError>) -> Option<ErrorReport> {
        if errors.is_empty() {
            return None;
        }
        Some(ErrorReport {
            file_name: report_file_name(job_id),
            errors,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Renders the report as UTF-8 CSV, one line per error in accumulation order.
    pub fn to_csv(&self) -> Result<Vec<u8>, StorageError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let csv_err = |e: csv::Error| StorageError::Io(std::io::Error::other(e));

        writer.write_record(REPORT_HEADER).map_err(csv_err)?;
        for error in &self.errors {
            writer
                .write_record([
                    error.row.to_string(),
                    error.column.header().to_string(),
                    error.message(),
                    error.value.clone(),
                ])
                .map_err(csv_err)?;
        }
        writer
            .into_inner()
            .map_err(|e| StorageError::Io(std::io::Error::other(e.to_string())))
    }
}

pub fn report_file_name(job_id: &str) -> String {
    format!("batch_upload_error_file{}.csv", job_id)
}
