//! Upload job records and the end-to-end bulk submission.

use crate::auth::password::Hasher;
use crate::error::{StorageError, SubmitError};
use crate::ingest::artifacts::ArtifactStore;
use crate::ingest::batch::BatchProcessor;
use crate::ingest::reader;
use crate::notify::{Notifier, UploadNotification};
use crate::store::SqliteStore;
use chrono::{DateTime, Utc};
use common::model::upload::{UploadJob, UploadStatus};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};

/// A file as received from the client.
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The admin submitting an upload.
#[derive(Debug, Clone)]
pub struct Submitter {
    pub id: String,
    pub email: String,
}

/// Everything one submission needs, borrowed from the caller.
pub struct Ingestor<'a> {
    pub store: &'a SqliteStore,
    pub hasher: &'a Hasher,
    pub artifacts: &'a ArtifactStore,
    pub notifier: &'a Notifier,
    pub batch_size: usize,
}

impl Ingestor<'_> {
    /// Validates, records and processes one bulk file.
    ///
    /// Structural problems are reported before anything is written. Once the
    /// job row exists, a storage failure leaves it `Started` and keeps every
    /// account created so far; resubmitting the file will reject those rows
    /// as duplicates.
    pub fn submit(&self, upload: &Upload, submitter: &Submitter) -> Result<UploadJob, SubmitError> {
        reader::check_file_name(&upload.file_name)?;
        let table = reader::read(&upload.bytes)?;
        let row_count = table.rows.len();
        let total_rows = u32::try_from(row_count)
            .map_err(|_| StorageError::Corrupt(format!("{} rows is too many", row_count)))?;

        let source = self.artifacts.store_source(&upload.bytes)?;
        let job = new_job(source, total_rows, &submitter.id);
        insert_job(self.store.conn(), &job)?;
        info!(
            "Upload {} started by {}: {} rows",
            job.id, submitter.email, total_rows
        );

        let mut processor =
            BatchProcessor::new(self.store, self.hasher, self.batch_size).created_by(&submitter.id);
        let outcome = processor.run(&job.id, &table.rows)?;

        let error_file = match &outcome.report {
            Some(report) => Some(self.artifacts.store_report(report)?),
            None => None,
        };

        complete_job(
            self.store.conn(),
            &job.id,
            outcome.valid_count,
            outcome.invalid_count,
            error_file.as_deref(),
        )?;
        info!(
            "Upload {} completed: {} valid, {} invalid",
            job.id, outcome.valid_count, outcome.invalid_count
        );

        let notification = UploadNotification::upload_result(
            &job.id,
            &submitter.email,
            outcome.valid_count,
            outcome.invalid_count,
            error_file.is_some(),
        );
        if let Err(e) = self.notifier.notify(notification) {
            warn!("Upload {}: notification not queued: {}", job.id, e);
        }

        find_job(self.store.conn(), &job.id)?
            .ok_or_else(|| StorageError::Corrupt(format!("upload {} vanished", job.id)).into())
    }
}

fn new_job(file: String, total_rows: u32, created_by: &str) -> UploadJob {
    let now = Utc::now();
    UploadJob {
        id: uuid::Uuid::new_v4().to_string(),
        file,
        total_rows,
        valid_count: 0,
        invalid_count: 0,
        status: UploadStatus::Started,
        error_file: None,
        created_by: Some(created_by.to_string()),
        created_at: now,
        updated_at: now,
    }
}

pub fn insert_job(conn: &Connection, job: &UploadJob) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO uploads (id, file, total_rows, valid_count, invalid_count, status,
                              error_file, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            job.id,
            job.file,
            job.total_rows,
            job.valid_count,
            job.invalid_count,
            job.status.as_str(),
            job.error_file,
            job.created_by,
            job.created_at,
            job.updated_at,
        ],
    )?;
    Ok(())
}

/// Moves a `Started` job to `Completed` with its final counters in one UPDATE.
pub fn complete_job(
    conn: &Connection,
    id: &str,
    valid_count: u32,
    invalid_count: u32,
    error_file: Option<&str>,
) -> Result<(), StorageError> {
    let changed = conn.execute(
        "UPDATE uploads
         SET valid_count = ?1, invalid_count = ?2, error_file = ?3, status = ?4, updated_at = ?5
         WHERE id = ?6 AND status = ?7",
        params![
            valid_count,
            invalid_count,
            error_file,
            UploadStatus::Completed.as_str(),
            Utc::now(),
            id,
            UploadStatus::Started.as_str(),
        ],
    )?;
    if changed != 1 {
        return Err(StorageError::Corrupt(format!(
            "upload {} is not awaiting completion",
            id
        )));
    }
    Ok(())
}

pub fn find_job(conn: &Connection, id: &str) -> Result<Option<UploadJob>, StorageError> {
    let row = conn
        .query_row(
            "SELECT id, file, total_rows, valid_count, invalid_count, status,
                    error_file, created_by, created_at, updated_at
             FROM uploads WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, DateTime<Utc>>(8)?,
                    row.get::<_, DateTime<Utc>>(9)?,
                ))
            },
        )
        .optional()?;

    let Some((
        id,
        file,
        total_rows,
        valid_count,
        invalid_count,
        status,
        error_file,
        created_by,
        created_at,
        updated_at,
    )) = row
    else {
        return Ok(None);
    };

    Ok(Some(UploadJob {
        id,
        file,
        total_rows,
        valid_count,
        invalid_count,
        status: status.parse().map_err(StorageError::Corrupt)?,
        error_file,
        created_by,
        created_at,
        updated_at,
    }))
}
