//! Batched validation and account creation over the rows of one upload.
//!
//! Batches only bound how much work is logged at a time: every valid row is
//! committed as soon as it passes, so later rows (including rows of the same
//! file) see it in their uniqueness checks. A storage failure stops the run and
//! leaves every earlier account in place.

use crate::auth::password::Hasher;
use crate::error::{BatchError, StorageError};
use crate::ingest::reader::Row;
use crate::ingest::report::ErrorReport;
use crate::ingest::validators::{validate_row, RowVerdict};
use crate::store::{AccountStore, NewAccount};
use common::jobs::BatchState;
use common::model::csv::{Column, ErrorCode, FieldError};
use common::model::user::{Department, Role};
use log::{error, info};

#[derive(Debug)]
pub struct BatchOutcome {
    pub report: Option<ErrorReport>,
    pub valid_count: u32,
    pub invalid_count: u32,
}

/// Running totals threaded through every batch.
#[derive(Debug, Default)]
struct Tally {
    valid_count: u32,
    invalid_count: u32,
    errors: Vec<FieldError>,
}

impl Tally {
    fn reject(&mut self, errors: impl IntoIterator<Item = FieldError>) {
        self.errors.extend(errors);
        self.invalid_count += 1;
    }
}

pub struct BatchProcessor<'a> {
    store: &'a dyn AccountStore,
    hasher: &'a Hasher,
    batch_size: usize,
    created_by: Option<String>,
    state: BatchState,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(store: &'a dyn AccountStore, hasher: &'a Hasher, batch_size: usize) -> Self {
        BatchProcessor {
            store,
            hasher,
            batch_size: batch_size.max(1),
            created_by: None,
            state: BatchState::Idle,
        }
    }

    /// Records `user_id` as the creator of every provisioned account.
    pub fn created_by(mut self, user_id: impl Into<String>) -> Self {
        self.created_by = Some(user_id.into());
        self
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn run(&mut self, job_id: &str, rows: &[Row]) -> Result<BatchOutcome, BatchError> {
        if self.state != BatchState::Idle {
            return Err(BatchError::NotIdle(self.state));
        }
        self.state = BatchState::Processing;

        let mut tally = Tally::default();
        for (batch_idx, batch) in rows.chunks(self.batch_size).enumerate() {
            info!(
                "Upload {}: processing batch {} ({} rows)",
                job_id,
                batch_idx + 1,
                batch.len()
            );
            tally = match self.process_batch(batch, tally) {
                Ok(tally) => tally,
                Err(e) => {
                    error!("Upload {}: batch {} failed: {}", job_id, batch_idx + 1, e);
                    self.state = BatchState::Failed;
                    return Err(e.into());
                }
            };
        }

        self.state = BatchState::Completed;
        Ok(BatchOutcome {
            report: ErrorReport::build(job_id, tally.errors),
            valid_count: tally.valid_count,
            invalid_count: tally.invalid_count,
        })
    }

    fn process_batch(&self, batch: &[Row], mut tally: Tally) -> Result<Tally, StorageError> {
        for row in batch {
            match validate_row(row, self.store)? {
                RowVerdict::Valid(department) => self.create(row, &department, &mut tally)?,
                RowVerdict::Invalid(errors) => tally.reject(errors),
            }
        }
        Ok(tally)
    }

    fn create(
        &self,
        row: &Row,
        department: &Department,
        tally: &mut Tally,
    ) -> Result<(), StorageError> {
        let matric_no = row.get(Column::MatricNumber);
        let account = NewAccount {
            email: row.get(Column::Email).to_string(),
            firstname: row.get(Column::FirstName).to_string(),
            lastname: row.get(Column::LastName).to_string(),
            middle_name: row.get(Column::MiddleName).to_string(),
            phone: row.get(Column::PhoneNumber).to_string(),
            matric_no: matric_no.to_string(),
            department_id: department.id,
            role: Role::Student,
            password_hash: self.hasher.hash(matric_no)?,
            created_by: self.created_by.clone(),
        };

        match self.store.create_account(&account) {
            Ok(_) => {
                tally.valid_count += 1;
                Ok(())
            }
            // Another upload committed the same value between check and insert.
            Err(StorageError::Conflict(detail)) => {
                let column = conflicting_column(&detail);
                tally.reject([FieldError::new(
                    row.index,
                    column,
                    ErrorCode::Duplicate,
                    row.get(column),
                )]);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Column whose unique index rejected an insert, from the SQLite message.
fn conflicting_column(detail: &str) -> Column {
    if detail.contains("phone") {
        Column::PhoneNumber
    } else if detail.contains("matric_no") {
        Column::MatricNumber
    } else {
        Column::Email
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::ingest::reader;
    use crate::store::SqliteStore;
    use std::cell::Cell;

    const HEADER: &str =
        "Email,First Name,Last Name,Middle Name,Phone Number,Matric Number,Department Code";

    fn store() -> SqliteStore {
        let conn = db::open_in_memory().unwrap();
        db::insert_department(&conn, "Computer Science", "CSCI").unwrap();
        SqliteStore::new(conn)
    }

    fn hasher() -> Hasher {
        Hasher::new(8, 1).unwrap()
    }

    fn rows(lines: &[&str]) -> Vec<Row> {
        let input = format!("{}\n{}\n", HEADER, lines.join("\n"));
        reader::read(input.as_bytes()).unwrap().rows
    }

    fn count_users(store: &SqliteStore) -> i64 {
        store
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap()
    }

    fn student(n: usize) -> String {
        format!("s{n}@example.com,First{n},Last{n},Mid{n},080{n},MAT/{n},CSCI")
    }

    #[test]
    fn mixed_file_commits_valid_rows_and_reports_the_rest() {
        let store = store();
        let hasher = hasher();
        let rows = rows(&[
            "ada@example.com,Ada,Lovelace,King,0801,MAT/1,CSCI",
            "not-an-email,Grace,,Brewster,0802,MAT/2,CSCI",
            "ada@example.com,Ada,Byron,King,0803,MAT/3,CSCI",
        ]);

        let mut processor = BatchProcessor::new(&store, &hasher, 100);
        let outcome = processor.run("job", &rows).unwrap();

        assert_eq!(processor.state(), BatchState::Completed);
        assert_eq!(outcome.valid_count, 1);
        assert_eq!(outcome.invalid_count, 2);
        assert_eq!(count_users(&store), 1);

        let report = outcome.report.unwrap();
        let got: Vec<(usize, Column, ErrorCode)> = report
            .errors()
            .iter()
            .map(|e| (e.row, e.column, e.code))
            .collect();
        assert_eq!(
            got,
            vec![
                (2, Column::Email, ErrorCode::InvalidFormat),
                (2, Column::LastName, ErrorCode::Empty),
                (3, Column::Email, ErrorCode::Duplicate),
            ]
        );
    }

    #[test]
    fn clean_file_has_no_report() {
        let store = store();
        let hasher = hasher();
        let rows = rows(&[&student(1), &student(2)]);
        let outcome = BatchProcessor::new(&store, &hasher, 1).run("job", &rows).unwrap();
        assert!(outcome.report.is_none());
        assert_eq!(outcome.valid_count, 2);
        assert_eq!(outcome.invalid_count, 0);
    }

    #[test]
    fn batch_size_does_not_change_the_outcome() {
        let lines: Vec<String> = (1..=7)
            .map(student)
            .chain(["bad,,,,x,,ZZZ".to_string(), student(3)])
            .collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();

        let mut results = Vec::new();
        for batch_size in [1, 3, 100] {
            let store = store();
            let hasher = hasher();
            let outcome = BatchProcessor::new(&store, &hasher, batch_size)
                .run("job", &rows(&lines))
                .unwrap();
            let errors = outcome.report.map(|r| r.errors().to_vec()).unwrap_or_default();
            results.push((outcome.valid_count, outcome.invalid_count, errors));
        }

        assert_eq!(results[0].0, 7);
        assert_eq!(results[0].1, 2);
        assert_eq!(results[0].0 + results[0].1, lines.len() as u32);
        assert!(results.iter().all(|r| *r == results[0]));
    }

    #[test]
    fn resubmitting_the_same_rows_rejects_every_row() {
        let store = store();
        let hasher = hasher();
        let rows = rows(&[&student(1), &student(2)]);
        BatchProcessor::new(&store, &hasher, 10).run("first", &rows).unwrap();

        let outcome = BatchProcessor::new(&store, &hasher, 10).run("second", &rows).unwrap();
        assert_eq!(outcome.valid_count, 0);
        assert_eq!(outcome.invalid_count, 2);
        let report = outcome.report.unwrap();
        assert!(report
            .errors()
            .iter()
            .any(|e| e.column == Column::Email && e.code == ErrorCode::Duplicate));
        assert_eq!(count_users(&store), 2);
    }

    #[test]
    fn processor_runs_only_once() {
        let store = store();
        let hasher = hasher();
        let rows = rows(&[&student(1)]);
        let mut processor = BatchProcessor::new(&store, &hasher, 10);
        processor.run("job", &rows).unwrap();
        assert!(matches!(
            processor.run("job", &rows),
            Err(BatchError::NotIdle(BatchState::Completed))
        ));
    }

    /// Delegates to SQLite but fails the n-th account insert.
    struct FlakyStore {
        inner: SqliteStore,
        fail_on: usize,
        inserts: Cell<usize>,
    }

    impl AccountStore for FlakyStore {
        fn email_exists(&self, email: &str) -> Result<bool, StorageError> {
            self.inner.email_exists(email)
        }
        fn phone_exists(&self, phone: &str) -> Result<bool, StorageError> {
            self.inner.phone_exists(phone)
        }
        fn matric_exists(&self, matric_no: &str) -> Result<bool, StorageError> {
            self.inner.matric_exists(matric_no)
        }
        fn find_department(&self, code: &str) -> Result<Option<Department>, StorageError> {
            self.inner.find_department(code)
        }
        fn create_account(&self, account: &NewAccount) -> Result<String, StorageError> {
            let n = self.inserts.get() + 1;
            self.inserts.set(n);
            if n == self.fail_on {
                return Err(StorageError::Io(std::io::Error::other("disk unavailable")));
            }
            self.inner.create_account(account)
        }
    }

    #[test]
    fn storage_failure_fails_the_run_and_keeps_earlier_accounts() {
        let store = FlakyStore {
            inner: store(),
            fail_on: 3,
            inserts: Cell::new(0),
        };
        let hasher = hasher();
        let rows = rows(&[&student(1), &student(2), &student(3), &student(4)]);

        let mut processor = BatchProcessor::new(&store, &hasher, 2);
        let err = processor.run("job", &rows).unwrap_err();

        assert!(matches!(err, BatchError::Storage(StorageError::Io(_))));
        assert_eq!(processor.state(), BatchState::Failed);
        assert_eq!(count_users(&store.inner), 2);
    }

    /// Pretends the uniqueness check for one column passed, so the insert
    /// loses the race against the unique index instead.
    struct RacingStore {
        inner: SqliteStore,
        unchecked: Column,
    }

    impl RacingStore {
        fn new(unchecked: Column) -> Self {
            RacingStore {
                inner: store(),
                unchecked,
            }
        }
    }

    impl AccountStore for RacingStore {
        fn email_exists(&self, email: &str) -> Result<bool, StorageError> {
            match self.unchecked {
                Column::Email => Ok(false),
                _ => self.inner.email_exists(email),
            }
        }
        fn phone_exists(&self, phone: &str) -> Result<bool, StorageError> {
            match self.unchecked {
                Column::PhoneNumber => Ok(false),
                _ => self.inner.phone_exists(phone),
            }
        }
        fn matric_exists(&self, matric_no: &str) -> Result<bool, StorageError> {
            match self.unchecked {
                Column::MatricNumber => Ok(false),
                _ => self.inner.matric_exists(matric_no),
            }
        }
        fn find_department(&self, code: &str) -> Result<Option<Department>, StorageError> {
            self.inner.find_department(code)
        }
        fn create_account(&self, account: &NewAccount) -> Result<String, StorageError> {
            self.inner.create_account(account)
        }
    }

    #[test]
    fn lost_insert_race_becomes_a_duplicate_email_error() {
        let store = RacingStore::new(Column::Email);
        let hasher = hasher();
        let rows = rows(&[
            "ada@example.com,Ada,Lovelace,King,0801,MAT/1,CSCI",
            "ADA@example.com,Ada,Lovelace,King,0802,MAT/2,CSCI",
        ]);

        let outcome = BatchProcessor::new(&store, &hasher, 10).run("job", &rows).unwrap();
        assert_eq!(outcome.valid_count, 1);
        assert_eq!(outcome.invalid_count, 1);
        let report = outcome.report.unwrap();
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.errors()[0].row, 2);
        assert_eq!(report.errors()[0].code, ErrorCode::Duplicate);
        assert_eq!(report.errors()[0].column, Column::Email);
    }

    #[test]
    fn lost_insert_race_is_reported_on_the_conflicting_column() {
        let hasher = hasher();
        for (column, lines, value) in [
            (
                Column::PhoneNumber,
                [
                    "ada@example.com,Ada,Lovelace,King,0801,MAT/1,CSCI",
                    "grace@example.com,Grace,Hopper,Brewster,0801,MAT/2,CSCI",
                ],
                "0801",
            ),
            (
                Column::MatricNumber,
                [
                    "ada@example.com,Ada,Lovelace,King,0801,MAT/1,CSCI",
                    "grace@example.com,Grace,Hopper,Brewster,0802,MAT/1,CSCI",
                ],
                "MAT/1",
            ),
        ] {
            let store = RacingStore::new(column);
            let outcome = BatchProcessor::new(&store, &hasher, 10)
                .run("job", &rows(&lines))
                .unwrap();
            assert_eq!((outcome.valid_count, outcome.invalid_count), (1, 1));
            assert_eq!(count_users(&store.inner), 1);

            let report = outcome.report.unwrap();
            let error = &report.errors()[0];
            assert_eq!((error.row, error.column, error.code), (2, column, ErrorCode::Duplicate));
            assert_eq!(error.value, value);
        }
    }
}
