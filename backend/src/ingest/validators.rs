//! Field validators for one uploaded row.
//!
//! The validators are an ordered table of `(column, check)` units. Every unit
//! runs for every row, so a row collects one `FieldError` per failing field.

use crate::error::StorageError;
use crate::ingest::reader::Row;
use crate::store::AccountStore;
use common::model::csv::{Column, ErrorCode, FieldError};
use common::model::user::Department;
use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;

/// Result of a single field check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Accepted, and the department the code refers to.
    Resolved(Department),
    Reject(ErrorCode),
}

type Check = fn(&str, &dyn AccountStore) -> Result<Verdict, StorageError>;

pub struct FieldValidator {
    pub column: Column,
    check: Check,
}

pub const VALIDATORS: [FieldValidator; 7] = [
    FieldValidator { column: Column::Email, check: check_email },
    FieldValidator { column: Column::FirstName, check: check_not_empty },
    FieldValidator { column: Column::LastName, check: check_not_empty },
    FieldValidator { column: Column::MiddleName, check: check_not_empty },
    FieldValidator { column: Column::PhoneNumber, check: check_phone },
    FieldValidator { column: Column::MatricNumber, check: check_matric },
    FieldValidator { column: Column::DepartmentCode, check: check_department },
];

/// Longest address accepted, as RFC 3696 errata 1690 allows.
const MAX_EMAIL_LEN: usize = 320;

static EMAIL_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:[-!#$%&'*+/=?^_`{}|~0-9a-z]+(?:\.[-!#$%&'*+/=?^_`{}|~0-9a-z]+)*",
        r#"|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f!#-\[\]-\x7f]|\\[\x01-\x09\x0b\x0c\x0d-\x7f])*")$"#,
    ))
    .unwrap()
});

static EMAIL_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9-]{2,63}$").unwrap()
});

static EMAIL_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\[([a-f0-9:.]+)\]$").unwrap());

/// Accepts a dot-atom or quoted local part, and a dotted host name,
/// `localhost`, or a bracketed IPv4/IPv6 literal as the domain.
pub fn is_valid_email(value: &str) -> bool {
    if value.is_empty() || value.len() > MAX_EMAIL_LEN {
        return false;
    }
    let Some((user, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if !EMAIL_USER.is_match(user) {
        return false;
    }
    if domain == "localhost" {
        return true;
    }
    if let Some(literal) = EMAIL_LITERAL.captures(domain) {
        return literal[1].parse::<IpAddr>().is_ok();
    }
    EMAIL_DOMAIN.is_match(domain) && !domain.ends_with('-')
}

fn check_email(value: &str, store: &dyn AccountStore) -> Result<Verdict, StorageError> {
    if !is_valid_email(value) {
        return Ok(Verdict::Reject(ErrorCode::InvalidFormat));
    }
    if store.email_exists(value)? {
        return Ok(Verdict::Reject(ErrorCode::Duplicate));
    }
    Ok(Verdict::Accept)
}

fn check_not_empty(value: &str, _: &dyn AccountStore) -> Result<Verdict, StorageError> {
    if value.trim().is_empty() {
        Ok(Verdict::Reject(ErrorCode::Empty))
    } else {
        Ok(Verdict::Accept)
    }
}

fn check_phone(value: &str, store: &dyn AccountStore) -> Result<Verdict, StorageError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(Verdict::Reject(ErrorCode::InvalidFormat));
    }
    if store.phone_exists(value)? {
        return Ok(Verdict::Reject(ErrorCode::Duplicate));
    }
    Ok(Verdict::Accept)
}

fn check_matric(value: &str, store: &dyn AccountStore) -> Result<Verdict, StorageError> {
    if value.trim().is_empty() {
        return Ok(Verdict::Reject(ErrorCode::Empty));
    }
    if store.matric_exists(value)? {
        return Ok(Verdict::Reject(ErrorCode::Duplicate));
    }
    Ok(Verdict::Accept)
}

fn check_department(value: &str, store: &dyn AccountStore) -> Result<Verdict, StorageError> {
    match store.find_department(value)? {
        Some(department) => Ok(Verdict::Resolved(department)),
        None => Ok(Verdict::Reject(ErrorCode::NotFound)),
    }
}

/// Outcome of running every validator over one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowVerdict {
    Valid(Department),
    Invalid(Vec<FieldError>),
}

/// Runs all validators over `row` in table order.
///
/// Storage failures abort immediately; rejected fields never do.
pub fn validate_row(row: &Row, store: &dyn AccountStore) -> Result<RowVerdict, StorageError> {
    let mut errors = Vec::new();
    let mut department = None;

    for validator in &VALIDATORS {
        let value = row.get(validator.column);
        match (validator.check)(value, store)? {
            Verdict::Accept => {}
            Verdict::Resolved(found) => department = Some(found),
            Verdict::Reject(code) => {
                errors.push(FieldError::new(row.index, validator.column, code, value))
            }
        }
    }

    match (errors.is_empty(), department) {
        (true, Some(department)) => Ok(RowVerdict::Valid(department)),
        (true, None) => Err(StorageError::Corrupt(format!(
            "row {} passed validation without a department",
            row.index
        ))),
        (false, _) => Ok(RowVerdict::Invalid(errors)),
    }
}
