use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the columns a bulk upload file must carry.
///
/// The declaration order is the order in which the row validators run, and
/// therefore the order in which errors for a single row show up in the error
/// report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    Email,
    FirstName,
    LastName,
    MiddleName,
    PhoneNumber,
    MatricNumber,
    DepartmentCode,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Email,
        Column::FirstName,
        Column::LastName,
        Column::MiddleName,
        Column::PhoneNumber,
        Column::MatricNumber,
        Column::DepartmentCode,
    ];

    /// The exact header text expected in the uploaded file.
    pub fn header(self) -> &'static str {
        match self {
            Column::Email => "Email",
            Column::FirstName => "First Name",
            Column::LastName => "Last Name",
            Column::MiddleName => "Middle Name",
            Column::PhoneNumber => "Phone Number",
            Column::MatricNumber => "Matric Number",
            Column::DepartmentCode => "Department Code",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.header() == header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Why a single cell was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidFormat,
    Duplicate,
    Empty,
    NotFound,
}

/// A rejected cell of an uploaded file.
///
/// `row` is 1-based over the data rows (the header is row 0). `value` is the
/// trimmed cell content that failed the check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub row: usize,
    pub column: Column,
    pub code: ErrorCode,
    pub value: String,
}

impl FieldError {
    pub fn new(row: usize, column: Column, code: ErrorCode, value: impl Into<String>) -> Self {
        FieldError {
            row,
            column,
            code,
            value: value.into(),
        }
    }

    /// Human readable message written to the `Error` column of the report.
    pub fn message(&self) -> String {
        match (self.column, self.code) {
            (Column::Email, ErrorCode::InvalidFormat) => "Email is not valid".to_string(),
            (Column::Email, ErrorCode::Duplicate) => "Email already exists".to_string(),
            (Column::PhoneNumber, ErrorCode::InvalidFormat) => {
                "Phone number is not valid".to_string()
            }
            (Column::PhoneNumber, ErrorCode::Duplicate) => {
                "Phone number already exists".to_string()
            }
            (Column::MatricNumber, ErrorCode::Duplicate) => {
                "Matric number already exists".to_string()
            }
            (Column::DepartmentCode, ErrorCode::NotFound) => {
                "Department code does not exist".to_string()
            }
            (column, ErrorCode::Empty) => format!("{} must not be empty", sentence_case(column)),
            (column, ErrorCode::InvalidFormat) => format!("{} is not valid", sentence_case(column)),
            (column, ErrorCode::Duplicate) => format!("{} already exists", sentence_case(column)),
            (column, ErrorCode::NotFound) => format!("{} does not exist", sentence_case(column)),
        }
    }
}

// "Last Name" -> "Last name"
fn sentence_case(column: Column) -> String {
    let header = column.header();
    let mut out = String::with_capacity(header.len());
    for (i, ch) in header.chars().enumerate() {
        if i == 0 {
            out.push(ch);
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_resolve_back_to_columns() {
        for column in Column::ALL {
            assert_eq!(Column::from_header(column.header()), Some(column));
        }
        assert_eq!(Column::from_header("email"), None);
        assert_eq!(Column::from_header("Email "), None);
    }

    #[test]
    fn messages_follow_column_and_code() {
        let err = FieldError::new(2, Column::LastName, ErrorCode::Empty, "");
        assert_eq!(err.message(), "Last name must not be empty");

        let err = FieldError::new(3, Column::Email, ErrorCode::Duplicate, "a@b.co");
        assert_eq!(err.message(), "Email already exists");

        let err = FieldError::new(3, Column::MatricNumber, ErrorCode::Empty, "");
        assert_eq!(err.message(), "Matric number must not be empty");
    }

    #[test]
    fn field_error_serializes_with_column_variant() {
        let err = FieldError::new(1, Column::DepartmentCode, ErrorCode::NotFound, "XYZ");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["column"], "DepartmentCode");
        assert_eq!(json["code"], "NotFound");
        assert_eq!(json["row"], 1);
    }
}
