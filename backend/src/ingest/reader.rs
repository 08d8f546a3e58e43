//! Structural parsing of an uploaded bulk file.

use crate::error::StructuralError;
use common::model::csv::Column;
use std::collections::HashMap;

/// Characters rejected anywhere in a header cell.
const DISALLOWED_HEADER_CHARS: &str = "!@#$%^&*(){}[]|\\;:\"'<>,.?/~`";

/// One data row restricted to the required columns.
///
/// `index` is 1-based; the header is row 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub index: usize,
    values: HashMap<Column, String>,
}

impl Row {
    pub fn new(index: usize, values: HashMap<Column, String>) -> Self {
        Row { index, values }
    }

    /// Trimmed cell value; missing cells read as empty.
    pub fn get(&self, column: Column) -> &str {
        self.values.get(&column).map(|v| v.trim()).unwrap_or("")
    }
}

#[derive(Debug)]
pub struct Table {
    pub rows: Vec<Row>,
}

/// Validates the file name an upload arrived with.
pub fn check_file_name(name: &str) -> Result<(), StructuralError> {
    if name.to_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(StructuralError::NotCsv)
    }
}

/// Parses comma-delimited UTF-8 bytes with a header row.
///
/// Checks, in order: the bytes parse as a rectangular table, at least one data
/// row exists, every required header is present, and no header carries
/// disallowed punctuation. Extra columns are dropped.
pub fn read(bytes: &[u8]) -> Result<Table, StructuralError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| StructuralError::Unparseable(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record.map_err(|e| StructuralError::Unparseable(e.to_string()))?);
    }

    if records.is_empty() {
        return Err(StructuralError::Empty);
    }

    let mut positions: HashMap<Column, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(column) = Column::from_header(header) {
            positions.entry(column).or_insert(idx);
        }
    }

    let missing: Vec<String> = Column::ALL
        .iter()
        .filter(|c| !positions.contains_key(c))
        .map(|c| c.header().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(StructuralError::MissingHeaders(missing));
    }

    if let Some(bad) = headers
        .iter()
        .find(|h| h.chars().any(|ch| DISALLOWED_HEADER_CHARS.contains(ch)))
    {
        return Err(StructuralError::DisallowedHeaderCharacter(bad.clone()));
    }

    let rows = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let values = positions
                .iter()
                .map(|(column, &idx)| (*column, record.get(idx).unwrap_or("").to_string()))
                .collect();
            Row::new(i + 1, values)
        })
        .collect();

    Ok(Table { rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Email,First Name,Last Name,Middle Name,Phone Number,Matric Number,Department Code";

    #[test]
    fn reads_rows_with_one_based_index() {
        let input = format!(
            "{}\n{}\n{}\n",
            HEADER,
            "ada@example.com,Ada,Lovelace,King,0801,CSC/001,CSCI",
            "grace@example.com, Grace ,Hopper,Brewster,0802,CSC/002,CSCI"
        );
        let table = read(input.as_bytes()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].index, 1);
        assert_eq!(table.rows[1].index, 2);
        assert_eq!(table.rows[1].get(Column::FirstName), "Grace");
        assert_eq!(table.rows[0].get(Column::DepartmentCode), "CSCI");
    }

    #[test]
    fn extra_columns_and_order_do_not_matter() {
        let input = "Department Code,Notes,Email,First Name,Last Name,Middle Name,\
                     Phone Number,Matric Number\n\
                     CSCI,anything,ada@example.com,Ada,Lovelace,King,0801,CSC/001\n";
        let table = read(input.as_bytes()).unwrap();
        assert_eq!(table.rows[0].get(Column::Email), "ada@example.com");
        assert_eq!(table.rows[0].get(Column::MatricNumber), "CSC/001");
    }

    #[test]
    fn reports_exactly_the_missing_headers() {
        let input = "Email,First Name,Last Name,Middle Name,Matric Number\na,b,c,d,e\n";
        let err = read(input.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            StructuralError::MissingHeaders(vec![
                "Phone Number".to_string(),
                "Department Code".to_string()
            ])
        );
    }

    #[test]
    fn header_match_is_case_sensitive() {
        let input = HEADER.replace("Email", "email") + "\na,b,c,d,e,f,g\n";
        let err = read(input.as_bytes()).unwrap_err();
        assert_eq!(err, StructuralError::MissingHeaders(vec!["Email".to_string()]));
    }

    #[test]
    fn rejects_punctuation_in_any_header() {
        let input = format!("{},Notes?\na,b,c,d,e,f,g,h\n", HEADER);
        let err = read(input.as_bytes()).unwrap_err();
        assert_eq!(err, StructuralError::DisallowedHeaderCharacter("Notes?".to_string()));
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = read(format!("{}\n", HEADER).as_bytes()).unwrap_err();
        assert_eq!(err, StructuralError::Empty);
    }

    #[test]
    fn header_only_file_missing_a_column_is_empty() {
        let input = "Email,First Name,Last Name,Middle Name,Phone Number,Department Code\n";
        assert_eq!(read(input.as_bytes()).unwrap_err(), StructuralError::Empty);
    }

    #[test]
    fn header_only_file_with_punctuation_is_empty() {
        let input = format!("{},Notes?\n", HEADER);
        assert_eq!(read(input.as_bytes()).unwrap_err(), StructuralError::Empty);
    }

    #[test]
    fn ragged_rows_are_unparseable() {
        let input = format!("{}\na,b,c\n", HEADER);
        assert!(matches!(
            read(input.as_bytes()).unwrap_err(),
            StructuralError::Unparseable(_)
        ));
    }

    #[test]
    fn invalid_utf8_is_unparseable() {
        let mut input = format!("{}\n", HEADER).into_bytes();
        input.extend_from_slice(b"\xff\xfe,b,c,d,e,f,g\n");
        assert!(matches!(read(&input).unwrap_err(), StructuralError::Unparseable(_)));
    }

    #[test]
    fn only_csv_file_names_are_accepted() {
        assert!(check_file_name("students.CSV").is_ok());
        assert_eq!(check_file_name("students.xlsx"), Err(StructuralError::NotCsv));
    }
}
