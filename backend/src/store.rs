//! Account storage.
//!
//! `AccountStore` is the narrow view the ingestion pipeline needs: existence
//! checks for the unique fields, department lookup, and a single atomic insert
//! per account. `SqliteStore` is the production implementation; it also carries
//! the queries used by login and user listing.

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use common::model::user::{Department, Role, UserSummary};
use common::requests::UserQuery;
use rusqlite::{params, Connection, OptionalExtension};

/// Everything needed to insert one provisioned account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub middle_name: String,
    pub phone: String,
    pub matric_no: String,
    pub department_id: i64,
    pub role: Role,
    pub password_hash: String,
    pub created_by: Option<String>,
}

pub trait AccountStore {
    fn email_exists(&self, email: &str) -> Result<bool, StorageError>;
    fn phone_exists(&self, phone: &str) -> Result<bool, StorageError>;
    fn matric_exists(&self, matric_no: &str) -> Result<bool, StorageError>;
    fn find_department(&self, code: &str) -> Result<Option<Department>, StorageError>;

    /// Inserts the account and returns its id. A unique index violation is
    /// reported as `StorageError::Conflict`.
    fn create_account(&self, account: &NewAccount) -> Result<String, StorageError>;
}

pub struct Credentials {
    pub id: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

pub struct SqliteStore {
    conn: Connection,
}

fn map_insert_error(err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(ffi_err, message)
            if ffi_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StorageError::Conflict(message.unwrap_or_else(|| "unique index".to_string()))
        }
        other => StorageError::Sqlite(other),
    }
}

fn parse_role(raw: String) -> Result<Role, StorageError> {
    raw.parse().map_err(StorageError::Corrupt)
}

/// Maps `?ordering=` onto an ORDER BY clause. Unknown fields fall back to the
/// default newest-first order.
fn order_clause(ordering: Option<&str>) -> &'static str {
    match ordering.map(str::trim) {
        Some("created_at") => "u.created_at ASC",
        Some("last_login") => "u.last_login ASC",
        Some("-last_login") => "u.last_login DESC",
        Some("email") => "u.email ASC",
        Some("-email") => "u.email DESC",
        Some("firstname") => "u.firstname ASC",
        Some("-firstname") => "u.firstname DESC",
        Some("lastname") => "u.lastname ASC",
        Some("-lastname") => "u.lastname DESC",
        Some("phone") => "u.phone ASC",
        Some("-phone") => "u.phone DESC",
        _ => "u.created_at DESC",
    }
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore { conn }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn exists(&self, sql: &str, value: &str) -> Result<bool, StorageError> {
        let found: Option<i64> = self
            .conn
            .query_row(sql, params![value], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, email, password, role, is_active
                 FROM users WHERE lower(email) = lower(?1)",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, bool>(4)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, email, password, role, is_active)) => Ok(Some(Credentials {
                id,
                email,
                password,
                role: parse_role(role)?,
                is_active,
            })),
            None => Ok(None),
        }
    }

    pub fn touch_last_login(&self, user_id: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now(), user_id],
        )?;
        Ok(())
    }

    /// Lists users, optionally filtered by a substring of email, names, phone
    /// or role.
    pub fn list_users(&self, query: &UserQuery) -> Result<Vec<UserSummary>, StorageError> {
        let sql = format!(
            "SELECT u.firstname, u.lastname, u.email, u.phone, u.matric_no, d.name, u.middle_name,
                    u.role, u.created_at, u.last_login
             FROM users u LEFT JOIN departments d ON d.id = u.department_id
             WHERE ?1 IS NULL
                OR u.email LIKE '%' || ?1 || '%'
                OR u.firstname LIKE '%' || ?1 || '%'
                OR u.lastname LIKE '%' || ?1 || '%'
                OR u.phone LIKE '%' || ?1 || '%'
                OR u.role LIKE '%' || ?1 || '%'
             ORDER BY {}",
            order_clause(query.ordering.as_deref())
        );

        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![search], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, DateTime<Utc>>(8)?,
                row.get::<_, Option<DateTime<Utc>>>(9)?,
            ))
        })?;

        let mut users = Vec::new();
        for row in rows {
            let (
                firstname,
                lastname,
                email,
                phone,
                matric_no,
                department_name,
                middle_name,
                role,
                created_at,
                last_login,
            ) = row?;
            users.push(UserSummary {
                firstname,
                lastname,
                email,
                phone,
                matric_no,
                department_name,
                middle_name,
                role: parse_role(role)?,
                created_at,
                last_login,
            });
        }
        Ok(users)
    }
}

impl AccountStore for SqliteStore {
    fn email_exists(&self, email: &str) -> Result<bool, StorageError> {
        self.exists("SELECT 1 FROM users WHERE lower(email) = lower(?1) LIMIT 1", email)
    }

    fn phone_exists(&self, phone: &str) -> Result<bool, StorageError> {
        self.exists("SELECT 1 FROM users WHERE phone = ?1 LIMIT 1", phone)
    }

    fn matric_exists(&self, matric_no: &str) -> Result<bool, StorageError> {
        self.exists("SELECT 1 FROM users WHERE matric_no = ?1 LIMIT 1", matric_no)
    }

    fn find_department(&self, code: &str) -> Result<Option<Department>, StorageError> {
        let department = self
            .conn
            .query_row(
                "SELECT id, name, code FROM departments WHERE code = ?1",
                params![code],
                |row| {
                    Ok(Department {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        code: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(department)
    }

    fn create_account(&self, account: &NewAccount) -> Result<String, StorageError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        self.conn
            .execute(
                "INSERT INTO users (id, email, password, firstname, lastname, middle_name, phone,
                                    role, department_id, matric_no, is_active, verified,
                                    created_at, updated_at, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, 0, ?11, ?11, ?12)",
                params![
                    id,
                    account.email,
                    account.password_hash,
                    account.firstname,
                    account.lastname,
                    account.middle_name,
                    account.phone,
                    account.role.as_str(),
                    account.department_id,
                    account.matric_no,
                    now,
                    account.created_by,
                ],
            )
            .map_err(map_insert_error)?;
        Ok(id)
    }
}
