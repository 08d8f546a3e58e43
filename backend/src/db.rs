//! SQLite connection handling, schema creation and default data.

use crate::auth::password::Hasher;
use crate::error::StorageError;
use chrono::Utc;
use common::model::user::Role;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS departments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    code        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL,
    password      TEXT,
    firstname     TEXT,
    lastname      TEXT,
    middle_name   TEXT,
    phone         TEXT,
    role          TEXT NOT NULL,
    department_id INTEGER REFERENCES departments(id),
    matric_no     TEXT,
    is_staff      INTEGER NOT NULL DEFAULT 0,
    is_active     INTEGER NOT NULL DEFAULT 1,
    verified      INTEGER NOT NULL DEFAULT 0,
    last_login    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    created_by    TEXT
);
CREATE UNIQUE INDEX IF NOT EXISTS users_email_ci ON users(lower(email));
CREATE UNIQUE INDEX IF NOT EXISTS users_phone_unique ON users(phone)
    WHERE phone IS NOT NULL AND phone <> '';
CREATE UNIQUE INDEX IF NOT EXISTS users_matric_no_unique ON users(matric_no)
    WHERE matric_no IS NOT NULL AND matric_no <> '';

CREATE TABLE IF NOT EXISTS uploads (
    id            TEXT PRIMARY KEY,
    file          TEXT NOT NULL,
    total_rows    INTEGER NOT NULL DEFAULT 0,
    valid_count   INTEGER NOT NULL DEFAULT 0,
    invalid_count INTEGER NOT NULL DEFAULT 0,
    status        TEXT NOT NULL,
    error_file    TEXT,
    created_by    TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
";

/// Departments created by `seed_defaults`, as `(name, code)`.
pub const DEFAULT_DEPARTMENTS: [(&str, &str); 8] = [
    ("Agriculture", "AGRI"),
    ("Computer Science", "CSCI"),
    ("Electrical Engineering", "EE"),
    ("Mechanical Engineering", "MECH"),
    ("Civil Engineering", "CE"),
    ("Business Administration", "BA"),
    ("Mathematics", "MATH"),
    ("Physics", "PHYS"),
];

/// Opens the database file and makes sure the schema exists.
pub fn open(path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open(path)?;
    prepare(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, StorageError> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<(), StorageError> {
    // Concurrent uploads each hold their own connection and queue on the write lock.
    conn.busy_timeout(Duration::from_secs(30))?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn insert_department(conn: &Connection, name: &str, code: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR IGNORE INTO departments (name, code, created_at) VALUES (?1, ?2, ?3)",
        params![name, code, Utc::now()],
    )?;
    Ok(())
}

/// Creates the super admin account (if the email is free) and the default
/// departments. Safe to run on every start-up.
pub fn seed_defaults(
    conn: &Connection,
    hasher: &Hasher,
    admin_email: &str,
    admin_password: &str,
) -> Result<(), StorageError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM users WHERE lower(email) = lower(?1)",
            params![admin_email],
            |row| row.get(0),
        )
        .optional()?;

    if existing.is_none() {
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (id, email, password, firstname, lastname, role,
                                is_staff, is_active, verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'Admin', 'User', ?4, 1, 1, 1, ?5, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                admin_email.trim().to_lowercase(),
                hasher.hash(admin_password)?,
                Role::SuperAdmin.as_str(),
                now,
            ],
        )?;
        info!("Successfully created superuser with email {}", admin_email);
    } else {
        info!("Superuser with email {} already exists", admin_email);
    }

    for (name, code) in DEFAULT_DEPARTMENTS {
        insert_department(conn, name, code)?;
    }
    Ok(())
}
