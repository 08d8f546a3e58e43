use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Student,
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Student => "Student",
            Role::SuperAdmin => "SuperAdmin",
        }
    }

    /// Admins and super admins may provision users and inspect uploads.
    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Student" => Ok(Role::Student),
            "SuperAdmin" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub code: String,
}

/// A user as returned by the listing endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub matric_no: Option<String>,
    pub department_name: Option<String>,
    pub middle_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}
