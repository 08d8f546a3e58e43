use crate::model::user::Role;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
/// Request payload for the token endpoint.
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct TokenResponse {
    pub token: String,
    pub role: Role,
}

/// Query string accepted by the user listing endpoint.
#[derive(Deserialize, Serialize, Default, Debug)]
pub struct UserQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct SubmitResponse {
    pub success: bool,
}
