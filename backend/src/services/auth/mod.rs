//! Token issuance.
//!
//! - `POST /api/auth/token`: exchanges `{email, password}` for `{token, role}`.
//!   The token goes into `Authorization: Bearer <token>` on every other route.

use actix_web::web::{post, scope};
use actix_web::Scope;

mod token;

const API_PATH: &str = "/api/auth";

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/token", post().to(token::process))
}
