//! User management API.
//!
//! - `POST /api/users/upload-users`: multipart upload with a `file` field. The
//!   whole file is validated and processed before the response is sent; the
//!   outcome is inspected through the upload job and its error file.
//! - `GET /api/users`: lists users, with `search` and `ordering` query parameters.
//! - `GET /api/users/uploads/{id}`: one upload job.
//! - `GET /api/users/uploads/{id}/error-file`: downloads the job's error report.
//!
//! Accounts are only created through uploads, so any other method under this
//! scope answers 405.

use actix_web::web::{get, post, resource, scope, to};
use actix_web::{HttpResponse, Scope};
use serde_json::json;

mod list;
mod upload;
mod uploads;

const API_PATH: &str = "/api/users";

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(json!({ "error": "Method not allowed" }))
}

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .service(
            resource("")
                .route(get().to(list::process))
                .default_service(to(method_not_allowed)),
        )
        .service(
            resource("/upload-users")
                .route(post().to(upload::process))
                .default_service(to(method_not_allowed)),
        )
        .service(
            resource("/uploads/{id}")
                .route(get().to(uploads::job))
                .default_service(to(method_not_allowed)),
        )
        .service(
            resource("/uploads/{id}/error-file")
                .route(get().to(uploads::error_file))
                .default_service(to(method_not_allowed)),
        )
        .service(resource("/{id}").default_service(to(method_not_allowed)))
}
