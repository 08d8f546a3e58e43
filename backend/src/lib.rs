pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod notify;
pub mod services;
pub mod state;
pub mod store;

use actix_web::web;

/// Registers every API scope. Shared by `main` and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(services::auth::configure_routes())
        .service(services::users::configure_routes());
}
