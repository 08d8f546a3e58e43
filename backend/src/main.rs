use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::info;
use registry_backend::auth::password::Hasher;
use registry_backend::auth::token::TokenIssuer;
use registry_backend::config::Config;
use registry_backend::ingest::artifacts::ArtifactStore;
use registry_backend::notify::{self, LogMailer, Notifier};
use registry_backend::state::AppState;
use registry_backend::{configure, db};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::parse();

    let hasher =
        Hasher::new(config.hash_memory_kib, config.hash_iterations).map_err(io::Error::other)?;
    let conn = db::open(&config.database).map_err(io::Error::other)?;
    if config.seed {
        db::seed_defaults(&conn, &hasher, &config.admin_email, &config.admin_password)
            .map_err(io::Error::other)?;
    }
    drop(conn);

    // Start notification task
    let (notifier, rx) = Notifier::channel(100);
    tokio::spawn(async move {
        notify::start_notifier(rx, Arc::new(LogMailer)).await;
    });

    let state = web::Data::new(AppState {
        db_path: config.database.clone(),
        artifacts: ArtifactStore::new(&config.media_root),
        tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl_minutes),
        hasher,
        batch_size: usize::from(config.batch_size),
        max_upload_bytes: config.max_upload_bytes,
        notifier,
    });

    let (host, port) = config.bind_address();
    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}
