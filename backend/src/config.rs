//! Runtime configuration.
//!
//! Every option can be passed on the command line or through a `REGISTRY_*`
//! environment variable, so the same binary runs locally and in a container.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "registry", about = "Student registry backend with bulk CSV provisioning")]
pub struct Config {
    #[arg(long, env = "REGISTRY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "REGISTRY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Path of the SQLite database file.
    #[arg(long, env = "REGISTRY_DATABASE", default_value = "registry.sqlite")]
    pub database: PathBuf,

    /// Root directory for uploaded sources and error reports.
    #[arg(long, env = "REGISTRY_MEDIA_ROOT", default_value = "media")]
    pub media_root: PathBuf,

    #[arg(long, env = "REGISTRY_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "REGISTRY_TOKEN_TTL_MINUTES", default_value_t = 60 * 24)]
    pub token_ttl_minutes: i64,

    /// Rows validated and committed per batch.
    #[arg(
        long,
        env = "REGISTRY_BATCH_SIZE",
        default_value_t = 100,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub batch_size: u16,

    #[arg(long, env = "REGISTRY_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    #[arg(long, env = "REGISTRY_HASH_MEMORY_KIB", default_value_t = 19456)]
    pub hash_memory_kib: u32,

    #[arg(long, env = "REGISTRY_HASH_ITERATIONS", default_value_t = 2)]
    pub hash_iterations: u32,

    /// Create the default super admin and departments on start-up.
    #[arg(long, env = "REGISTRY_SEED", default_value_t = false)]
    pub seed: bool,

    #[arg(long, env = "REGISTRY_ADMIN_EMAIL", default_value = "admin@gmail.com")]
    pub admin_email: String,

    #[arg(
        long,
        env = "REGISTRY_ADMIN_PASSWORD",
        default_value = "Password1.",
        hide_env_values = true
    )]
    pub admin_password: String,
}

impl Config {
    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_secret_is_given() {
        let config = Config::try_parse_from(["registry", "--jwt-secret", "s3cret"]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.media_root, PathBuf::from("media"));
        assert!(!config.seed);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let parsed = Config::try_parse_from(["registry", "--jwt-secret", "s", "--batch-size", "0"]);
        assert!(parsed.is_err());
    }
}
