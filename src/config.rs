use std::env;
use std::path::{Path, PathBuf};

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub database_url: String,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let max_upload_mb: u64 = env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "25".to_string())
            .parse()?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(BYTES_PER_MB)
            .ok_or_else(|| format!("MAX_UPLOAD_MB={} is too large", max_upload_mb))?;

        Ok(Config {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/photo-gallery.db".to_string()),
            uploads_dir: env::var("UPLOADS_DIR")
                .unwrap_or_else(|_| "./uploads".to_string())
                .into(),
            max_upload_bytes,
        })
    }
}

/// Loads `KEY=value` lines from an env file without overriding variables that are already set.
///
/// A missing file is not an error; anything else unreadable is.
pub fn load_env_file(path: &Path) -> Result<bool, dotenvy::Error> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
