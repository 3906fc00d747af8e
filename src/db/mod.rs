pub mod connection;
pub mod crud;
pub mod migrations;
pub mod models;
pub mod schema;

pub use connection::*;
pub use models::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Validation failed: {0} is required")]
    Validation(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
