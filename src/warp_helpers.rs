use log::error;
use serde::Serialize;
use std::convert::Infallible;

use warp::{reject, Filter, Rejection, Reply};

use crate::db::{DbPool, StoreError};
use crate::storage::Storage;
use crate::upload::UploadError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub timestamp: String,
}

#[derive(Debug)]
pub struct DatabaseError {
    pub message: String,
}

impl reject::Reject for DatabaseError {}

#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl reject::Reject for ValidationError {}

#[derive(Debug)]
pub struct UploadTooLarge {
    pub limit: u64,
}

impl reject::Reject for UploadTooLarge {}

#[derive(Debug)]
pub struct ProcessingError {
    pub message: String,
}

impl reject::Reject for ProcessingError {}

pub fn with_db(db_pool: DbPool) -> impl Filter<Extract = (DbPool,), Error = Infallible> + Clone {
    warp::any().map(move || db_pool.clone())
}

pub fn with_storage(
    storage: Storage,
) -> impl Filter<Extract = (Storage,), Error = Infallible> + Clone {
    warp::any().map(move || storage.clone())
}

pub fn database_rejection(err: StoreError) -> Rejection {
    error!("Database error: {}", err);
    reject::custom(DatabaseError {
        message: format!("Database error: {}", err),
    })
}

/// Maps a failed upload onto the rejection that carries its status code.
pub fn upload_rejection(err: UploadError) -> Rejection {
    match err {
        UploadError::UnsupportedType(_)
        | UploadError::Multipart(_)
        | UploadError::Store(StoreError::Validation(_)) => {
            reject::custom(ValidationError {
                message: err.to_string(),
            })
        }
        UploadError::TooLarge { limit } => reject::custom(UploadTooLarge { limit }),
        UploadError::Store(store_err) => database_rejection(store_err),
        other => {
            error!("Upload processing failed: {}", other);
            reject::custom(ProcessingError {
                message: other.to_string(),
            })
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;
    let timestamp = chrono::Utc::now().to_rfc3339();

    if err.is_not_found() {
        code = warp::http::StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(database_error) = err.find::<DatabaseError>() {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = database_error.message.clone();
    } else if let Some(validation_error) = err.find::<ValidationError>() {
        code = warp::http::StatusCode::BAD_REQUEST;
        message = validation_error.message.clone();
    } else if let Some(too_large) = err.find::<UploadTooLarge>() {
        code = warp::http::StatusCode::PAYLOAD_TOO_LARGE;
        message = format!("Upload exceeds {} bytes", too_large.limit);
    } else if let Some(processing_error) = err.find::<ProcessingError>() {
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = processing_error.message.clone();
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        code = warp::http::StatusCode::PAYLOAD_TOO_LARGE;
        message = "Payload too large".to_string();
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        code = warp::http::StatusCode::LENGTH_REQUIRED;
        message = "Content-Length header is required".to_string();
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        code = warp::http::StatusCode::UNSUPPORTED_MEDIA_TYPE;
        message = "Unsupported media type".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = warp::http::StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else {
        error!("Unhandled rejection: {:?}", err);
        code = warp::http::StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    let error_response = ErrorResponse {
        error: message,
        code: code.as_u16(),
        timestamp,
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&error_response),
        code,
    ))
}
