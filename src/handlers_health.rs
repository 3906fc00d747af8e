use serde_json::json;
use std::convert::Infallible;
use warp::{Filter, Rejection, Reply};

use crate::db::{DbPool, Photo};
use crate::warp_helpers::{database_rejection, with_db};

pub async fn health_check() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Ready once the record store answers a trivial query.
pub async fn ready_check(db_pool: DbPool) -> Result<impl Reply, Rejection> {
    Photo::ping(&db_pool).await.map_err(database_rejection)?;

    Ok(warp::reply::json(&json!({
        "status": "ready",
        "database": "connected",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub fn build_health_routes(
    db_pool: DbPool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    let ready = warp::path("ready")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_db(db_pool))
        .and_then(ready_check);

    health.or(ready)
}
