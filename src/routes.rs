use std::convert::Infallible;
use warp::Filter;

use crate::db::DbPool;
use crate::handlers_health::build_health_routes;
use crate::handlers_photo::build_photo_routes;
use crate::handlers_static::build_static_routes;
use crate::storage::Storage;
use crate::warp_helpers::handle_rejection;

/// The complete route table, request logging and rejection recovery included.
pub fn build_routes(
    db_pool: DbPool,
    storage: Storage,
    max_upload_bytes: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    build_health_routes(db_pool.clone())
        .or(build_photo_routes(db_pool, storage, max_upload_bytes))
        .or(build_static_routes())
        .with(warp::log("photo_gallery"))
        .recover(handle_rejection)
}
