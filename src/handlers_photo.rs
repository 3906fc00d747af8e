use log::{debug, info};
use warp::http::{StatusCode, Uri};
use warp::multipart::FormData;
use warp::{reject, Filter, Rejection, Reply};

use crate::db::{DbPool, Photo};
use crate::mimetype_detector;
use crate::storage::Storage;
use crate::upload;
use crate::views;
use crate::warp_helpers::{database_rejection, upload_rejection, with_db, with_storage};

/// Multipart bodies may exceed the file limit by this much to fit the text fields and boundaries.
const FORM_OVERHEAD_BYTES: u64 = 64 * 1024;

fn redirect_to_gallery() -> impl Reply {
    warp::redirect::found(Uri::from_static("/photos"))
}

pub async fn list_photos(db_pool: DbPool) -> Result<impl Reply, Rejection> {
    let photos = Photo::list_all(&db_pool)
        .await
        .map_err(database_rejection)?;

    Ok(warp::reply::html(views::gallery_page(&photos)))
}

pub async fn upload_photo(
    form: FormData,
    db_pool: DbPool,
    storage: Storage,
    max_upload_bytes: u64,
) -> Result<impl Reply, Rejection> {
    let form = upload::read_upload_form(form, &storage, max_upload_bytes)
        .await
        .map_err(upload_rejection)?;

    let Some(staged) = form.file else {
        debug!("Upload without a file, nothing to do");
        return Ok(redirect_to_gallery());
    };

    let photo = upload::ingest(&db_pool, &storage, form.title, form.description, staged)
        .await
        .map_err(upload_rejection)?;

    info!(
        "Stored photo {} ({:?}, {} bytes)",
        photo.id,
        photo.original_name,
        photo.original_bytes.unwrap_or_default()
    );

    Ok(redirect_to_gallery())
}

pub async fn get_photo(photo_id: String, db_pool: DbPool) -> Result<Box<dyn Reply>, Rejection> {
    match Photo::find_by_id(&db_pool, &photo_id).await {
        Ok(Some(photo)) => Ok(Box::new(warp::reply::html(views::photo_detail(&photo)))),
        Ok(None) => Ok(Box::new(warp::reply::with_status(
            "Not found",
            StatusCode::NOT_FOUND,
        ))),
        Err(e) => Err(database_rejection(e)),
    }
}

pub async fn get_upload_file(
    area: String,
    filename: String,
    storage: Storage,
) -> Result<impl Reply, Rejection> {
    let path = storage
        .resolve(&area, &filename)
        .ok_or_else(reject::not_found)?;

    let file_data = tokio::fs::read(&path)
        .await
        .map_err(|_| reject::not_found())?;

    let content_type = mimetype_detector::from_path(&path)
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let reply = warp::reply::with_header(file_data, "content-type", content_type);
    // Stored files are never rewritten
    let reply = warp::reply::with_header(reply, "cache-control", "public, max-age=31536000");

    Ok(reply)
}

pub fn build_photo_routes(
    db_pool: DbPool,
    storage: Storage,
    max_upload_bytes: u64,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let root = warp::path::end()
        .and(warp::get())
        .map(redirect_to_gallery);

    let photos_list = warp::path("photos")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_db(db_pool.clone()))
        .and_then(list_photos);

    let photos_upload = warp::path("photos")
        .and(warp::path("upload"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload_bytes + FORM_OVERHEAD_BYTES))
        .and(with_db(db_pool.clone()))
        .and(with_storage(storage.clone()))
        .and(warp::any().map(move || max_upload_bytes))
        .and_then(upload_photo);

    let photo_detail = warp::path("photos")
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_db(db_pool))
        .and_then(get_photo);

    let upload_files = warp::path("uploads")
        .and(warp::path::param::<String>())
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_storage(storage))
        .and_then(get_upload_file);

    root.or(photos_list)
        .or(photos_upload)
        .or(photo_detail)
        .or(upload_files)
}
