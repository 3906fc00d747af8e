use warp::Filter;

macro_rules! include_static {
    ($($path:expr),* $(,)?) => {
        &[
            $(($path, include_str!(concat!("../static/", $path)))),*
        ]
    };
}

const STATIC_FILES: &[(&str, &str)] = include_static!["css/main.css", "js/gallery.js"];

fn content_type_from_path(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        _ => "text/plain; charset=utf-8",
    }
}

/// Looks up an embedded asset by its request path, without the leading slash.
pub fn find_static(path: &str) -> Option<(&'static str, &'static str)> {
    STATIC_FILES
        .iter()
        .find(|(file_path, _)| *file_path == path)
        .map(|(file_path, content)| (*content, content_type_from_path(file_path)))
}

pub fn build_static_routes(
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path::full()
        .and(warp::get())
        .and_then(|full_path: warp::path::FullPath| async move {
            let path = full_path.as_str().trim_start_matches('/');

            match find_static(path) {
                Some((content, content_type)) => Ok::<_, warp::Rejection>(
                    warp::reply::with_header(content, "content-type", content_type),
                ),
                None => Err(warp::reject::not_found()),
            }
        })
}
