pub mod config;
pub mod db;
pub mod handlers_health;
pub mod handlers_photo;
pub mod handlers_static;
pub mod mimetype_detector;
pub mod routes;
pub mod storage;
pub mod upload;
pub mod views;
pub mod warp_helpers;
