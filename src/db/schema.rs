pub const CREATE_PHOTOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    original_name TEXT NOT NULL,
    original_file TEXT NOT NULL,
    thumb_file TEXT NOT NULL,
    large_file TEXT NOT NULL,
    width INTEGER,
    height INTEGER,
    original_bytes INTEGER,
    thumb_bytes INTEGER,
    large_bytes INTEGER,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
);
"#;

pub const CREATE_CREATED_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_photos_created_at ON photos(created_at DESC);";

/// Column list shared by every query that materializes a [`crate::db::Photo`].
pub const PHOTO_COLUMNS: &str = "id, title, description, original_name, original_file, \
     thumb_file, large_file, width, height, original_bytes, thumb_bytes, large_bytes, \
     created_at, updated_at";
