use chrono::Utc;
use log::debug;

use crate::db::schema::PHOTO_COLUMNS;
use crate::db::{DbPool, NewPhoto, Photo, StoreResult};

impl Photo {
    pub async fn create(pool: &DbPool, new_photo: NewPhoto) -> StoreResult<Photo> {
        let new_photo = new_photo.normalized()?;
        let now = Utc::now();

        let sql = format!(
            r#"
            INSERT INTO photos (
                title, description, original_name,
                original_file, thumb_file, large_file,
                width, height,
                original_bytes, thumb_bytes, large_bytes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            RETURNING {}
            "#,
            PHOTO_COLUMNS
        );

        let photo = sqlx::query_as::<_, Photo>(&sql)
            .bind(new_photo.title)
            .bind(new_photo.description)
            .bind(new_photo.original_name)
            .bind(new_photo.original_file)
            .bind(new_photo.thumb_file)
            .bind(new_photo.large_file)
            .bind(new_photo.width)
            .bind(new_photo.height)
            .bind(new_photo.original_bytes)
            .bind(new_photo.thumb_bytes)
            .bind(new_photo.large_bytes)
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await?;

        debug!("Created photo {} ({})", photo.id, photo.original_file);
        Ok(photo)
    }

    /// Every photo, most recently created first.
    pub async fn list_all(pool: &DbPool) -> StoreResult<Vec<Photo>> {
        let sql = format!(
            "SELECT {} FROM photos ORDER BY created_at DESC, id DESC",
            PHOTO_COLUMNS
        );

        Ok(sqlx::query_as::<_, Photo>(&sql).fetch_all(pool).await?)
    }

    /// Looks a photo up by its path-supplied id; ids that do not parse are simply absent.
    pub async fn find_by_id(pool: &DbPool, raw_id: &str) -> StoreResult<Option<Photo>> {
        let Ok(id) = raw_id.parse::<i64>() else {
            return Ok(None);
        };

        let sql = format!("SELECT {} FROM photos WHERE id = ?1", PHOTO_COLUMNS);

        Ok(sqlx::query_as::<_, Photo>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn ping(pool: &DbPool) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
