use crate::db::schema::*;
use crate::db::DbPool;

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_PHOTOS_TABLE).execute(pool).await?;
    sqlx::query(CREATE_CREATED_AT_INDEX).execute(pool).await?;

    Ok(())
}
