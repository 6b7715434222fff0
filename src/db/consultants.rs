use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::Consultant;

pub async fn create(pool: &PgPool, name: &str) -> Result<Consultant, sqlx::Error> {
    sqlx::query_as::<_, Consultant>(
        "INSERT INTO consultants (id, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(name)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Consultant>, sqlx::Error> {
    sqlx::query_as::<_, Consultant>("SELECT * FROM consultants ORDER BY name, id")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Consultant>, sqlx::Error> {
    sqlx::query_as::<_, Consultant>("SELECT * FROM consultants WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Row-lock a consultant for the rest of the transaction. Returns false if it does not exist.
pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, Uuid>("SELECT id FROM consultants WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}
