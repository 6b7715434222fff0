use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus};

pub struct NewAppointment<'a> {
    pub consultant_id: Uuid,
    pub booked_by: &'a str,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

pub struct ListParams {
    pub booked_by: String,
    pub status: Option<AppointmentStatus>,
    pub consultant_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn insert(
    conn: &mut PgConnection,
    new: &NewAppointment<'_>,
) -> Result<Appointment, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "INSERT INTO appointments (id, consultant_id, booked_by, start_time, end_time, status)
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(new.consultant_id)
    .bind(new.booked_by)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(AppointmentStatus::Scheduled.as_str())
    .fetch_one(conn)
    .await
}

/// Whether a scheduled appointment of the consultant intersects `[start, end)`.
pub async fn has_overlap(
    conn: &mut PgConnection,
    consultant_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
             SELECT 1 FROM appointments
             WHERE consultant_id = $1
               AND status = 'scheduled'
               AND start_time < $3
               AND end_time > $2
               AND ($4::uuid IS NULL OR id <> $4)
         )",
    )
    .bind(consultant_id)
    .bind(start_time)
    .bind(end_time)
    .bind(exclude)
    .fetch_one(conn)
    .await
}

pub async fn find_for_caller(
    pool: &PgPool,
    id: Uuid,
    booked_by: &str,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE id = $1 AND booked_by = $2",
    )
    .bind(id)
    .bind(booked_by)
    .fetch_optional(pool)
    .await
}

pub async fn lock_for_caller(
    conn: &mut PgConnection,
    id: Uuid,
    booked_by: &str,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE id = $1 AND booked_by = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(booked_by)
    .fetch_optional(conn)
    .await
}

pub async fn list(pool: &PgPool, params: &ListParams) -> Result<Vec<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments
         WHERE booked_by = $1
           AND ($2::text IS NULL OR status = $2)
           AND ($3::uuid IS NULL OR consultant_id = $3)
         ORDER BY start_time DESC, id DESC
         LIMIT $4 OFFSET $5",
    )
    .bind(&params.booked_by)
    .bind(params.status.map(AppointmentStatus::as_str))
    .bind(params.consultant_id)
    .bind(params.limit)
    .bind(params.offset)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool, params: &ListParams) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM appointments
         WHERE booked_by = $1
           AND ($2::text IS NULL OR status = $2)
           AND ($3::uuid IS NULL OR consultant_id = $3)",
    )
    .bind(&params.booked_by)
    .bind(params.status.map(AppointmentStatus::as_str))
    .bind(params.consultant_id)
    .fetch_one(pool)
    .await
}

// `updated_at` doubles as the cache version. clock_timestamp() is taken after the
// row lock, so it follows commit order where now() would not.
pub async fn reschedule(
    conn: &mut PgConnection,
    id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<Appointment, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET start_time = $2, end_time = $3, updated_at = clock_timestamp()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(start_time)
    .bind(end_time)
    .fetch_one(conn)
    .await
}

pub async fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: AppointmentStatus,
) -> Result<Appointment, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET status = $2, updated_at = clock_timestamp()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_one(conn)
    .await
}

pub async fn upcoming_for_consultant(
    pool: &PgPool,
    consultant_id: Uuid,
    from: DateTime<Utc>,
) -> Result<Vec<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments
         WHERE consultant_id = $1 AND status = 'scheduled' AND end_time > $2
         ORDER BY start_time",
    )
    .bind(consultant_id)
    .bind(from)
    .fetch_all(pool)
    .await
}
