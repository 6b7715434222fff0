use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::Caller;
use crate::db;
use crate::db::appointments::NewAppointment;
use crate::error::AppError;
use crate::models::{Appointment, AppointmentStatus, resolve_interval};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateAppointment {
    pub start_time: DateTime<Utc>,
    pub consultant_id: Uuid,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct RescheduleAppointment {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<AppointmentStatus>,
    pub consultant_id: Option<Uuid>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn create(
    caller: Caller,
    State(state): State<SharedState>,
    Json(req): Json<CreateAppointment>,
) -> Result<impl IntoResponse, AppError> {
    let (start_time, end_time) = resolve_interval(
        req.start_time,
        req.end_time,
        Duration::minutes(state.config.default_duration_minutes),
    )
    .map_err(AppError::BadRequest)?;

    let mut tx = state.pool.begin().await?;

    if !db::consultants::lock(&mut *tx, req.consultant_id).await? {
        return Err(AppError::NotFound("Consultant not found".to_string()));
    }

    if db::appointments::has_overlap(&mut *tx, req.consultant_id, start_time, end_time, None).await? {
        return Err(AppError::Conflict(
            "Consultant is already booked for this time".to_string(),
        ));
    }

    let new = NewAppointment {
        consultant_id: req.consultant_id,
        booked_by: &caller.subject,
        start_time,
        end_time,
    };
    let appointment = db::appointments::insert(&mut *tx, &new)
        .await
        .map_err(map_write_error)?;

    tx.commit().await?;

    tracing::info!(
        appointment_id = %appointment.id,
        consultant_id = %appointment.consultant_id,
        "Appointment booked"
    );

    let location = format!("/api/appointments/{}", appointment.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(appointment),
    ))
}

pub async fn list(
    caller: Caller,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1)
        .checked_mul(per_page)
        .ok_or_else(|| AppError::BadRequest("page is out of range".to_string()))?;

    let list_params = db::appointments::ListParams {
        booked_by: caller.subject,
        status: params.status,
        consultant_id: params.consultant_id,
        limit: per_page,
        offset,
    };

    let appointments = db::appointments::list(&state.pool, &list_params).await?;
    let total = db::appointments::count(&state.pool, &list_params).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": total,
        "page": page,
        "per_page": per_page,
    })))
}

pub async fn get(
    caller: Caller,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    if let Some(cached) = state.cache.get(id).await {
        if cached.booked_by == caller.subject {
            return Ok(Json(cached));
        }
    }

    let appointment = db::appointments::find_for_caller(&state.pool, id, &caller.subject)
        .await?
        .ok_or_else(not_found)?;

    state.cache.put(&appointment).await;
    Ok(Json(appointment))
}

pub async fn reschedule(
    caller: Caller,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RescheduleAppointment>,
) -> Result<Json<Appointment>, AppError> {
    let mut tx = state.pool.begin().await?;

    let current = db::appointments::lock_for_caller(&mut *tx, id, &caller.subject)
        .await?
        .ok_or_else(not_found)?;

    if current.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Cannot reschedule a {} appointment",
            current.status
        )));
    }

    // Without an explicit end the booked length is preserved.
    let current_length = current.end_time - current.start_time;
    let (start_time, end_time) = resolve_interval(req.start_time, req.end_time, current_length)
        .map_err(AppError::BadRequest)?;

    db::consultants::lock(&mut *tx, current.consultant_id).await?;

    if db::appointments::has_overlap(
        &mut *tx,
        current.consultant_id,
        start_time,
        end_time,
        Some(id),
    )
    .await?
    {
        return Err(AppError::Conflict(
            "Consultant is already booked for this time".to_string(),
        ));
    }

    let appointment = db::appointments::reschedule(&mut *tx, id, start_time, end_time)
        .await
        .map_err(map_write_error)?;

    tx.commit().await?;
    state.cache.put(&appointment).await;

    tracing::info!(appointment_id = %id, "Appointment rescheduled");

    Ok(Json(appointment))
}

pub async fn complete(
    caller: Caller,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    transition(&state, &caller, id, AppointmentStatus::Completed).await
}

pub async fn cancel(
    caller: Caller,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    transition(&state, &caller, id, AppointmentStatus::Cancelled).await
}

async fn transition(
    state: &SharedState,
    caller: &Caller,
    id: Uuid,
    next: AppointmentStatus,
) -> Result<Json<Appointment>, AppError> {
    let mut tx = state.pool.begin().await?;

    let current = db::appointments::lock_for_caller(&mut *tx, id, &caller.subject)
        .await?
        .ok_or_else(not_found)?;

    if !current.status.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "Cannot move appointment from {} to {next}",
            current.status
        )));
    }

    let appointment = db::appointments::set_status(&mut *tx, id, next).await?;
    tx.commit().await?;
    state.cache.put(&appointment).await;

    tracing::info!(appointment_id = %id, status = %next, "Appointment status changed");

    Ok(Json(appointment))
}

fn not_found() -> AppError {
    AppError::NotFound("Appointment not found".to_string())
}

/// Translate constraint violations that slip past handler validation.
fn map_write_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
            AppError::BadRequest("start_time must be before end_time".to_string())
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::NotFound("Consultant not found".to_string())
        }
        sqlx::Error::RowNotFound => not_found(),
        _ => AppError::Database(e),
    }
}
