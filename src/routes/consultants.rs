use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::extractor::Caller;
use crate::db;
use crate::error::AppError;
use crate::models::{AppointmentStatus, Consultant};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateConsultant {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ScheduleParams {
    pub from: Option<DateTime<Utc>>,
}

/// Busy slot of a consultant, without the booking client's identity.
#[derive(Serialize)]
pub struct BookedSlot {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
}

pub async fn create(
    caller: Caller,
    State(state): State<SharedState>,
    Json(req): Json<CreateConsultant>,
) -> Result<impl IntoResponse, AppError> {
    caller.require_admin()?;

    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > 200 {
        return Err(AppError::BadRequest(
            "Name must be between 1 and 200 characters".to_string(),
        ));
    }

    let consultant = db::consultants::create(&state.pool, name).await?;
    tracing::info!(consultant_id = %consultant.id, "Consultant created");

    let location = format!("/api/consultants/{}", consultant.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(consultant),
    ))
}

pub async fn list(
    _caller: Caller,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Consultant>>, AppError> {
    let consultants = db::consultants::list(&state.pool).await?;
    Ok(Json(consultants))
}

pub async fn get(
    _caller: Caller,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Consultant>, AppError> {
    let consultant = db::consultants::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Consultant not found".to_string()))?;
    Ok(Json(consultant))
}

pub async fn schedule(
    _caller: Caller,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<Vec<BookedSlot>>, AppError> {
    db::consultants::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Consultant not found".to_string()))?;

    let from = params.from.unwrap_or_else(Utc::now);
    let slots = db::appointments::upcoming_for_consultant(&state.pool, id, from)
        .await?
        .into_iter()
        .map(|a| BookedSlot {
            id: a.id,
            start_time: a.start_time,
            end_time: a.end_time,
            status: a.status,
        })
        .collect();

    Ok(Json(slots))
}
