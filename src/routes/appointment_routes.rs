// src/routes/appointment_routes.rs

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    extract::{Json, Path, Query},
    models::{AppState, Appointment, AppointmentRequest, AppointmentStatus, OkResponse, datetime_format},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route("/appointments/upcoming", get(get_upcoming))
        .route("/appointments/today", get(get_today))
        .route("/appointments/overdue", get(get_overdue))
        .route("/appointments/between", get(get_between))
        .route("/appointments/doctors", get(list_doctors))
        .route("/appointments/departments", get(list_departments))
        .route("/appointments/stats/total", get(count_appointments))
        .route("/appointments/stats/status/{status}", get(count_by_status))
        .route("/appointments/patient/{patient_id}", get(list_by_patient))
        .route("/appointments/doctor/{doctor_name}", get(list_by_doctor))
        .route("/appointments/department/{department}", get(list_by_department))
        .route("/appointments/status/{status}", get(list_by_status))
        .route(
            "/appointments/{appointment_id}",
            get(get_appointment).put(update_appointment).delete(delete_appointment),
        )
        .route("/appointments/{appointment_id}/status", patch(patch_status))
        .route("/appointments/{appointment_id}/cancel", patch(cancel_appointment))
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, ApiError> {
    raw.parse().map_err(|e| ApiError::validation(format!("{e}")))
}

/* ============================================================
   CRUD
   ============================================================ */

pub async fn create_appointment(
    State(state): State<AppState>,
    Json(req): Json<AppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let appointment = state.appointments.create_appointment(req).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn list_appointments(
    State(state): State<AppState>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.list().await?))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(state.appointments.get(appointment_id).await?))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<AppointmentRequest>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(state.appointments.update_appointment(appointment_id, req).await?))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    state.appointments.delete(appointment_id).await?;
    Ok(Json(OkResponse::ok()))
}

/* ============================================================
   Status transitions
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

pub async fn patch_status(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    Query(q): Query<StatusQuery>,
) -> Result<Json<Appointment>, ApiError> {
    let Some(raw) = q.status else {
        return Err(ApiError::validation("status is required"));
    };
    let status = parse_status(&raw)?;

    Ok(Json(state.appointments.update_status(appointment_id, status).await?))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, ApiError> {
    Ok(Json(state.appointments.cancel(appointment_id).await?))
}

/* ============================================================
   Filtered reads
   ============================================================ */

pub async fn list_by_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.by_patient(patient_id).await?))
}

pub async fn list_by_doctor(
    State(state): State<AppState>,
    Path(doctor_name): Path<String>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.by_doctor(&doctor_name).await?))
}

pub async fn list_by_department(
    State(state): State<AppState>,
    Path(department): Path<String>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.by_department(&department).await?))
}

pub async fn list_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let status = parse_status(&status)?;
    Ok(Json(state.appointments.by_status(status).await?))
}

pub async fn get_upcoming(
    State(state): State<AppState>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.upcoming().await?))
}

pub async fn get_today(State(state): State<AppState>) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.today().await?))
}

pub async fn get_overdue(
    State(state): State<AppState>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.overdue().await?))
}

#[derive(Debug, Deserialize)]
pub struct BetweenQuery {
    #[serde(with = "datetime_format")]
    pub start: NaiveDateTime,
    #[serde(with = "datetime_format")]
    pub end: NaiveDateTime,
}

pub async fn get_between(
    State(state): State<AppState>,
    Query(q): Query<BetweenQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    Ok(Json(state.appointments.between(q.start, q.end).await?))
}

pub async fn list_doctors(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.appointments.doctors().await?))
}

pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.appointments.departments().await?))
}

/* ============================================================
   Stats
   ============================================================ */

pub async fn count_appointments(State(state): State<AppState>) -> Result<Json<i64>, ApiError> {
    Ok(Json(state.appointments.count().await?))
}

pub async fn count_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<i64>, ApiError> {
    let status = parse_status(&status)?;
    Ok(Json(state.appointments.count_by_status(status).await?))
}
