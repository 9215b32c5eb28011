// src/routes/patient_routes.rs

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::ApiError,
    extract::{Json, Path, Query},
    models::{AppState, OkResponse, Patient, PatientRequest},
    services::patients::DEFAULT_RECENT_DAYS,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/search", get(search_patients))
        .route("/patients/recent", get(recent_patients))
        .route("/patients/stats/total", get(count_patients))
        .route("/patients/stats/gender/{gender}", get(count_patients_by_gender))
        .route("/patients/email/{email}", get(get_patient_by_email))
        .route("/patients/phone/{phone}", get(get_patient_by_phone))
        .route("/patients/gender/{gender}", get(list_patients_by_gender))
        .route("/patients/blood-group/{blood_group}", get(list_patients_by_blood_group))
        .route(
            "/patients/{patient_id}",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
}

pub async fn create_patient(
    State(state): State<AppState>,
    Json(req): Json<PatientRequest>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let patient = state.patients.create(req).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn list_patients(State(state): State<AppState>) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.patients.list().await?))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.patients.get(patient_id).await?))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<PatientRequest>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.patients.update(patient_id, req).await?))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    state.patients.delete(patient_id).await?;
    Ok(Json(OkResponse::ok()))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

pub async fn search_patients(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let name = q.name.unwrap_or_default();
    Ok(Json(state.patients.search_by_name(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub days: Option<i64>,
}

pub async fn recent_patients(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let days = q.days.unwrap_or(DEFAULT_RECENT_DAYS);
    Ok(Json(state.patients.registered_since_days(days).await?))
}

pub async fn get_patient_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.patients.by_email(&email).await?))
}

pub async fn get_patient_by_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.patients.by_phone(&phone).await?))
}

pub async fn list_patients_by_gender(
    State(state): State<AppState>,
    Path(gender): Path<String>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.patients.by_gender(&gender).await?))
}

pub async fn list_patients_by_blood_group(
    State(state): State<AppState>,
    Path(blood_group): Path<String>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.patients.by_blood_group(&blood_group).await?))
}

pub async fn count_patients(State(state): State<AppState>) -> Result<Json<i64>, ApiError> {
    Ok(Json(state.patients.count().await?))
}

pub async fn count_patients_by_gender(
    State(state): State<AppState>,
    Path(gender): Path<String>,
) -> Result<Json<i64>, ApiError> {
    Ok(Json(state.patients.count_by_gender(&gender).await?))
}
