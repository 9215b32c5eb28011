use crate::models::AppState;
use axum::Router;

pub mod appointment_routes;
pub mod health_routes;
pub mod patient_routes;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(patient_routes::router())
        .merge(appointment_routes::router());

    Router::new()
        .nest("/api", api)
        .merge(health_routes::router())
        .with_state(state)
}
