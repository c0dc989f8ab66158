use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{error::AppError, middleware::StaffUser, models::dome::DomePayload, AppState};

// Domes are staff-only for every verb
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/planetarium_domes", get(list_domes).post(create_dome))
        .route(
            "/planetarium_domes/{id}",
            get(get_dome).put(update_dome).delete(delete_dome),
        )
}

async fn list_domes(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.list_domes().await?))
}

async fn get_dome(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.get_dome(id).await?))
}

async fn create_dome(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Json(payload): Json<DomePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let dome = state.catalog.create_dome(&payload).await?;
    Ok((StatusCode::CREATED, Json(dome)))
}

// PUT /api/planetarium_domes/{id}
// Geometry is frozen once sessions reference the dome (409).
async fn update_dome(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    Json(payload): Json<DomePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(state.catalog.update_dome(id, &payload).await?))
}

async fn delete_dome(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete_dome(id).await?;
    tracing::info!(staff = %staff.email, dome_id = id, "planetarium dome deleted");
    Ok(StatusCode::NO_CONTENT)
}
