use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{error::AppError, middleware::StaffUser, models::show::ThemePayload, AppState};

// Themes are staff-only for every verb
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/show_themes", get(list_themes).post(create_theme))
        .route(
            "/show_themes/{id}",
            get(get_theme).put(update_theme).delete(delete_theme),
        )
}

async fn list_themes(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.list_themes().await?))
}

async fn get_theme(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.get_theme(id).await?))
}

async fn create_theme(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Json(payload): Json<ThemePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let theme = state.catalog.create_theme(&payload).await?;
    Ok((StatusCode::CREATED, Json(theme)))
}

async fn update_theme(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    Json(payload): Json<ThemePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(state.catalog.update_theme(id, &payload).await?))
}

async fn delete_theme(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete_theme(id).await?;
    tracing::info!(staff = %staff.email, theme_id = id, "show theme deleted");
    Ok(StatusCode::NO_CONTENT)
}
