use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    catalog::{CatalogQuery, ShowFilter},
    error::AppError,
    middleware::{AuthUser, StaffUser},
    models::show::ShowPayload,
    AppState,
};

// Read for any authenticated user, write for staff
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/astronomy_shows", get(list_shows).post(create_show))
        .route(
            "/astronomy_shows/{id}",
            get(get_show).put(update_show).delete(delete_show),
        )
}

// GET /api/astronomy_shows?title=
// `title` matches show title, description or theme name, case-insensitively.
async fn list_shows(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ShowFilter::from_query(&query);
    Ok(Json(state.catalog.list_shows(&filter).await?))
}

async fn get_show(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.get_show(id).await?))
}

async fn create_show(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Json(payload): Json<ShowPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let show = state.catalog.create_show(&payload).await?;
    Ok((StatusCode::CREATED, Json(show)))
}

async fn update_show(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    Json(payload): Json<ShowPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(state.catalog.update_show(id, &payload).await?))
}

async fn delete_show(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete_show(id).await?;
    tracing::info!(staff = %staff.email, show_id = id, "astronomy show deleted");
    Ok(StatusCode::NO_CONTENT)
}
