use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::{
    catalog::{CatalogQuery, SessionFilter},
    error::AppError,
    middleware::{AuthUser, StaffUser},
    models::session::SessionPayload,
    AppState,
};

// Read for any authenticated user, write for staff
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/show_sessions", get(list_sessions).post(create_session))
        .route(
            "/show_sessions/{id}",
            get(get_session).put(update_session).delete(delete_session),
        )
}

// GET /api/show_sessions?title=&show_time=YYYY-MM-DD
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = SessionFilter::from_query(&query)?;
    Ok(Json(state.catalog.list_sessions(&filter).await?))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.get_session(id).await?))
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Json(payload): Json<SessionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.catalog.create_session(&payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn update_session(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<i64>,
    Json(payload): Json<SessionPayload>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.update_session(id, &payload).await?))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    StaffUser(staff): StaffUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete_session(id).await?;
    tracing::info!(staff = %staff.email, session_id = id, "show session deleted");
    Ok(StatusCode::NO_CONTENT)
}
