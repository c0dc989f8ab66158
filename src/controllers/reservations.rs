use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppError,
    middleware::AuthUser,
    models::TicketRequest,
    pagination::{PageQuery, PageRequest},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/reservations", get(list_reservations).post(create_reservation))
}

/* ---------- RESERVATIONS ---------- */

// GET /api/reservations?page=&page_size=
// Only the caller's reservations, newest first.
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pagination = state.config.pagination;
    let page = PageRequest::resolve(query, pagination.page_size, pagination.max_page_size);
    let reservations = state.reservations.list_reservations(user.user_id, page).await?;
    Ok(Json(reservations))
}

// POST /api/reservations
#[derive(Debug, Deserialize)]
struct CreateReservationRequest {
    #[serde(default)]
    tickets: Vec<TicketRequest>,
}

async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = state
        .reservations
        .create_reservation(user.user_id, &req.tickets)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}
