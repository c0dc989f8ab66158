use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::{error::AppError, models::User, AppState};

/// Any active, authenticated user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
}

/// An authenticated user with `is_staff` set; required for catalog writes.
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthUser);

/// Splits an `Authorization: Basic <base64(email:password)>` header value.
fn basic_credentials(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (email, password) = credentials.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (email, password) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(basic_credentials)
            .ok_or(AppError::Unauthorized)?;

        let user = User::find_by_email(&email, &state.db)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::Unauthorized)?;

        // bcrypt is CPU-bound
        let checked = user.clone();
        let valid = tokio::task::spawn_blocking(move || checked.verify_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))?;
        if !valid {
            tracing::debug!(%email, "rejected credentials");
            return Err(AppError::Unauthorized);
        }

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
            is_staff: user.is_staff,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(AppError::Forbidden);
        }
        Ok(StaffUser(user))
    }
}
