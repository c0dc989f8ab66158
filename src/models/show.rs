use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Theme {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Theme ids
    #[sqlx(skip)]
    pub show_theme: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ThemePayload {
    #[validate(length(min = 1, max = 64, message = "must be between 1 and 64 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShowPayload {
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub show_theme: Vec<i64>,
}
