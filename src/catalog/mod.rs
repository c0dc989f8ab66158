//! Reference data: themes, shows, domes and sessions.

pub mod filter;
pub mod repository;

use thiserror::Error;

pub use filter::{CatalogQuery, SessionFilter, SessionListItem, ShowFilter, ShowListItem};
pub use repository::CatalogRepository;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// Maps constraint failures of an INSERT/UPDATE to field errors.
    pub(crate) fn on_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Invalid {
                    field: "name",
                    message: "an object with this name already exists".to_string(),
                };
            }
            if db.is_foreign_key_violation() {
                return Self::Invalid {
                    field: reference_field(db.constraint()),
                    message: "referenced object does not exist".to_string(),
                };
            }
        }
        Self::Database(err)
    }

    /// Maps a foreign key failure of a DELETE to a conflict.
    pub(crate) fn on_delete(err: sqlx::Error, what: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::Conflict(format!("{what} is still referenced and cannot be deleted"))
            }
            _ => Self::Database(err),
        }
    }
}

fn reference_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("show_sessions_astronomy_show_fk") => "astronomy_show",
        Some("show_sessions_planetarium_dome_fk") => "planetarium_dome",
        Some("astronomy_show_themes_theme_fk") => "show_theme",
        _ => "non_field_errors",
    }
}
