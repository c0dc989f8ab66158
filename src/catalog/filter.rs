//! Query parameters for catalog listings and the row folding that keeps
//! list results free of join duplicates.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::CatalogError;

/// `?title=&show_time=` as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub title: Option<String>,
    pub show_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowFilter {
    /// ILIKE pattern, already escaped and wrapped in `%`.
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub title: Option<String>,
    pub show_date: Option<NaiveDate>,
}

impl ShowFilter {
    pub fn from_query(query: &CatalogQuery) -> Self {
        Self {
            title: query.title.as_deref().and_then(title_pattern),
        }
    }
}

impl SessionFilter {
    pub fn from_query(query: &CatalogQuery) -> Result<Self, CatalogError> {
        let show_date = match query.show_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_show_date(raw)?),
        };
        Ok(Self {
            title: query.title.as_deref().and_then(title_pattern),
            show_date,
        })
    }
}

/// Parses a `YYYY-MM-DD` calendar day.
pub fn parse_show_date(raw: &str) -> Result<NaiveDate, CatalogError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| CatalogError::Invalid {
        field: "show_time",
        message: format!("expected a date in YYYY-MM-DD format, got {raw:?}"),
    })
}

/// Case-insensitive substring pattern over the text exactly as given; only an
/// empty string disables the filter.
pub fn title_pattern(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// One row per (show, theme) from the display join.
#[derive(Debug, Clone, FromRow)]
pub struct ShowRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub theme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub show_theme: Vec<String>,
    pub show_sessions: Vec<i64>,
}

/// One row per (session, theme of its show).
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub show_title: String,
    pub dome_name: String,
    pub theme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionListItem {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub astronomy_show: String,
    pub planetarium_dome: String,
    pub show_theme: Vec<String>,
}

fn push_theme(themes: &mut Vec<String>, theme: Option<String>) {
    if let Some(theme) = theme {
        if !themes.contains(&theme) {
            themes.push(theme);
        }
    }
}

/// Collapses join rows into one item per show id, keeping first-seen order.
pub fn fold_shows(rows: Vec<ShowRow>) -> Vec<ShowListItem> {
    let mut items: Vec<ShowListItem> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();
    for row in rows {
        let pos = *positions.entry(row.id).or_insert_with(|| {
            items.push(ShowListItem {
                id: row.id,
                title: row.title.clone(),
                description: row.description.clone(),
                show_theme: Vec::new(),
                show_sessions: Vec::new(),
            });
            items.len() - 1
        });
        push_theme(&mut items[pos].show_theme, row.theme);
    }
    items
}

/// Collapses join rows into one item per session id, keeping first-seen order.
pub fn fold_sessions(rows: Vec<SessionRow>) -> Vec<SessionListItem> {
    let mut items: Vec<SessionListItem> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();
    for row in rows {
        let pos = *positions.entry(row.id).or_insert_with(|| {
            items.push(SessionListItem {
                id: row.id,
                show_time: row.show_time,
                astronomy_show: row.show_title.clone(),
                planetarium_dome: row.dome_name.clone(),
                show_theme: Vec::new(),
            });
            items.len() - 1
        });
        push_theme(&mut items[pos].show_theme, row.theme);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn show_row(id: i64, theme: Option<&str>) -> ShowRow {
        ShowRow {
            id,
            title: format!("Show {id}"),
            description: String::new(),
            theme: theme.map(str::to_string),
        }
    }

    #[test]
    fn show_matching_several_themes_appears_once() {
        let rows = vec![
            show_row(1, Some("Cosmos")),
            show_row(1, Some("Cosmic rays")),
            show_row(1, Some("Cosmos")),
            show_row(2, None),
        ];
        let items = fold_shows(rows);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 1);
        assert_eq!(items[0].show_theme, vec!["Cosmos", "Cosmic rays"]);
        assert!(items[1].show_theme.is_empty());
    }

    #[test]
    fn sessions_fold_keeps_query_order() {
        let at = Utc.with_ymd_and_hms(2025, 5, 18, 15, 0, 0).unwrap();
        let row = |id, theme: &str| SessionRow {
            id,
            show_time: at,
            show_title: "Stars".to_string(),
            dome_name: "Main Dome".to_string(),
            theme: Some(theme.to_string()),
        };
        let items = fold_sessions(vec![row(9, "A"), row(3, "A"), row(9, "B"), row(3, "B")]);
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![9, 3]);
        assert_eq!(items[0].show_theme, vec!["A", "B"]);
    }

    #[test]
    fn title_pattern_escapes_wildcards() {
        assert_eq!(title_pattern(""), None);
        assert_eq!(title_pattern("  ").as_deref(), Some("%  %"));
        assert_eq!(title_pattern(" Mars").as_deref(), Some("% Mars%"));
        assert_eq!(title_pattern("Mars").as_deref(), Some("%Mars%"));
        assert_eq!(title_pattern("100%_a\\b").as_deref(), Some("%100\\%\\_a\\\\b%"));
    }

    #[test]
    fn session_filter_parses_date() {
        let query = CatalogQuery {
            title: Some("stars".to_string()),
            show_time: Some("2025-05-18".to_string()),
        };
        let filter = SessionFilter::from_query(&query).unwrap();
        assert_eq!(filter.show_date, NaiveDate::from_ymd_opt(2025, 5, 18));
        assert_eq!(filter.title.as_deref(), Some("%stars%"));

        let bad = CatalogQuery {
            title: None,
            show_time: Some("18/05/2025".to_string()),
        };
        assert!(matches!(
            SessionFilter::from_query(&bad),
            Err(CatalogError::Invalid { field: "show_time", .. })
        ));
    }
}
