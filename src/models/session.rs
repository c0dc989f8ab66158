use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A show scheduled in a dome. Its seat space is the dome's.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    #[sqlx(rename = "astronomy_show_id")]
    pub astronomy_show: i64,
    #[sqlx(rename = "planetarium_dome_id")]
    pub planetarium_dome: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionPayload {
    pub show_time: DateTime<Utc>,
    pub astronomy_show: i64,
    pub planetarium_dome: i64,
}
