use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Identity of a seat within a session. At most one ticket may hold a given key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatKey {
    #[serde(rename = "show_session")]
    pub session_id: i64,
    pub row: i32,
    pub seat: i32,
}

impl SeatKey {
    pub fn new(session_id: i64, row: i32, seat: i32) -> Self {
        Self { session_id, row, seat }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {} row {} seat {}", self.session_id, self.row, self.seat)
    }
}

/// One requested seat in a reservation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRequest {
    #[serde(rename = "show_session")]
    pub session_id: i64,
    pub row: i32,
    pub seat: i32,
}

impl TicketRequest {
    pub fn new(session_id: i64, row: i32, seat: i32) -> Self {
        Self { session_id, row, seat }
    }

    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.session_id, self.row, self.seat)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    #[serde(rename = "show_session")]
    #[sqlx(rename = "show_session_id")]
    pub session_id: i64,
    pub row: i32,
    pub seat: i32,
    #[serde(skip)]
    pub reservation_id: i64,
}

impl Ticket {
    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.session_id, self.row, self.seat)
    }
}

/// One checkout. Tickets are kept in the order they were requested.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub user_id: i64,
    #[sqlx(skip)]
    pub tickets: Vec<Ticket>,
}

/// Session fields shown next to a ticket in reservation listings.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: i64,
    pub show_time: DateTime<Utc>,
    pub astronomy_show: i64,
    pub planetarium_dome: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetail {
    pub id: i64,
    pub show_session: SessionSummary,
    pub row: i32,
    pub seat: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetail {
    pub id: i64,
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketDetail>,
}
