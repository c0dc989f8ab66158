//! Storage boundary for the reservation core.
//!
//! The manager only talks to [`ReservationStore`] and [`ReservationTx`]. Whatever
//! backs them must guarantee that a `(session, row, seat)` key is held by at most
//! one committed ticket, and must report a violation of that guarantee as
//! [`StoreError::UniqueViolation`] whether it fires on insert or on commit.

pub mod memory;
pub mod postgres;

use std::future::Future;

use thiserror::Error;

use crate::models::reservation::ReservationDetail;
use crate::models::{Dome, Reservation, SeatKey, Ticket};
use crate::pagination::{Page, PageRequest};

pub use memory::MemoryStore;
pub use postgres::PgReservationStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("seat uniqueness constraint violated")]
    UniqueViolation { seat: Option<SeatKey> },

    /// The database aborted the transaction as a deadlock victim or on a
    /// serialization failure while competing for `seat`.
    #[error("transaction aborted by concurrent reservation")]
    Contention { seat: Option<SeatKey> },

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Classify a driver error. Unique-constraint failures become `UniqueViolation`,
    /// deadlocks (`40P01`) and serialization failures (`40001`) become `Contention`.
    pub fn from_sqlx(err: sqlx::Error, seat: Option<SeatKey>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::UniqueViolation { seat },
            sqlx::Error::Database(db) if is_contention(db.code().as_deref()) => {
                Self::Contention { seat }
            }
            _ => Self::Database(err),
        }
    }
}

fn is_contention(code: Option<&str>) -> bool {
    matches!(code, Some("40P01" | "40001"))
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::from_sqlx(err, None)
    }
}

pub trait ReservationStore: Send + Sync {
    type Tx: ReservationTx;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;

    /// The user's reservations, newest first.
    fn list_reservations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<ReservationDetail>, StoreError>> + Send;
}

/// One atomic unit of work. Dropping it without `commit` must discard every write.
pub trait ReservationTx: Send {
    /// Geometry of the dome hosting `session_id`, or `None` if the session does not exist.
    fn session_dome(
        &mut self,
        session_id: i64,
    ) -> impl Future<Output = Result<Option<Dome>, StoreError>> + Send;

    fn is_taken(&mut self, seat: SeatKey) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn insert_reservation(
        &mut self,
        user_id: i64,
    ) -> impl Future<Output = Result<Reservation, StoreError>> + Send;

    fn insert_ticket(
        &mut self,
        reservation_id: i64,
        seat: SeatKey,
    ) -> impl Future<Output = Result<Ticket, StoreError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
