//! Reservation/ticket consistency core.
//!
//! [`validator`] checks seat coordinates against a dome, [`manager`] turns a batch
//! of ticket requests into one reservation inside a single storage transaction.

pub mod error;
pub mod manager;
pub mod validator;

pub use error::{ReservationError, SeatConflict, TicketError, TicketErrors, TicketField};
pub use manager::ReservationManager;
pub use validator::{validate, BoundsError};
