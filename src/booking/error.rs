use std::collections::BTreeMap;

use thiserror::Error;

use super::validator::BoundsError;
use crate::models::SeatKey;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TicketField {
    ShowSession,
    Row,
    Seat,
}

impl TicketField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShowSession => "show_session",
            Self::Row => "row",
            Self::Seat => "seat",
        }
    }
}

/// A field-level failure of the ticket at `index` in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketError {
    pub index: usize,
    pub field: TicketField,
    pub message: String,
}

impl TicketError {
    pub fn out_of_bounds(index: usize, err: BoundsError) -> Self {
        let field = match err {
            BoundsError::RowOutOfRange { .. } => TicketField::Row,
            BoundsError::SeatOutOfRange { .. } => TicketField::Seat,
        };
        Self {
            index,
            field,
            message: err.to_string(),
        }
    }

    pub fn unknown_session(index: usize, session_id: i64) -> Self {
        Self {
            index,
            field: TicketField::ShowSession,
            message: format!("Invalid pk \"{session_id}\" - object does not exist."),
        }
    }
}

/// All validation failures of one batch, addressable by input position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketErrors {
    pub ticket_count: usize,
    pub errors: Vec<TicketError>,
}

impl TicketErrors {
    pub fn for_index(&self, index: usize) -> impl Iterator<Item = &TicketError> {
        self.errors.iter().filter(move |e| e.index == index)
    }

    /// One map per submitted ticket, empty for tickets that passed.
    pub fn by_position(&self) -> Vec<BTreeMap<&'static str, Vec<String>>> {
        (0..self.ticket_count)
            .map(|index| {
                let mut fields = BTreeMap::new();
                for err in self.for_index(index) {
                    fields
                        .entry(err.field.as_str())
                        .or_insert_with(Vec::new)
                        .push(err.message.clone());
                }
                fields
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeatConflict {
    #[error("ticket {index}: {seat} is already taken")]
    Taken { index: usize, seat: SeatKey },

    #[error("ticket {index}: {seat} is also requested by ticket {first}")]
    Duplicate { index: usize, first: usize, seat: SeatKey },

    /// A commit-time constraint failure that could not be traced to one request.
    #[error("a requested seat was taken by a concurrent reservation")]
    Unattributed { seat: Option<SeatKey> },
}

impl SeatConflict {
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Taken { index, .. } | Self::Duplicate { index, .. } => Some(*index),
            Self::Unattributed { .. } => None,
        }
    }

    pub fn seat(&self) -> Option<SeatKey> {
        match self {
            Self::Taken { seat, .. } | Self::Duplicate { seat, .. } => Some(*seat),
            Self::Unattributed { seat } => *seat,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("a reservation must contain at least one ticket")]
    EmptyBatch,

    #[error("{} ticket field(s) failed validation", .0.errors.len())]
    Validation(TicketErrors),

    #[error(transparent)]
    Conflict(#[from] SeatConflict),

    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ReservationError {
    /// Losing a seat race is always a conflict, never a storage failure.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { seat } | StoreError::Contention { seat } => {
                Self::Conflict(SeatConflict::Unattributed { seat })
            }
            other => Self::Storage(other),
        }
    }
}
