use std::collections::HashMap;

use tracing::{info, instrument, warn};

use super::error::{ReservationError, SeatConflict, TicketError, TicketErrors};
use super::validator;
use crate::models::reservation::ReservationDetail;
use crate::models::{Dome, Reservation, SeatKey, TicketRequest};
use crate::pagination::{Page, PageRequest};
use crate::store::{ReservationStore, ReservationTx, StoreError};

/// Creates reservations as all-or-nothing units on top of a [`ReservationStore`].
///
/// A batch either persists one reservation with every requested ticket, or
/// nothing at all. Seat uniqueness is checked inside the same transaction that
/// inserts the tickets, and a uniqueness violation reported by the store at
/// insert or commit time is surfaced as a [`SeatConflict`] like any other.
#[derive(Clone)]
pub struct ReservationManager<S> {
    store: S,
}

impl<S: ReservationStore> ReservationManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, requests), fields(tickets = requests.len()))]
    pub async fn create_reservation(
        &self,
        user_id: i64,
        requests: &[TicketRequest],
    ) -> Result<Reservation, ReservationError> {
        if requests.is_empty() {
            info!("rejected empty reservation");
            return Err(ReservationError::EmptyBatch);
        }

        let mut tx = self.store.begin().await?;

        let reservation = match stage(&mut tx, user_id, requests).await {
            Ok(reservation) => reservation,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("rollback after rejected reservation failed: {rollback_err}");
                }
                info!("reservation rejected: {err}");
                return Err(err);
            }
        };

        match tx.commit().await {
            Ok(()) => {
                info!(reservation_id = reservation.id, "reservation created");
                Ok(reservation)
            }
            Err(StoreError::UniqueViolation { seat } | StoreError::Contention { seat }) => {
                let conflict = attribute(seat, requests);
                info!("reservation lost a seat race at commit: {conflict}");
                Err(conflict.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_reservations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<ReservationDetail>, ReservationError> {
        Ok(self.store.list_reservations(user_id, page).await?)
    }
}

/// Validates and writes the batch without committing.
async fn stage<T: ReservationTx>(
    tx: &mut T,
    user_id: i64,
    requests: &[TicketRequest],
) -> Result<Reservation, ReservationError> {
    let mut domes: HashMap<i64, Option<Dome>> = HashMap::new();
    let mut errors = Vec::new();

    for (index, request) in requests.iter().enumerate() {
        if !domes.contains_key(&request.session_id) {
            let dome = tx.session_dome(request.session_id).await?;
            domes.insert(request.session_id, dome);
        }
        match domes.get(&request.session_id).and_then(Option::as_ref) {
            Some(dome) => errors.extend(
                validator::violations(request.row, request.seat, dome)
                    .map(|err| TicketError::out_of_bounds(index, err)),
            ),
            None => errors.push(TicketError::unknown_session(index, request.session_id)),
        }
    }

    if !errors.is_empty() {
        return Err(ReservationError::Validation(TicketErrors {
            ticket_count: requests.len(),
            errors,
        }));
    }

    let mut claimed: HashMap<SeatKey, usize> = HashMap::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        let seat = request.key();
        if let Some(&first) = claimed.get(&seat) {
            return Err(SeatConflict::Duplicate { index, first, seat }.into());
        }
        claimed.insert(seat, index);

        if validator::is_taken(tx, seat).await? {
            return Err(SeatConflict::Taken { index, seat }.into());
        }
    }

    let mut reservation = tx.insert_reservation(user_id).await?;

    // Concurrent batches must take seat locks in the same order, whatever order
    // their tickets were requested in.
    let mut write_order: Vec<usize> = (0..requests.len()).collect();
    write_order.sort_by_key(|&index| requests[index].key());

    let mut written = vec![None; requests.len()];
    for index in write_order {
        let seat = requests[index].key();
        match tx.insert_ticket(reservation.id, seat).await {
            Ok(ticket) => written[index] = Some(ticket),
            Err(StoreError::UniqueViolation { .. } | StoreError::Contention { .. }) => {
                return Err(SeatConflict::Taken { index, seat }.into());
            }
            Err(err) => return Err(err.into()),
        }
    }
    reservation.tickets = written.into_iter().flatten().collect();

    Ok(reservation)
}

fn attribute(seat: Option<SeatKey>, requests: &[TicketRequest]) -> SeatConflict {
    seat.and_then(|seat| {
        requests
            .iter()
            .position(|r| r.key() == seat)
            .map(|index| SeatConflict::Taken { index, seat })
    })
    .unwrap_or(SeatConflict::Unattributed { seat })
}
