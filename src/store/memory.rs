//! In-process reservation storage.
//!
//! Writes are buffered per transaction and only applied on commit, under one lock,
//! after re-checking the seat uniqueness constraint. Reads inside a transaction see
//! committed state only, the same view a READ COMMITTED database gives.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use super::{ReservationStore, ReservationTx, StoreError};
use crate::models::reservation::{ReservationDetail, SessionSummary, TicketDetail};
use crate::models::{Dome, Reservation, SeatKey, Session, Ticket};
use crate::pagination::{Page, PageRequest};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    next_id: AtomicI64,
}

#[derive(Default)]
struct State {
    users: HashMap<i64, String>,
    domes: HashMap<i64, Dome>,
    sessions: HashMap<i64, Session>,
    reservations: BTreeMap<i64, Reservation>,
    taken: HashMap<SeatKey, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub async fn add_user(&self, email: &str) -> i64 {
        let id = self.next_id();
        self.inner.state.lock().await.users.insert(id, email.to_string());
        id
    }

    pub async fn add_dome(&self, name: &str, rows: i32, seats_in_row: i32) -> Dome {
        let dome = Dome {
            id: self.next_id(),
            name: name.to_string(),
            rows,
            seats_in_row,
        };
        self.inner.state.lock().await.domes.insert(dome.id, dome.clone());
        dome
    }

    pub async fn add_session(
        &self,
        show_id: i64,
        dome_id: i64,
        show_time: DateTime<Utc>,
    ) -> Session {
        let session = Session {
            id: self.next_id(),
            show_time,
            astronomy_show: show_id,
            planetarium_dome: dome_id,
        };
        self.inner.state.lock().await.sessions.insert(session.id, session.clone());
        session
    }

    pub async fn ticket_count(&self, session_id: i64) -> usize {
        let state = self.inner.state.lock().await;
        state.taken.keys().filter(|k| k.session_id == session_id).count()
    }

    pub async fn reservation_count(&self) -> usize {
        self.inner.state.lock().await.reservations.len()
    }

    pub async fn total_tickets(&self) -> usize {
        self.inner.state.lock().await.taken.len()
    }
}

pub struct MemoryTx {
    store: MemoryStore,
    reservations: Vec<Reservation>,
    tickets: Vec<Ticket>,
}

impl ReservationStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            store: self.clone(),
            reservations: Vec::new(),
            tickets: Vec::new(),
        })
    }

    async fn list_reservations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<ReservationDetail>, StoreError> {
        let state = self.inner.state.lock().await;
        let mut own: Vec<&Reservation> = state
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let count = own.len() as i64;
        let email = state.users.get(&user_id).cloned().unwrap_or_default();
        let results = own
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .map(|r| ReservationDetail {
                id: r.id,
                user: email.clone(),
                created_at: r.created_at,
                tickets: r
                    .tickets
                    .iter()
                    .filter_map(|t| {
                        let session = state.sessions.get(&t.session_id)?;
                        Some(TicketDetail {
                            id: t.id,
                            show_session: SessionSummary {
                                id: session.id,
                                show_time: session.show_time,
                                astronomy_show: session.astronomy_show,
                                planetarium_dome: session.planetarium_dome,
                            },
                            row: t.row,
                            seat: t.seat,
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(Page::new(page, count, results))
    }
}

impl ReservationTx for MemoryTx {
    async fn session_dome(&mut self, session_id: i64) -> Result<Option<Dome>, StoreError> {
        let state = self.store.inner.state.lock().await;
        Ok(state
            .sessions
            .get(&session_id)
            .and_then(|s| state.domes.get(&s.planetarium_dome))
            .cloned())
    }

    async fn is_taken(&mut self, seat: SeatKey) -> Result<bool, StoreError> {
        Ok(self.store.inner.state.lock().await.taken.contains_key(&seat))
    }

    async fn insert_reservation(&mut self, user_id: i64) -> Result<Reservation, StoreError> {
        let reservation = Reservation {
            id: self.store.next_id(),
            created_at: Utc::now(),
            user_id,
            tickets: Vec::new(),
        };
        self.reservations.push(reservation.clone());
        Ok(reservation)
    }

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        seat: SeatKey,
    ) -> Result<Ticket, StoreError> {
        let ticket = Ticket {
            id: self.store.next_id(),
            session_id: seat.session_id,
            row: seat.row,
            seat: seat.seat,
            reservation_id,
        };
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut state = self.store.inner.state.lock().await;

        let mut staged = HashSet::with_capacity(self.tickets.len());
        for ticket in &self.tickets {
            let key = ticket.key();
            if state.taken.contains_key(&key) || !staged.insert(key) {
                debug!(%key, "commit rejected by seat uniqueness constraint");
                return Err(StoreError::UniqueViolation { seat: Some(key) });
            }
        }

        for mut reservation in self.reservations {
            reservation.tickets = self
                .tickets
                .iter()
                .filter(|t| t.reservation_id == reservation.id)
                .cloned()
                .collect();
            state.reservations.insert(reservation.id, reservation);
        }
        for ticket in &self.tickets {
            state.taken.insert(ticket.key(), ticket.id);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Session) {
        let store = MemoryStore::new();
        let dome = store.add_dome("Main Dome", 10, 10).await;
        let session = store.add_session(1, dome.id, Utc::now()).await;
        (store, session)
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let (store, session) = seeded().await;
        let key = SeatKey::new(session.id, 1, 1);

        let mut tx = store.begin().await.unwrap();
        let reservation = tx.insert_reservation(7).await.unwrap();
        tx.insert_ticket(reservation.id, key).await.unwrap();

        let mut other = store.begin().await.unwrap();
        assert!(!other.is_taken(key).await.unwrap());

        tx.rollback().await.unwrap();
        assert_eq!(store.total_tickets().await, 0);
        assert_eq!(store.reservation_count().await, 0);
    }

    #[tokio::test]
    async fn second_commit_of_same_seat_is_rejected() {
        let (store, session) = seeded().await;
        let key = SeatKey::new(session.id, 3, 4);

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        assert!(!first.is_taken(key).await.unwrap());
        assert!(!second.is_taken(key).await.unwrap());

        let r1 = first.insert_reservation(1).await.unwrap();
        first.insert_ticket(r1.id, key).await.unwrap();
        let r2 = second.insert_reservation(2).await.unwrap();
        second.insert_ticket(r2.id, key).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { seat: Some(k) } if k == key));

        assert_eq!(store.ticket_count(session.id).await, 1);
        assert_eq!(store.reservation_count().await, 1);
    }

    #[tokio::test]
    async fn session_dome_resolves_geometry() {
        let (store, session) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let dome = tx.session_dome(session.id).await.unwrap().unwrap();
        assert_eq!((dome.rows, dome.seats_in_row), (10, 10));
        assert!(tx.session_dome(9_999).await.unwrap().is_none());
    }
}
