use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::{ReservationStore, ReservationTx, StoreError};
use crate::models::reservation::{ReservationDetail, SessionSummary, TicketDetail};
use crate::models::{Dome, Reservation, SeatKey, Ticket};
use crate::pagination::{Page, PageRequest};

/// PostgreSQL-backed reservation storage.
///
/// `tickets_session_row_seat_key` (UNIQUE on `show_session_id, row, seat`) decides
/// races: the in-transaction read is only a fast path, the constraint is what makes
/// a losing concurrent insert fail.
#[derive(Clone)]
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgReservationTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(FromRow)]
struct ReservationRow {
    id: i64,
    created_at: DateTime<Utc>,
    email: String,
}

#[derive(FromRow)]
struct TicketRow {
    id: i64,
    reservation_id: i64,
    row: i32,
    seat: i32,
    session_id: i64,
    show_time: DateTime<Utc>,
    astronomy_show: i64,
    planetarium_dome: i64,
}

impl ReservationStore for PgReservationStore {
    type Tx = PgReservationTx;

    async fn begin(&self) -> Result<PgReservationTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgReservationTx { tx })
    }

    async fn list_reservations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Page<ReservationDetail>, StoreError> {
        let count_query =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool);
        let page_query = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT r.id, r.created_at, u.email
            FROM reservations r
            JOIN users u ON u.id = r.user_id
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool);
        let (count, reservations) = futures::try_join!(count_query, page_query)?;

        let ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();
        let ticket_rows = if ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, TicketRow>(
                r#"
                SELECT t.id, t.reservation_id, t.row, t.seat,
                       s.id AS session_id,
                       s.show_time,
                       s.astronomy_show_id AS astronomy_show,
                       s.planetarium_dome_id AS planetarium_dome
                FROM tickets t
                JOIN show_sessions s ON s.id = t.show_session_id
                WHERE t.reservation_id = ANY($1)
                ORDER BY t.id
                "#,
            )
            .bind(ids.as_slice())
            .fetch_all(&self.pool)
            .await?
        };

        let mut tickets: HashMap<i64, Vec<TicketDetail>> = HashMap::new();
        for t in ticket_rows {
            tickets.entry(t.reservation_id).or_default().push(TicketDetail {
                id: t.id,
                show_session: SessionSummary {
                    id: t.session_id,
                    show_time: t.show_time,
                    astronomy_show: t.astronomy_show,
                    planetarium_dome: t.planetarium_dome,
                },
                row: t.row,
                seat: t.seat,
            });
        }

        let results = reservations
            .into_iter()
            .map(|r| ReservationDetail {
                tickets: tickets.remove(&r.id).unwrap_or_default(),
                id: r.id,
                user: r.email,
                created_at: r.created_at,
            })
            .collect();

        Ok(Page::new(page, count, results))
    }
}

impl ReservationTx for PgReservationTx {
    async fn session_dome(&mut self, session_id: i64) -> Result<Option<Dome>, StoreError> {
        // Share-locks the session and its dome so neither the session's dome nor the
        // dome's geometry can change under this reservation.
        let dome = sqlx::query_as::<_, Dome>(
            r#"
            SELECT d.id, d.name, d.rows, d.seats_in_row
            FROM show_sessions s
            JOIN planetarium_domes d ON d.id = s.planetarium_dome_id
            WHERE s.id = $1
            FOR SHARE OF s, d
            "#,
        )
        .bind(session_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(dome)
    }

    async fn is_taken(&mut self, seat: SeatKey) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                 SELECT 1 FROM tickets WHERE show_session_id = $1 AND row = $2 AND seat = $3
             )",
        )
        .bind(seat.session_id)
        .bind(seat.row)
        .bind(seat.seat)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(taken)
    }

    async fn insert_reservation(&mut self, user_id: i64) -> Result<Reservation, StoreError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (user_id) VALUES ($1) RETURNING id, created_at, user_id",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(reservation)
    }

    async fn insert_ticket(
        &mut self,
        reservation_id: i64,
        seat: SeatKey,
    ) -> Result<Ticket, StoreError> {
        sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (show_session_id, row, seat, reservation_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, show_session_id, row, seat, reservation_id
            "#,
        )
        .bind(seat.session_id)
        .bind(seat.row)
        .bind(seat.seat)
        .bind(reservation_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| StoreError::from_sqlx(e, Some(seat)))
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| StoreError::from_sqlx(e, None))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
