//! PostgreSQL integration tests.
//!
//! These need a scratch database and are ignored by default. They wipe the
//! planetarium tables, so never point them at real data:
//!
//! ```bash
//! export DATABASE_URL=postgres://localhost/planetarium_test
//! cargo test --test postgres_reservations -- --ignored --test-threads=1
//! ```

use chrono::{TimeZone, Utc};
use planetarium_booking::booking::{ReservationError, ReservationManager, SeatConflict};
use planetarium_booking::catalog::{
    CatalogError, CatalogQuery, CatalogRepository, SessionFilter, ShowFilter,
};
use planetarium_booking::config::DatabaseConfig;
use planetarium_booking::database::Database;
use planetarium_booking::models::dome::DomePayload;
use planetarium_booking::models::session::SessionPayload;
use planetarium_booking::models::TicketRequest;
use planetarium_booking::store::PgReservationStore;

struct Seeded {
    db: Database,
    user: i64,
    show: i64,
    dome: i64,
    session: i64,
}

impl Seeded {
    fn manager(&self) -> ReservationManager<PgReservationStore> {
        ReservationManager::new(PgReservationStore::new(self.db.pool.clone()))
    }

    fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.db.pool.clone())
    }
}

async fn seeded() -> Seeded {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::new(&DatabaseConfig {
        url,
        pool_size: 20,
        acquire_timeout_seconds: 5,
    })
    .await
    .expect("connect");
    db.run_migrations().await.expect("migrate");

    sqlx::query(
        "TRUNCATE tickets, reservations, show_sessions, astronomy_show_themes,
                  astronomy_shows, show_themes, planetarium_domes, users RESTART IDENTITY CASCADE",
    )
    .execute(&db.pool)
    .await
    .expect("truncate");

    let user: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash) VALUES ('user@example.com', 'x') RETURNING id",
    )
    .fetch_one(&db.pool)
    .await
    .expect("user");
    let show: i64 = sqlx::query_scalar(
        "INSERT INTO astronomy_shows (title, description)
         VALUES ('Stars', 'A show about stars') RETURNING id",
    )
    .fetch_one(&db.pool)
    .await
    .expect("show");
    for theme in ["Cosmos", "Cosmic rays"] {
        let theme_id: i64 =
            sqlx::query_scalar("INSERT INTO show_themes (name) VALUES ($1) RETURNING id")
                .bind(theme)
                .fetch_one(&db.pool)
                .await
                .expect("theme");
        sqlx::query("INSERT INTO astronomy_show_themes (show_id, theme_id) VALUES ($1, $2)")
            .bind(show)
            .bind(theme_id)
            .execute(&db.pool)
            .await
            .expect("link");
    }
    let dome: i64 = sqlx::query_scalar(
        "INSERT INTO planetarium_domes (name, rows, seats_in_row)
         VALUES ('Main Dome', 10, 10) RETURNING id",
    )
    .fetch_one(&db.pool)
    .await
    .expect("dome");
    let session: i64 = sqlx::query_scalar(
        "INSERT INTO show_sessions (show_time, astronomy_show_id, planetarium_dome_id)
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(Utc.with_ymd_and_hms(2025, 5, 18, 15, 0, 0).unwrap())
    .bind(show)
    .bind(dome)
    .fetch_one(&db.pool)
    .await
    .expect("session");

    Seeded {
        db,
        user,
        show,
        dome,
        session,
    }
}

async fn ticket_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
        .fetch_one(&db.pool)
        .await
        .expect("count")
}

async fn reservation_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reservations")
        .fetch_one(&db.pool)
        .await
        .expect("count")
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn out_of_bounds_row_persists_nothing() {
    let s = seeded().await;
    let manager = s.manager();

    let err = manager
        .create_reservation(s.user, &[TicketRequest::new(s.session, 11, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::Validation(_)));
    assert_eq!(ticket_count(&s.db).await, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_same_seat_has_one_winner() {
    let s = seeded().await;
    let manager = s.manager();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let manager = manager.clone();
            let (user, session) = (s.user, s.session);
            tokio::spawn(async move {
                manager
                    .create_reservation(user, &[TicketRequest::new(session, 3, 3)])
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for joined in futures::future::join_all(handles).await {
        match joined.expect("task") {
            Ok(_) => winners += 1,
            Err(ReservationError::Conflict(SeatConflict::Taken { index: 0, .. })) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(ticket_count(&s.db).await, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn theme_filter_does_not_duplicate() {
    let s = seeded().await;
    let catalog = s.catalog();

    let query = CatalogQuery {
        title: Some("COSM".to_string()),
        show_time: Some("2025-05-18".to_string()),
    };
    let shows = catalog.list_shows(&ShowFilter::from_query(&query)).await.unwrap();
    assert_eq!(shows.len(), 1);
    assert_eq!(shows[0].show_theme.len(), 2);
    assert_eq!(shows[0].show_sessions, vec![s.session]);

    let sessions = catalog
        .list_sessions(&SessionFilter::from_query(&query).unwrap())
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);

    let other_day = CatalogQuery {
        title: None,
        show_time: Some("2025-05-19".to_string()),
    };
    let none = catalog
        .list_sessions(&SessionFilter::from_query(&other_day).unwrap())
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn conflict_mid_batch_persists_nothing() {
    let s = seeded().await;
    let manager = s.manager();
    manager
        .create_reservation(s.user, &[TicketRequest::new(s.session, 5, 5)])
        .await
        .unwrap();

    let requests = [
        TicketRequest::new(s.session, 5, 4),
        TicketRequest::new(s.session, 5, 6),
        TicketRequest::new(s.session, 5, 5),
    ];
    let err = manager.create_reservation(s.user, &requests).await.unwrap_err();
    assert!(matches!(
        err,
        ReservationError::Conflict(SeatConflict::Taken { index: 2, .. })
    ));
    assert_eq!(ticket_count(&s.db).await, 1);
    assert_eq!(reservation_count(&s.db).await, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn opposite_order_batches_conflict_without_deadlock() {
    let s = seeded().await;
    let manager = s.manager();

    for row in 1..=10 {
        let ascending: Vec<TicketRequest> =
            (1..=10).map(|seat| TicketRequest::new(s.session, row, seat)).collect();
        let descending: Vec<TicketRequest> = ascending.iter().rev().copied().collect();

        let handles: Vec<_> = [ascending, descending]
            .into_iter()
            .map(|requests| {
                let manager = manager.clone();
                let user = s.user;
                tokio::spawn(async move { manager.create_reservation(user, &requests).await })
            })
            .collect();

        let mut winners = 0;
        for joined in futures::future::join_all(handles).await {
            match joined.expect("task") {
                Ok(reservation) => {
                    winners += 1;
                    assert_eq!(reservation.tickets.len(), 10);
                }
                Err(ReservationError::Conflict(_)) => {}
                Err(other) => panic!("row {row}: unexpected error {other:?}"),
            }
        }
        assert_eq!(winners, 1, "row {row}");
    }
    assert_eq!(ticket_count(&s.db).await, 100);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn dome_geometry_is_frozen_once_scheduled() {
    let s = seeded().await;
    let catalog = s.catalog();

    let resize = DomePayload {
        name: "Main Dome".to_string(),
        rows: 4,
        seats_in_row: 4,
    };
    let err = catalog.update_dome(s.dome, &resize).await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let rename = DomePayload {
        name: "Great Dome".to_string(),
        rows: 10,
        seats_in_row: 10,
    };
    let dome = catalog.update_dome(s.dome, &rename).await.unwrap();
    assert_eq!(dome.name, "Great Dome");
    assert_eq!((dome.rows, dome.seats_in_row), (10, 10));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn referenced_rows_cannot_be_deleted() {
    let s = seeded().await;
    let catalog = s.catalog();
    s.manager()
        .create_reservation(s.user, &[TicketRequest::new(s.session, 1, 1)])
        .await
        .unwrap();

    assert!(matches!(
        catalog.delete_dome(s.dome).await.unwrap_err(),
        CatalogError::Conflict(_)
    ));
    assert!(matches!(
        catalog.delete_session(s.session).await.unwrap_err(),
        CatalogError::Conflict(_)
    ));
    assert!(matches!(
        catalog.delete_dome(9_999).await.unwrap_err(),
        CatalogError::NotFound(_)
    ));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn missing_reference_is_a_field_error() {
    let s = seeded().await;
    let catalog = s.catalog();
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap();

    let no_dome = SessionPayload {
        show_time: at,
        astronomy_show: s.show,
        planetarium_dome: 9_999,
    };
    match catalog.create_session(&no_dome).await.unwrap_err() {
        CatalogError::Invalid { field, .. } => assert_eq!(field, "planetarium_dome"),
        other => panic!("expected field error, got {other:?}"),
    }

    let no_show = SessionPayload {
        show_time: at,
        astronomy_show: 9_999,
        planetarium_dome: s.dome,
    };
    match catalog.create_session(&no_show).await.unwrap_err() {
        CatalogError::Invalid { field, .. } => assert_eq!(field, "astronomy_show"),
        other => panic!("expected field error, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn session_with_tickets_stays_in_its_dome() {
    let s = seeded().await;
    let catalog = s.catalog();
    s.manager()
        .create_reservation(s.user, &[TicketRequest::new(s.session, 10, 10)])
        .await
        .unwrap();

    let small = catalog
        .create_dome(&DomePayload {
            name: "Small Dome".to_string(),
            rows: 2,
            seats_in_row: 2,
        })
        .await
        .unwrap();
    let at = Utc.with_ymd_and_hms(2025, 5, 18, 15, 0, 0).unwrap();

    let err = catalog
        .update_session(
            s.session,
            &SessionPayload {
                show_time: at,
                astronomy_show: s.show,
                planetarium_dome: small.id,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let outside: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tickets t
         JOIN show_sessions s ON s.id = t.show_session_id
         JOIN planetarium_domes d ON d.id = s.planetarium_dome_id
         WHERE t.row > d.rows OR t.seat > d.seats_in_row",
    )
    .fetch_one(&s.db.pool)
    .await
    .expect("count");
    assert_eq!(outside, 0);

    // Rescheduling within the same dome is still allowed.
    let later = Utc.with_ymd_and_hms(2025, 5, 18, 18, 0, 0).unwrap();
    let moved = catalog
        .update_session(
            s.session,
            &SessionPayload {
                show_time: later,
                astronomy_show: s.show,
                planetarium_dome: s.dome,
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.show_time, later);

    // A session without tickets may change dome.
    let empty = catalog
        .create_session(&SessionPayload {
            show_time: at,
            astronomy_show: s.show,
            planetarium_dome: s.dome,
        })
        .await
        .unwrap();
    let rehoused = catalog
        .update_session(
            empty.id,
            &SessionPayload {
                show_time: at,
                astronomy_show: s.show,
                planetarium_dome: small.id,
            },
        )
        .await
        .unwrap();
    assert_eq!(rehoused.planetarium_dome, small.id);
}
