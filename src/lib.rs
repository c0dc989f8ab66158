pub mod config;
pub mod database;
pub mod error;
pub mod pagination;
pub mod models;
pub mod store;
pub mod booking;
pub mod catalog;
pub mod controllers;
pub mod middleware;

use std::sync::Arc;

use booking::ReservationManager;
use catalog::CatalogRepository;
use store::PgReservationStore;

// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub catalog: CatalogRepository,
    pub reservations: ReservationManager<PgReservationStore>,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> Result<Arc<Self>, anyhow::Error> {
        let db = database::Database::new(&config.database).await?;
        db.run_migrations().await?;
        Ok(Arc::new(Self::from_database(db, config)))
    }

    pub fn from_database(db: database::Database, config: config::Config) -> Self {
        Self {
            catalog: CatalogRepository::new(db.pool.clone()),
            reservations: ReservationManager::new(PgReservationStore::new(db.pool.clone())),
            db,
            config,
        }
    }
}
