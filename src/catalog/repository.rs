use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::info;

use super::filter::{fold_sessions, fold_shows, SessionFilter, SessionRow, ShowFilter, ShowRow};
use super::{CatalogError, SessionListItem, ShowListItem};
use crate::models::dome::DomePayload;
use crate::models::session::SessionPayload;
use crate::models::show::{ShowPayload, ThemePayload};
use crate::models::{Dome, Session, Show, Theme};

/// Theme match used by both list queries. `$1` is the escaped ILIKE pattern or NULL.
const TITLE_MATCH: &str = r#"
    ($1::text IS NULL
     OR s.title ILIKE $1
     OR s.description ILIKE $1
     OR EXISTS (
        SELECT 1
        FROM astronomy_show_themes mst
        JOIN show_themes mt ON mt.id = mst.theme_id
        WHERE mst.show_id = s.id AND mt.name ILIKE $1
     ))
"#;

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /* ---------- THEMES ---------- */

    pub async fn list_themes(&self) -> Result<Vec<Theme>, CatalogError> {
        let themes = sqlx::query_as::<_, Theme>("SELECT id, name FROM show_themes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(themes)
    }

    pub async fn get_theme(&self, id: i64) -> Result<Theme, CatalogError> {
        sqlx::query_as::<_, Theme>("SELECT id, name FROM show_themes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CatalogError::NotFound("show theme"))
    }

    pub async fn create_theme(&self, payload: &ThemePayload) -> Result<Theme, CatalogError> {
        let theme = sqlx::query_as::<_, Theme>(
            "INSERT INTO show_themes (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&payload.name)
        .fetch_one(&self.pool)
        .await
        .map_err(CatalogError::on_write)?;
        info!(theme_id = theme.id, "show theme created");
        Ok(theme)
    }

    pub async fn update_theme(
        &self,
        id: i64,
        payload: &ThemePayload,
    ) -> Result<Theme, CatalogError> {
        sqlx::query_as::<_, Theme>(
            "UPDATE show_themes SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(&payload.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(CatalogError::on_write)?
        .ok_or(CatalogError::NotFound("show theme"))
    }

    pub async fn delete_theme(&self, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM show_themes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::on_delete(e, "show theme"))?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound("show theme"));
        }
        Ok(())
    }

    /* ---------- SHOWS ---------- */

    pub async fn list_shows(&self, filter: &ShowFilter) -> Result<Vec<ShowListItem>, CatalogError> {
        self.query_shows(filter.title.as_deref(), None).await
    }

    pub async fn get_show(&self, id: i64) -> Result<ShowListItem, CatalogError> {
        self.query_shows(None, Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound("astronomy show"))
    }

    async fn query_shows(
        &self,
        title: Option<&str>,
        id: Option<i64>,
    ) -> Result<Vec<ShowListItem>, CatalogError> {
        let sql = format!(
            r#"
            SELECT s.id, s.title, s.description, t.name AS theme
            FROM astronomy_shows s
            LEFT JOIN astronomy_show_themes st ON st.show_id = s.id
            LEFT JOIN show_themes t ON t.id = st.theme_id
            WHERE {TITLE_MATCH}
              AND ($2::bigint IS NULL OR s.id = $2)
            ORDER BY s.id, t.name
            "#,
        );
        let rows = sqlx::query_as::<_, ShowRow>(&sql)
            .bind(title)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        let mut shows = fold_shows(rows);
        if shows.is_empty() {
            return Ok(shows);
        }

        let ids: Vec<i64> = shows.iter().map(|s| s.id).collect();
        let sessions = sqlx::query_as::<_, (i64, i64)>(
            "SELECT astronomy_show_id, id FROM show_sessions
             WHERE astronomy_show_id = ANY($1)
             ORDER BY id",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;
        for (show_id, session_id) in sessions {
            if let Some(show) = shows.iter_mut().find(|s| s.id == show_id) {
                show.show_sessions.push(session_id);
            }
        }
        Ok(shows)
    }

    pub async fn create_show(&self, payload: &ShowPayload) -> Result<Show, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let mut show = sqlx::query_as::<_, Show>(
            "INSERT INTO astronomy_shows (title, description) VALUES ($1, $2)
             RETURNING id, title, description",
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(CatalogError::on_write)?;

        show.show_theme = link_themes(&mut tx, show.id, &payload.show_theme).await?;
        tx.commit().await?;
        info!(show_id = show.id, "astronomy show created");
        Ok(show)
    }

    pub async fn update_show(&self, id: i64, payload: &ShowPayload) -> Result<Show, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let mut show = sqlx::query_as::<_, Show>(
            "UPDATE astronomy_shows SET title = $2, description = $3 WHERE id = $1
             RETURNING id, title, description",
        )
        .bind(id)
        .bind(&payload.title)
        .bind(&payload.description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CatalogError::on_write)?
        .ok_or(CatalogError::NotFound("astronomy show"))?;

        sqlx::query("DELETE FROM astronomy_show_themes WHERE show_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        show.show_theme = link_themes(&mut tx, id, &payload.show_theme).await?;
        tx.commit().await?;
        Ok(show)
    }

    pub async fn delete_show(&self, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM astronomy_shows WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::on_delete(e, "astronomy show"))?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound("astronomy show"));
        }
        Ok(())
    }

    /* ---------- DOMES ---------- */

    pub async fn list_domes(&self) -> Result<Vec<Dome>, CatalogError> {
        let domes = sqlx::query_as::<_, Dome>(
            "SELECT id, name, rows, seats_in_row FROM planetarium_domes ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(domes)
    }

    pub async fn get_dome(&self, id: i64) -> Result<Dome, CatalogError> {
        sqlx::query_as::<_, Dome>(
            "SELECT id, name, rows, seats_in_row FROM planetarium_domes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CatalogError::NotFound("planetarium dome"))
    }

    pub async fn create_dome(&self, payload: &DomePayload) -> Result<Dome, CatalogError> {
        let dome = sqlx::query_as::<_, Dome>(
            "INSERT INTO planetarium_domes (name, rows, seats_in_row) VALUES ($1, $2, $3)
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(&payload.name)
        .bind(payload.rows)
        .bind(payload.seats_in_row)
        .fetch_one(&self.pool)
        .await
        .map_err(CatalogError::on_write)?;
        info!(dome_id = dome.id, capacity = dome.capacity(), "planetarium dome created");
        Ok(dome)
    }

    /// Renames freely; changing the seat grid is refused once a session uses the dome.
    pub async fn update_dome(&self, id: i64, payload: &DomePayload) -> Result<Dome, CatalogError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Dome>(
            "SELECT id, name, rows, seats_in_row FROM planetarium_domes WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CatalogError::NotFound("planetarium dome"))?;

        if !current.same_geometry(payload.rows, payload.seats_in_row) {
            let in_use = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM show_sessions WHERE planetarium_dome_id = $1)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if in_use {
                return Err(CatalogError::Conflict(
                    "dome geometry cannot change while sessions are scheduled in it".to_string(),
                ));
            }
        }

        let dome = sqlx::query_as::<_, Dome>(
            "UPDATE planetarium_domes SET name = $2, rows = $3, seats_in_row = $4 WHERE id = $1
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(id)
        .bind(&payload.name)
        .bind(payload.rows)
        .bind(payload.seats_in_row)
        .fetch_one(&mut *tx)
        .await
        .map_err(CatalogError::on_write)?;
        tx.commit().await?;
        Ok(dome)
    }

    pub async fn delete_dome(&self, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM planetarium_domes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::on_delete(e, "planetarium dome"))?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound("planetarium dome"));
        }
        Ok(())
    }

    /* ---------- SESSIONS ---------- */

    pub async fn list_sessions(
        &self,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionListItem>, CatalogError> {
        self.query_sessions(filter.title.as_deref(), filter.show_date, None).await
    }

    pub async fn get_session(&self, id: i64) -> Result<SessionListItem, CatalogError> {
        self.query_sessions(None, None, Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound("show session"))
    }

    async fn query_sessions(
        &self,
        title: Option<&str>,
        show_date: Option<NaiveDate>,
        id: Option<i64>,
    ) -> Result<Vec<SessionListItem>, CatalogError> {
        let sql = format!(
            r#"
            SELECT ss.id, ss.show_time, s.title AS show_title, d.name AS dome_name, t.name AS theme
            FROM show_sessions ss
            JOIN astronomy_shows s ON s.id = ss.astronomy_show_id
            JOIN planetarium_domes d ON d.id = ss.planetarium_dome_id
            LEFT JOIN astronomy_show_themes st ON st.show_id = s.id
            LEFT JOIN show_themes t ON t.id = st.theme_id
            WHERE {TITLE_MATCH}
              AND ($2::date IS NULL OR (ss.show_time AT TIME ZONE 'UTC')::date = $2)
              AND ($3::bigint IS NULL OR ss.id = $3)
            ORDER BY ss.show_time, ss.id, t.name
            "#,
        );
        let rows = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(title)
            .bind(show_date)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(fold_sessions(rows))
    }

    pub async fn create_session(&self, payload: &SessionPayload) -> Result<Session, CatalogError> {
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO show_sessions (show_time, astronomy_show_id, planetarium_dome_id)
             VALUES ($1, $2, $3)
             RETURNING id, show_time, astronomy_show_id, planetarium_dome_id",
        )
        .bind(payload.show_time)
        .bind(payload.astronomy_show)
        .bind(payload.planetarium_dome)
        .fetch_one(&self.pool)
        .await
        .map_err(CatalogError::on_write)?;
        info!(session_id = session.id, "show session created");
        Ok(session)
    }

    /// A session with sold tickets stays in its dome; other fields may change.
    pub async fn update_session(
        &self,
        id: i64,
        payload: &SessionPayload,
    ) -> Result<Session, CatalogError> {
        let mut tx = self.pool.begin().await?;

        // Conflicts with the share lock a reservation holds on the session row.
        let current_dome = sqlx::query_scalar::<_, i64>(
            "SELECT planetarium_dome_id FROM show_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CatalogError::NotFound("show session"))?;

        if current_dome != payload.planetarium_dome {
            let sold = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM tickets WHERE show_session_id = $1)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if sold {
                return Err(CatalogError::Conflict(
                    "a session with sold tickets cannot move to another dome".to_string(),
                ));
            }
        }

        let session = sqlx::query_as::<_, Session>(
            "UPDATE show_sessions
             SET show_time = $2, astronomy_show_id = $3, planetarium_dome_id = $4
             WHERE id = $1
             RETURNING id, show_time, astronomy_show_id, planetarium_dome_id",
        )
        .bind(id)
        .bind(payload.show_time)
        .bind(payload.astronomy_show)
        .bind(payload.planetarium_dome)
        .fetch_one(&mut *tx)
        .await
        .map_err(CatalogError::on_write)?;
        tx.commit().await?;
        Ok(session)
    }

    pub async fn delete_session(&self, id: i64) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM show_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::on_delete(e, "show session"))?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound("show session"));
        }
        Ok(())
    }
}

async fn link_themes(
    tx: &mut sqlx::Transaction<'static, sqlx::Postgres>,
    show_id: i64,
    theme_ids: &[i64],
) -> Result<Vec<i64>, CatalogError> {
    let mut linked = Vec::with_capacity(theme_ids.len());
    for &theme_id in theme_ids {
        if linked.contains(&theme_id) {
            continue;
        }
        sqlx::query("INSERT INTO astronomy_show_themes (show_id, theme_id) VALUES ($1, $2)")
            .bind(show_id)
            .bind(theme_id)
            .execute(&mut **tx)
            .await
            .map_err(CatalogError::on_write)?;
        linked.push(theme_id);
    }
    Ok(linked)
}
