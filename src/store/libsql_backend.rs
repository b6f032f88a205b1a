//! libSQL backend for onboarding step drafts.
//!
//! Supports local file and in-memory databases. Each saved step is one row
//! keyed by `(user_id, step)`, holding the form as it was when that step
//! was saved.

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::onboarding::model::{FormData, OnboardingStep};
use crate::store::migrations;

/// A step save as recorded in the draft store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedStep {
    pub step: OnboardingStep,
    pub payload: FormData,
    pub saved_at: DateTime<Utc>,
}

/// libSQL draft store.
///
/// Holds a single connection reused for all operations.
pub struct LibSqlStepStore {
    /// Owns the database the connection was opened from; an in-memory
    /// database lives only as long as this handle.
    _db: LibSqlDatabase,
    conn: Connection,
}

impl LibSqlStepStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::connect(db).await?;
        info!(path = %path.display(), "Draft store opened");
        Ok(store)
    }

    /// In-memory database, for tests and throwaway sessions.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::connect(db).await
    }

    async fn connect(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self { _db: db, conn })
    }

    /// Insert or replace the draft for `(user_id, step)`.
    pub async fn save_step(
        &self,
        user_id: &str,
        step: OnboardingStep,
        payload: &FormData,
    ) -> Result<(), DatabaseError> {
        let payload_json =
            serde_json::to_string(payload).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO onboarding_steps (user_id, step, payload, saved_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, step) DO UPDATE SET payload = ?3, saved_at = ?4",
                params![user_id, i64::from(step.index()), payload_json, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_step: {e}")))?;

        debug!(user_id, step = %step, "Step draft saved");
        Ok(())
    }

    /// All drafts for a user, in step order.
    pub async fn load_steps(&self, user_id: &str) -> Result<Vec<SavedStep>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT step, payload, saved_at FROM onboarding_steps
                 WHERE user_id = ?1 ORDER BY step",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_steps: {e}")))?;

        let mut steps = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("load_steps: {e}")))?
        {
            steps.push(row_to_saved_step(&row)?);
        }
        Ok(steps)
    }

    /// The furthest step saved for a user.
    pub async fn latest_step(&self, user_id: &str) -> Result<Option<SavedStep>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT step, payload, saved_at FROM onboarding_steps
                 WHERE user_id = ?1 ORDER BY step DESC LIMIT 1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("latest_step: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_saved_step(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("latest_step: {e}"))),
        }
    }

    /// Delete every draft for a user. Returns the number of rows removed.
    pub async fn clear(&self, user_id: &str) -> Result<u64, DatabaseError> {
        let count = self
            .conn
            .execute(
                "DELETE FROM onboarding_steps WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("clear: {e}")))?;
        debug!(user_id, count, "Step drafts cleared");
        Ok(count)
    }
}

/// Columns: 0:step, 1:payload, 2:saved_at
fn row_to_saved_step(row: &libsql::Row) -> Result<SavedStep, DatabaseError> {
    let step_index: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("read step: {e}")))?;
    let payload_str: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("read payload: {e}")))?;
    let saved_str: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("read saved_at: {e}")))?;

    let step = u8::try_from(step_index)
        .ok()
        .and_then(OnboardingStep::from_index)
        .ok_or_else(|| DatabaseError::Serialization(format!("unknown step index {step_index}")))?;
    let payload: FormData =
        serde_json::from_str(&payload_str).map_err(|e| DatabaseError::Serialization(e.to_string()))?;

    Ok(SavedStep {
        step,
        payload,
        saved_at: parse_datetime(&saved_str),
    })
}

/// Parse an RFC 3339 or SQLite datetime string.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}
