//! SQLite-backed reward ledger

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::ledger::RewardLedger;
use crate::error::{Error, Result};
use crate::types::{FeedbackEvent, FeedbackLabel};

/// SQLite feedback ledger
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::ledger(format!("Failed to open database: {}", e)))?;

        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        ledger.migrate()?;
        Ok(ledger)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::ledger(format!("Failed to open in-memory database: {}", e)))?;

        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        ledger.migrate()?;
        Ok(ledger)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        // WAL is a no-op for in-memory databases
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        "#,
        )
        .map_err(|e| Error::ledger(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                feedback_id TEXT NOT NULL UNIQUE,
                query TEXT NOT NULL,
                answer TEXT NOT NULL,
                sources TEXT NOT NULL,
                feedback TEXT NOT NULL CHECK (feedback IN ('positive', 'negative')),
                created_at TEXT NOT NULL
            );
        "#,
        )
        .map_err(|e| Error::ledger(format!("Failed to run migrations: {}", e)))?;

        tracing::debug!("Ledger migrations complete");
        Ok(())
    }

    /// Number of stored events
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM feedback", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn append_blocking(conn: &Mutex<Connection>, event: &FeedbackEvent) -> Result<Uuid> {
        let sources = serde_json::to_string(&event.sources)?;
        let conn = conn.lock();

        conn.execute(
            r#"
            INSERT INTO feedback (feedback_id, query, answer, sources, feedback, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                event.feedback_id.to_string(),
                event.query,
                event.answer,
                sources,
                event.label.as_str(),
                event.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::ledger(format!("Failed to append feedback: {}", e)))?;

        Ok(event.feedback_id)
    }

    fn read_page_blocking(
        conn: &Mutex<Connection>,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<FeedbackEvent>> {
        let conn = conn.lock();

        let mut stmt = conn
            .prepare(
                "SELECT feedback_id, query, answer, sources, feedback, created_at
                 FROM feedback ORDER BY id LIMIT ?1 OFFSET ?2",
            )
            .map_err(|e| Error::ledger(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![page_size as i64, offset as i64], |row| {
                Ok(RawFeedbackRow {
                    feedback_id: row.get(0)?,
                    query: row.get(1)?,
                    answer: row.get(2)?,
                    sources: row.get(3)?,
                    feedback: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map_err(|e| Error::ledger(format!("Failed to read feedback: {}", e)))?;

        let mut events = Vec::with_capacity(page_size.min(1024));
        for row in rows {
            let row = row.map_err(|e| Error::ledger(format!("Failed to read row: {}", e)))?;
            events.push(row.into_event()?);
        }
        Ok(events)
    }
}

/// Columns as stored, before decoding
struct RawFeedbackRow {
    feedback_id: String,
    query: String,
    answer: String,
    sources: String,
    feedback: String,
    created_at: String,
}

impl RawFeedbackRow {
    fn into_event(self) -> Result<FeedbackEvent> {
        let feedback_id = Uuid::parse_str(&self.feedback_id)
            .map_err(|e| Error::ledger(format!("Bad feedback_id {}: {}", self.feedback_id, e)))?;
        let sources: Vec<String> = serde_json::from_str(&self.sources).map_err(|e| {
            Error::ledger(format!("Bad sources for {}: {}", self.feedback_id, e))
        })?;
        let label: FeedbackLabel = self
            .feedback
            .parse()
            .map_err(|e| Error::ledger(format!("Bad label for {}: {}", self.feedback_id, e)))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| Error::ledger(format!("Bad timestamp for {}: {}", self.feedback_id, e)))?;

        Ok(FeedbackEvent {
            feedback_id,
            query: self.query,
            answer: self.answer,
            sources,
            label,
            created_at,
        })
    }
}

#[async_trait]
impl RewardLedger for SqliteLedger {
    async fn append_feedback(&self, event: &FeedbackEvent) -> Result<Uuid> {
        let conn = Arc::clone(&self.conn);
        let event = event.clone();
        tokio::task::spawn_blocking(move || Self::append_blocking(&conn, &event))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }

    async fn read_feedback_page(
        &self,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<FeedbackEvent>> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || Self::read_page_blocking(&conn, offset, page_size))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }

    async fn health_check(&self) -> Result<bool> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            conn.lock()
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok()
        })
        .await
        .map_err(|e| Error::internal(format!("Task join error: {}", e)))
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
