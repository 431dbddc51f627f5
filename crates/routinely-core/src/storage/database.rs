//! SQLite-backed persistence.
//!
//! Provides persistent storage for:
//! - Routine templates
//! - Conditional habit answers
//! - Finished session summaries
//! - Key-value store for application state
//!
//! Rows are stored as JSON documents. A row that no longer decodes is
//! skipped and handed to the [`ErrorReporter`] instead of failing the read.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::data_dir;
use super::kv::KeyValueStore;
use super::migrations;
use crate::error::{CoreError, DatabaseError, ValidationError};
use crate::habit::ConditionalResponse;
use crate::reporting::{ErrorReporter, TracingReporter};
use crate::session::SessionSummary;
use crate::template::RoutineTemplate;

/// How often one option of a conditional habit was picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCount {
    pub option_id: String,
    pub option_text: String,
    pub count: u64,
}

/// SQLite database for templates and history.
pub struct Database {
    conn: Connection,
    reporter: Arc<dyn ErrorReporter>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/routinely/routinely.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        Self::open_at(data_dir()?.join("routinely.db"))
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, CoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CoreError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn,
            reporter: Arc::new(TracingReporter),
        })
    }

    /// Route corrupted-row reports somewhere other than the log.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    // ── Templates ────────────────────────────────────────────────────

    /// Insert or replace a template. Listing order is first-insert order.
    ///
    /// # Errors
    /// Returns a validation error for an invalid template, or a database
    /// error if the write fails.
    pub fn save_template(&self, template: &RoutineTemplate) -> Result<(), CoreError> {
        template.validate()?;
        let data = encode(&template.id, template)?;
        self.conn.execute(
            "INSERT INTO templates (id, name, is_default, last_used_at, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                is_default = excluded.is_default,
                last_used_at = excluded.last_used_at,
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![
                template.id,
                template.name,
                template.is_default,
                template.last_used_at.map(|t| t.to_rfc3339()),
                data,
                Utc::now().to_rfc3339(),
            ],
        )?;
        tracing::debug!(template = %template.id, name = %template.name, "template saved");
        Ok(())
    }

    pub fn get_template(&self, id: &str) -> Result<Option<RoutineTemplate>, CoreError> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM templates WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(data.and_then(|d| self.decode_or_report(id, &d)))
    }

    /// All templates that still decode, in first-insert order.
    pub fn list_templates(&self) -> Result<Vec<RoutineTemplate>, CoreError> {
        self.decode_rows("SELECT id, data FROM templates ORDER BY rowid", [])
    }

    /// Returns whether a template was deleted.
    pub fn delete_template(&self, id: &str) -> Result<bool, CoreError> {
        let n = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// Stamp `last_used_at`. Returns `false` if the template is unknown.
    pub fn mark_template_used(&self, id: &str, at: DateTime<Utc>) -> Result<bool, CoreError> {
        let Some(mut template) = self.get_template(id)? else {
            return Ok(false);
        };
        template.mark_used(at);
        self.save_template(&template)?;
        Ok(true)
    }

    /// Make `id` the only default template.
    ///
    /// # Errors
    /// Returns [`ValidationError::UnknownId`] if no such template exists.
    pub fn set_default_template(&self, id: &str) -> Result<(), CoreError> {
        let templates = self.list_templates()?;
        if !templates.iter().any(|t| t.id == id) {
            return Err(ValidationError::UnknownId {
                kind: "template".into(),
                id: id.into(),
            }
            .into());
        }
        let tx = self.conn.unchecked_transaction()?;
        for mut template in templates {
            let is_default = template.id == id;
            if template.is_default != is_default {
                template.is_default = is_default;
                tx.execute(
                    "UPDATE templates SET is_default = ?2, data = ?3 WHERE id = ?1",
                    params![template.id, is_default, encode(&template.id, &template)?],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Conditional responses ────────────────────────────────────────

    pub fn record_response(&self, response: &ConditionalResponse) -> Result<(), CoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO conditional_responses (id, habit_id, option_id, answered_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                response.id,
                response.habit_id,
                response.option_id,
                response.answered_at.to_rfc3339(),
                encode(&response.id, response)?,
            ],
        )?;
        Ok(())
    }

    /// Answers in the order they were given, optionally for one habit.
    pub fn list_responses(
        &self,
        habit_id: Option<&str>,
    ) -> Result<Vec<ConditionalResponse>, CoreError> {
        match habit_id {
            Some(habit_id) => self.decode_rows(
                "SELECT id, data FROM conditional_responses WHERE habit_id = ?1
                 ORDER BY answered_at, rowid",
                params![habit_id],
            ),
            None => self.decode_rows(
                "SELECT id, data FROM conditional_responses ORDER BY answered_at, rowid",
                [],
            ),
        }
    }

    /// Per-option answer counts for a habit, most picked first.
    pub fn response_counts(&self, habit_id: &str) -> Result<Vec<ResponseCount>, CoreError> {
        let mut counts: Vec<ResponseCount> = Vec::new();
        for response in self.list_responses(Some(habit_id))? {
            match counts.iter_mut().find(|c| c.option_id == response.option_id) {
                Some(count) => {
                    count.count += 1;
                    count.option_text = response.option_text;
                }
                None => counts.push(ResponseCount {
                    option_id: response.option_id,
                    option_text: response.option_text,
                    count: 1,
                }),
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(counts)
    }

    // ── Session history ──────────────────────────────────────────────

    pub fn record_session(&self, summary: &SessionSummary) -> Result<(), CoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session_history (session_id, routine_id, started_at, completed_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                summary.session_id,
                summary.routine_id,
                summary.started_at.to_rfc3339(),
                summary.completed_at.map(|t| t.to_rfc3339()),
                encode(&summary.session_id, summary)?,
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, CoreError> {
        self.decode_rows(
            "SELECT session_id, data FROM session_history ORDER BY started_at DESC LIMIT ?1",
            params![limit as i64],
        )
    }

    // ── Row decoding ─────────────────────────────────────────────────

    fn decode_rows<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<T>, CoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (key, data) = row?;
            if let Some(value) = self.decode_or_report(&key, &data) {
                out.push(value);
            }
        }
        Ok(out)
    }

    fn decode_or_report<T: DeserializeOwned>(&self, key: &str, data: &str) -> Option<T> {
        match serde_json::from_str(data) {
            Ok(value) => Some(value),
            Err(e) => {
                let err = CoreError::Database(DatabaseError::CorruptedRecord {
                    key: key.to_string(),
                    message: e.to_string(),
                });
                self.reporter.report("load record", &err);
                None
            }
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::EncodeFailed {
        key: key.to_string(),
        message: e.to_string(),
    })
}

impl KeyValueStore for Database {
    fn get_raw(&self, key: &str) -> Result<Option<String>, CoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, CoreError> {
        let n = self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(n > 0)
    }
}
