use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::session::SessionResult;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A finished session as handed back by a store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub id: i64,
    pub result: SessionResult,
}

/// Keyed storage for finished sessions
pub trait ResultStore {
    fn add(&mut self, result: &SessionResult) -> Result<i64, StoreError>;
    fn get_all(&self) -> Result<Vec<StoredSession>, StoreError>;
    /// Most recently completed first
    fn get_recent(&self, limit: usize) -> Result<Vec<StoredSession>, StoreError>;
    fn get_by_id(&self, id: i64) -> Result<Option<StoredSession>, StoreError>;
    fn delete(&mut self, id: i64) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS session_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        completed_at TEXT NOT NULL,
        duration_seconds INTEGER NOT NULL,
        total_problems INTEGER NOT NULL,
        first_try_correct INTEGER NOT NULL,
        accuracy REAL NOT NULL,
        difficulty TEXT,
        payload TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_session_results_completed_at
        ON session_results(completed_at);
"#;

/// SQLite-backed result store
///
/// The summary columns exist for ad-hoc querying; the full result lives in
/// `payload` as JSON and is what gets read back.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open the database at the default location, creating it if needed
    pub fn new() -> Result<Self, StoreError> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("monkeymath.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn collect(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<StoredSession>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, raw_row)?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, payload) = row?;
            sessions.push(decode(id, &payload)?);
        }
        Ok(sessions)
    }
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<(i64, String)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn decode(id: i64, payload: &str) -> Result<StoredSession, StoreError> {
    Ok(StoredSession {
        id,
        result: serde_json::from_str(payload)?,
    })
}

impl ResultStore for SqliteStore {
    fn add(&mut self, result: &SessionResult) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(result)?;
        self.conn.execute(
            r#"
            INSERT INTO session_results
            (completed_at, duration_seconds, total_problems, first_try_correct, accuracy, difficulty, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                result.completed_at.to_rfc3339(),
                result.duration_seconds,
                result.total_problems,
                result.first_try_correct_count,
                result.accuracy_percent,
                result.config_snapshot.difficulty.map(|d| d.to_string()),
                payload,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_all(&self) -> Result<Vec<StoredSession>, StoreError> {
        self.collect("SELECT id, payload FROM session_results ORDER BY id", [])
    }

    fn get_recent(&self, limit: usize) -> Result<Vec<StoredSession>, StoreError> {
        self.collect(
            "SELECT id, payload FROM session_results ORDER BY completed_at DESC, id DESC LIMIT ?1",
            [limit as i64],
        )
    }

    fn get_by_id(&self, id: i64) -> Result<Option<StoredSession>, StoreError> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, payload FROM session_results WHERE id = ?1",
                [id],
                raw_row,
            )
            .optional()?;

        raw.map(|(id, payload)| decode(id, &payload)).transpose()
    }

    fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM session_results WHERE id = ?1", [id])?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM session_results", [])?;
        Ok(())
    }
}

/// Volatile store, mostly for tests and `--no-save` style runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: i64,
    sessions: Vec<StoredSession>,
}

impl ResultStore for MemoryStore {
    fn add(&mut self, result: &SessionResult) -> Result<i64, StoreError> {
        self.next_id += 1;
        self.sessions.push(StoredSession {
            id: self.next_id,
            result: result.clone(),
        });
        Ok(self.next_id)
    }

    fn get_all(&self) -> Result<Vec<StoredSession>, StoreError> {
        Ok(self.sessions.clone())
    }

    fn get_recent(&self, limit: usize) -> Result<Vec<StoredSession>, StoreError> {
        let mut recent = self.sessions.clone();
        recent.sort_by(|a, b| {
            b.result
                .completed_at
                .cmp(&a.result.completed_at)
                .then(b.id.cmp(&a.id))
        });
        recent.truncate(limit);
        Ok(recent)
    }

    fn get_by_id(&self, id: i64) -> Result<Option<StoredSession>, StoreError> {
        Ok(self.sessions.iter().find(|s| s.id == id).cloned())
    }

    fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.sessions.retain(|s| s.id != id);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.sessions.clear();
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    id: i64,
    completed_at: String,
    difficulty: String,
    duration_seconds: u32,
    total_problems: u32,
    first_try_correct: u32,
    eventually_correct: u32,
    accuracy: &'a str,
    problems_per_minute: f64,
    average_time_ms: f64,
}

/// Write one CSV row per session
pub fn export_csv<W: Write>(sessions: &[StoredSession], writer: W) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for s in sessions {
        let accuracy = s.result.accuracy_label();
        wtr.serialize(CsvRow {
            id: s.id,
            completed_at: s.result.completed_at.to_rfc3339(),
            difficulty: s
                .result
                .config_snapshot
                .difficulty
                .map_or_else(|| "custom".to_string(), |d| d.to_string()),
            duration_seconds: s.result.duration_seconds,
            total_problems: s.result.total_problems,
            first_try_correct: s.result.first_try_correct_count,
            eventually_correct: s.result.eventually_correct_count,
            accuracy: &accuracy,
            problems_per_minute: s.result.problems_per_minute(),
            average_time_ms: s.result.average_time_ms().round(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
