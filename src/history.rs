use chrono::{DateTime, Local};
use directories::ProjectDirs;
use log::debug;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use crate::session::ComparisonReport;
use crate::Result;

/// One scored attempt against a named reference
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub reference: String,
    pub accuracy: i32,
    pub mean_deviation: Option<f64>,
    pub dtw_cost: Option<f64>,
    pub timestamp: DateTime<Local>,
}

impl AttemptRecord {
    pub fn from_report(reference: impl Into<String>, report: &ComparisonReport) -> Self {
        Self {
            reference: reference.into(),
            accuracy: report.accuracy,
            mean_deviation: report.deviation.map(|d| d.mean),
            dtw_cost: report.dtw_cost,
            timestamp: Local::now(),
        }
    }
}

/// Attempt history backed by SQLite
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Opens the database at [`HistoryDb::default_path`]
    pub fn new() -> Result<Self> {
        Self::open(Self::default_path())
    }

    /// `$HOME/.local/state/quill/history.db`, else the platform data dir, else
    /// the working directory
    pub fn default_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".local/state/quill/history.db"),
            None => ProjectDirs::from("", "", "quill")
                .map(|dirs| dirs.data_local_dir().join("history.db"))
                .unwrap_or_else(|| PathBuf::from("quill_history.db")),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!("opening attempt history at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reference TEXT NOT NULL,
                accuracy INTEGER NOT NULL,
                mean_deviation REAL,
                dtw_cost REAL,
                timestamp TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attempts_reference ON attempts(reference)",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn record_attempt(&self, record: &AttemptRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO attempts (reference, accuracy, mean_deviation, dtw_cost, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.reference,
                record.accuracy,
                record.mean_deviation,
                record.dtw_cost,
                record.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Newest first; all references when `reference` is `None`
    pub fn recent_attempts(&self, reference: Option<&str>, limit: usize) -> Result<Vec<AttemptRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT reference, accuracy, mean_deviation, dtw_cost, timestamp
            FROM attempts
            WHERE ?1 IS NULL OR reference = ?1
            ORDER BY timestamp DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![reference, limit as i64], |row| {
            let timestamp_str: String = row.get(4)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(4, "timestamp".to_string(), rusqlite::types::Type::Text)
                })?
                .with_timezone(&Local);

            Ok(AttemptRecord {
                reference: row.get(0)?,
                accuracy: row.get(1)?,
                mean_deviation: row.get(2)?,
                dtw_cost: row.get(3)?,
                timestamp,
            })
        })?;

        let mut attempts = Vec::new();
        for attempt in rows {
            attempts.push(attempt?);
        }
        Ok(attempts)
    }

    pub fn best_accuracy(&self, reference: &str) -> Result<Option<i32>> {
        let best = self.conn.query_row(
            "SELECT MAX(accuracy) FROM attempts WHERE reference = ?1",
            [reference],
            |row| row.get(0),
        )?;
        Ok(best)
    }

    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM attempts", [])?;
        Ok(())
    }
}
