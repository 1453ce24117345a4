use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::engine::TrainingResult;
use crate::error::AimResult;
use crate::session::TrainingMode;

/// Most recent runs kept; older ones are dropped on insert.
pub const HISTORY_LIMIT: usize = 100;

/// Where finished runs go. Injected into the host, never reached globally.
pub trait ResultSink {
    fn record(&mut self, result: &TrainingResult) -> AimResult<()>;
}

/// A sink that can also be read back, for the host's results and history screens.
pub trait HistoryStore: ResultSink {
    /// Newest first.
    fn recent(&self, limit: usize) -> AimResult<Vec<TrainingResult>>;
    fn summary_for(&self, mode: TrainingMode) -> AimResult<Option<ModeSummary>>;
    fn overall_summary(&self) -> AimResult<Option<OverallSummary>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeSummary {
    pub mode: TrainingMode,
    pub sessions: u32,
    pub avg_accuracy: f64,
    pub avg_reaction_ms: f64,
    pub best_score: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverallSummary {
    pub sessions: u32,
    pub avg_accuracy: f64,
    pub avg_reaction_ms: f64,
    pub total_score: u64,
}

impl ModeSummary {
    pub fn from_results<'a>(
        mode: TrainingMode,
        results: impl IntoIterator<Item = &'a TrainingResult>,
    ) -> Option<Self> {
        let runs: Vec<_> = results.into_iter().filter(|r| r.mode == mode).collect();
        if runs.is_empty() {
            return None;
        }
        let n = runs.len() as f64;
        Some(Self {
            mode,
            sessions: runs.len() as u32,
            avg_accuracy: runs.iter().map(|r| r.accuracy).sum::<f64>() / n,
            avg_reaction_ms: runs.iter().map(|r| r.avg_reaction_ms).sum::<f64>() / n,
            best_score: runs.iter().map(|r| r.score).max().unwrap_or(0),
        })
    }
}

impl OverallSummary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a TrainingResult>) -> Option<Self> {
        let runs: Vec<_> = results.into_iter().collect();
        if runs.is_empty() {
            return None;
        }
        let n = runs.len() as f64;
        Some(Self {
            sessions: runs.len() as u32,
            avg_accuracy: runs.iter().map(|r| r.accuracy).sum::<f64>() / n,
            avg_reaction_ms: runs.iter().map(|r| r.avg_reaction_ms).sum::<f64>() / n,
            total_score: runs.iter().map(|r| r.score as u64).sum(),
        })
    }
}

/// Flat row written by [`HistoryDb::export_csv`].
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    mode: &'a str,
    score: u32,
    accuracy: f64,
    avg_reaction_ms: f64,
    best_reaction_ms: f64,
    hits: u32,
    misses: u32,
    total_targets: u32,
    duration_secs: f64,
}

/// SQLite-backed run history
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Opens (creating if needed) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> AimResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Opens the per-user database under the state directory.
    pub fn open_default() -> AimResult<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("aimforge_history.db"));
        debug!(path = %path.display(), "opening history");
        Self::open(path)
    }

    pub fn open_in_memory() -> AimResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AimResult<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS training_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode TEXT NOT NULL,
                score INTEGER NOT NULL,
                accuracy REAL NOT NULL,
                avg_reaction_ms REAL NOT NULL,
                timestamp TEXT NOT NULL,
                payload TEXT NOT NULL
            )
            "#,
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_training_results_mode ON training_results(mode)",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Appends a run and trims the table back to [`HISTORY_LIMIT`].
    pub fn insert(&mut self, result: &TrainingResult) -> AimResult<()> {
        let payload = serde_json::to_string(result)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO training_results
            (mode, score, accuracy, avg_reaction_ms, timestamp, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                result.mode.to_string(),
                result.score,
                result.accuracy,
                result.avg_reaction_ms,
                result.timestamp.to_rfc3339(),
                payload,
            ],
        )?;
        tx.execute(
            r#"
            DELETE FROM training_results
            WHERE id NOT IN (
                SELECT id FROM training_results ORDER BY id DESC LIMIT ?1
            )
            "#,
            [HISTORY_LIMIT as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn len(&self) -> AimResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM training_results", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> AimResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> AimResult<Vec<TrainingResult>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload FROM training_results ORDER BY id DESC LIMIT ?1")?;
        let payloads = stmt
            .query_map([limit as i64], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(Into::into))
            .collect()
    }

    pub fn summary_for(&self, mode: TrainingMode) -> AimResult<Option<ModeSummary>> {
        let (sessions, avg_accuracy, avg_reaction_ms, best_score) = self.conn.query_row(
            r#"
            SELECT COUNT(*), AVG(accuracy), AVG(avg_reaction_ms), MAX(score)
            FROM training_results
            WHERE mode = ?1
            "#,
            [mode.to_string()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            },
        )?;
        if sessions == 0 {
            return Ok(None);
        }
        Ok(Some(ModeSummary {
            mode,
            sessions: sessions as u32,
            avg_accuracy: avg_accuracy.unwrap_or(0.0),
            avg_reaction_ms: avg_reaction_ms.unwrap_or(0.0),
            best_score: best_score.unwrap_or(0) as u32,
        }))
    }

    pub fn overall_summary(&self) -> AimResult<Option<OverallSummary>> {
        let (sessions, avg_accuracy, avg_reaction_ms, total_score) = self.conn.query_row(
            r#"
            SELECT COUNT(*), AVG(accuracy), AVG(avg_reaction_ms), SUM(score)
            FROM training_results
            "#,
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            },
        )?;
        if sessions == 0 {
            return Ok(None);
        }
        Ok(Some(OverallSummary {
            sessions: sessions as u32,
            avg_accuracy: avg_accuracy.unwrap_or(0.0),
            avg_reaction_ms: avg_reaction_ms.unwrap_or(0.0),
            total_score: total_score.unwrap_or(0) as u64,
        }))
    }

    pub fn clear(&self) -> AimResult<()> {
        self.conn.execute("DELETE FROM training_results", [])?;
        Ok(())
    }

    /// Writes every stored run, newest first, as CSV. Returns the row count.
    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> AimResult<usize> {
        let results = self.recent(HISTORY_LIMIT)?;
        let mut writer = csv::Writer::from_path(path)?;
        for r in &results {
            let mode = r.mode.to_string();
            writer.serialize(CsvRow {
                timestamp: r.timestamp.to_rfc3339(),
                mode: &mode,
                score: r.score,
                accuracy: r.accuracy,
                avg_reaction_ms: r.avg_reaction_ms,
                best_reaction_ms: r.best_reaction_ms,
                hits: r.hits,
                misses: r.misses,
                total_targets: r.total_targets,
                duration_secs: r.duration_secs,
            })?;
        }
        writer.flush()?;
        Ok(results.len())
    }
}

impl ResultSink for HistoryDb {
    fn record(&mut self, result: &TrainingResult) -> AimResult<()> {
        self.insert(result)
    }
}

impl HistoryStore for HistoryDb {
    fn recent(&self, limit: usize) -> AimResult<Vec<TrainingResult>> {
        HistoryDb::recent(self, limit)
    }

    fn summary_for(&self, mode: TrainingMode) -> AimResult<Option<ModeSummary>> {
        HistoryDb::summary_for(self, mode)
    }

    fn overall_summary(&self) -> AimResult<Option<OverallSummary>> {
        HistoryDb::overall_summary(self)
    }
}

/// In-process history with the same cap, for hosts without a disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryHistory {
    results: VecDeque<TrainingResult>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first.
    pub fn results(&self) -> impl Iterator<Item = &TrainingResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn latest(&self) -> Option<&TrainingResult> {
        self.results.front()
    }

    pub fn summary_for(&self, mode: TrainingMode) -> Option<ModeSummary> {
        ModeSummary::from_results(mode, &self.results)
    }

    pub fn overall_summary(&self) -> Option<OverallSummary> {
        OverallSummary::from_results(&self.results)
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}

impl ResultSink for MemoryHistory {
    fn record(&mut self, result: &TrainingResult) -> AimResult<()> {
        self.results.push_front(result.clone());
        self.results.truncate(HISTORY_LIMIT);
        Ok(())
    }
}

impl HistoryStore for MemoryHistory {
    fn recent(&self, limit: usize) -> AimResult<Vec<TrainingResult>> {
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    fn summary_for(&self, mode: TrainingMode) -> AimResult<Option<ModeSummary>> {
        Ok(MemoryHistory::summary_for(self, mode))
    }

    fn overall_summary(&self) -> AimResult<Option<OverallSummary>> {
        Ok(MemoryHistory::overall_summary(self))
    }
}
