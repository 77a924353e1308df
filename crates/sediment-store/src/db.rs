//! SQLite-backed state: file scores and the snapshot series.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use sediment_core::{AnalysisResult, DebtSnapshot, FileScore, SedimentError};

/// Database location inside an analyzed workspace.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sediment_store::default_db_path;
///
/// let path = default_db_path(Path::new("/repo"));
/// assert!(path.ends_with(".sediment/state.db"));
/// ```
pub fn default_db_path(workspace: &Path) -> PathBuf {
    workspace.join(".sediment").join("state.db")
}

/// Persistent analysis state for one workspace.
///
/// File scores live in one row per file: plain columns for external
/// querying plus a JSON payload carrying the full component breakdown.
/// Snapshots are append-only; their rowid order is the capture order.
///
/// # Examples
///
/// ```
/// use sediment_store::StateStore;
///
/// let store = StateStore::in_memory().unwrap();
/// assert!(store.load_result(65.0).unwrap().is_none());
/// ```
pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    /// Open or create the state database at the given path.
    ///
    /// Creates parent directories and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Database`] if the database cannot be
    /// opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use sediment_store::StateStore;
    ///
    /// let store = StateStore::open(Path::new(".sediment/state.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, SedimentError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SedimentError::Database(format!("failed to create state directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| SedimentError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, SedimentError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SedimentError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), SedimentError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS file_scores (
                    path TEXT PRIMARY KEY,
                    relative_path TEXT NOT NULL,
                    composite_score REAL NOT NULL,
                    loc INTEGER NOT NULL,
                    language TEXT NOT NULL,
                    last_modified INTEGER NOT NULL,
                    supervision_status TEXT NOT NULL,
                    score_json TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_file_scores_relative
                    ON file_scores(relative_path);

                CREATE TABLE IF NOT EXISTS debt_snapshots (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp INTEGER NOT NULL,
                    composite_score REAL NOT NULL,
                    file_count INTEGER NOT NULL,
                    high_debt_count INTEGER NOT NULL,
                    commit_count_week INTEGER NOT NULL,
                    metadata TEXT
                );
                ",
            )
            .map_err(|e| SedimentError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Replace all stored file scores with the given result.
    ///
    /// Runs in one transaction, so readers never observe a half-written
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Database`] on write failure.
    pub fn save_result(&mut self, result: &AnalysisResult) -> Result<(), SedimentError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| SedimentError::Database(format!("failed to begin transaction: {e}")))?;

        tx.execute("DELETE FROM file_scores", [])
            .map_err(|e| SedimentError::Database(format!("failed to clear scores: {e}")))?;
        for score in &result.files {
            insert_score(&tx, score)?;
        }

        tx.commit()
            .map_err(|e| SedimentError::Database(format!("failed to commit scores: {e}")))?;
        Ok(())
    }

    /// Insert or update the row for a single file.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Database`] on write failure.
    pub fn save_file(&self, score: &FileScore) -> Result<(), SedimentError> {
        insert_score(&self.conn, score)
    }

    /// Load the stored result, recomputing aggregates against the given
    /// warning threshold.
    ///
    /// Returns `None` when no scores have been saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Database`] on query failure and
    /// [`SedimentError::Serialization`] if a stored row no longer
    /// decodes.
    pub fn load_result(&self, warning: f64) -> Result<Option<AnalysisResult>, SedimentError> {
        let mut stmt = self
            .conn
            .prepare("SELECT score_json FROM file_scores ORDER BY relative_path ASC")
            .map_err(|e| SedimentError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| SedimentError::Database(format!("failed to query scores: {e}")))?;

        let mut files = Vec::new();
        for row in rows {
            let json =
                row.map_err(|e| SedimentError::Database(format!("failed to read row: {e}")))?;
            files.push(serde_json::from_str::<FileScore>(&json)?);
        }
        if files.is_empty() {
            return Ok(None);
        }

        let mut result = AnalysisResult::empty();
        result.files = files;
        result.recompute_aggregates(warning);
        Ok(Some(result))
    }

    /// Append a snapshot of the result's aggregates and return it with
    /// its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Database`] on insert failure.
    pub fn take_snapshot(
        &self,
        result: &AnalysisResult,
        commit_count_week: u32,
        metadata: Option<String>,
    ) -> Result<DebtSnapshot, SedimentError> {
        let timestamp = unix_now();
        self.conn
            .execute(
                "INSERT INTO debt_snapshots
                 (timestamp, composite_score, file_count, high_debt_count,
                  commit_count_week, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    timestamp,
                    result.workspace_score,
                    result.file_count as i64,
                    result.high_debt_count as i64,
                    commit_count_week,
                    metadata,
                ],
            )
            .map_err(|e| SedimentError::Database(format!("failed to insert snapshot: {e}")))?;

        Ok(DebtSnapshot {
            id: self.conn.last_insert_rowid(),
            timestamp,
            composite_score: result.workspace_score,
            file_count: result.file_count,
            high_debt_count: result.high_debt_count,
            commit_count_week,
            metadata,
        })
    }

    /// All snapshots in capture order.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Database`] on query failure.
    pub fn snapshots(&self) -> Result<Vec<DebtSnapshot>, SedimentError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, composite_score, file_count, high_debt_count,
                        commit_count_week, metadata
                 FROM debt_snapshots ORDER BY id ASC",
            )
            .map_err(|e| SedimentError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], map_snapshot)
            .map_err(|e| SedimentError::Database(format!("failed to query snapshots: {e}")))?;

        let mut snapshots = Vec::new();
        for row in rows {
            let snapshot =
                row.map_err(|e| SedimentError::Database(format!("failed to read snapshot: {e}")))?;
            snapshots.push(snapshot);
        }
        Ok(snapshots)
    }

    /// The newest `limit` snapshots, oldest first.
    ///
    /// This is the shape trend forecasting consumes.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Database`] on query failure.
    pub fn recent_snapshots(&self, limit: usize) -> Result<Vec<DebtSnapshot>, SedimentError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, composite_score, file_count, high_debt_count,
                        commit_count_week, metadata
                 FROM debt_snapshots ORDER BY id DESC LIMIT ?1",
            )
            .map_err(|e| SedimentError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![limit as i64], map_snapshot)
            .map_err(|e| SedimentError::Database(format!("failed to query snapshots: {e}")))?;

        let mut snapshots = Vec::new();
        for row in rows {
            let snapshot =
                row.map_err(|e| SedimentError::Database(format!("failed to read snapshot: {e}")))?;
            snapshots.push(snapshot);
        }
        snapshots.reverse();
        Ok(snapshots)
    }
}

fn insert_score(conn: &Connection, score: &FileScore) -> Result<(), SedimentError> {
    let json = serde_json::to_string(score)?;
    conn.execute(
        "INSERT OR REPLACE INTO file_scores
         (path, relative_path, composite_score, loc, language, last_modified,
          supervision_status, score_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            score.path.to_string_lossy().to_string(),
            score.relative_path,
            score.composite_score,
            score.loc as i64,
            score.language,
            score.last_modified,
            score.supervision_status.to_string(),
            json,
        ],
    )
    .map_err(|e| SedimentError::Database(format!("failed to insert score: {e}")))?;
    Ok(())
}

fn map_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<DebtSnapshot> {
    Ok(DebtSnapshot {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        composite_score: row.get(2)?,
        file_count: row.get::<_, i64>(3)? as usize,
        high_debt_count: row.get::<_, i64>(4)? as usize,
        commit_count_week: row.get(5)?,
        metadata: row.get(6)?,
    })
}

fn unix_now() -> i64 {
    use std::time::SystemTime;
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use sediment_core::{ComponentScore, ScoreComponents, SupervisionStatus};

    fn make_score(rel: &str, raw: f64) -> FileScore {
        let components = ScoreComponents::uniform(ComponentScore::new(raw, 0.125, vec![]));
        FileScore {
            path: PathBuf::from(format!("/ws/{rel}")),
            relative_path: rel.to_string(),
            composite_score: components.composite(),
            components,
            loc: 42,
            language: "Rust".to_string(),
            last_modified: 1_700_000_000,
            supervision_status: SupervisionStatus::None,
        }
    }

    fn make_result(files: Vec<FileScore>) -> AnalysisResult {
        let mut result = AnalysisResult::empty();
        result.files = files;
        result.recompute_aggregates(65.0);
        result
    }

    #[test]
    fn empty_store_has_no_result_or_snapshots() {
        let store = StateStore::in_memory().unwrap();
        assert!(store.load_result(65.0).unwrap().is_none());
        assert!(store.snapshots().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_round_trips_scores() {
        let mut store = StateStore::in_memory().unwrap();
        let mut acked = make_score("src/b.rs", 70.0);
        acked.supervision_status = SupervisionStatus::Acceptable;
        store.save_result(&make_result(vec![make_score("src/a.rs", 30.0), acked])).unwrap();

        let loaded = store.load_result(65.0).unwrap().expect("saved result");
        assert_eq!(loaded.file_count, 2);
        assert_eq!(loaded.high_debt_count, 1);
        assert_eq!(loaded.files[0].relative_path, "src/a.rs");
        assert!((loaded.files[1].composite_score - 70.0).abs() < 1e-9);
        assert_eq!(loaded.files[1].supervision_status, SupervisionStatus::Acceptable);
        // Component detail survives the JSON column.
        assert!((loaded.files[0].components.churn_rate.raw_score - 30.0).abs() < 1e-9);
    }

    #[test]
    fn save_result_replaces_prior_rows() {
        let mut store = StateStore::in_memory().unwrap();
        store
            .save_result(&make_result(vec![
                make_score("src/a.rs", 30.0),
                make_score("src/b.rs", 40.0),
            ]))
            .unwrap();
        store
            .save_result(&make_result(vec![make_score("src/c.rs", 50.0)]))
            .unwrap();

        let loaded = store.load_result(65.0).unwrap().expect("saved result");
        assert_eq!(loaded.file_count, 1);
        assert_eq!(loaded.files[0].relative_path, "src/c.rs");
    }

    #[test]
    fn save_file_upserts_one_row() {
        let mut store = StateStore::in_memory().unwrap();
        store
            .save_result(&make_result(vec![
                make_score("src/a.rs", 30.0),
                make_score("src/b.rs", 40.0),
            ]))
            .unwrap();

        let mut updated = make_score("src/b.rs", 40.0);
        updated.supervision_status = SupervisionStatus::Acceptable;
        store.save_file(&updated).unwrap();

        let loaded = store.load_result(65.0).unwrap().expect("saved result");
        assert_eq!(loaded.file_count, 2);
        assert_eq!(loaded.files[1].supervision_status, SupervisionStatus::Acceptable);
        assert_eq!(loaded.files[0].supervision_status, SupervisionStatus::None);
    }

    #[test]
    fn snapshots_keep_capture_order() {
        let store = StateStore::in_memory().unwrap();
        for score in [10.0, 20.0, 30.0] {
            store
                .take_snapshot(&make_result(vec![make_score("src/a.rs", score)]), 7, None)
                .unwrap();
        }

        let snapshots = store.snapshots().unwrap();
        assert_eq!(snapshots.len(), 3);
        assert!(snapshots.windows(2).all(|w| w[0].id < w[1].id));
        assert!((snapshots[0].composite_score - 10.0).abs() < 1e-9);
        assert!((snapshots[2].composite_score - 30.0).abs() < 1e-9);
        assert_eq!(snapshots[0].commit_count_week, 7);
    }

    #[test]
    fn recent_snapshots_window_the_newest_ascending() {
        let store = StateStore::in_memory().unwrap();
        for i in 0..10 {
            store
                .take_snapshot(&make_result(vec![make_score("src/a.rs", f64::from(i))]), 0, None)
                .unwrap();
        }

        let recent = store.recent_snapshots(8).unwrap();
        assert_eq!(recent.len(), 8);
        assert!(recent.windows(2).all(|w| w[0].id < w[1].id));
        assert!((recent[0].composite_score - 2.0).abs() < 1e-9);
        assert!((recent[7].composite_score - 9.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_metadata_round_trips() {
        let store = StateStore::in_memory().unwrap();
        let taken = store
            .take_snapshot(&make_result(vec![]), 3, Some("after refactor".to_string()))
            .unwrap();
        assert_eq!(taken.metadata.as_deref(), Some("after refactor"));

        let snapshots = store.snapshots().unwrap();
        assert_eq!(snapshots[0].metadata.as_deref(), Some("after refactor"));
        assert_eq!(snapshots[0].id, taken.id);
    }

    #[test]
    fn open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_db_path(dir.path());

        {
            let mut store = StateStore::open(&path).unwrap();
            store
                .save_result(&make_result(vec![make_score("src/a.rs", 55.0)]))
                .unwrap();
            store
                .take_snapshot(&make_result(vec![make_score("src/a.rs", 55.0)]), 2, None)
                .unwrap();
        }

        let reopened = StateStore::open(&path).unwrap();
        let loaded = reopened.load_result(65.0).unwrap().expect("persisted");
        assert_eq!(loaded.file_count, 1);
        assert_eq!(reopened.snapshots().unwrap().len(), 1);
    }
}
