use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use sediment_core::{
    AnalysisProgress, AnalysisResult, CouplingPair, FileBreakdown, FileScore, SedimentConfig,
    SedimentError, SupervisionStatus,
};
use sediment_history::blame::collect_ownership;
use sediment_history::coupling::detect_change_couplings;
use sediment_history::mining::{mine_history, MiningOptions};
use sediment_history::snapshot::HistorySnapshot;
use sediment_source::imports::ImportGraph;
use sediment_source::walker::{load_source_file, walk_workspace, SourceFile, WalkOptions};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::rescore;
use crate::scorer::ScoringContext;

/// Debt analysis engine for one workspace.
///
/// At most one full run is in flight per engine; rescores and readers go
/// through one state mutex, so the published [`AnalysisResult`] has a
/// single mutation point. [`cancel`](Self::cancel) stops an in-flight
/// run without publishing anything.
pub struct DebtEngine {
    workspace: PathBuf,
    config: SedimentConfig,
    in_flight: AtomicBool,
    cancel: AtomicBool,
    state: tokio::sync::Mutex<EngineState>,
}

#[derive(Default)]
struct EngineState {
    context: Option<Arc<ScoringContext>>,
    result: Option<AnalysisResult>,
}

/// Clears the in-flight flag when a full run leaves scope.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl DebtEngine {
    pub fn new(workspace: PathBuf, config: SedimentConfig) -> Self {
        Self {
            workspace,
            config,
            in_flight: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            state: tokio::sync::Mutex::new(EngineState::default()),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn config(&self) -> &SedimentConfig {
        &self.config
    }

    /// Reject the workspace before any analysis: it must exist, be a
    /// directory, and live inside a git repository.
    ///
    /// # Errors
    ///
    /// Returns [`SedimentError::Workspace`] describing the first failed
    /// check.
    pub fn validate_workspace(&self) -> Result<(), SedimentError> {
        if !self.workspace.exists() {
            return Err(SedimentError::Workspace(format!(
                "path does not exist: {}",
                self.workspace.display()
            )));
        }
        if !self.workspace.is_dir() {
            return Err(SedimentError::Workspace(format!(
                "path is not a directory: {}",
                self.workspace.display()
            )));
        }
        git2::Repository::discover(&self.workspace)
            .map_err(|e| SedimentError::Workspace(format!("not a git repository: {e}")))?;
        Ok(())
    }

    /// Ask an in-flight run to stop. Outstanding worker tasks are
    /// abandoned rather than awaited, and nothing is published.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Seed the engine with a previously persisted result.
    pub async fn restore(&self, result: AnalysisResult) {
        self.state.lock().await.result = Some(result);
    }

    /// The most recently published result, if any.
    pub async fn current(&self) -> Option<AnalysisResult> {
        self.state.lock().await.result.clone()
    }

    /// Run the full pipeline: mine history, walk the workspace, score
    /// every file on a bounded worker pool, publish the result.
    ///
    /// `progress` fires after each file completes; `current` never
    /// decreases and reaches `total` before the method returns.
    ///
    /// # Errors
    ///
    /// [`SedimentError::AnalysisInProgress`] when a run is already
    /// active, [`SedimentError::Cancelled`] when [`cancel`](Self::cancel)
    /// interrupted this run, and the fatal input errors from workspace
    /// validation and history mining.
    pub async fn run_full<F>(&self, progress: F) -> Result<AnalysisResult, SedimentError>
    where
        F: Fn(AnalysisProgress) + Send,
    {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(SedimentError::AnalysisInProgress);
        }
        let _guard = RunGuard(&self.in_flight);
        self.cancel.store(false, Ordering::SeqCst);
        let started = Instant::now();

        self.validate_workspace()?;

        let (context, files) = {
            let workspace = self.workspace.clone();
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || build_inputs(&workspace, &config))
                .await
                .map_err(|e| SedimentError::Task(format!("analysis task failed: {e}")))??
        };
        let context = Arc::new(context);
        let total = files.len();

        let semaphore = Arc::new(Semaphore::new(self.config.analysis.max_workers));
        let mut workers: JoinSet<FileScore> = JoinSet::new();
        for file in files {
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                unreachable!("semaphore closed");
            };
            let context = Arc::clone(&context);
            workers.spawn_blocking(move || {
                let score = context.score_file(&file);
                drop(permit);
                score
            });
        }

        let mut scores = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            if self.cancel.load(Ordering::SeqCst) {
                workers.abort_all();
                return Err(SedimentError::Cancelled);
            }
            let score =
                joined.map_err(|e| SedimentError::Task(format!("scoring worker failed: {e}")))?;
            let current_file = score.relative_path.clone();
            scores.push(score);
            progress(AnalysisProgress {
                current: scores.len(),
                total,
                current_file,
            });
        }
        if self.cancel.load(Ordering::SeqCst) {
            return Err(SedimentError::Cancelled);
        }

        // Workers finish in arbitrary order; restore the walk order.
        scores.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        let mut result = AnalysisResult::empty();
        result.files = scores;
        result.recompute_aggregates(self.config.thresholds.warning);
        result.duration_ms = started.elapsed().as_millis() as u64;

        let mut state = self.state.lock().await;
        state.context = Some(context);
        state.result = Some(result.clone());
        Ok(result)
    }

    /// Rescore one file against the cached history and merge it into the
    /// current result.
    ///
    /// Returns `Ok(None)` when the file is gone, unreadable, or filtered
    /// out; the prior result stands. An unchanged mtime short-circuits
    /// to the existing score without re-analysis.
    ///
    /// # Errors
    ///
    /// Fails only on the fatal input errors of building the scoring
    /// context; per-file problems are the `Ok(None)` case.
    pub async fn rescore_file(
        &self,
        relative_path: &str,
    ) -> Result<Option<FileScore>, SedimentError> {
        let context = self.context().await?;

        let prior = {
            let state = self.state.lock().await;
            state
                .result
                .as_ref()
                .and_then(|r| r.files.iter().find(|f| f.relative_path == relative_path))
                .cloned()
        };

        let options = WalkOptions::from_patterns(&self.config.analysis.exclude);
        let workspace = self.workspace.clone();
        let target = relative_path.to_string();
        let loaded = tokio::task::spawn_blocking(move || {
            load_source_file(&workspace, Path::new(&target), &options)
        })
        .await
        .map_err(|e| SedimentError::Task(format!("rescore task failed: {e}")))?;

        let Some(file) = loaded else {
            return Ok(None);
        };

        if let Some(prior) = &prior {
            if rescore::is_unchanged(prior, file.last_modified) {
                return Ok(Some(prior.clone()));
            }
        }

        let worker_context = Arc::clone(&context);
        let mut score = tokio::task::spawn_blocking(move || worker_context.score_file(&file))
            .await
            .map_err(|e| SedimentError::Task(format!("rescore task failed: {e}")))?;
        if let Some(prior) = &prior {
            rescore::carry_supervision(prior, &mut score);
        }

        let mut state = self.state.lock().await;
        let result = state.result.get_or_insert_with(AnalysisResult::empty);
        result.merge_file(score.clone(), self.config.thresholds.warning);
        Ok(Some(score))
    }

    /// Change-coupled pairs at `threshold`, annotated with import links.
    /// `threshold = 0` returns every detected pair.
    ///
    /// # Errors
    ///
    /// Fails on the fatal input errors of building the scoring context.
    pub async fn change_couplings(
        &self,
        threshold: f64,
    ) -> Result<Vec<CouplingPair>, SedimentError> {
        let context = self.context().await?;
        let imports = Arc::clone(context.imports());
        Ok(detect_change_couplings(context.history(), threshold, |a, b| {
            imports.linked(a, b)
        }))
    }

    /// Detail projection of an already-computed score, components ordered
    /// by contribution.
    pub async fn file_breakdown(&self, relative_path: &str) -> Option<FileBreakdown> {
        let state = self.state.lock().await;
        state
            .result
            .as_ref()?
            .files
            .iter()
            .find(|f| f.relative_path == relative_path)
            .map(FileScore::breakdown)
    }

    /// Update the acknowledgement state of a scored file, returning the
    /// updated score, or `None` when the file is not in the current
    /// result.
    pub async fn set_supervision(
        &self,
        relative_path: &str,
        status: SupervisionStatus,
    ) -> Option<FileScore> {
        let mut state = self.state.lock().await;
        let result = state.result.as_mut()?;
        let file = result
            .files
            .iter_mut()
            .find(|f| f.relative_path == relative_path)?;
        file.supervision_status = status;
        Some(file.clone())
    }

    /// Shared scoring inputs, built on first use and replaced by every
    /// full run.
    ///
    /// # Errors
    ///
    /// Propagates workspace validation and history mining failures.
    pub async fn context(&self) -> Result<Arc<ScoringContext>, SedimentError> {
        let mut state = self.state.lock().await;
        if let Some(context) = &state.context {
            return Ok(Arc::clone(context));
        }
        self.validate_workspace()?;
        let workspace = self.workspace.clone();
        let config = self.config.clone();
        let (context, _) = tokio::task::spawn_blocking(move || build_inputs(&workspace, &config))
            .await
            .map_err(|e| SedimentError::Task(format!("analysis task failed: {e}")))??;
        let context = Arc::new(context);
        state.context = Some(Arc::clone(&context));
        Ok(context)
    }
}

/// Mine history, walk the workspace, and blame every file, producing the
/// shared inputs one run's workers score against.
fn build_inputs(
    workspace: &Path,
    config: &SedimentConfig,
) -> Result<(ScoringContext, Vec<SourceFile>), SedimentError> {
    let mining = MiningOptions {
        since_days: config.analysis.history_days,
        max_files_per_commit: config.analysis.max_files_per_commit,
        branch: None,
    };
    let commits = mine_history(workspace, &mining)?;
    if commits.is_empty() {
        return Err(SedimentError::Git(format!(
            "no commits in the last {} days",
            config.analysis.history_days
        )));
    }
    let history = Arc::new(HistorySnapshot::build(&commits));

    let options = WalkOptions::from_patterns(&config.analysis.exclude);
    let files = walk_workspace(workspace, &options)?;

    let relative: Vec<String> = files.iter().map(|f| f.relative_path.clone()).collect();
    let ownership = Arc::new(collect_ownership(workspace, &relative)?);
    let imports = Arc::new(ImportGraph::build(&files));

    let context = ScoringContext::new(
        config.clone(),
        workspace.to_path_buf(),
        history,
        ownership,
        imports,
    );
    Ok((context, files))
}
