use std::path::PathBuf;
use std::sync::Arc;

use sediment_core::{ComponentScore, FileScore, ScoreComponents, SedimentConfig, SupervisionStatus};
use sediment_history::blame::OwnershipMap;
use sediment_history::coupling::coupling_ratio;
use sediment_history::snapshot::HistorySnapshot;
use sediment_source::complexity::analyze_complexity;
use sediment_source::coverage::assess_coverage_gap;
use sediment_source::imports::ImportGraph;
use sediment_source::smells::detect_smells;
use sediment_source::staleness::compute_staleness;
use sediment_source::walker::SourceFile;

/// Everything a worker needs to score one file.
///
/// Holds the immutable history, ownership, and import snapshots behind
/// `Arc`s so the same context is shared across the worker pool and
/// reused by incremental rescores until the next full run.
pub struct ScoringContext {
    config: SedimentConfig,
    workspace: PathBuf,
    history: Arc<HistorySnapshot>,
    ownership: Arc<OwnershipMap>,
    imports: Arc<ImportGraph>,
    churn_baseline: f64,
}

impl ScoringContext {
    pub fn new(
        config: SedimentConfig,
        workspace: PathBuf,
        history: Arc<HistorySnapshot>,
        ownership: Arc<OwnershipMap>,
        imports: Arc<ImportGraph>,
    ) -> Self {
        let churn_baseline = churn_baseline(&history, config.analysis.churn_percentile);
        Self {
            config,
            workspace,
            history,
            ownership,
            imports,
            churn_baseline,
        }
    }

    /// The history snapshot this context scores against.
    pub fn history(&self) -> &Arc<HistorySnapshot> {
        &self.history
    }

    /// The workspace import graph.
    pub fn imports(&self) -> &Arc<ImportGraph> {
        &self.imports
    }

    /// Churn count at which the churn score saturates.
    pub fn churn_baseline(&self) -> f64 {
        self.churn_baseline
    }

    /// Run all eight signals over one file and combine them.
    ///
    /// Per-file analyzer failures never abort the file: the failing
    /// component contributes 0 with a detail note and the composite is
    /// built from the rest.
    pub fn score_file(&self, file: &SourceFile) -> FileScore {
        let weights = &self.config.weights;
        let rel = file.relative_path.as_str();
        let loc = file.loc();

        let churn_rate = ComponentScore::new(
            self.churn_raw(self.history.churn(rel)),
            weights.churn_rate,
            vec![],
        );

        let smells = detect_smells(file);
        let smell_raw = smells.raw_score(loc);
        let code_smell_density =
            ComponentScore::new(smell_raw, weights.code_smell_density, smells.details());

        let coupling_index =
            ComponentScore::new(self.imports.raw_score(rel), weights.coupling_index, vec![]);

        let change_coupling =
            ComponentScore::new(self.change_coupling_raw(rel), weights.change_coupling, vec![]);

        let coverage = assess_coverage_gap(&self.workspace, rel);
        let test_coverage_gap = ComponentScore::new(
            coverage.raw_score,
            weights.test_coverage_gap,
            vec![coverage.detail],
        );

        let knowledge_concentration = self.knowledge_component(rel);

        let cyclomatic_complexity = match analyze_complexity(file) {
            Ok(c) => ComponentScore::new(
                c.raw_score(),
                weights.cyclomatic_complexity,
                c.hotspots(3),
            ),
            Err(e) => ComponentScore::new(
                0.0,
                weights.cyclomatic_complexity,
                vec![format!("parse failed: {e}")],
            ),
        };

        let decision_staleness = ComponentScore::new(
            compute_staleness(&self.workspace, rel, smell_raw),
            weights.decision_staleness,
            vec![],
        );

        let components = ScoreComponents {
            churn_rate,
            code_smell_density,
            coupling_index,
            change_coupling,
            test_coverage_gap,
            knowledge_concentration,
            cyclomatic_complexity,
            decision_staleness,
        };
        let composite_score = components.composite();

        FileScore {
            path: file.path.clone(),
            relative_path: file.relative_path.clone(),
            composite_score,
            components,
            loc,
            language: file.language.name().to_string(),
            last_modified: file.last_modified,
            supervision_status: SupervisionStatus::None,
        }
    }

    fn churn_raw(&self, churn: u32) -> f64 {
        if churn == 0 {
            return 0.0;
        }
        if self.churn_baseline <= 0.0 || f64::from(churn) >= self.churn_baseline {
            return 100.0;
        }
        f64::from(churn) / self.churn_baseline * 100.0
    }

    /// Mean of the file's top-5 partner coupling ratios, scaled to 0-100.
    fn change_coupling_raw(&self, relative_path: &str) -> f64 {
        let mut ratios: Vec<f64> = self
            .history
            .partners_of(relative_path)
            .into_iter()
            .map(|(partner, co)| coupling_ratio(&self.history, relative_path, partner, co))
            .collect();
        if ratios.is_empty() {
            return 0.0;
        }
        ratios.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let top: Vec<f64> = ratios.into_iter().take(5).collect();
        let mean = top.iter().sum::<f64>() / top.len() as f64;
        (mean * 100.0).min(100.0)
    }

    fn knowledge_component(&self, relative_path: &str) -> ComponentScore {
        let weight = self.config.weights.knowledge_concentration;
        let threshold = self.config.thresholds.bus_factor_ratio();
        match self.ownership.dominant_share(relative_path) {
            Some((author, share)) => {
                let raw = if share <= threshold {
                    0.0
                } else {
                    // threshold is clamped below 1.0 on load
                    ((share - threshold) / (1.0 - threshold) * 100.0).min(100.0)
                };
                ComponentScore::new(
                    raw,
                    weight,
                    vec![format!("{author} owns {:.0}% of lines", share * 100.0)],
                )
            }
            None => ComponentScore::zero(weight, "no blame data"),
        }
    }
}

/// Nearest-rank percentile over the nonzero churn counts.
fn churn_baseline(history: &HistorySnapshot, percentile: u8) -> f64 {
    let mut counts: Vec<u32> = history.churn_counts().filter(|c| *c > 0).collect();
    if counts.is_empty() {
        return 0.0;
    }
    counts.sort_unstable();
    let rank = (f64::from(percentile) / 100.0 * counts.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, counts.len()) - 1;
    f64::from(counts[idx])
}
