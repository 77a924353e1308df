use std::cmp::Ordering;

use sediment_core::{AnalysisResult, FileScore, SupervisionStatus, WeightKey};
use serde::{Deserialize, Serialize};

/// Effort points per detected smell occurrence.
const SMELL_COST: f64 = 0.5;
/// Non-empty lines per effort point.
const LOC_DIVISOR: f64 = 200.0;
/// Coupling raw-score points per effort point.
const COUPLING_DIVISOR: f64 = 20.0;

/// A file worth paying down, with its payoff estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationTarget {
    pub relative_path: String,
    pub composite_score: f64,
    /// Estimated effort-adjusted payoff of cleaning the file up.
    pub roi: f64,
    /// Component keys with the largest contributions, up to two.
    pub drivers: Vec<String>,
}

/// Remediation payoff estimate for one file.
///
/// Smell occurrences dominate: each one costs half a point, while size
/// and coupling add slower-growing terms.
pub fn estimate_roi(smell_count: usize, loc: usize, coupling_raw: f64) -> f64 {
    smell_count as f64 * SMELL_COST + loc as f64 / LOC_DIVISOR + coupling_raw / COUPLING_DIVISOR
}

/// The top remediation candidates in `result`.
///
/// Files the user has acknowledged as acceptable are skipped; the rest
/// rank by composite score descending, capped at `limit`.
pub fn remediation_targets(result: &AnalysisResult, limit: usize) -> Vec<RemediationTarget> {
    let mut candidates: Vec<&FileScore> = result
        .files
        .iter()
        .filter(|f| f.supervision_status != SupervisionStatus::Acceptable)
        .collect();
    candidates.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(Ordering::Equal)
    });

    candidates
        .into_iter()
        .take(limit)
        .map(|score| {
            let coupling = score.components.get(WeightKey::CouplingIndex).raw_score;
            RemediationTarget {
                relative_path: score.relative_path.clone(),
                composite_score: score.composite_score,
                roi: estimate_roi(smell_count(score), score.loc, coupling),
                drivers: drivers(score),
            }
        })
        .collect()
}

/// Total smell occurrences, recovered from the density evidence lines.
///
/// Each line reads `"<count> <category>"`; lines that do not start with
/// a number count as zero.
fn smell_count(score: &FileScore) -> usize {
    score
        .components
        .get(WeightKey::CodeSmellDensity)
        .details
        .iter()
        .filter_map(|d| d.split_whitespace().next()?.parse::<usize>().ok())
        .sum()
}

fn drivers(score: &FileScore) -> Vec<String> {
    score
        .breakdown()
        .components
        .into_iter()
        .filter(|c| c.contribution > 0.0)
        .take(2)
        .map(|c| c.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sediment_core::{ComponentScore, ScoreComponents};
    use std::path::PathBuf;

    fn make_score(rel: &str, raw: f64) -> FileScore {
        let components = ScoreComponents::uniform(ComponentScore::new(raw, 0.125, vec![]));
        FileScore {
            path: PathBuf::from(format!("/ws/{rel}")),
            relative_path: rel.to_string(),
            composite_score: components.composite(),
            components,
            loc: 100,
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
    fn roi_formula_matches_the_reference_points() {
        assert!((estimate_roi(10, 400, 60.0) - 10.0).abs() < 1e-9);
        assert_eq!(estimate_roi(0, 0, 0.0), 0.0);
    }

    #[test]
    fn acknowledged_files_are_not_targets() {
        let mut noisy = make_score("src/noisy.rs", 90.0);
        noisy.supervision_status = SupervisionStatus::Acceptable;
        let quiet = make_score("src/quiet.rs", 20.0);

        let targets = remediation_targets(&make_result(vec![noisy, quiet]), 10);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].relative_path, "src/quiet.rs");
    }

    #[test]
    fn targets_rank_by_composite_and_respect_the_cap() {
        let files = vec![
            make_score("src/a.rs", 30.0),
            make_score("src/b.rs", 70.0),
            make_score("src/c.rs", 50.0),
        ];

        let targets = remediation_targets(&make_result(files), 2);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].relative_path, "src/b.rs");
        assert_eq!(targets[1].relative_path, "src/c.rs");
    }

    #[test]
    fn smell_counts_come_from_the_density_evidence() {
        let mut score = make_score("src/messy.rs", 40.0);
        score.components.code_smell_density.details = vec![
            "3 todo_fixme".to_string(),
            "1 god_function".to_string(),
            "unstructured note".to_string(),
        ];
        score.loc = 400;
        score.components.coupling_index.raw_score = 60.0;

        let targets = remediation_targets(&make_result(vec![score]), 1);
        // 4 smells * 0.5 + 400 / 200 + 60 / 20 = 7.
        assert!((targets[0].roi - 7.0).abs() < 1e-9);
    }

    #[test]
    fn drivers_name_the_loudest_components() {
        let mut score = make_score("src/a.rs", 0.0);
        score.components.churn_rate = ComponentScore::new(80.0, 0.22, vec![]);
        score.components.coupling_index = ComponentScore::new(40.0, 0.18, vec![]);
        score.components.test_coverage_gap = ComponentScore::new(10.0, 0.12, vec![]);
        score.composite_score = score.components.composite();

        let targets = remediation_targets(&make_result(vec![score]), 1);
        assert_eq!(targets[0].drivers, vec!["churn_rate", "coupling_index"]);
    }
}
