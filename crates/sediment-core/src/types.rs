use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::weights::WeightKey;

/// One normalized debt signal for a file.
///
/// `raw_score` is the analyzer output in `[0, 100]`, `weight` the share this
/// signal holds in the composite, and `contribution = raw_score * weight`.
/// Values are fixed at construction and never adjusted afterwards.
///
/// # Examples
///
/// ```
/// use sediment_core::ComponentScore;
///
/// let score = ComponentScore::new(80.0, 0.22, vec!["12 commits in window".into()]);
/// assert!((score.contribution - 17.6).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScore {
    /// Analyzer output, 0–100.
    pub raw_score: f64,
    /// Weight applied in the composite, 0–1.
    pub weight: f64,
    /// `raw_score * weight`.
    pub contribution: f64,
    /// Human-readable evidence lines, most significant first.
    pub details: Vec<String>,
}

impl ComponentScore {
    /// Build a component score, computing the contribution.
    pub fn new(raw_score: f64, weight: f64, details: Vec<String>) -> Self {
        Self {
            raw_score,
            weight,
            contribution: raw_score * weight,
            details,
        }
    }

    /// A zero-valued component carrying an explanation of why no signal
    /// was available (parse failure, missing history).
    pub fn zero(weight: f64, reason: &str) -> Self {
        Self::new(0.0, weight, vec![reason.to_string()])
    }
}

/// The eight named signals that make up a file's composite score.
///
/// # Examples
///
/// ```
/// use sediment_core::{ComponentScore, ScoreComponents};
/// use sediment_core::WeightKey;
///
/// let components = ScoreComponents::uniform(ComponentScore::new(0.0, 0.125, vec![]));
/// assert_eq!(components.iter().count(), 8);
/// assert_eq!(components.composite(), 0.0);
/// assert_eq!(components.get(WeightKey::ChurnRate).raw_score, 0.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponents {
    pub churn_rate: ComponentScore,
    pub code_smell_density: ComponentScore,
    pub coupling_index: ComponentScore,
    pub change_coupling: ComponentScore,
    pub test_coverage_gap: ComponentScore,
    pub knowledge_concentration: ComponentScore,
    pub cyclomatic_complexity: ComponentScore,
    pub decision_staleness: ComponentScore,
}

impl ScoreComponents {
    /// Component for `key`.
    pub fn get(&self, key: WeightKey) -> &ComponentScore {
        match key {
            WeightKey::ChurnRate => &self.churn_rate,
            WeightKey::CodeSmellDensity => &self.code_smell_density,
            WeightKey::CouplingIndex => &self.coupling_index,
            WeightKey::ChangeCoupling => &self.change_coupling,
            WeightKey::TestCoverageGap => &self.test_coverage_gap,
            WeightKey::KnowledgeConcentration => &self.knowledge_concentration,
            WeightKey::CyclomaticComplexity => &self.cyclomatic_complexity,
            WeightKey::DecisionStaleness => &self.decision_staleness,
        }
    }

    /// All eight components in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (WeightKey, &ComponentScore)> {
        WeightKey::ALL.iter().map(move |&key| (key, self.get(key)))
    }

    /// Sum of the eight contributions.
    pub fn composite(&self) -> f64 {
        self.iter().map(|(_, c)| c.contribution).sum()
    }

    /// The same component in every slot. Test and placeholder helper.
    pub fn uniform(component: ComponentScore) -> Self {
        Self {
            churn_rate: component.clone(),
            code_smell_density: component.clone(),
            coupling_index: component.clone(),
            change_coupling: component.clone(),
            test_coverage_gap: component.clone(),
            knowledge_concentration: component.clone(),
            cyclomatic_complexity: component.clone(),
            decision_staleness: component,
        }
    }
}

/// User acknowledgement state for a scored file.
///
/// `Acceptable` marks debt that was reviewed and accepted; it keeps the file
/// out of remediation lists without touching its score. A later rescore that
/// worsens the file flips it to `Regressed`.
///
/// # Examples
///
/// ```
/// use sediment_core::SupervisionStatus;
///
/// let status: SupervisionStatus = "acceptable".parse().unwrap();
/// assert_eq!(status, SupervisionStatus::Acceptable);
/// assert_eq!(SupervisionStatus::default(), SupervisionStatus::None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisionStatus {
    /// Not acknowledged.
    #[default]
    None,
    /// Debt reviewed and accepted.
    Acceptable,
    /// Previously accepted, but the score has since worsened.
    Regressed,
}

impl fmt::Display for SupervisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisionStatus::None => write!(f, "none"),
            SupervisionStatus::Acceptable => write!(f, "acceptable"),
            SupervisionStatus::Regressed => write!(f, "regressed"),
        }
    }
}

impl FromStr for SupervisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(SupervisionStatus::None),
            "acceptable" => Ok(SupervisionStatus::Acceptable),
            "regressed" => Ok(SupervisionStatus::Regressed),
            other => Err(format!("unknown supervision status: {other}")),
        }
    }
}

/// Complete debt score for one source file.
///
/// Produced by a full or incremental analysis run and never mutated after:
/// a rescore builds a new value and the holder replaces the old one by path.
///
/// # Examples
///
/// ```
/// use sediment_core::{ComponentScore, FileScore, ScoreComponents, SupervisionStatus};
/// use std::path::PathBuf;
///
/// let components = ScoreComponents::uniform(ComponentScore::new(40.0, 0.125, vec![]));
/// let score = FileScore {
///     path: PathBuf::from("/repo/src/auth.rs"),
///     relative_path: "src/auth.rs".into(),
///     composite_score: components.composite(),
///     components,
///     loc: 120,
///     language: "rust".into(),
///     last_modified: 1_700_000_000,
///     supervision_status: SupervisionStatus::None,
/// };
/// assert!((score.composite_score - 40.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileScore {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the workspace root, forward slashes.
    pub relative_path: String,
    /// Weighted sum of the eight component contributions, 0–100.
    pub composite_score: f64,
    /// The eight signal scores.
    pub components: ScoreComponents,
    /// Non-empty line count.
    pub loc: usize,
    /// Detected language name.
    pub language: String,
    /// File mtime, unix seconds.
    pub last_modified: i64,
    /// User acknowledgement state.
    pub supervision_status: SupervisionStatus,
}

impl FileScore {
    /// Read-only detail projection with components ordered by contribution
    /// descending.
    pub fn breakdown(&self) -> FileBreakdown {
        let mut components: Vec<ComponentEntry> = self
            .components
            .iter()
            .map(|(key, c)| ComponentEntry {
                name: key.to_string(),
                raw_score: c.raw_score,
                weight: c.weight,
                contribution: c.contribution,
                details: c.details.clone(),
            })
            .collect();
        components.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        FileBreakdown {
            relative_path: self.relative_path.clone(),
            composite_score: self.composite_score,
            components,
        }
    }
}

/// One named component inside a [`FileBreakdown`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    /// Canonical component key, e.g. `"churn_rate"`.
    pub name: String,
    pub raw_score: f64,
    pub weight: f64,
    pub contribution: f64,
    pub details: Vec<String>,
}

/// Per-file score detail for display, components largest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBreakdown {
    pub relative_path: String,
    pub composite_score: f64,
    pub components: Vec<ComponentEntry>,
}

/// Aggregate result of a workspace analysis.
///
/// `workspace_score` and `high_debt_count` are always recomputed from the
/// full file list, never adjusted incrementally.
///
/// # Examples
///
/// ```
/// use sediment_core::AnalysisResult;
///
/// let mut result = AnalysisResult::empty();
/// result.recompute_aggregates(65.0);
/// assert_eq!(result.file_count, 0);
/// assert_eq!(result.workspace_score, 0.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Arithmetic mean of all composite scores; 0 when no files.
    pub workspace_score: f64,
    /// Number of scored files.
    pub file_count: usize,
    /// Files with `composite_score` above the warning threshold.
    pub high_debt_count: usize,
    /// Per-file scores.
    pub files: Vec<FileScore>,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

impl AnalysisResult {
    /// A result with no files and zeroed aggregates.
    pub fn empty() -> Self {
        Self {
            workspace_score: 0.0,
            file_count: 0,
            high_debt_count: 0,
            files: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Recompute `workspace_score`, `file_count` and `high_debt_count` from
    /// the current file list.
    pub fn recompute_aggregates(&mut self, warning_threshold: f64) {
        self.file_count = self.files.len();
        self.high_debt_count = self
            .files
            .iter()
            .filter(|f| f.composite_score > warning_threshold)
            .count();
        self.workspace_score = if self.files.is_empty() {
            0.0
        } else {
            self.files.iter().map(|f| f.composite_score).sum::<f64>() / self.files.len() as f64
        };
    }

    /// Replace the entry matching `score` by absolute or relative path, or
    /// append when no entry matches, then recompute the aggregates.
    ///
    /// # Examples
    ///
    /// ```
    /// use sediment_core::{AnalysisResult, ComponentScore, FileScore, ScoreComponents, SupervisionStatus};
    /// use std::path::PathBuf;
    ///
    /// let make = |raw: f64| {
    ///     let components = ScoreComponents::uniform(ComponentScore::new(raw, 0.125, vec![]));
    ///     FileScore {
    ///         path: PathBuf::from("/repo/a.rs"),
    ///         relative_path: "a.rs".into(),
    ///         composite_score: components.composite(),
    ///         components,
    ///         loc: 10,
    ///         language: "rust".into(),
    ///         last_modified: 0,
    ///         supervision_status: SupervisionStatus::None,
    ///     }
    /// };
    /// let mut result = AnalysisResult::empty();
    /// result.merge_file(make(40.0), 65.0);
    /// result.merge_file(make(80.0), 65.0);
    /// assert_eq!(result.file_count, 1);
    /// assert_eq!(result.high_debt_count, 1);
    /// ```
    pub fn merge_file(&mut self, score: FileScore, warning_threshold: f64) {
        match self
            .files
            .iter_mut()
            .find(|f| f.path == score.path || f.relative_path == score.relative_path)
        {
            Some(existing) => *existing = score,
            None => self.files.push(score),
        }
        self.recompute_aggregates(warning_threshold);
    }

    /// Top `n` files by composite score descending.
    pub fn top_files(&self, n: usize) -> Vec<&FileScore> {
        let mut sorted: Vec<&FileScore> = self.files.iter().collect();
        sorted.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(n);
        sorted
    }
}

/// Two files that change together in history.
///
/// Symmetric: `file_a` is the lexicographically smaller path.
/// `coupling_ratio` is the co-change count over the rarer file's churn,
/// so it reads the same regardless of which file you start from.
///
/// # Examples
///
/// ```
/// use sediment_core::CouplingPair;
///
/// let pair = CouplingPair {
///     file_a: "src/auth.rs".into(),
///     file_b: "src/session.rs".into(),
///     coupling_ratio: 0.75,
///     co_change_count: 9,
///     has_import_link: false,
/// };
/// assert!(pair.coupling_ratio > 0.5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingPair {
    /// First file of the pair (lexicographically smaller).
    pub file_a: String,
    /// Second file of the pair.
    pub file_b: String,
    /// `co_change_count / min(churn_a, churn_b)`, capped at 1.
    pub coupling_ratio: f64,
    /// Commits touching both files.
    pub co_change_count: u32,
    /// Whether a static import connects the two files.
    pub has_import_link: bool,
}

/// Point-in-time aggregate persisted after a run. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtSnapshot {
    /// Row id in the snapshot store.
    pub id: i64,
    /// Capture time, unix seconds.
    pub timestamp: i64,
    /// Workspace score at capture time.
    pub composite_score: f64,
    pub file_count: usize,
    pub high_debt_count: usize,
    /// Commits in the 7 days before capture.
    pub commit_count_week: u32,
    /// Optional serialized top-10 `(path, score)` list.
    pub metadata: Option<String>,
}

/// Progress report emitted after each file completes.
///
/// `current` never decreases and reaches `total` before the run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub current: usize,
    pub total: usize,
    pub current_file: String,
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use sediment_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
