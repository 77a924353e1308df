use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tolerance used when checking that a weight vector sums to 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Identifier for one of the eight composite components.
///
/// # Examples
///
/// ```
/// use sediment_core::WeightKey;
///
/// let key: WeightKey = "churn_rate".parse().unwrap();
/// assert_eq!(key, WeightKey::ChurnRate);
/// assert_eq!(key.to_string(), "churn_rate");
/// assert_eq!(WeightKey::ALL.len(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightKey {
    ChurnRate,
    CodeSmellDensity,
    CouplingIndex,
    ChangeCoupling,
    TestCoverageGap,
    KnowledgeConcentration,
    CyclomaticComplexity,
    DecisionStaleness,
}

impl WeightKey {
    /// Every key in canonical order (heaviest default weight first).
    pub const ALL: [WeightKey; 8] = [
        WeightKey::ChurnRate,
        WeightKey::CodeSmellDensity,
        WeightKey::CouplingIndex,
        WeightKey::ChangeCoupling,
        WeightKey::TestCoverageGap,
        WeightKey::KnowledgeConcentration,
        WeightKey::CyclomaticComplexity,
        WeightKey::DecisionStaleness,
    ];
}

impl fmt::Display for WeightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightKey::ChurnRate => "churn_rate",
            WeightKey::CodeSmellDensity => "code_smell_density",
            WeightKey::CouplingIndex => "coupling_index",
            WeightKey::ChangeCoupling => "change_coupling",
            WeightKey::TestCoverageGap => "test_coverage_gap",
            WeightKey::KnowledgeConcentration => "knowledge_concentration",
            WeightKey::CyclomaticComplexity => "cyclomatic_complexity",
            WeightKey::DecisionStaleness => "decision_staleness",
        };
        write!(f, "{name}")
    }
}

impl FromStr for WeightKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "churn_rate" => Ok(WeightKey::ChurnRate),
            "code_smell_density" => Ok(WeightKey::CodeSmellDensity),
            "coupling_index" => Ok(WeightKey::CouplingIndex),
            "change_coupling" => Ok(WeightKey::ChangeCoupling),
            "test_coverage_gap" => Ok(WeightKey::TestCoverageGap),
            "knowledge_concentration" => Ok(WeightKey::KnowledgeConcentration),
            "cyclomatic_complexity" => Ok(WeightKey::CyclomaticComplexity),
            "decision_staleness" => Ok(WeightKey::DecisionStaleness),
            other => Err(format!("unknown weight key: {other}")),
        }
    }
}

/// The eight component weights. Invariant: they sum to 1.0 within
/// [`WEIGHT_SUM_TOLERANCE`] after every mutation through this type.
///
/// # Examples
///
/// ```
/// use sediment_core::{WeightKey, Weights};
///
/// let mut weights = Weights::default();
/// assert!((weights.sum() - 1.0).abs() < 1e-6);
///
/// weights.set(WeightKey::ChurnRate, 0.5);
/// assert!((weights.sum() - 1.0).abs() < 1e-6);
/// assert!((weights.get(WeightKey::ChurnRate) - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(default = "default_churn_rate")]
    pub churn_rate: f64,
    #[serde(default = "default_code_smell_density")]
    pub code_smell_density: f64,
    #[serde(default = "default_coupling_index")]
    pub coupling_index: f64,
    #[serde(default = "default_change_coupling")]
    pub change_coupling: f64,
    #[serde(default = "default_test_coverage_gap")]
    pub test_coverage_gap: f64,
    #[serde(default = "default_knowledge_concentration")]
    pub knowledge_concentration: f64,
    #[serde(default = "default_cyclomatic_complexity")]
    pub cyclomatic_complexity: f64,
    #[serde(default = "default_decision_staleness")]
    pub decision_staleness: f64,
}

fn default_churn_rate() -> f64 {
    0.22
}

fn default_code_smell_density() -> f64 {
    0.20
}

fn default_coupling_index() -> f64 {
    0.18
}

fn default_change_coupling() -> f64 {
    0.12
}

fn default_test_coverage_gap() -> f64 {
    0.12
}

fn default_knowledge_concentration() -> f64 {
    0.08
}

fn default_cyclomatic_complexity() -> f64 {
    0.05
}

fn default_decision_staleness() -> f64 {
    0.03
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            churn_rate: default_churn_rate(),
            code_smell_density: default_code_smell_density(),
            coupling_index: default_coupling_index(),
            change_coupling: default_change_coupling(),
            test_coverage_gap: default_test_coverage_gap(),
            knowledge_concentration: default_knowledge_concentration(),
            cyclomatic_complexity: default_cyclomatic_complexity(),
            decision_staleness: default_decision_staleness(),
        }
    }
}

impl Weights {
    /// Weight for `key`.
    pub fn get(&self, key: WeightKey) -> f64 {
        match key {
            WeightKey::ChurnRate => self.churn_rate,
            WeightKey::CodeSmellDensity => self.code_smell_density,
            WeightKey::CouplingIndex => self.coupling_index,
            WeightKey::ChangeCoupling => self.change_coupling,
            WeightKey::TestCoverageGap => self.test_coverage_gap,
            WeightKey::KnowledgeConcentration => self.knowledge_concentration,
            WeightKey::CyclomaticComplexity => self.cyclomatic_complexity,
            WeightKey::DecisionStaleness => self.decision_staleness,
        }
    }

    fn put(&mut self, key: WeightKey, value: f64) {
        match key {
            WeightKey::ChurnRate => self.churn_rate = value,
            WeightKey::CodeSmellDensity => self.code_smell_density = value,
            WeightKey::CouplingIndex => self.coupling_index = value,
            WeightKey::ChangeCoupling => self.change_coupling = value,
            WeightKey::TestCoverageGap => self.test_coverage_gap = value,
            WeightKey::KnowledgeConcentration => self.knowledge_concentration = value,
            WeightKey::CyclomaticComplexity => self.cyclomatic_complexity = value,
            WeightKey::DecisionStaleness => self.decision_staleness = value,
        }
    }

    /// Sum over all eight weights.
    pub fn sum(&self) -> f64 {
        WeightKey::ALL.iter().map(|&k| self.get(k)).sum()
    }

    /// Set one weight to `value` (clamped to `[0, 1]`), redistributing the
    /// difference across the other seven in proportion to their current
    /// share of their own total, then rescaling the whole vector to sum 1.
    ///
    /// Adjusted weights floor at 0; a degenerate all-zero vector resets to
    /// the defaults.
    pub fn set(&mut self, key: WeightKey, value: f64) {
        let value = value.clamp(0.0, 1.0);
        let delta = value - self.get(key);

        let others: Vec<WeightKey> = WeightKey::ALL
            .iter()
            .copied()
            .filter(|&k| k != key)
            .collect();
        let others_total: f64 = others.iter().map(|&k| self.get(k)).sum();

        for &k in &others {
            let share = if others_total > f64::EPSILON {
                self.get(k) / others_total
            } else {
                1.0 / others.len() as f64
            };
            self.put(k, (self.get(k) - delta * share).max(0.0));
        }
        self.put(key, value);

        self.rescale();
    }

    /// Restore the documented default vector.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Rescale so the weights sum to 1, used when loading an external
    /// vector that is off by more than the tolerance. A degenerate
    /// all-zero vector resets to the defaults.
    pub fn normalize(&mut self) {
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            self.rescale();
        }
    }

    fn rescale(&mut self) {
        let total = self.sum();
        if total <= f64::EPSILON {
            *self = Self::default();
            return;
        }
        for key in WeightKey::ALL {
            self.put(key, self.get(key) / total);
        }
    }
}
