use std::fmt;

use sediment_core::DebtSnapshot;
use serde::{Deserialize, Serialize};

/// Snapshots consumed by one forecast; older captures are ignored.
pub const FORECAST_WINDOW: usize = 8;
/// Fewer points than this leaves the regression undefined.
pub const MIN_SNAPSHOTS: usize = 3;
/// Dead-band around zero slope for the direction label.
const DIRECTION_DEADBAND: f64 = 0.5;
/// Projected four-week drop that counts as an improvement.
const IMPROVEMENT_MARGIN: f64 = 2.0;

/// Sign of the fitted slope, with a dead-band for noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Flat => write!(f, "flat"),
        }
    }
}

/// Where the projected scores land over the next four weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendOutlook {
    /// A projected week reaches the critical threshold.
    Critical,
    /// A projected week reaches the warning threshold.
    Warning,
    /// The four-week projection drops by more than two points.
    Improving,
    Stable,
}

impl fmt::Display for TrendOutlook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendOutlook::Critical => write!(f, "critical"),
            TrendOutlook::Warning => write!(f, "warning"),
            TrendOutlook::Improving => write!(f, "improving"),
            TrendOutlook::Stable => write!(f, "stable"),
        }
    }
}

/// A fitted trend over the recent snapshot series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendProjection {
    /// Points per week: the least-squares slope.
    pub velocity: f64,
    pub direction: TrendDirection,
    pub outlook: TrendOutlook,
    /// Projected workspace scores one to four weeks out, clamped to
    /// `[0, 100]`.
    pub projected: [f64; 4],
}

/// Outcome of a forecast request.
#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    /// Fewer than three snapshots: no regression is defined.
    InsufficientData {
        /// Snapshots that were available.
        available: usize,
    },
    Projection(TrendProjection),
}

impl Forecast {
    /// The fitted projection, unless the series was too short.
    pub fn projection(&self) -> Option<&TrendProjection> {
        match self {
            Forecast::InsufficientData { .. } => None,
            Forecast::Projection(p) => Some(p),
        }
    }
}

/// Fit ordinary least squares over the recent snapshot series and
/// project one to four weeks ahead.
///
/// `snapshots` come in ascending timestamp order; only the newest
/// [`FORECAST_WINDOW`] enter the regression. The score series regresses
/// against snapshot index, so irregular capture intervals read as equal
/// steps.
///
/// # Examples
///
/// ```
/// use sediment_core::DebtSnapshot;
/// use sediment_engine::forecast::{forecast_trend, Forecast};
///
/// let snapshots: Vec<DebtSnapshot> = (0..5)
///     .map(|i| DebtSnapshot {
///         id: i,
///         timestamp: 1_700_000_000 + i * 86_400,
///         composite_score: 40.0 + i as f64,
///         file_count: 10,
///         high_debt_count: 1,
///         commit_count_week: 3,
///         metadata: None,
///     })
///     .collect();
///
/// let Forecast::Projection(trend) = forecast_trend(&snapshots, 65.0, 80.0) else {
///     panic!("five snapshots fit a line");
/// };
/// assert!((trend.velocity - 1.0).abs() < 1e-9);
/// ```
pub fn forecast_trend(snapshots: &[DebtSnapshot], warning: f64, critical: f64) -> Forecast {
    let start = snapshots.len().saturating_sub(FORECAST_WINDOW);
    let recent = &snapshots[start..];
    if recent.len() < MIN_SNAPSHOTS {
        return Forecast::InsufficientData {
            available: recent.len(),
        };
    }

    let points: Vec<(f64, f64)> = recent
        .iter()
        .enumerate()
        .map(|(i, s)| (i as f64, s.composite_score))
        .collect();
    let (slope, intercept) = fit_line(&points);

    let n = points.len() as f64;
    let mut projected = [0.0f64; 4];
    for (w, slot) in projected.iter_mut().enumerate() {
        let week = (w + 1) as f64;
        *slot = (slope * (n - 1.0 + week) + intercept).clamp(0.0, 100.0);
    }

    let last = recent[recent.len() - 1].composite_score;
    let outlook = if projected.iter().any(|p| *p >= critical) {
        TrendOutlook::Critical
    } else if projected.iter().any(|p| *p >= warning) {
        TrendOutlook::Warning
    } else if projected[3] - last < -IMPROVEMENT_MARGIN {
        TrendOutlook::Improving
    } else {
        TrendOutlook::Stable
    };
    let direction = if slope > DIRECTION_DEADBAND {
        TrendDirection::Up
    } else if slope < -DIRECTION_DEADBAND {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };

    Forecast::Projection(TrendProjection {
        velocity: slope,
        direction,
        outlook,
        projected,
    })
}

/// Least-squares line through `points` as `(slope, intercept)`.
fn fit_line(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    if n < 2.0 {
        return (0.0, points.first().map(|(_, y)| *y).unwrap_or(0.0));
    }

    let sum_x: f64 = points.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = points.iter().map(|(_, y)| y).sum();
    let dot_xy: f64 = points.iter().map(|(x, y)| x * y).sum();
    let sum_xx: f64 = points.iter().map(|(x, _)| x * x).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < f64::EPSILON {
        return (0.0, sum_y / n);
    }

    let slope = (n * dot_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}
