//! Change coupling detection.
//!
//! Turns the co-change counts of a [`HistorySnapshot`] into ranked
//! [`CouplingPair`]s. Pairs that co-change without a static import edge
//! are the interesting ones: coupling with no structural explanation.

use sediment_core::CouplingPair;

use crate::snapshot::HistorySnapshot;

/// Pairs returned by [`detect_change_couplings`] are capped at this many.
pub const MAX_COUPLING_PAIRS: usize = 200;

/// Minimum commits a pair must share before it is reported.
pub const MIN_CO_CHANGES: u32 = 2;

/// Detect change-coupled file pairs.
///
/// `coupling_ratio` is the pair's co-change count over the rarer file's
/// churn, capped at 1. Pairs need at least [`MIN_CO_CHANGES`] shared
/// commits and a ratio of at least `threshold` (`0.0` keeps them all).
/// `has_import_link` reports whether `import_link` says the two files
/// reference each other statically.
///
/// Results are sorted by co-change count descending and truncated to
/// [`MAX_COUPLING_PAIRS`].
///
/// # Examples
///
/// ```
/// use sediment_history::coupling::detect_change_couplings;
/// use sediment_history::mining::{ChangeStatus, CommitInfo, FileChange};
/// use sediment_history::snapshot::HistorySnapshot;
///
/// let commit = |files: Vec<&str>| CommitInfo {
///     hash: "abc".into(),
///     author: "alice".into(),
///     email: "a@example.com".into(),
///     timestamp: 1000,
///     message: "change".into(),
///     files_changed: files
///         .into_iter()
///         .map(|p| FileChange {
///             path: p.into(),
///             lines_added: 1,
///             lines_deleted: 0,
///             status: ChangeStatus::Modified,
///         })
///         .collect(),
/// };
/// let snapshot = HistorySnapshot::build(&[
///     commit(vec!["a.rs", "b.rs"]),
///     commit(vec!["a.rs", "b.rs"]),
/// ]);
/// let pairs = detect_change_couplings(&snapshot, 0.0, |_, _| false);
/// assert_eq!(pairs.len(), 1);
/// assert_eq!(pairs[0].co_change_count, 2);
/// assert!((pairs[0].coupling_ratio - 1.0).abs() < f64::EPSILON);
/// ```
pub fn detect_change_couplings<F>(
    snapshot: &HistorySnapshot,
    threshold: f64,
    import_link: F,
) -> Vec<CouplingPair>
where
    F: Fn(&str, &str) -> bool,
{
    let mut pairs = Vec::new();

    for (file_a, file_b, co_count) in snapshot.pairs() {
        if co_count < MIN_CO_CHANGES {
            continue;
        }

        let ratio = coupling_ratio(snapshot, file_a, file_b, co_count);
        if ratio < threshold {
            continue;
        }

        pairs.push(CouplingPair {
            file_a: file_a.to_string(),
            file_b: file_b.to_string(),
            coupling_ratio: ratio,
            co_change_count: co_count,
            has_import_link: import_link(file_a, file_b),
        });
    }

    pairs.sort_by(|a, b| {
        b.co_change_count
            .cmp(&a.co_change_count)
            .then_with(|| {
                b.coupling_ratio
                    .partial_cmp(&a.coupling_ratio)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.file_a.cmp(&b.file_a))
    });
    pairs.truncate(MAX_COUPLING_PAIRS);

    pairs
}

/// Co-change count over the rarer file's churn, capped at 1.
///
/// A file with zero churn has ratio 0 with every partner.
pub fn coupling_ratio(
    snapshot: &HistorySnapshot,
    file_a: &str,
    file_b: &str,
    co_count: u32,
) -> f64 {
    let churn_a = snapshot.churn(file_a);
    let churn_b = snapshot.churn(file_b);
    if churn_a == 0 || churn_b == 0 {
        return 0.0;
    }
    (f64::from(co_count) / f64::from(churn_a.min(churn_b).max(1))).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::{ChangeStatus, CommitInfo, FileChange};

    fn make_commit(files: Vec<&str>) -> CommitInfo {
        CommitInfo {
            hash: "abc".into(),
            author: "alice".into(),
            email: "alice@example.com".into(),
            timestamp: 1000,
            message: "test".into(),
            files_changed: files
                .into_iter()
                .map(|path| FileChange {
                    path: path.into(),
                    lines_added: 5,
                    lines_deleted: 2,
                    status: ChangeStatus::Modified,
                })
                .collect(),
        }
    }

    #[test]
    fn files_always_changed_together_have_ratio_1() {
        let snapshot = HistorySnapshot::build(&[
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
        ]);
        let pairs = detect_change_couplings(&snapshot, 0.0, |_, _| false);
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].coupling_ratio - 1.0).abs() < f64::EPSILON);
        assert_eq!(pairs[0].co_change_count, 3);
    }

    #[test]
    fn ratio_is_relative_to_the_rarer_file() {
        // a changes 4 times, b twice, together twice: ratio = 2/2 = 1.0
        let snapshot = HistorySnapshot::build(&[
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs"]),
            make_commit(vec!["a.rs"]),
        ]);
        let pairs = detect_change_couplings(&snapshot, 0.0, |_, _| false);
        assert_eq!(pairs.len(), 1);
        assert!((pairs[0].coupling_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_co_change_is_below_the_floor() {
        let snapshot = HistorySnapshot::build(&[make_commit(vec!["a.rs", "b.rs"])]);
        let pairs = detect_change_couplings(&snapshot, 0.0, |_, _| false);
        assert!(pairs.is_empty(), "one shared commit is noise, not coupling");
    }

    #[test]
    fn threshold_filters_low_ratios() {
        // together twice, b alone six more times: ratio = 2/8 = 0.25
        let mut commits = vec![
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
        ];
        for _ in 0..6 {
            commits.push(make_commit(vec!["b.rs"]));
            commits.push(make_commit(vec!["a.rs"]));
        }
        let snapshot = HistorySnapshot::build(&commits);

        let all = detect_change_couplings(&snapshot, 0.0, |_, _| false);
        assert_eq!(all.len(), 1);

        let filtered = detect_change_couplings(&snapshot, 0.5, |_, _| false);
        assert!(filtered.is_empty());
    }

    #[test]
    fn pairs_sort_by_co_change_count() {
        let snapshot = HistorySnapshot::build(&[
            make_commit(vec!["x.rs", "y.rs"]),
            make_commit(vec!["x.rs", "y.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
        ]);
        let pairs = detect_change_couplings(&snapshot, 0.0, |_, _| false);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].file_a, "a.rs");
        assert_eq!(pairs[0].co_change_count, 3);
        assert_eq!(pairs[1].co_change_count, 2);
    }

    #[test]
    fn import_link_predicate_is_attached() {
        let snapshot = HistorySnapshot::build(&[
            make_commit(vec!["a.rs", "b.rs"]),
            make_commit(vec!["a.rs", "b.rs"]),
        ]);
        let pairs = detect_change_couplings(&snapshot, 0.0, |a, b| a == "a.rs" && b == "b.rs");
        assert!(pairs[0].has_import_link);
    }

    #[test]
    fn file_a_is_lexicographically_smaller() {
        let snapshot = HistorySnapshot::build(&[
            make_commit(vec!["z.rs", "a.rs"]),
            make_commit(vec!["a.rs", "z.rs"]),
        ]);
        let pairs = detect_change_couplings(&snapshot, 0.0, |_, _| false);
        assert_eq!(pairs[0].file_a, "a.rs");
        assert_eq!(pairs[0].file_b, "z.rs");
    }
}
