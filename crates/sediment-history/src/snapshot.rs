//! Immutable history aggregates built once per full run.
//!
//! [`HistorySnapshot`] folds mined commits into the per-file churn map and
//! the unordered co-change pair map. It is built once after mining, wrapped
//! in an `Arc`, and handed read-only to every scoring worker.

use std::collections::HashMap;

use crate::mining::{ChangeStatus, CommitInfo};

/// Per-file churn and pairwise co-change counts for one history window.
///
/// Deleted and renamed paths are left out, as are changes with no textual
/// line delta (binary or metadata-only).
///
/// # Examples
///
/// ```
/// use sediment_history::mining::{ChangeStatus, CommitInfo, FileChange};
/// use sediment_history::snapshot::HistorySnapshot;
///
/// let commits = vec![CommitInfo {
///     hash: "abc".into(),
///     author: "alice".into(),
///     email: "alice@example.com".into(),
///     timestamp: 1700000000,
///     message: "touch both".into(),
///     files_changed: vec![
///         FileChange { path: "a.rs".into(), lines_added: 4, lines_deleted: 1, status: ChangeStatus::Modified },
///         FileChange { path: "b.rs".into(), lines_added: 2, lines_deleted: 0, status: ChangeStatus::Modified },
///     ],
/// }];
/// let snapshot = HistorySnapshot::build(&commits);
/// assert_eq!(snapshot.churn("a.rs"), 1);
/// assert_eq!(snapshot.co_change("b.rs", "a.rs"), 1);
/// ```
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    churn: HashMap<String, u32>,
    co_change: HashMap<(String, String), u32>,
    commit_count: usize,
    commit_count_week: u32,
}

impl HistorySnapshot {
    /// Fold `commits` into churn and co-change maps.
    pub fn build(commits: &[CommitInfo]) -> Self {
        let week_cutoff = now_unix() - 7 * 86400;

        let mut churn: HashMap<String, u32> = HashMap::new();
        let mut co_change: HashMap<(String, String), u32> = HashMap::new();
        let mut commit_count_week = 0u32;

        for commit in commits {
            if commit.timestamp >= week_cutoff {
                commit_count_week += 1;
            }

            let mut files: Vec<&str> = Vec::new();
            let mut seen = std::collections::HashSet::new();
            for change in &commit.files_changed {
                if !counts_toward_churn(change) {
                    continue;
                }
                if seen.insert(change.path.as_str()) {
                    files.push(change.path.as_str());
                }
            }

            for file in &files {
                *churn.entry((*file).to_string()).or_default() += 1;
            }

            for i in 0..files.len() {
                for j in (i + 1)..files.len() {
                    let key = normalize_pair(files[i], files[j]);
                    *co_change.entry(key).or_default() += 1;
                }
            }
        }

        Self {
            churn,
            co_change,
            commit_count: commits.len(),
            commit_count_week,
        }
    }

    /// An empty snapshot. Used when scoring without history.
    pub fn empty() -> Self {
        Self {
            churn: HashMap::new(),
            co_change: HashMap::new(),
            commit_count: 0,
            commit_count_week: 0,
        }
    }

    /// Commits touching `path` within the window.
    pub fn churn(&self, path: &str) -> u32 {
        self.churn.get(path).copied().unwrap_or(0)
    }

    /// All per-file churn counts, for distribution statistics.
    pub fn churn_counts(&self) -> impl Iterator<Item = u32> + '_ {
        self.churn.values().copied()
    }

    /// Commits touching both `a` and `b`. Argument order does not matter.
    pub fn co_change(&self, a: &str, b: &str) -> u32 {
        let key = normalize_pair(a, b);
        self.co_change.get(&key).copied().unwrap_or(0)
    }

    /// Every tracked pair as `(file_a, file_b, co_change_count)`.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, u32)> + '_ {
        self.co_change
            .iter()
            .map(|((a, b), count)| (a.as_str(), b.as_str(), *count))
    }

    /// Co-change partners of `path` with their pair counts.
    pub fn partners_of(&self, path: &str) -> Vec<(&str, u32)> {
        self.co_change
            .iter()
            .filter_map(|((a, b), count)| {
                if a == path {
                    Some((b.as_str(), *count))
                } else if b == path {
                    Some((a.as_str(), *count))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Commits folded into this snapshot.
    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    /// Commits from the last 7 days.
    pub fn commit_count_week(&self) -> u32 {
        self.commit_count_week
    }

    /// True when no commits were folded in.
    pub fn is_empty(&self) -> bool {
        self.commit_count == 0
    }
}

fn counts_toward_churn(change: &crate::mining::FileChange) -> bool {
    match change.status {
        ChangeStatus::Added | ChangeStatus::Modified => {
            change.lines_added + change.lines_deleted > 0
        }
        ChangeStatus::Deleted | ChangeStatus::Renamed { .. } => false,
    }
}

fn normalize_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::FileChange;

    fn make_commit(timestamp: i64, files: Vec<&str>) -> CommitInfo {
        CommitInfo {
            hash: "abc".into(),
            author: "alice".into(),
            email: "alice@example.com".into(),
            timestamp,
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
    fn churn_counts_commits_per_file() {
        let commits = vec![
            make_commit(1000, vec!["a.rs", "b.rs"]),
            make_commit(2000, vec!["a.rs"]),
            make_commit(3000, vec!["a.rs"]),
        ];
        let snapshot = HistorySnapshot::build(&commits);
        assert_eq!(snapshot.churn("a.rs"), 3);
        assert_eq!(snapshot.churn("b.rs"), 1);
        assert_eq!(snapshot.churn("missing.rs"), 0);
        assert_eq!(snapshot.commit_count(), 3);
    }

    #[test]
    fn co_change_is_order_independent() {
        let commits = vec![
            make_commit(1000, vec!["z.rs", "a.rs"]),
            make_commit(2000, vec!["a.rs", "z.rs"]),
        ];
        let snapshot = HistorySnapshot::build(&commits);
        assert_eq!(snapshot.co_change("a.rs", "z.rs"), 2);
        assert_eq!(snapshot.co_change("z.rs", "a.rs"), 2);
    }

    #[test]
    fn deleted_and_renamed_changes_are_excluded() {
        let mut commit = make_commit(1000, vec!["kept.rs"]);
        commit.files_changed.push(FileChange {
            path: "gone.rs".into(),
            lines_added: 0,
            lines_deleted: 0,
            status: ChangeStatus::Deleted,
        });
        commit.files_changed.push(FileChange {
            path: "new_name.rs".into(),
            lines_added: 1,
            lines_deleted: 1,
            status: ChangeStatus::Renamed {
                from: "old_name.rs".into(),
            },
        });

        let snapshot = HistorySnapshot::build(&[commit]);
        assert_eq!(snapshot.churn("kept.rs"), 1);
        assert_eq!(snapshot.churn("gone.rs"), 0);
        assert_eq!(snapshot.churn("new_name.rs"), 0);
        assert_eq!(snapshot.co_change("kept.rs", "gone.rs"), 0);
    }

    #[test]
    fn changes_without_line_deltas_are_excluded() {
        let mut commit = make_commit(1000, vec!["text.rs"]);
        commit.files_changed.push(FileChange {
            path: "logo.png".into(),
            lines_added: 0,
            lines_deleted: 0,
            status: ChangeStatus::Modified,
        });

        let snapshot = HistorySnapshot::build(&[commit]);
        assert_eq!(snapshot.churn("logo.png"), 0);
        assert_eq!(snapshot.co_change("text.rs", "logo.png"), 0);
    }

    #[test]
    fn duplicate_paths_in_one_commit_count_once() {
        let mut commit = make_commit(1000, vec!["a.rs"]);
        commit.files_changed.push(FileChange {
            path: "a.rs".into(),
            lines_added: 2,
            lines_deleted: 0,
            status: ChangeStatus::Modified,
        });

        let snapshot = HistorySnapshot::build(&[commit]);
        assert_eq!(snapshot.churn("a.rs"), 1);
    }

    #[test]
    fn partners_of_lists_both_directions() {
        let commits = vec![
            make_commit(1000, vec!["a.rs", "b.rs"]),
            make_commit(2000, vec!["b.rs", "c.rs"]),
        ];
        let snapshot = HistorySnapshot::build(&commits);
        let mut partners = snapshot.partners_of("b.rs");
        partners.sort();
        assert_eq!(partners, vec![("a.rs", 1), ("c.rs", 1)]);
        assert!(snapshot.partners_of("d.rs").is_empty());
    }

    #[test]
    fn recent_commits_count_toward_the_week() {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let commits = vec![
            make_commit(now - 3600, vec!["a.rs"]),
            make_commit(now - 30 * 86400, vec!["a.rs"]),
        ];
        let snapshot = HistorySnapshot::build(&commits);
        assert_eq!(snapshot.commit_count_week(), 1);
    }

    #[test]
    fn empty_snapshot_reports_empty() {
        let snapshot = HistorySnapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.churn("a.rs"), 0);
        assert_eq!(snapshot.churn_counts().count(), 0);
    }
}
