//! Line ownership via git blame.
//!
//! Blames each current file against its latest revision and aggregates
//! owned line counts per author. Cost scales with file count, not commit
//! count, so this runs once per full analysis alongside history mining.

use std::collections::HashMap;
use std::path::Path;

use git2::Repository;
use sediment_core::SedimentError;
use serde::{Deserialize, Serialize};

/// Author line ownership for a set of files.
///
/// Files git cannot blame (untracked, binary) are simply absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnershipMap {
    files: HashMap<String, HashMap<String, usize>>,
}

impl OwnershipMap {
    /// An ownership map with no entries.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attribute `lines` of `path` to `author`, accumulating.
    pub fn record(&mut self, path: &str, author: &str, lines: usize) {
        *self
            .files
            .entry(path.to_string())
            .or_default()
            .entry(author.to_string())
            .or_default() += lines;
    }

    /// Author line counts for `path`, if the file could be blamed.
    pub fn authors(&self, path: &str) -> Option<&HashMap<String, usize>> {
        self.files.get(path)
    }

    /// The author owning the most lines of `path` and their share of the
    /// total, if any lines are attributed.
    ///
    /// # Examples
    ///
    /// ```
    /// use sediment_history::blame::OwnershipMap;
    ///
    /// let map = OwnershipMap::empty();
    /// assert!(map.dominant_share("src/main.rs").is_none());
    /// ```
    pub fn dominant_share(&self, path: &str) -> Option<(String, f64)> {
        let authors = self.files.get(path)?;
        let total: usize = authors.values().sum();
        if total == 0 {
            return None;
        }
        let (name, owned) = authors
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))?;
        Some((name.clone(), *owned as f64 / total as f64))
    }

    /// Number of distinct authors attributed to `path`.
    pub fn author_count(&self, path: &str) -> usize {
        self.files.get(path).map_or(0, HashMap::len)
    }

    /// Number of files with at least one attributed line.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Blame every file in `relative_paths` against its latest revision.
///
/// Per-file blame failures recover to an absent entry; only failing to
/// open the repository is an error.
///
/// # Errors
///
/// Returns [`SedimentError::Git`] if the repository cannot be opened.
pub fn collect_ownership(
    repo_path: &Path,
    relative_paths: &[String],
) -> Result<OwnershipMap, SedimentError> {
    let repo = Repository::discover(repo_path)
        .map_err(|e| SedimentError::Git(format!("failed to open repository: {e}")))?;

    let mut ownership = OwnershipMap::default();
    for rel in relative_paths {
        for (author, lines) in blame_file(&repo, rel) {
            ownership.record(rel, &author, lines);
        }
    }

    Ok(ownership)
}

fn blame_file(repo: &Repository, rel: &str) -> HashMap<String, usize> {
    let Ok(blame) = repo.blame_file(Path::new(rel), None) else {
        return HashMap::new();
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for hunk in blame.iter() {
        let signature = hunk.final_signature();
        let name = signature.name().unwrap_or("unknown").to_string();
        *counts.entry(name).or_default() += hunk.lines_in_hunk();
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;

    fn commit_as(repo: &Repository, author: &str, rel: &str, content: &str) {
        let workdir = repo.workdir().expect("workdir");
        fs::write(workdir.join(rel), content).expect("write file");
        let mut index = repo.index().expect("index");
        index.add_path(Path::new(rel)).expect("add path");
        index.write().expect("write index");
        let tree_id = index.write_tree().expect("write tree");
        let tree = repo.find_tree(tree_id).expect("find tree");
        let email = format!("{}@example.com", author.to_lowercase());
        let sig = Signature::now(author, &email).expect("signature");
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "change", &tree, &parents)
            .expect("commit");
    }

    #[test]
    fn single_author_owns_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Repository::init(dir.path()).expect("init");
        commit_as(&repo, "Alice", "a.rs", "one\ntwo\nthree\n");

        let ownership = collect_ownership(dir.path(), &["a.rs".to_string()]).unwrap();
        let (author, share) = ownership.dominant_share("a.rs").expect("blamed");
        assert_eq!(author, "Alice");
        assert!((share - 1.0).abs() < f64::EPSILON);
        assert_eq!(ownership.author_count("a.rs"), 1);
    }

    #[test]
    fn appended_lines_attribute_to_the_second_author() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Repository::init(dir.path()).expect("init");
        commit_as(&repo, "Alice", "a.rs", "one\ntwo\nthree\n");
        commit_as(&repo, "Bob", "a.rs", "one\ntwo\nthree\nfour\n");

        let ownership = collect_ownership(dir.path(), &["a.rs".to_string()]).unwrap();
        let authors = ownership.authors("a.rs").expect("blamed");
        assert_eq!(authors.get("Alice"), Some(&3));
        assert_eq!(authors.get("Bob"), Some(&1));

        let (author, share) = ownership.dominant_share("a.rs").expect("blamed");
        assert_eq!(author, "Alice");
        assert!((share - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn untracked_file_recovers_to_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = Repository::init(dir.path()).expect("init");
        commit_as(&repo, "Alice", "tracked.rs", "x\n");
        fs::write(dir.path().join("loose.rs"), "y\n").expect("write");

        let ownership = collect_ownership(
            dir.path(),
            &["tracked.rs".to_string(), "loose.rs".to_string()],
        )
        .unwrap();
        assert!(ownership.authors("tracked.rs").is_some());
        assert!(ownership.authors("loose.rs").is_none());
        assert_eq!(ownership.file_count(), 1);
    }

    #[test]
    fn missing_repository_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = collect_ownership(dir.path(), &[]);
        assert!(matches!(result, Err(SedimentError::Git(_))));
    }

    #[test]
    fn ownership_map_serializes_per_author_counts() {
        let mut map = OwnershipMap::empty();
        map.record("src/a.rs", "ada", 12);
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("\"ada\":12"));
    }
}
