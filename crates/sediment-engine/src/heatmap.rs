use std::cmp::Ordering;
use std::collections::BTreeMap;

use sediment_core::FileScore;
use serde::{Deserialize, Serialize};

/// One cell of the directory heat map.
///
/// Directories average the composite scores of every file below them;
/// files carry their own score and an empty child list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapNode {
    /// Final path segment, `"."` for the root.
    pub name: String,
    /// Path relative to the workspace root, empty for the root.
    pub path: String,
    /// Mean composite score of the files under this node.
    pub score: f64,
    /// Files under this node.
    pub file_count: usize,
    /// Child nodes, hottest first.
    pub children: Vec<HeatmapNode>,
}

/// Fold per-file scores into a directory tree.
///
/// Children at every level sort by score descending, so the first chain
/// of children walks straight to the hottest corner of the workspace.
pub fn build_heatmap(files: &[FileScore]) -> HeatmapNode {
    let mut root = Builder::default();
    for file in files {
        let segments: Vec<&str> = file
            .relative_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            continue;
        }
        root.insert(&segments, file.composite_score);
    }
    root.into_node(".".to_string(), String::new())
}

#[derive(Default)]
struct Builder {
    dirs: BTreeMap<String, Builder>,
    files: Vec<(String, f64)>,
    sum: f64,
    count: usize,
}

impl Builder {
    fn insert(&mut self, segments: &[&str], composite: f64) {
        self.sum += composite;
        self.count += 1;
        match segments {
            [] => {}
            [file] => self.files.push(((*file).to_string(), composite)),
            [dir, rest @ ..] => self
                .dirs
                .entry((*dir).to_string())
                .or_default()
                .insert(rest, composite),
        }
    }

    fn into_node(self, name: String, path: String) -> HeatmapNode {
        let mut children: Vec<HeatmapNode> = self
            .dirs
            .into_iter()
            .map(|(child, builder)| {
                let child_path = join(&path, &child);
                builder.into_node(child, child_path)
            })
            .chain(self.files.into_iter().map(|(file, composite)| HeatmapNode {
                path: join(&path, &file),
                name: file,
                score: composite,
                file_count: 1,
                children: Vec::new(),
            }))
            .collect();
        children.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        HeatmapNode {
            name,
            path,
            score: if self.count == 0 {
                0.0
            } else {
                self.sum / self.count as f64
            },
            file_count: self.count,
            children,
        }
    }
}

fn join(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sediment_core::{ComponentScore, ScoreComponents, SupervisionStatus};
    use std::path::PathBuf;

    fn make_score(rel: &str, composite: f64) -> FileScore {
        FileScore {
            path: PathBuf::from(format!("/ws/{rel}")),
            relative_path: rel.to_string(),
            composite_score: composite,
            components: ScoreComponents::uniform(ComponentScore::new(0.0, 0.125, vec![])),
            loc: 10,
            language: "Rust".to_string(),
            last_modified: 1_700_000_000,
            supervision_status: SupervisionStatus::None,
        }
    }

    #[test]
    fn files_group_under_their_directories() {
        let files = vec![
            make_score("src/a.rs", 80.0),
            make_score("src/b.rs", 40.0),
            make_score("lib/c.rs", 20.0),
        ];

        let root = build_heatmap(&files);
        assert_eq!(root.file_count, 3);
        assert!((root.score - 140.0 / 3.0).abs() < 1e-9);

        assert_eq!(root.children.len(), 2);
        let src = &root.children[0];
        assert_eq!(src.name, "src");
        assert_eq!(src.path, "src");
        assert_eq!(src.file_count, 2);
        assert!((src.score - 60.0).abs() < 1e-9);
        assert_eq!(root.children[1].name, "lib");
    }

    #[test]
    fn children_sort_hottest_first() {
        let files = vec![
            make_score("src/cool.rs", 10.0),
            make_score("src/warm.rs", 50.0),
            make_score("src/hot.rs", 90.0),
        ];

        let root = build_heatmap(&files);
        let names: Vec<&str> = root.children[0]
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["hot.rs", "warm.rs", "cool.rs"]);
    }

    #[test]
    fn deep_paths_nest_one_level_per_segment() {
        let root = build_heatmap(&[make_score("src/io/net/tcp.rs", 42.0)]);

        let io = &root.children[0].children[0];
        assert_eq!(io.path, "src/io");
        assert_eq!(io.file_count, 1);
        let tcp = &io.children[0].children[0];
        assert_eq!(tcp.path, "src/io/net/tcp.rs");
        assert!(tcp.children.is_empty());
        assert!((tcp.score - 42.0).abs() < 1e-9);
    }

    #[test]
    fn root_level_files_sit_beside_directories() {
        let files = vec![make_score("build.rs", 50.0), make_score("src/a.rs", 70.0)];

        let root = build_heatmap(&files);
        assert_eq!(root.children[0].name, "src");
        assert_eq!(root.children[1].name, "build.rs");
        assert_eq!(root.children[1].path, "build.rs");
    }

    #[test]
    fn empty_input_yields_an_empty_root() {
        let root = build_heatmap(&[]);
        assert_eq!(root.file_count, 0);
        assert_eq!(root.score, 0.0);
        assert!(root.children.is_empty());
    }
}
