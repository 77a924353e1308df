use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::{Bfs, EdgeRef};
use sediment_core::CouplingPair;
use serde::{Deserialize, Serialize};

/// Clusters reported per workspace.
const MAX_CLUSTERS: usize = 5;

/// Files that change together without any import connecting them.
///
/// A cluster is a connected component of the hidden-coupling graph; its
/// members share maintenance fate for no visible structural reason.
///
/// # Examples
///
/// ```
/// use sediment_core::CouplingPair;
/// use sediment_engine::clusters::detect_clusters;
///
/// let pair = CouplingPair {
///     file_a: "src/auth.rs".into(),
///     file_b: "src/session.rs".into(),
///     coupling_ratio: 0.8,
///     co_change_count: 4,
///     has_import_link: false,
/// };
/// let clusters = detect_clusters(&[pair]);
/// assert_eq!(clusters.len(), 1);
/// assert_eq!(clusters[0].files.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouplingCluster {
    /// Member files, breadth-first from the first file seen.
    pub files: Vec<String>,
    /// Mean coupling ratio over the cluster's internal pairs.
    pub avg_ratio: f64,
}

/// Find hidden-coupling clusters among `pairs`.
///
/// Only pairs without an import link enter the graph. Connected
/// components of size >= 2 come back as clusters, largest first (ties in
/// discovery order), capped at five.
pub fn detect_clusters(pairs: &[CouplingPair]) -> Vec<CouplingCluster> {
    let mut graph: UnGraph<String, f64> = UnGraph::new_undirected();
    let mut index: HashMap<String, NodeIndex> = HashMap::new();

    for pair in pairs.iter().filter(|p| !p.has_import_link) {
        let a = *index
            .entry(pair.file_a.clone())
            .or_insert_with(|| graph.add_node(pair.file_a.clone()));
        let b = *index
            .entry(pair.file_b.clone())
            .or_insert_with(|| graph.add_node(pair.file_b.clone()));
        graph.add_edge(a, b, pair.coupling_ratio);
    }

    let edges: Vec<(NodeIndex, NodeIndex, f64)> = graph
        .edge_references()
        .map(|e| (e.source(), e.target(), *e.weight()))
        .collect();

    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut clusters = Vec::new();
    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut members = Vec::new();
        let mut bfs = Bfs::new(&graph, start);
        while let Some(node) = bfs.next(&graph) {
            visited.insert(node);
            members.push(node);
        }
        if members.len() < 2 {
            continue;
        }

        let member_set: HashSet<NodeIndex> = members.iter().copied().collect();
        let mut ratio_sum = 0.0;
        let mut edge_count = 0usize;
        for (source, target, ratio) in &edges {
            if member_set.contains(source) && member_set.contains(target) {
                ratio_sum += ratio;
                edge_count += 1;
            }
        }

        clusters.push(CouplingCluster {
            files: members.iter().map(|&n| graph[n].clone()).collect(),
            avg_ratio: ratio_sum / edge_count as f64,
        });
    }

    // Stable sort keeps discovery order among equal sizes.
    clusters.sort_by(|a, b| b.files.len().cmp(&a.files.len()));
    clusters.truncate(MAX_CLUSTERS);
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pair(a: &str, b: &str, ratio: f64, import: bool) -> CouplingPair {
        CouplingPair {
            file_a: a.to_string(),
            file_b: b.to_string(),
            coupling_ratio: ratio,
            co_change_count: 4,
            has_import_link: import,
        }
    }

    #[test]
    fn hidden_pairs_chain_into_one_cluster() {
        let pairs = vec![
            make_pair("a.rs", "b.rs", 0.8, false),
            make_pair("b.rs", "c.rs", 0.6, false),
            make_pair("c.rs", "d.rs", 0.9, true),
        ];

        let clusters = detect_clusters(&pairs);
        assert_eq!(clusters.len(), 1);
        let cluster = &clusters[0];
        assert_eq!(cluster.files.len(), 3);
        for file in ["a.rs", "b.rs", "c.rs"] {
            assert!(cluster.files.iter().any(|f| f == file), "missing {file}");
        }
        assert!(!cluster.files.iter().any(|f| f == "d.rs"));
        assert!((cluster.avg_ratio - 0.7).abs() < 1e-9);
    }

    #[test]
    fn import_linked_pairs_never_cluster() {
        let pairs = vec![
            make_pair("a.rs", "b.rs", 0.8, true),
            make_pair("b.rs", "c.rs", 0.9, true),
        ];
        assert!(detect_clusters(&pairs).is_empty());
    }

    #[test]
    fn disjoint_pairs_stay_separate() {
        let pairs = vec![
            make_pair("a.rs", "b.rs", 0.5, false),
            make_pair("c.rs", "d.rs", 0.9, false),
        ];

        let clusters = detect_clusters(&pairs);
        assert_eq!(clusters.len(), 2);
        // Equal sizes keep discovery order.
        assert!(clusters[0].files.iter().any(|f| f == "a.rs"));
        assert!(clusters[1].files.iter().any(|f| f == "c.rs"));
        assert!((clusters[0].avg_ratio - 0.5).abs() < 1e-9);
        assert!((clusters[1].avg_ratio - 0.9).abs() < 1e-9);
    }

    #[test]
    fn largest_cluster_leads_and_the_list_caps_at_five() {
        let mut pairs = vec![
            make_pair("hub1.rs", "hub2.rs", 0.9, false),
            make_pair("hub2.rs", "hub3.rs", 0.9, false),
        ];
        for i in 0..6 {
            pairs.push(make_pair(&format!("x{i}.rs"), &format!("y{i}.rs"), 0.5, false));
        }

        let clusters = detect_clusters(&pairs);
        assert_eq!(clusters.len(), 5);
        assert_eq!(clusters[0].files.len(), 3);
        assert!(clusters[0].files.iter().any(|f| f == "hub1.rs"));
        assert!(clusters[1..].iter().all(|c| c.files.len() == 2));
        // The sixth two-file pair fell off the end.
        assert!(clusters[1].files.iter().any(|f| f == "x0.rs"));
    }

    #[test]
    fn no_pairs_means_no_clusters() {
        assert!(detect_clusters(&[]).is_empty());
    }
}
