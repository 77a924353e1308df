//! Static source analysis for debt scoring.
//!
//! Walks a workspace with the `ignore` crate, parses source files with
//! tree-sitter for cyclomatic complexity, scans text for maintenance
//! smells, builds a stem-matched import graph, and applies the coverage
//! and decision-staleness heuristics. Everything here works on a file's
//! text and the filesystem around it; git history lives elsewhere.

pub mod complexity;
pub mod coverage;
pub mod imports;
pub mod smells;
pub mod staleness;
pub mod walker;
