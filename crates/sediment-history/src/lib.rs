//! Git history analysis: churn, change coupling, and line ownership.
//!
//! Mines git history using git2 into an immutable [`snapshot::HistorySnapshot`]
//! of per-file churn and pairwise co-change counts, detects change-coupled
//! file pairs, and attributes line ownership per author via blame.

pub mod blame;
pub mod coupling;
pub mod mining;
pub mod snapshot;
