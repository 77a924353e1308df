//! SQLite persistence for analysis results and debt snapshots.
//!
//! Stores per-file scores (columns for querying, JSON for the full
//! component breakdown) and the append-only snapshot series that trend
//! forecasting reads. Lives at `.sediment/state.db` inside the analyzed
//! workspace.

pub mod db;

pub use db::{default_db_path, StateStore};
