//! Debt scoring pipeline: parallel analysis, re-scoring, derived views.
//!
//! Owns the full-workspace run (history mining, source walking, and the
//! worker pool that scores each file), selective re-scoring against the
//! cached result, and the views derived from a finished analysis:
//! coupling clusters, trend forecasts, remediation targets, and the
//! directory heat map.

pub mod clusters;
pub mod forecast;
pub mod heatmap;
mod pipeline;
mod rescore;
pub mod roi;
pub mod scorer;

pub use pipeline::DebtEngine;
