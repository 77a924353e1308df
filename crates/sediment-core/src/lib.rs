//! Core types, configuration, and error handling for Sediment.
//!
//! This crate provides the shared foundation used by all other Sediment
//! crates:
//! - [`SedimentError`] — unified error type using `thiserror`
//! - [`SedimentConfig`] — configuration loaded from `.sediment.toml`
//! - [`Weights`] — the eight component weights with their sum-to-one invariant
//! - Shared types: [`FileScore`], [`AnalysisResult`], [`CouplingPair`],
//!   [`DebtSnapshot`], [`OutputFormat`]

mod config;
mod error;
mod types;
mod weights;

pub use config::{AnalysisConfig, SedimentConfig, ThresholdConfig};
pub use error::SedimentError;
pub use types::{
    AnalysisProgress, AnalysisResult, ComponentEntry, ComponentScore, CouplingPair, DebtSnapshot,
    FileBreakdown, FileScore, OutputFormat, ScoreComponents, SupervisionStatus,
};
pub use weights::{WeightKey, Weights, WEIGHT_SUM_TOLERANCE};

/// A convenience `Result` type for Sediment operations.
pub type Result<T> = std::result::Result<T, SedimentError>;
