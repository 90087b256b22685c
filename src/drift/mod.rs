//! Drift Detection
//!
//! This module splits reference and analysis data into chunks, pairs them by
//! position and runs a univariate hypothesis test per feature and chunk pair.
//!
//! # Submodules
//!
//! * `calculation`: Chunk pairing, the `DriftMethod` hook and the `DriftCalculator`.
//! * `result`: Per-chunk records and the `DriftResult` table.
//! * `stats`: Chi-squared and Kolmogorov-Smirnov two-sample tests.

pub mod calculation;
pub mod result;
pub mod stats;

pub use calculation::{
    calculate_statistical_drift, pair_chunks, ChunkPair, DriftCalculator, DriftMethod, StatisticalDrift,
    StatisticalDriftCalculator,
};
pub use result::{DriftAlert, DriftRecord, DriftResult, FeatureDrift};
