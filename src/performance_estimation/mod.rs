//! Performance Estimation
//!
//! Estimate model performance on data without ground truth, against a
//! baseline fitted on reference data.
//!
//! # Submodules
//!
//! * `base`: The `PerformanceEstimator` lifecycle and the `PerformanceEstimation` hook.
//! * `cbpe`: Confidence-based estimation of ROC AUC.

pub mod base;
pub mod cbpe;

pub use base::{
    EstimationContext, EstimatorState, PerformanceEstimation, PerformanceEstimator, PerformanceEstimatorResult,
};
pub use cbpe::{Cbpe, CbpeBaseline, CBPE_COLUMNS};
