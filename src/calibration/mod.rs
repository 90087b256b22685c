//! Calibration Module
//!
//! Maps predicted probabilities onto observed event rates, so they can be used
//! as expected labels when estimating performance without targets.
//!
//! # Submodules
//!
//! * `isotonic`: Isotonic regression fitted with pool adjacent violators.

pub mod isotonic;

pub use isotonic::IsotonicCalibrator;
