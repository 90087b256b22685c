//! Errors
//!
//! Custom error types used throughout the `driftwatch` crate.
use thiserror::Error;

/// Errors that can occur while chunking, testing for drift or estimating performance.
#[derive(Debug, Error, PartialEq)]
pub enum MonitorError {
    /// Empty or structurally invalid input data.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    /// Estimation attempted before fitting, or no chunking strategy available.
    #[error("Not fitted: {0}")]
    NotFitted(String),
    /// Conflicting or degenerate chunking parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A required column is not present in the data.
    #[error("Column {0} is not present in the data.")]
    MissingColumn(String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Unable to write to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read from file.
    #[error("Unable to read from a file {0}")]
    UnableToRead(String),
}
