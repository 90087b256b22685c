// Modules
pub mod calibration;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod data;
pub mod drift;
pub mod errors;
pub mod metadata;
pub mod metric;
pub mod performance_estimation;
pub mod utils;

// Individual classes, and functions
pub use chunk::{Chunk, Chunker, CountBasedChunker, DefaultChunker, PeriodBasedChunker, SizeBasedChunker};
pub use config::{ChunkingConfig, JsonIO};
pub use data::{Column, ColumnValues, Table};
pub use drift::{calculate_statistical_drift, DriftResult, StatisticalDriftCalculator};
pub use errors::MonitorError;
pub use metadata::{Feature, FeatureType, ModelMetadata};
pub use performance_estimation::{Cbpe, PerformanceEstimator, PerformanceEstimatorResult};
