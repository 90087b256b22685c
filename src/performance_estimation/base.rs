//! Shared fit/estimate control flow for performance estimators.
//!
//! `PerformanceEstimator` owns validation, preprocessing, feature selection and
//! chunking. Concrete algorithms only implement `PerformanceEstimation`.
use crate::chunk::{Chunk, Chunker};
use crate::config::ChunkingConfig;
use crate::constants::NML_METADATA_COLUMNS;
use crate::data::Table;
use crate::errors::MonitorError;
use crate::metadata::{MetadataPreprocessor, ModelMetadata, Preprocessor};

/// Estimated performance, one row per chunk, with the metadata that produced it.
///
/// Both are copied on construction, so the caller's data cannot change it.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceEstimatorResult {
    data: Table,
    metadata: ModelMetadata,
}

impl PerformanceEstimatorResult {
    pub fn new(estimated_data: &Table, model_metadata: &ModelMetadata) -> Self {
        PerformanceEstimatorResult {
            data: estimated_data.clone(),
            metadata: model_metadata.clone(),
        }
    }

    pub fn data(&self) -> &Table {
        &self.data
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Everything an estimation algorithm may read from its estimator.
pub struct EstimationContext<'a> {
    pub model_metadata: &'a ModelMetadata,
    pub selected_features: &'a [String],
    pub chunker: &'a dyn Chunker,
}

impl EstimationContext<'_> {
    /// Internal metadata columns followed by the selected features.
    pub fn columns(&self) -> Vec<String> {
        NML_METADATA_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.selected_features.iter().cloned())
            .collect()
    }
}

/// A performance estimation algorithm.
pub trait PerformanceEstimation: Send + Sync {
    /// Establish the baseline from preprocessed reference data.
    fn fit(&mut self, reference_data: &Table, context: &EstimationContext) -> Result<(), MonitorError>;

    /// Estimate performance for every chunk, returning one row per chunk.
    fn estimate(&self, chunks: &[Chunk], context: &EstimationContext) -> Result<Table, MonitorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorState {
    Created,
    Fitted,
}

/// Wraps an estimation algorithm with preprocessing, chunking and fit tracking.
pub struct PerformanceEstimator<E: PerformanceEstimation> {
    model_metadata: ModelMetadata,
    selected_features: Vec<String>,
    chunker: Box<dyn Chunker>,
    preprocessor: Box<dyn Preprocessor + Send + Sync>,
    method: E,
    state: EstimatorState,
}

impl<E: PerformanceEstimation> PerformanceEstimator<E> {
    /// Create an estimator, choosing its chunker from `chunking`.
    ///
    /// Fails with `InvalidConfiguration` if more than one of size, number and
    /// period is set. Without any of them the default chunker is used.
    pub fn new(model_metadata: ModelMetadata, method: E, chunking: &ChunkingConfig) -> Result<Self, MonitorError> {
        let chunker = chunking.resolve()?;
        Ok(PerformanceEstimator::with_chunker(model_metadata, method, chunker))
    }

    /// Create an estimator using an explicit chunker.
    pub fn with_chunker(model_metadata: ModelMetadata, method: E, chunker: Box<dyn Chunker>) -> Self {
        let selected_features = model_metadata.feature_column_names();
        PerformanceEstimator {
            model_metadata,
            selected_features,
            chunker,
            preprocessor: Box::new(MetadataPreprocessor),
            method,
            state: EstimatorState::Created,
        }
    }

    /// Restrict estimation to these features. An empty list selects all features.
    pub fn set_features(mut self, features: Vec<String>) -> Self {
        self.selected_features = if features.is_empty() {
            self.model_metadata.feature_column_names()
        } else {
            features
        };
        self
    }

    /// Replace the chunker; an explicit chunker takes precedence over any configuration.
    pub fn set_chunker(mut self, chunker: Box<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn set_preprocessor(mut self, preprocessor: Box<dyn Preprocessor + Send + Sync>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    pub fn is_fitted(&self) -> bool {
        self.state == EstimatorState::Fitted
    }

    pub fn method(&self) -> &E {
        &self.method
    }

    pub fn selected_features(&self) -> &[String] {
        &self.selected_features
    }

    pub fn model_metadata(&self) -> &ModelMetadata {
        &self.model_metadata
    }

    pub fn chunker(&self) -> &dyn Chunker {
        self.chunker.as_ref()
    }

    /// Fit the estimator on a reference data set.
    ///
    /// Calling `fit` again replaces the baseline. If fitting fails the
    /// estimator is left unfitted.
    ///
    /// * `reference_data` - A data set for which performance is accepted as exemplary.
    pub fn fit(&mut self, reference_data: &Table) -> Result<(), MonitorError> {
        self.state = EstimatorState::Created;
        if reference_data.is_empty() {
            return Err(MonitorError::InvalidArguments(
                "reference data contains no rows. Provide a valid reference data set.".to_string(),
            ));
        }
        let reference_data = self.preprocessor.preprocess(reference_data, &self.model_metadata)?;

        let context = EstimationContext {
            model_metadata: &self.model_metadata,
            selected_features: &self.selected_features,
            chunker: self.chunker.as_ref(),
        };
        self.method.fit(&reference_data, &context)?;
        self.state = EstimatorState::Fitted;
        Ok(())
    }

    /// Estimate performance for a data set lacking ground truth.
    ///
    /// The data is preprocessed, restricted to the internal metadata columns and
    /// selected features, and split into chunks before estimation.
    pub fn estimate(&self, data: &Table) -> Result<PerformanceEstimatorResult, MonitorError> {
        if data.is_empty() {
            return Err(MonitorError::InvalidArguments(
                "data contains no rows. Provide a valid data set.".to_string(),
            ));
        }
        if !self.is_fitted() {
            return Err(MonitorError::NotFitted(
                "estimator has not been fitted. Please run `fit` before running `estimate`.".to_string(),
            ));
        }

        let data = self.preprocessor.preprocess(data, &self.model_metadata)?;
        let context = EstimationContext {
            model_metadata: &self.model_metadata,
            selected_features: &self.selected_features,
            chunker: self.chunker.as_ref(),
        };
        let chunks = self.chunker.split(&data, Some(&context.columns()))?;
        let estimated = self.method.estimate(&chunks, &context)?;
        Ok(PerformanceEstimatorResult::new(&estimated, &self.model_metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::SizeBasedChunker;
    use crate::data::{Column, ColumnValues};
    use crate::metadata::Feature;

    /// Counts rows per chunk and remembers the reference row count.
    #[derive(Default)]
    struct RowCounter {
        reference_rows: Option<usize>,
        fail_fit: bool,
    }

    impl PerformanceEstimation for RowCounter {
        fn fit(&mut self, reference_data: &Table, _context: &EstimationContext) -> Result<(), MonitorError> {
            if self.fail_fit {
                return Err(MonitorError::InvalidArguments("no baseline".to_string()));
            }
            self.reference_rows = Some(reference_data.n_rows());
            Ok(())
        }

        fn estimate(&self, chunks: &[Chunk], context: &EstimationContext) -> Result<Table, MonitorError> {
            let columns = chunks
                .first()
                .map(|c| c.data.column_names().join(","))
                .unwrap_or_default();
            Table::new(vec![
                Column::categorical("key", chunks.iter().map(|c| c.key.clone()).collect()),
                Column::new(
                    "rows",
                    ColumnValues::Integer(chunks.iter().map(|c| Some(c.len() as i64)).collect()),
                ),
                Column::categorical("columns", vec![columns; chunks.len()]),
                Column::new(
                    "features",
                    ColumnValues::Integer(vec![Some(context.selected_features.len() as i64); chunks.len()]),
                ),
            ])
        }
    }

    fn metadata() -> ModelMetadata {
        ModelMetadata::new(vec![Feature::continuous("a"), Feature::categorical("b")])
            .set_predicted_probability_column_name("proba")
    }

    fn data(n: usize) -> Table {
        Table::new(vec![
            Column::continuous("a", (0..n).map(|i| i as f64).collect()),
            Column::categorical("b", vec!["x"; n]),
            Column::continuous("proba", vec![0.5; n]),
            Column::continuous("unused", vec![1.0; n]),
        ])
        .unwrap()
    }

    #[test]
    fn test_estimate_before_fit() {
        let estimator = PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::by_size(5)).unwrap();
        assert_eq!(estimator.state(), EstimatorState::Created);
        assert!(matches!(estimator.estimate(&data(10)), Err(MonitorError::NotFitted(_))));
    }

    #[test]
    fn test_fit_on_empty_reference() {
        let mut estimator =
            PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::default()).unwrap();
        assert!(matches!(
            estimator.fit(&Table::default()),
            Err(MonitorError::InvalidArguments(_))
        ));
        assert!(!estimator.is_fitted());
    }

    #[test]
    fn test_estimate_on_empty_data() {
        let mut estimator =
            PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::by_size(5)).unwrap();
        estimator.fit(&data(10)).unwrap();
        assert!(matches!(
            estimator.estimate(&Table::default()),
            Err(MonitorError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_fit_then_estimate_many_times() {
        let mut estimator =
            PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::by_size(4)).unwrap();
        estimator.fit(&data(8)).unwrap();
        assert_eq!(estimator.method().reference_rows, Some(8));

        let first = estimator.estimate(&data(10)).unwrap();
        let second = estimator.estimate(&data(10)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.data().n_rows(), 3);
        assert_eq!(
            first.data().column("rows").unwrap().values,
            ColumnValues::Integer(vec![Some(4), Some(4), Some(2)])
        );

        // refitting replaces the baseline
        estimator.fit(&data(12)).unwrap();
        assert_eq!(estimator.method().reference_rows, Some(12));
        assert!(estimator.is_fitted());
    }

    #[test]
    fn test_chunks_hold_metadata_and_selected_features_only() {
        let mut estimator = PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::by_size(5))
            .unwrap()
            .set_features(vec!["a".to_string()]);
        estimator.fit(&data(10)).unwrap();
        let result = estimator.estimate(&data(10)).unwrap();
        assert_eq!(
            result.data().column("columns").unwrap().values,
            ColumnValues::Categorical(vec![Some("a,nml_meta_predicted_proba".to_string()); 2])
        );
    }

    #[test]
    fn test_features_default_to_all_declared() {
        let estimator =
            PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::default()).unwrap();
        assert_eq!(estimator.selected_features(), &["a".to_string(), "b".to_string()]);
        let estimator = estimator.set_features(Vec::new());
        assert_eq!(estimator.selected_features().len(), 2);
    }

    #[test]
    fn test_chunker_resolution() {
        let conflicting = ChunkingConfig {
            chunk_size: Some(100),
            chunk_number: Some(10),
            ..Default::default()
        };
        assert!(matches!(
            PerformanceEstimator::new(metadata(), RowCounter::default(), &conflicting),
            Err(MonitorError::InvalidConfiguration(_))
        ));

        // explicit chunker wins over configuration
        let mut estimator = PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::by_number(2))
            .unwrap()
            .set_chunker(Box::new(SizeBasedChunker::new(3).unwrap()));
        estimator.fit(&data(9)).unwrap();
        assert_eq!(estimator.estimate(&data(9)).unwrap().data().n_rows(), 3);

        // default chunker splits into ten chunks
        let mut estimator =
            PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::default()).unwrap();
        estimator.fit(&data(20)).unwrap();
        assert_eq!(estimator.estimate(&data(20)).unwrap().data().n_rows(), 10);
    }

    #[test]
    fn test_failed_refit_leaves_estimator_unfitted() {
        let mut estimator =
            PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::by_size(5)).unwrap();
        estimator.fit(&data(10)).unwrap();
        estimator.method.fail_fit = true;
        assert!(estimator.fit(&data(10)).is_err());
        assert!(matches!(estimator.estimate(&data(10)), Err(MonitorError::NotFitted(_))));
    }

    #[test]
    fn test_refit_on_empty_reference_drops_baseline() {
        let mut estimator =
            PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::by_size(5)).unwrap();
        estimator.fit(&data(10)).unwrap();
        assert!(matches!(
            estimator.fit(&Table::default()),
            Err(MonitorError::InvalidArguments(_))
        ));
        assert!(!estimator.is_fitted());
        assert!(matches!(estimator.estimate(&data(10)), Err(MonitorError::NotFitted(_))));
    }

    #[test]
    fn test_refit_with_invalid_metadata_drops_baseline() {
        let mut estimator =
            PerformanceEstimator::new(metadata(), RowCounter::default(), &ChunkingConfig::by_size(5)).unwrap();
        estimator.fit(&data(10)).unwrap();
        // preprocessing rejects the internal column prefix in feature names
        estimator.model_metadata = ModelMetadata::new(vec![Feature::continuous("nml_meta_a")]);
        assert!(estimator.fit(&data(10)).is_err());
        assert_eq!(estimator.state(), EstimatorState::Created);
    }

    #[test]
    fn test_result_is_a_copy() {
        let mut table = data(3);
        let result = PerformanceEstimatorResult::new(&table, &metadata());
        table.push_column(Column::continuous("extra", vec![0.0; 3])).unwrap();
        assert_eq!(result.data().n_cols(), 4);
        assert_eq!(result.metadata(), &metadata());
    }
}
