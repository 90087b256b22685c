use crate::chunk::{Chunk, Chunker};
use crate::config::ChunkingConfig;
use crate::constants::{DEFAULT_CHUNK_PRESET, NML_METADATA_COLUMNS, P_VALUE_PRECISION};
use crate::data::Table;
use crate::drift::result::{DriftRecord, DriftResult, FeatureDrift};
use crate::drift::stats::{chi2_test, ks_2samp, TestResult};
use crate::errors::MonitorError;
use crate::metadata::{Feature, FeatureType, MetadataPreprocessor, ModelMetadata, Preprocessor};
use crate::utils::{precision_round, sorted_finite};
use log::debug;
use rayon::prelude::*;

/// A reference chunk and the analysis chunk at the same position.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPair<'a> {
    pub reference: &'a Chunk,
    pub analysis: &'a Chunk,
}

/// Pair chunks by position.
///
/// Only positions present in both sequences are paired; the unmatched tail of
/// the longer sequence is dropped.
pub fn pair_chunks<'a>(reference: &'a [Chunk], analysis: &'a [Chunk]) -> Vec<ChunkPair<'a>> {
    if reference.len() != analysis.len() {
        debug!(
            "Reference has {} chunks and analysis has {}, dropping the {} unmatched chunks.",
            reference.len(),
            analysis.len(),
            reference.len().abs_diff(analysis.len())
        );
    }
    reference
        .iter()
        .zip(analysis.iter())
        .map(|(reference, analysis)| ChunkPair { reference, analysis })
        .collect()
}

/// A drift detection method, applied to one chunk pair at a time.
pub trait DriftMethod: Send + Sync {
    /// Test every feature that is present in both chunks.
    ///
    /// * `pair` - The reference and analysis chunk to compare.
    /// * `features` - The selected features, categorical ones first.
    /// * `parallel` - Whether features may be tested in parallel.
    fn calculate_drift(
        &self,
        pair: &ChunkPair,
        features: &[&Feature],
        parallel: bool,
    ) -> Result<Vec<FeatureDrift>, MonitorError>;
}

/// Chi-squared tests for categorical features, Kolmogorov-Smirnov tests for continuous ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticalDrift;

impl StatisticalDrift {
    fn test_feature(&self, pair: &ChunkPair, feature: &Feature) -> Result<Option<FeatureDrift>, MonitorError> {
        let name = feature.column_name.as_str();
        let (reference, analysis) = match (pair.reference.data.column(name), pair.analysis.data.column(name)) {
            (Some(r), Some(a)) => (&r.values, &a.values),
            _ => return Ok(None),
        };

        let result: Option<TestResult> = match feature.feature_type {
            FeatureType::Categorical => {
                let kind_error = |kind: &str| {
                    MonitorError::InvalidArguments(format!(
                        "categorical feature {} holds {} values",
                        name, kind
                    ))
                };
                let r = reference.as_labels().ok_or_else(|| kind_error(reference.kind()))?;
                let a = analysis.as_labels().ok_or_else(|| kind_error(analysis.kind()))?;
                chi2_test(&r, &a)
            }
            FeatureType::Continuous => {
                let kind_error = |kind: &str| {
                    MonitorError::InvalidArguments(format!(
                        "continuous feature {} holds {} values",
                        name, kind
                    ))
                };
                let r = reference.as_f64().ok_or_else(|| kind_error(reference.kind()))?;
                let a = analysis.as_f64().ok_or_else(|| kind_error(analysis.kind()))?;
                ks_2samp(&sorted_finite(&r), &sorted_finite(&a))
            }
            FeatureType::Unknown => None,
        };

        if result.is_none() {
            debug!(
                "Skipping feature {} for chunk {}, no values to compare.",
                name, pair.analysis.key
            );
        }
        Ok(result.map(|r| FeatureDrift {
            feature: name.to_string(),
            statistic: r.statistic,
            p_value: precision_round(r.p_value, P_VALUE_PRECISION),
        }))
    }
}

impl DriftMethod for StatisticalDrift {
    fn calculate_drift(
        &self,
        pair: &ChunkPair,
        features: &[&Feature],
        parallel: bool,
    ) -> Result<Vec<FeatureDrift>, MonitorError> {
        let tested: Vec<Option<FeatureDrift>> = if parallel {
            features
                .par_iter()
                .map(|f| self.test_feature(pair, f))
                .collect::<Result<_, _>>()?
        } else {
            features
                .iter()
                .map(|f| self.test_feature(pair, f))
                .collect::<Result<_, _>>()?
        };
        Ok(tested.into_iter().flatten().collect())
    }
}

/// Pairs reference and analysis chunks and runs a drift method on every pair.
pub struct DriftCalculator<M: DriftMethod> {
    method: M,
    features: Option<Vec<String>>,
    preprocessor: Box<dyn Preprocessor + Send + Sync>,
    parallel: bool,
}

/// Drift calculator using hypothesis tests.
pub type StatisticalDriftCalculator = DriftCalculator<StatisticalDrift>;

impl<M: DriftMethod + Default> Default for DriftCalculator<M> {
    fn default() -> Self {
        DriftCalculator::new(M::default())
    }
}

impl<M: DriftMethod> DriftCalculator<M> {
    pub fn new(method: M) -> Self {
        DriftCalculator {
            method,
            features: None,
            preprocessor: Box::new(MetadataPreprocessor),
            parallel: false,
        }
    }

    /// Restrict testing to these feature columns. Defaults to all declared features.
    pub fn set_features(mut self, features: Vec<String>) -> Self {
        self.features = Some(features);
        self
    }

    pub fn set_preprocessor(mut self, preprocessor: Box<dyn Preprocessor + Send + Sync>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Test the features of a chunk pair on the rayon thread pool.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Selected features, categorical first, each group in declaration order.
    fn selected_features<'a>(&self, metadata: &'a ModelMetadata) -> Result<Vec<&'a Feature>, MonitorError> {
        if let Some(names) = &self.features {
            if let Some(unknown) = names.iter().find(|n| metadata.feature(n).is_none()) {
                return Err(MonitorError::InvalidArguments(format!(
                    "feature {} is not declared in the model metadata",
                    unknown
                )));
            }
        }
        let is_selected = |f: &&Feature| {
            self.features
                .as_ref()
                .map_or(true, |names| names.iter().any(|n| *n == f.column_name))
        };
        let mut selected: Vec<&Feature> = metadata.categorical_features().into_iter().filter(is_selected).collect();
        selected.extend(metadata.continuous_features().into_iter().filter(is_selected));
        Ok(selected)
    }

    /// Calculate drift, chunking both data sets according to `chunk_by`.
    pub fn calculate(
        &self,
        reference_data: &Table,
        analysis_data: &Table,
        model_metadata: &ModelMetadata,
        chunk_by: &ChunkingConfig,
    ) -> Result<DriftResult, MonitorError> {
        let chunker = chunk_by.resolve()?;
        self.calculate_with_chunker(reference_data, analysis_data, model_metadata, chunker.as_ref())
    }

    /// Calculate drift, chunking both data sets with `chunker`.
    pub fn calculate_with_chunker(
        &self,
        reference_data: &Table,
        analysis_data: &Table,
        model_metadata: &ModelMetadata,
        chunker: &dyn Chunker,
    ) -> Result<DriftResult, MonitorError> {
        if reference_data.is_empty() {
            return Err(MonitorError::InvalidArguments(
                "reference data contains no rows. Provide a valid reference data set.".to_string(),
            ));
        }
        if analysis_data.is_empty() {
            return Err(MonitorError::InvalidArguments(
                "analysis data contains no rows. Provide a valid analysis data set.".to_string(),
            ));
        }

        let features = self.selected_features(model_metadata)?;
        let columns: Vec<String> = NML_METADATA_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(features.iter().map(|f| f.column_name.clone()))
            .collect();

        let reference = self.preprocessor.preprocess(reference_data, model_metadata)?;
        let analysis = self.preprocessor.preprocess(analysis_data, model_metadata)?;
        let reference_chunks = chunker.split(&reference, Some(&columns))?;
        let analysis_chunks = chunker.split(&analysis, Some(&columns))?;

        let records = pair_chunks(&reference_chunks, &analysis_chunks)
            .iter()
            .map(|pair| {
                Ok(DriftRecord {
                    chunk: pair.analysis.key.clone(),
                    start_index: pair.analysis.start_index,
                    end_index: pair.analysis.end_index,
                    start_date: pair.analysis.start_date,
                    end_date: pair.analysis.end_date,
                    features: self.method.calculate_drift(pair, &features, self.parallel)?,
                })
            })
            .collect::<Result<Vec<_>, MonitorError>>()?;
        Ok(DriftResult::new(records))
    }
}

/// Calculate drift using statistical testing.
///
/// `chunk_by` is a chunking preset such as `size_1000`, `count_10` or `period_W`.
pub fn calculate_statistical_drift(
    reference_data: &Table,
    analysis_data: &Table,
    model_metadata: &ModelMetadata,
    chunk_by: &str,
) -> Result<DriftResult, MonitorError> {
    if chunk_by.trim().is_empty() {
        return Err(MonitorError::NotFitted(format!(
            "no chunking configuration could be resolved, provide a preset such as {}",
            DEFAULT_CHUNK_PRESET
        )));
    }
    let config: ChunkingConfig = chunk_by.parse()?;
    StatisticalDriftCalculator::default().calculate(reference_data, analysis_data, model_metadata, &config)
}
