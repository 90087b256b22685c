//! Model Metadata
//!
//! Describes which columns of the monitored data are features and which carry
//! the model's identifier, timestamp, partition, prediction and target, and
//! maps them onto the fixed internal column layout.
use crate::config::JsonIO;
use crate::constants::{
    NML_METADATA_IDENTIFIER_COLUMN_NAME, NML_METADATA_PARTITION_COLUMN_NAME,
    NML_METADATA_PREDICTED_PROBABILITY_COLUMN_NAME, NML_METADATA_PREDICTION_COLUMN_NAME,
    NML_METADATA_TARGET_COLUMN_NAME, NML_METADATA_TIMESTAMP_COLUMN_NAME,
};
use crate::data::Table;
use crate::errors::MonitorError;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

/// Declared kind of a feature.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum FeatureType {
    Categorical,
    Continuous,
    /// Not yet classified; excluded from drift testing.
    Unknown,
}

/// A single model input.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Feature {
    pub column_name: String,
    pub label: String,
    pub feature_type: FeatureType,
}

impl Feature {
    pub fn new(column_name: impl Into<String>, feature_type: FeatureType) -> Self {
        let column_name = column_name.into();
        Feature {
            label: column_name.clone(),
            column_name,
            feature_type,
        }
    }

    pub fn categorical(column_name: impl Into<String>) -> Self {
        Feature::new(column_name, FeatureType::Categorical)
    }

    pub fn continuous(column_name: impl Into<String>) -> Self {
        Feature::new(column_name, FeatureType::Continuous)
    }
}

/// Description of the monitored model's data.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct ModelMetadata {
    pub model_name: Option<String>,
    pub features: Vec<Feature>,
    #[serde(default)]
    pub identifier_column_name: Option<String>,
    #[serde(default)]
    pub timestamp_column_name: Option<String>,
    #[serde(default)]
    pub partition_column_name: Option<String>,
    #[serde(default)]
    pub prediction_column_name: Option<String>,
    #[serde(default)]
    pub predicted_probability_column_name: Option<String>,
    #[serde(default)]
    pub target_column_name: Option<String>,
}

impl ModelMetadata {
    pub fn new(features: Vec<Feature>) -> Self {
        ModelMetadata {
            features,
            ..Default::default()
        }
    }

    pub fn set_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn set_identifier_column_name(mut self, name: impl Into<String>) -> Self {
        self.identifier_column_name = Some(name.into());
        self
    }

    pub fn set_timestamp_column_name(mut self, name: impl Into<String>) -> Self {
        self.timestamp_column_name = Some(name.into());
        self
    }

    pub fn set_partition_column_name(mut self, name: impl Into<String>) -> Self {
        self.partition_column_name = Some(name.into());
        self
    }

    pub fn set_prediction_column_name(mut self, name: impl Into<String>) -> Self {
        self.prediction_column_name = Some(name.into());
        self
    }

    pub fn set_predicted_probability_column_name(mut self, name: impl Into<String>) -> Self {
        self.predicted_probability_column_name = Some(name.into());
        self
    }

    pub fn set_target_column_name(mut self, name: impl Into<String>) -> Self {
        self.target_column_name = Some(name.into());
        self
    }

    pub fn categorical_features(&self) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| f.feature_type == FeatureType::Categorical)
            .collect()
    }

    pub fn continuous_features(&self) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| f.feature_type == FeatureType::Continuous)
            .collect()
    }

    pub fn feature(&self, column_name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.column_name == column_name)
    }

    /// Column names of all declared features, in declaration order.
    pub fn feature_column_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.column_name.clone()).collect()
    }

    /// Pairs of (model column, internal column) for every mapped metadata column.
    pub fn metadata_column_mapping(&self) -> Vec<(&str, &'static str)> {
        [
            (&self.identifier_column_name, NML_METADATA_IDENTIFIER_COLUMN_NAME),
            (&self.timestamp_column_name, NML_METADATA_TIMESTAMP_COLUMN_NAME),
            (&self.partition_column_name, NML_METADATA_PARTITION_COLUMN_NAME),
            (&self.prediction_column_name, NML_METADATA_PREDICTION_COLUMN_NAME),
            (
                &self.predicted_probability_column_name,
                NML_METADATA_PREDICTED_PROBABILITY_COLUMN_NAME,
            ),
            (&self.target_column_name, NML_METADATA_TARGET_COLUMN_NAME),
        ]
        .into_iter()
        .filter_map(|(name, internal)| name.as_deref().map(|n| (n, internal)))
        .collect()
    }

    /// Check that feature column names are unique and do not shadow internal columns.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let mut seen = HashSet::new();
        for f in &self.features {
            if !seen.insert(f.column_name.as_str()) {
                return Err(MonitorError::InvalidArguments(format!(
                    "feature {} is declared more than once",
                    f.column_name
                )));
            }
            if f.column_name.starts_with("nml_meta_") {
                return Err(MonitorError::InvalidArguments(format!(
                    "feature {} uses the reserved nml_meta_ prefix",
                    f.column_name
                )));
            }
        }
        Ok(())
    }
}

impl JsonIO for ModelMetadata {}

/// Normalizes raw input into the fixed internal column layout.
pub trait Preprocessor {
    fn preprocess(&self, data: &Table, metadata: &ModelMetadata) -> Result<Table, MonitorError>;
}

/// Copies every mapped metadata column onto its fixed `nml_meta_*` name.
///
/// Mapped columns missing from the data are skipped, since analysis data
/// typically lacks a target.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataPreprocessor;

impl Preprocessor for MetadataPreprocessor {
    fn preprocess(&self, data: &Table, metadata: &ModelMetadata) -> Result<Table, MonitorError> {
        metadata.validate()?;
        let mut out = data.clone();
        for (column, internal) in metadata.metadata_column_mapping() {
            if data.contains(column) {
                out.copy_column(column, internal)?;
            }
        }
        Ok(out)
    }
}

/// Preprocess with the default `MetadataPreprocessor`.
pub fn preprocess(data: &Table, metadata: &ModelMetadata) -> Result<Table, MonitorError> {
    MetadataPreprocessor.preprocess(data, metadata)
}
