//! Confidence-based performance estimation.
//!
//! Predicted probabilities are calibrated on the reference data, then used as
//! expected labels to estimate ROC AUC for chunks that have no targets.
use crate::calibration::IsotonicCalibrator;
use crate::chunk::Chunk;
use crate::constants::{
    NML_METADATA_PREDICTED_PROBABILITY_COLUMN_NAME, NML_METADATA_TARGET_COLUMN_NAME, THRESHOLD_STD_MULTIPLIER,
};
use crate::data::{Column, ColumnValues, Table};
use crate::errors::MonitorError;
use crate::metric::{estimated_roc_auc, roc_auc_score};
use crate::performance_estimation::base::{EstimationContext, PerformanceEstimation};
use crate::utils::{mean, std_dev};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Output columns of `Cbpe::estimate`, in order.
pub const CBPE_COLUMNS: [&str; 11] = [
    "key",
    "start_index",
    "end_index",
    "partition",
    "realized_roc_auc",
    "estimated_roc_auc",
    "confidence_lower",
    "confidence_upper",
    "lower_threshold",
    "upper_threshold",
    "alert",
];

/// Baseline learned during `fit`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CbpeBaseline {
    pub lower_threshold: f64,
    pub upper_threshold: f64,
    pub confidence_deviation: f64,
}

/// Confidence-based performance estimation of ROC AUC.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Cbpe {
    calibrator: IsotonicCalibrator,
    baseline: Option<CbpeBaseline>,
}

impl Cbpe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calibrator(&self) -> &IsotonicCalibrator {
        &self.calibrator
    }

    pub fn baseline(&self) -> Option<&CbpeBaseline> {
        self.baseline.as_ref()
    }
}

fn numeric_column(data: &Table, name: &str, role: &str) -> Result<Vec<f64>, MonitorError> {
    let column = data.require(name).map_err(|_| {
        MonitorError::MissingColumn(format!(
            "{} column is required, set it in the model metadata and include it in the data",
            role
        ))
    })?;
    column.values.as_f64().ok_or_else(|| {
        MonitorError::InvalidArguments(format!(
            "{} column must be numeric, found {} values",
            role,
            column.values.kind()
        ))
    })
}

/// Unweighted ROC AUC of the realized targets.
fn realized_roc_auc(targets: &[f64], proba: &[f64]) -> f64 {
    roc_auc_score(targets, proba, &vec![1.0; targets.len()])
}

fn finite(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values.into_iter().filter(|v| v.is_finite()).collect()
}

impl PerformanceEstimation for Cbpe {
    fn fit(&mut self, reference_data: &Table, context: &EstimationContext) -> Result<(), MonitorError> {
        let proba = numeric_column(
            reference_data,
            NML_METADATA_PREDICTED_PROBABILITY_COLUMN_NAME,
            "predicted probability",
        )?;
        let targets = numeric_column(reference_data, NML_METADATA_TARGET_COLUMN_NAME, "target")?;

        let calibrator = IsotonicCalibrator::new(&proba, &targets);
        if !calibrator.is_fitted() {
            return Err(MonitorError::InvalidArguments(
                "reference data has no rows with both a target and a predicted probability".to_string(),
            ));
        }

        let chunks = context.chunker.split(reference_data, Some(&context.columns()))?;
        let mut realized = Vec::with_capacity(chunks.len());
        let mut estimated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let chunk_proba = numeric_column(
                &chunk.data,
                NML_METADATA_PREDICTED_PROBABILITY_COLUMN_NAME,
                "predicted probability",
            )?;
            let chunk_targets = numeric_column(&chunk.data, NML_METADATA_TARGET_COLUMN_NAME, "target")?;
            realized.push(realized_roc_auc(&chunk_targets, &chunk_proba));
            estimated.push(estimated_roc_auc(&calibrator.transform(&chunk_proba)));
        }

        let realized = finite(realized);
        if realized.is_empty() {
            return Err(MonitorError::InvalidArguments(
                "no reference chunk contains both target classes, ROC AUC is undefined".to_string(),
            ));
        }
        let (m, s) = (mean(&realized), std_dev(&realized));
        let lower_threshold = (m - THRESHOLD_STD_MULTIPLIER * s).clamp(0.0, 1.0);
        let upper_threshold = (m + THRESHOLD_STD_MULTIPLIER * s).clamp(0.0, 1.0);

        let estimated = finite(estimated);
        let confidence_deviation = if estimated.is_empty() { 0.0 } else { std_dev(&estimated) };

        info!(
            "Fitted ROC AUC thresholds [{:.4}, {:.4}] on {} reference chunks, confidence deviation {:.4}.",
            lower_threshold,
            upper_threshold,
            chunks.len(),
            confidence_deviation
        );

        self.calibrator = calibrator;
        self.baseline = Some(CbpeBaseline {
            lower_threshold,
            upper_threshold,
            confidence_deviation,
        });
        Ok(())
    }

    fn estimate(&self, chunks: &[Chunk], _context: &EstimationContext) -> Result<Table, MonitorError> {
        let baseline = self
            .baseline
            .as_ref()
            .ok_or_else(|| MonitorError::NotFitted("Cbpe has no baseline, fit it on reference data first".to_string()))?;

        let n = chunks.len();
        let mut keys = Vec::with_capacity(n);
        let mut start_index = Vec::with_capacity(n);
        let mut end_index = Vec::with_capacity(n);
        let mut partition = Vec::with_capacity(n);
        let mut realized = Vec::with_capacity(n);
        let mut estimated = Vec::with_capacity(n);
        let mut lower = Vec::with_capacity(n);
        let mut upper = Vec::with_capacity(n);
        let mut alert = Vec::with_capacity(n);

        for chunk in chunks {
            let proba = numeric_column(
                &chunk.data,
                NML_METADATA_PREDICTED_PROBABILITY_COLUMN_NAME,
                "predicted probability",
            )?;
            let realized_auc = match chunk.data.column(NML_METADATA_TARGET_COLUMN_NAME) {
                Some(_) => {
                    let targets = numeric_column(&chunk.data, NML_METADATA_TARGET_COLUMN_NAME, "target")?;
                    realized_roc_auc(&targets, &proba)
                }
                None => f64::NAN,
            };
            let estimated_auc = estimated_roc_auc(&self.calibrator.transform(&proba));
            if estimated_auc.is_nan() {
                debug!("Chunk {} has no usable predicted probabilities.", chunk.key);
            }

            keys.push(chunk.key.clone());
            start_index.push(Some(chunk.start_index as i64));
            end_index.push(Some(chunk.end_index as i64));
            partition.push(chunk.partition.clone());
            realized.push(realized_auc);
            estimated.push(estimated_auc);
            // a missing estimate has missing bounds
            if estimated_auc.is_nan() {
                lower.push(f64::NAN);
                upper.push(f64::NAN);
            } else {
                lower.push((estimated_auc - baseline.confidence_deviation).max(0.0));
                upper.push((estimated_auc + baseline.confidence_deviation).min(1.0));
            }
            alert.push(Some(
                estimated_auc < baseline.lower_threshold || estimated_auc > baseline.upper_threshold,
            ));
        }

        Table::new(vec![
            Column::categorical("key", keys),
            Column::new("start_index", ColumnValues::Integer(start_index)),
            Column::new("end_index", ColumnValues::Integer(end_index)),
            Column::new("partition", ColumnValues::Categorical(partition)),
            Column::continuous("realized_roc_auc", realized),
            Column::continuous("estimated_roc_auc", estimated),
            Column::continuous("confidence_lower", lower),
            Column::continuous("confidence_upper", upper),
            Column::continuous("lower_threshold", vec![baseline.lower_threshold; n]),
            Column::continuous("upper_threshold", vec![baseline.upper_threshold; n]),
            Column::new("alert", ColumnValues::Boolean(alert)),
        ])
    }
}
