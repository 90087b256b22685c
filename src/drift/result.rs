//! Drift Results
//!
//! One record per analysis chunk, materialized into a `DriftResult` once all
//! records are known.
use crate::config::JsonIO;
use crate::constants::DEFAULT_ALERT_ALPHA;
use crate::data::{Column, ColumnValues, Table};
use crate::errors::MonitorError;
use crate::utils::validate_probability_parameter;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const STATISTIC_SUFFIX: &str = "_statistic";
pub const P_VALUE_SUFFIX: &str = "_p_value";

/// Test outcome for a single feature in a single chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    pub feature: String,
    pub statistic: f64,
    /// Rounded to 3 decimals.
    pub p_value: f64,
}

/// All test outcomes for one analysis chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    /// Key of the analysis chunk.
    pub chunk: String,
    pub start_index: usize,
    pub end_index: usize,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub features: Vec<FeatureDrift>,
}

impl DriftRecord {
    pub fn feature(&self, feature: &str) -> Option<&FeatureDrift> {
        self.features.iter().find(|f| f.feature == feature)
    }
}

/// A feature flagged as drifting in a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftAlert {
    pub chunk: String,
    pub feature: String,
    pub p_value: f64,
}

/// Drift test outcomes, one row per analysis chunk in chunk order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    rows: Vec<DriftRecord>,
}

impl DriftResult {
    pub fn new(rows: Vec<DriftRecord>) -> Self {
        DriftResult { rows }
    }

    pub fn rows(&self) -> &[DriftRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `chunk` followed by a statistic and p-value column per tested feature.
    ///
    /// Rows may test different features; the column set is their union, in
    /// the order features first appear.
    pub fn columns(&self) -> Vec<String> {
        let mut features: Vec<&str> = Vec::new();
        for f in self.rows.iter().flat_map(|r| r.features.iter()) {
            if !features.contains(&f.feature.as_str()) {
                features.push(&f.feature);
            }
        }
        let mut columns = vec!["chunk".to_string()];
        for f in features {
            columns.push(format!("{}{}", f, STATISTIC_SUFFIX));
            columns.push(format!("{}{}", f, P_VALUE_SUFFIX));
        }
        columns
    }

    /// Value of a `<feature>_statistic` or `<feature>_p_value` column in a row.
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let record = self.rows.get(row)?;
        if let Some(feature) = column.strip_suffix(STATISTIC_SUFFIX) {
            record.feature(feature).map(|f| f.statistic)
        } else if let Some(feature) = column.strip_suffix(P_VALUE_SUFFIX) {
            record.feature(feature).map(|f| f.p_value)
        } else {
            None
        }
    }

    /// Features whose p-value falls below `alpha`, in row order.
    pub fn alerts(&self, alpha: f64) -> Result<Vec<DriftAlert>, MonitorError> {
        validate_probability_parameter(alpha, "alpha")?;
        Ok(self
            .rows
            .iter()
            .flat_map(|r| {
                r.features.iter().filter(|f| f.p_value < alpha).map(move |f| DriftAlert {
                    chunk: r.chunk.clone(),
                    feature: f.feature.clone(),
                    p_value: f.p_value,
                })
            })
            .collect())
    }

    /// `alerts` at the conventional significance level of 0.05.
    pub fn default_alerts(&self) -> Vec<DriftAlert> {
        self.alerts(DEFAULT_ALERT_ALPHA).unwrap_or_default()
    }

    /// Materialize as a table. Cells of features a row did not test are `NaN`.
    pub fn to_table(&self) -> Result<Table, MonitorError> {
        let columns = self.columns();
        let mut table = Table::new(vec![Column::categorical(
            "chunk",
            self.rows.iter().map(|r| r.chunk.clone()).collect(),
        )])?;
        for c in columns.iter().skip(1) {
            let values = (0..self.rows.len())
                .map(|i| self.value(i, c).unwrap_or(f64::NAN))
                .collect();
            table.push_column(Column::new(c.clone(), ColumnValues::Continuous(values)))?;
        }
        Ok(table)
    }
}

impl JsonIO for DriftResult {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chunk: &str, features: &[(&str, f64, f64)]) -> DriftRecord {
        DriftRecord {
            chunk: chunk.to_string(),
            start_index: 0,
            end_index: 0,
            start_date: None,
            end_date: None,
            features: features
                .iter()
                .map(|(f, s, p)| FeatureDrift {
                    feature: f.to_string(),
                    statistic: *s,
                    p_value: *p,
                })
                .collect(),
        }
    }

    fn result() -> DriftResult {
        DriftResult::new(vec![
            record("[0:9]", &[("region", 1.5, 0.472), ("score", 0.2, 0.031)]),
            record("[10:19]", &[("score", 0.1, 0.61)]),
            record("[20:29]", &[("age", 0.4, 0.002)]),
        ])
    }

    #[test]
    fn test_columns_are_union_in_first_seen_order() {
        assert_eq!(
            result().columns(),
            vec![
                "chunk",
                "region_statistic",
                "region_p_value",
                "score_statistic",
                "score_p_value",
                "age_statistic",
                "age_p_value"
            ]
        );
    }

    #[test]
    fn test_value_lookup() {
        let r = result();
        assert_eq!(r.value(0, "region_p_value"), Some(0.472));
        assert_eq!(r.value(1, "score_statistic"), Some(0.1));
        assert_eq!(r.value(1, "region_statistic"), None);
        assert_eq!(r.value(0, "chunk"), None);
        assert_eq!(r.value(7, "score_statistic"), None);
    }

    #[test]
    fn test_alerts() {
        let alerts = result().alerts(0.05).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].chunk, "[0:9]");
        assert_eq!(alerts[0].feature, "score");
        assert_eq!(alerts[1].feature, "age");
        assert!(result().alerts(2.0).is_err());
    }

    #[test]
    fn test_to_table_leaves_untested_cells_missing() {
        let t = result().to_table().unwrap();
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.n_cols(), 7);
        match &t.column("region_statistic").unwrap().values {
            ColumnValues::Continuous(v) => {
                assert_eq!(v[0], 1.5);
                assert!(v[1].is_nan());
            }
            other => panic!("unexpected column kind {}", other.kind()),
        }
    }

    #[test]
    fn test_result_io_json() {
        let r = result();
        let json = r.json_dump().unwrap();
        assert_eq!(DriftResult::from_json(&json).unwrap(), r);
    }
}
