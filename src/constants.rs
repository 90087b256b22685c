pub const DEFAULT_MINIMUM_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_COUNT: usize = 10;
pub const DEFAULT_CHUNK_PRESET: &str = "size_1000";
pub const P_VALUE_PRECISION: i32 = 3;
pub const KS_EXACT_MAX_N: usize = 10_000;
pub const DEFAULT_ALERT_ALPHA: f64 = 0.05;
pub const THRESHOLD_STD_MULTIPLIER: f64 = 3.0;

pub const NML_METADATA_IDENTIFIER_COLUMN_NAME: &str = "nml_meta_identifier";
pub const NML_METADATA_TIMESTAMP_COLUMN_NAME: &str = "nml_meta_timestamp";
pub const NML_METADATA_PARTITION_COLUMN_NAME: &str = "nml_meta_partition";
pub const NML_METADATA_PREDICTION_COLUMN_NAME: &str = "nml_meta_prediction";
pub const NML_METADATA_PREDICTED_PROBABILITY_COLUMN_NAME: &str = "nml_meta_predicted_proba";
pub const NML_METADATA_TARGET_COLUMN_NAME: &str = "nml_meta_target";

pub const NML_METADATA_COLUMNS: [&str; 6] = [
    NML_METADATA_IDENTIFIER_COLUMN_NAME,
    NML_METADATA_TIMESTAMP_COLUMN_NAME,
    NML_METADATA_PARTITION_COLUMN_NAME,
    NML_METADATA_PREDICTION_COLUMN_NAME,
    NML_METADATA_PREDICTED_PROBABILITY_COLUMN_NAME,
    NML_METADATA_TARGET_COLUMN_NAME,
];
