//! Configuration
//!
//! Serializable chunking configuration and the JSON IO shared by every
//! persisted structure in the crate.
use crate::chunk::{Chunker, CountBasedChunker, DefaultChunker, PeriodBasedChunker, SizeBasedChunker};
use crate::constants::DEFAULT_MINIMUM_CHUNK_SIZE;
use crate::errors::MonitorError;
use crate::utils::items_to_strings;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

fn default_minimum_chunk_size() -> usize {
    DEFAULT_MINIMUM_CHUNK_SIZE
}

/// How to split data into chunks.
///
/// At most one of `chunk_size`, `chunk_number` and `chunk_period` may be set.
/// When none is set the `DefaultChunker` is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Split into chunks of this many rows.
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// Split into this many chunks.
    #[serde(default)]
    pub chunk_number: Option<usize>,
    /// Split by calendar period, e.g. `"W"` or `"M"`.
    #[serde(default)]
    pub chunk_period: Option<String>,
    /// Chunks smaller than this are reported, not rejected.
    #[serde(default = "default_minimum_chunk_size")]
    pub minimum_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: None,
            chunk_number: None,
            chunk_period: None,
            minimum_chunk_size: default_minimum_chunk_size(),
        }
    }
}

impl ChunkingConfig {
    pub fn by_size(chunk_size: usize) -> Self {
        ChunkingConfig {
            chunk_size: Some(chunk_size),
            ..Default::default()
        }
    }

    pub fn by_number(chunk_number: usize) -> Self {
        ChunkingConfig {
            chunk_number: Some(chunk_number),
            ..Default::default()
        }
    }

    pub fn by_period(chunk_period: impl Into<String>) -> Self {
        ChunkingConfig {
            chunk_period: Some(chunk_period.into()),
            ..Default::default()
        }
    }

    /// Set the advisory minimum chunk size.
    pub fn set_minimum_chunk_size(mut self, minimum_chunk_size: usize) -> Self {
        self.minimum_chunk_size = minimum_chunk_size;
        self
    }

    /// Build the chunker this configuration describes.
    pub fn resolve(&self) -> Result<Box<dyn Chunker>, MonitorError> {
        let given = [
            self.chunk_size.is_some(),
            self.chunk_number.is_some(),
            self.chunk_period.is_some(),
        ]
        .iter()
        .filter(|g| **g)
        .count();
        if given > 1 {
            return Err(MonitorError::InvalidConfiguration(
                "only one of chunk_size, chunk_number or chunk_period can be given".to_string(),
            ));
        }

        let chunker: Box<dyn Chunker> = if let Some(size) = self.chunk_size {
            Box::new(SizeBasedChunker::new(size)?.set_minimum_chunk_size(self.minimum_chunk_size))
        } else if let Some(number) = self.chunk_number {
            Box::new(CountBasedChunker::new(number)?.set_minimum_chunk_size(self.minimum_chunk_size))
        } else if let Some(period) = &self.chunk_period {
            Box::new(PeriodBasedChunker::new(period)?.set_minimum_chunk_size(self.minimum_chunk_size))
        } else {
            Box::new(DefaultChunker::new().set_minimum_chunk_size(self.minimum_chunk_size))
        };
        Ok(chunker)
    }
}

fn preset_error(s: &str) -> MonitorError {
    MonitorError::ParseString(
        s.to_string(),
        "ChunkingConfig".to_string(),
        items_to_strings(vec!["size_<n>", "count_<n>", "number_<n>", "period_<offset>", "default"]),
    )
}

impl FromStr for ChunkingConfig {
    type Err = MonitorError;

    /// Parse a preset such as `size_1000`, `count_10` or `period_W`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(ChunkingConfig::default());
        }
        let (kind, arg) = s.split_once('_').ok_or_else(|| preset_error(s))?;
        match kind {
            "size" => arg
                .parse::<usize>()
                .map(ChunkingConfig::by_size)
                .map_err(|_| preset_error(s)),
            "count" | "number" => arg
                .parse::<usize>()
                .map(ChunkingConfig::by_number)
                .map_err(|_| preset_error(s)),
            "period" if !arg.is_empty() => Ok(ChunkingConfig::by_period(arg)),
            _ => Err(preset_error(s)),
        }
    }
}

/// IO
pub trait JsonIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save to.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MonitorError> {
        fs::write(path, self.json_dump()?).map_err(|e| MonitorError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object
    fn json_dump(&self) -> Result<String, MonitorError> {
        serde_json::to_string(self).map_err(|e| MonitorError::UnableToWrite(e.to_string()))
    }

    /// Load from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, MonitorError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| MonitorError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load from.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, MonitorError> {
        let json_str = fs::read_to_string(path).map_err(|e| MonitorError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl JsonIO for ChunkingConfig {}
