//! Chunking
//!
//! Strategies that split a `Table` into an ordered sequence of `Chunk`s. Every
//! strategy is deterministic: the same input always yields the same chunks, in
//! the same order, so chunks from two tables split with the same strategy can
//! be paired by position.
use crate::constants::{
    DEFAULT_CHUNK_COUNT, DEFAULT_MINIMUM_CHUNK_SIZE, NML_METADATA_PARTITION_COLUMN_NAME,
    NML_METADATA_TIMESTAMP_COLUMN_NAME,
};
use crate::data::{ColumnValues, Table};
use crate::errors::MonitorError;
use crate::utils::items_to_strings;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::str::FromStr;

/// An ordered, keyed slice of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Stable identifier, `[start:end]` or a period label.
    pub key: String,
    pub data: Table,
    /// Position of the first row in the source table.
    pub start_index: usize,
    /// Position of the last row in the source table, inclusive.
    pub end_index: usize,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    /// Partition label shared by every row of the chunk, if any.
    pub partition: Option<String>,
}

impl Chunk {
    pub fn new(key: impl Into<String>, data: Table, start_index: usize, end_index: usize) -> Self {
        Chunk {
            key: key.into(),
            data,
            start_index,
            end_index,
            start_date: None,
            end_date: None,
            partition: None,
        }
    }

    pub fn len(&self) -> usize {
        self.data.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn annotate(&mut self) {
        if let Some(ColumnValues::Timestamp(ts)) = self
            .data
            .column(NML_METADATA_TIMESTAMP_COLUMN_NAME)
            .map(|c| &c.values)
        {
            self.start_date = ts.iter().flatten().min().copied();
            self.end_date = ts.iter().flatten().max().copied();
        }
        if let Some(labels) = self
            .data
            .column(NML_METADATA_PARTITION_COLUMN_NAME)
            .and_then(|c| c.values.as_labels())
        {
            let first = labels.first().cloned().flatten();
            if labels.iter().all(|l| *l == first) {
                self.partition = first;
            }
        }
    }
}

/// Splits a table into an ordered sequence of chunks.
pub trait Chunker: Send + Sync {
    /// Strategy specific splitting, on the full set of columns.
    fn split_into_chunks(&self, data: &Table) -> Result<Vec<Chunk>, MonitorError>;

    /// Chunks below this many rows are reported as too small for meaningful testing.
    fn minimum_chunk_size(&self) -> usize {
        DEFAULT_MINIMUM_CHUNK_SIZE
    }

    /// Split `data` into chunks, retaining only `columns` when given.
    fn split(&self, data: &Table, columns: Option<&[String]>) -> Result<Vec<Chunk>, MonitorError> {
        let mut chunks = self.split_into_chunks(data)?;
        if chunks.is_empty() {
            return Err(MonitorError::InvalidConfiguration(
                "chunking produced no chunks, provide a non-empty data set".to_string(),
            ));
        }

        let minimum = self.minimum_chunk_size();
        for chunk in chunks.iter_mut() {
            chunk.annotate();
            if let Some(columns) = columns {
                chunk.data = chunk.data.select(columns);
            }
            if chunk.len() < minimum {
                warn!(
                    "Chunk {} contains {} rows, fewer than the minimum chunk size of {}. Test results may be unreliable.",
                    chunk.key,
                    chunk.len(),
                    minimum
                );
            }
        }
        debug!("Split {} rows into {} chunks.", data.n_rows(), chunks.len());
        Ok(chunks)
    }
}

fn index_key(start: usize, end: usize) -> String {
    format!("[{}:{}]", start, end)
}

/// Chunks with a fixed number of rows; the last chunk may be shorter.
#[derive(Debug, Clone)]
pub struct SizeBasedChunker {
    chunk_size: usize,
    minimum_chunk_size: usize,
}

impl SizeBasedChunker {
    pub fn new(chunk_size: usize) -> Result<Self, MonitorError> {
        if chunk_size == 0 {
            return Err(MonitorError::InvalidConfiguration(
                "chunk_size must be a positive integer".to_string(),
            ));
        }
        Ok(SizeBasedChunker {
            chunk_size,
            minimum_chunk_size: DEFAULT_MINIMUM_CHUNK_SIZE,
        })
    }

    pub fn set_minimum_chunk_size(mut self, minimum_chunk_size: usize) -> Self {
        self.minimum_chunk_size = minimum_chunk_size;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Chunker for SizeBasedChunker {
    fn split_into_chunks(&self, data: &Table) -> Result<Vec<Chunk>, MonitorError> {
        let n = data.n_rows();
        Ok((0..n)
            .step_by(self.chunk_size)
            .map(|start| {
                let end = (start + self.chunk_size).min(n);
                Chunk::new(index_key(start, end - 1), data.slice(start, end), start, end - 1)
            })
            .collect())
    }

    fn minimum_chunk_size(&self) -> usize {
        self.minimum_chunk_size
    }
}

/// A fixed number of chunks, with rows spread as evenly as possible.
#[derive(Debug, Clone)]
pub struct CountBasedChunker {
    chunk_count: usize,
    minimum_chunk_size: usize,
}

impl CountBasedChunker {
    pub fn new(chunk_count: usize) -> Result<Self, MonitorError> {
        if chunk_count == 0 {
            return Err(MonitorError::InvalidConfiguration(
                "chunk_number must be a positive integer".to_string(),
            ));
        }
        Ok(CountBasedChunker {
            chunk_count,
            minimum_chunk_size: DEFAULT_MINIMUM_CHUNK_SIZE,
        })
    }

    pub fn set_minimum_chunk_size(mut self, minimum_chunk_size: usize) -> Self {
        self.minimum_chunk_size = minimum_chunk_size;
        self
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }
}

impl Chunker for CountBasedChunker {
    fn split_into_chunks(&self, data: &Table) -> Result<Vec<Chunk>, MonitorError> {
        let n = data.n_rows();
        if n == 0 {
            return Ok(Vec::new());
        }
        let count = if n < self.chunk_count {
            warn!(
                "Requested {} chunks but the data only has {} rows, creating one chunk per row.",
                self.chunk_count, n
            );
            n
        } else {
            self.chunk_count
        };

        // The first `n % count` chunks get one extra row.
        let base = n / count;
        let extra = n % count;
        let mut chunks = Vec::with_capacity(count);
        let mut start = 0;
        for i in 0..count {
            let size = base + usize::from(i < extra);
            let end = start + size;
            chunks.push(Chunk::new(index_key(start, end - 1), data.slice(start, end), start, end - 1));
            start = end;
        }
        Ok(chunks)
    }

    fn minimum_chunk_size(&self) -> usize {
        self.minimum_chunk_size
    }
}

/// The chunker used when no strategy is configured: ten equally sized chunks.
#[derive(Debug, Clone)]
pub struct DefaultChunker {
    inner: CountBasedChunker,
}

impl DefaultChunker {
    pub fn new() -> Self {
        DefaultChunker {
            inner: CountBasedChunker {
                chunk_count: DEFAULT_CHUNK_COUNT,
                minimum_chunk_size: DEFAULT_MINIMUM_CHUNK_SIZE,
            },
        }
    }

    pub fn set_minimum_chunk_size(mut self, minimum_chunk_size: usize) -> Self {
        self.inner.minimum_chunk_size = minimum_chunk_size;
        self
    }
}

impl Default for DefaultChunker {
    fn default() -> Self {
        DefaultChunker::new()
    }
}

impl Chunker for DefaultChunker {
    fn split_into_chunks(&self, data: &Table) -> Result<Vec<Chunk>, MonitorError> {
        self.inner.split_into_chunks(data)
    }

    fn minimum_chunk_size(&self) -> usize {
        self.inner.minimum_chunk_size
    }
}

/// Calendar period used by the `PeriodBasedChunker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPeriod {
    Hour,
    Day,
    /// Monday through Sunday.
    Week,
    Month,
    Quarter,
    Year,
}

impl FromStr for ChunkPeriod {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "H" => Ok(ChunkPeriod::Hour),
            "D" => Ok(ChunkPeriod::Day),
            "W" => Ok(ChunkPeriod::Week),
            "M" => Ok(ChunkPeriod::Month),
            "Q" => Ok(ChunkPeriod::Quarter),
            "Y" | "A" => Ok(ChunkPeriod::Year),
            _ => Err(MonitorError::InvalidConfiguration(format!(
                "invalid chunk period {}, expected one of {}",
                s,
                items_to_strings(vec!["H", "D", "W", "M", "Q", "Y", "A"])
            ))),
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

impl ChunkPeriod {
    /// Start of the period containing `ts`, and its label.
    pub fn period_of(&self, ts: &NaiveDateTime) -> (NaiveDateTime, String) {
        let date = ts.date();
        match self {
            ChunkPeriod::Hour => {
                let start = date.and_hms_opt(ts.hour(), 0, 0).unwrap_or(*ts);
                (start, start.format("%Y-%m-%d %H:00").to_string())
            }
            ChunkPeriod::Day => (midnight(date), date.format("%Y-%m-%d").to_string()),
            ChunkPeriod::Week => {
                let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                let sunday = monday + Duration::days(6);
                (
                    midnight(monday),
                    format!("{}/{}", monday.format("%Y-%m-%d"), sunday.format("%Y-%m-%d")),
                )
            }
            ChunkPeriod::Month => {
                let first = date.with_day(1).unwrap_or(date);
                (midnight(first), date.format("%Y-%m").to_string())
            }
            ChunkPeriod::Quarter => {
                let quarter = (date.month() - 1) / 3 + 1;
                let first = NaiveDate::from_ymd_opt(date.year(), (quarter - 1) * 3 + 1, 1).unwrap_or(date);
                (midnight(first), format!("{}Q{}", date.year(), quarter))
            }
            ChunkPeriod::Year => {
                let first = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
                (midnight(first), format!("{}", date.year()))
            }
        }
    }
}

/// One chunk per calendar period of a timestamp column, ordered by period.
#[derive(Debug, Clone)]
pub struct PeriodBasedChunker {
    offset: ChunkPeriod,
    date_column: String,
    minimum_chunk_size: usize,
}

impl PeriodBasedChunker {
    pub fn new(offset: &str) -> Result<Self, MonitorError> {
        Ok(PeriodBasedChunker {
            offset: offset.parse()?,
            date_column: NML_METADATA_TIMESTAMP_COLUMN_NAME.to_string(),
            minimum_chunk_size: DEFAULT_MINIMUM_CHUNK_SIZE,
        })
    }

    /// Group on another timestamp column than the internal one.
    pub fn set_date_column(mut self, date_column: impl Into<String>) -> Self {
        self.date_column = date_column.into();
        self
    }

    pub fn set_minimum_chunk_size(mut self, minimum_chunk_size: usize) -> Self {
        self.minimum_chunk_size = minimum_chunk_size;
        self
    }

    pub fn offset(&self) -> ChunkPeriod {
        self.offset
    }
}

impl Chunker for PeriodBasedChunker {
    fn split_into_chunks(&self, data: &Table) -> Result<Vec<Chunk>, MonitorError> {
        let column = data.require(&self.date_column)?;
        let timestamps = match &column.values {
            ColumnValues::Timestamp(ts) => ts,
            other => {
                return Err(MonitorError::InvalidArguments(format!(
                    "column {} must hold timestamps to chunk by period, found {} values",
                    self.date_column,
                    other.kind()
                )))
            }
        };

        let mut groups: BTreeMap<NaiveDateTime, (String, Vec<usize>)> = BTreeMap::new();
        for (i, ts) in timestamps.iter().enumerate() {
            let ts = ts.as_ref().ok_or_else(|| {
                MonitorError::InvalidArguments(format!("column {} has a missing timestamp at row {}", self.date_column, i))
            })?;
            let (start, label) = self.offset.period_of(ts);
            groups.entry(start).or_insert_with(|| (label, Vec::new())).1.push(i);
        }

        Ok(groups
            .into_values()
            .map(|(label, rows)| {
                let start = rows[0];
                let end = rows[rows.len() - 1];
                Chunk::new(label, data.take(&rows), start, end)
            })
            .collect())
    }

    fn minimum_chunk_size(&self) -> usize {
        self.minimum_chunk_size
    }
}
