//! Time-bucketed grouping and aggregation of one measurement.
//!
//! This module provides:
//! - Bucket modes that map a timestamp to a sortable [`GroupKey`]
//! - Aggregate modes (first, average, max, min, sum)
//! - [`Accumulator`], the per-run map from key to [`Group`]
//! - [`Filter`], which routes matching records either straight to a sink
//!   (passthrough) or into the accumulator
//!
//! Group keys are fixed-width and zero-padded, so the lexicographic order of
//! keys equals the chronological order of the buckets they name.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{format_value, Record};
use crate::sink::RowSink;

/// Time window used to bucket matching records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BucketMode {
    /// No bucketing, matching records pass straight through
    #[default]
    None,
    /// One bucket per clock hour
    Hourly,
    /// One bucket per calendar day
    Daily,
    /// One bucket per ISO week
    Weekly,
    /// A single bucket for all matches
    Total,
}

/// Reduction applied to the values of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregateMode {
    /// Value of the first record inserted into the bucket
    First,
    /// Arithmetic mean
    #[default]
    Average,
    /// Largest value
    Max,
    /// Smallest value
    Min,
    /// Sum of all values
    Sum,
}

impl Display for BucketMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketMode::None => write!(f, "none"),
            BucketMode::Hourly => write!(f, "hourly"),
            BucketMode::Daily => write!(f, "daily"),
            BucketMode::Weekly => write!(f, "weekly"),
            BucketMode::Total => write!(f, "total"),
        }
    }
}

impl FromStr for BucketMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(BucketMode::None),
            "hourly" => Ok(BucketMode::Hourly),
            "daily" => Ok(BucketMode::Daily),
            "weekly" => Ok(BucketMode::Weekly),
            "total" => Ok(BucketMode::Total),
            other => Err(Error::UnknownMode {
                kind: "bucket mode",
                value: other.to_string(),
            }),
        }
    }
}

impl Display for AggregateMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateMode::First => write!(f, "first"),
            AggregateMode::Average => write!(f, "average"),
            AggregateMode::Max => write!(f, "max"),
            AggregateMode::Min => write!(f, "min"),
            AggregateMode::Sum => write!(f, "sum"),
        }
    }
}

impl FromStr for AggregateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first" => Ok(AggregateMode::First),
            "average" => Ok(AggregateMode::Average),
            "max" => Ok(AggregateMode::Max),
            "min" => Ok(AggregateMode::Min),
            "sum" => Ok(AggregateMode::Sum),
            other => Err(Error::UnknownMode {
                kind: "aggregate mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Sortable label of one bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl BucketMode {
    /// Derives the bucket key for `timestamp`, or `None` in passthrough mode.
    pub fn key(&self, timestamp: &NaiveDateTime) -> Option<GroupKey> {
        let key = match self {
            BucketMode::None => return None,
            BucketMode::Hourly => format!(
                "{:04}-{:02}-{:02} {:02}",
                timestamp.year(),
                timestamp.month(),
                timestamp.day(),
                timestamp.hour()
            ),
            BucketMode::Daily => format!(
                "{:04}-{:02}-{:02}",
                timestamp.year(),
                timestamp.month(),
                timestamp.day()
            ),
            BucketMode::Weekly => {
                let week = timestamp.iso_week();
                format!("{:04}-W{:02}", week.year(), week.week())
            }
            BucketMode::Total => "total".to_string(),
        };
        Some(GroupKey(key))
    }
}

/// All records sharing one key, reduced as they arrive.
///
/// The first record is kept whole; every later record only contributes its
/// value to the running statistics, which are seeded from the first value.
#[derive(Debug, Clone)]
pub struct Group {
    first: Record,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Group {
    pub fn new(first: Record) -> Self {
        let value = first.value();
        Self {
            first,
            count: 1,
            sum: value,
            min: value,
            max: value,
        }
    }

    pub fn push(&mut self, record: &Record) {
        let value = record.value();
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn first(&self) -> &Record {
        &self.first
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn aggregate(&self, mode: AggregateMode) -> f64 {
        match mode {
            AggregateMode::First => self.first.value(),
            AggregateMode::Average => self.sum / self.count as f64,
            AggregateMode::Max => self.max,
            AggregateMode::Min => self.min,
            AggregateMode::Sum => self.sum,
        }
    }
}

/// Groups of one aggregation run, kept in ascending key order.
#[derive(Debug, Default)]
pub struct Accumulator {
    groups: BTreeMap<GroupKey, Group>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: GroupKey, record: Record) {
        match self.groups.get_mut(&key) {
            Some(group) => group.push(&record),
            None => {
                self.groups.insert(key, Group::new(record));
            }
        }
    }

    fn len(&self) -> usize {
        self.groups.len()
    }

    /// `[key, measurement, aggregate]` rows in ascending key order.
    pub fn rows(&self, mode: AggregateMode) -> impl Iterator<Item = Vec<String>> + '_ {
        self.groups.iter().map(move |(key, group)| {
            vec![
                key.to_string(),
                group.first().measurement().to_string(),
                format_value(group.aggregate(mode)),
            ]
        })
    }
}

/// Selects one measurement and either streams or aggregates it.
pub struct Filter {
    measure: String,
    bucket: BucketMode,
    aggregate: AggregateMode,
    accumulator: Accumulator,
}

impl Filter {
    pub fn new(measure: impl Into<String>, bucket: BucketMode, aggregate: AggregateMode) -> Self {
        Self {
            measure: measure.into(),
            bucket,
            aggregate,
            accumulator: Accumulator::new(),
        }
    }

    /// Feeds one record. Passthrough rows are written to `sink` immediately.
    pub fn add<S: RowSink + ?Sized>(&mut self, record: Record, sink: &mut S) -> Result<()> {
        if record.measurement() != self.measure {
            return Ok(());
        }
        match self.bucket.key(&record.timestamp()) {
            None => sink.write_row(&record.to_fields(None)),
            Some(key) => {
                self.accumulator.add(key, record);
                Ok(())
            }
        }
    }

    /// Emits one row per group in ascending key order.
    pub fn finish<S: RowSink + ?Sized>(self, sink: &mut S) -> Result<()> {
        debug!(
            measure = %self.measure,
            bucket = %self.bucket,
            aggregate = %self.aggregate,
            groups = self.accumulator.len(),
            "emitting aggregated groups"
        );
        for row in self.accumulator.rows(self.aggregate) {
            sink.write_row(&row)?;
        }
        Ok(())
    }
}
