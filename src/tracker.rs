//! Orchestration: wires the log reader into the engine and writes rows out.
//!
//! Every read operation drives one spawned [`LogReader`] through a single
//! consumer that owns its filter, interval tracker or reducer for the whole
//! call. The configured [`ErrorPolicy`] applies to every read operation alike.

use std::collections::{BTreeMap, BTreeSet};

use futures::StreamExt;
use tokio::io::AsyncRead;
use tracing::{debug, info};

use crate::aggregation::{AggregateMode, BucketMode, Filter};
use crate::config::Settings;
use crate::error::Result;
use crate::interval::{IntervalTracker, RoundUnit};
use crate::reader::{apply_policy, ErrorPolicy, LogReader, RecordStream};
use crate::record::Record;
use crate::sink::{Clock, Plotter, RowSink, SystemClock};

pub struct Tracker {
    reader: LogReader,
    policy: ErrorPolicy,
    clock: Box<dyn Clock>,
}

impl Tracker {
    pub fn new(delimiter: char, policy: ErrorPolicy) -> Self {
        Self::with_clock(delimiter, policy, Box::new(SystemClock))
    }

    pub fn with_clock(delimiter: char, policy: ErrorPolicy, clock: Box<dyn Clock>) -> Self {
        Self {
            reader: LogReader::new(delimiter),
            policy,
            clock,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(settings.delimiter()?, settings.reader.policy))
    }

    fn records<R>(&self, reader: R) -> RecordStream
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        apply_policy(self.reader.spawn(reader), self.policy)
    }

    /// Writes one record as a log line.
    ///
    /// Fails before writing anything if a field contains the log delimiter.
    pub fn append<S: RowSink + ?Sized>(&self, record: &Record, sink: &mut S) -> Result<()> {
        record.check_delimiter(self.reader.delimiter())?;
        sink.write_row(&record.to_fields(None))?;
        info!(
            measurement = record.measurement(),
            value = record.value(),
            "appended record"
        );
        Ok(())
    }

    /// Streams (passthrough) or aggregates one measurement into `sink`.
    pub async fn filter<R, S>(
        &self,
        reader: R,
        measure: &str,
        bucket: BucketMode,
        aggregate: AggregateMode,
        sink: &mut S,
    ) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        S: RowSink + ?Sized,
    {
        debug!(measure, %bucket, %aggregate, "filtering log");
        let mut filter = Filter::new(measure, bucket, aggregate);
        let mut records = self.records(reader);
        while let Some(record) = records.next().await {
            filter.add(record?, sink)?;
        }
        filter.finish(sink)
    }

    pub async fn filter_rows<R>(
        &self,
        reader: R,
        measure: &str,
        bucket: BucketMode,
        aggregate: AggregateMode,
    ) -> Result<Vec<Vec<String>>>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut rows = Vec::new();
        self.filter(reader, measure, bucket, aggregate, &mut rows).await?;
        Ok(rows)
    }

    /// Writes the gap between consecutive events of `measure`, plus the time
    /// elapsed since the last one.
    pub async fn interval<R, S>(
        &self,
        reader: R,
        measure: &str,
        unit: RoundUnit,
        sink: &mut S,
    ) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        S: RowSink + ?Sized,
    {
        debug!(measure, %unit, "tracking intervals");
        let mut tracker = IntervalTracker::new(measure, unit);
        let mut records = self.records(reader);
        while let Some(record) = records.next().await {
            if let Some(row) = tracker.observe(&record?) {
                sink.write_row(&row)?;
            }
        }
        if let Some(row) = tracker.finish(self.clock.now()) {
            sink.write_row(&row)?;
        }
        Ok(())
    }

    pub async fn interval_rows<R>(
        &self,
        reader: R,
        measure: &str,
        unit: RoundUnit,
    ) -> Result<Vec<Vec<String>>>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut rows = Vec::new();
        self.interval(reader, measure, unit, &mut rows).await?;
        Ok(rows)
    }

    /// Writes the most recent record of every measurement, sorted by name.
    ///
    /// On equal timestamps the record read first is kept.
    pub async fn latest<R, S>(&self, reader: R, sink: &mut S) -> Result<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
        S: RowSink + ?Sized,
    {
        let mut latest: BTreeMap<String, Record> = BTreeMap::new();
        let mut records = self.records(reader);
        while let Some(record) = records.next().await {
            let record = record?;
            match latest.get(record.measurement()) {
                Some(seen) if seen.timestamp() >= record.timestamp() => {}
                _ => {
                    latest.insert(record.measurement().to_string(), record);
                }
            }
        }

        let now = self.clock.now();
        for record in latest.values() {
            sink.write_row(&record.to_fields(Some(now)))?;
        }
        Ok(())
    }

    pub async fn latest_rows<R>(&self, reader: R) -> Result<Vec<Vec<String>>>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut rows = Vec::new();
        self.latest(reader, &mut rows).await?;
        Ok(rows)
    }

    /// Distinct measurement names in the log.
    pub async fn measurements<R>(&self, reader: R) -> Result<BTreeSet<String>>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut names = BTreeSet::new();
        let mut records = self.records(reader);
        while let Some(record) = records.next().await {
            let record = record?;
            if !names.contains(record.measurement()) {
                names.insert(record.measurement().to_string());
            }
        }
        Ok(names)
    }

    /// Values of `measure` in log order.
    pub async fn series_values<R>(&self, reader: R, measure: &str) -> Result<Vec<f64>>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut values = Vec::new();
        let mut records = self.records(reader);
        while let Some(record) = records.next().await {
            let record = record?;
            if record.measurement() == measure {
                values.push(record.value());
            }
        }
        Ok(values)
    }

    /// Renders the series of `measure`, or `None` when it has no values.
    pub async fn plot<R>(
        &self,
        reader: R,
        measure: &str,
        plotter: &dyn Plotter,
    ) -> Result<Option<String>>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let values = self.series_values(reader, measure).await?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(plotter.render(&values)))
    }
}
