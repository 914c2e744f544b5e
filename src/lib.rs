//! Tallylog: personal measurement tracking over an append-only log
//!
//! This library reads a delimiter-separated log of timestamped measurements
//! and turns it into summarized views: time-bucketed aggregates, intervals
//! between events, latest values per measurement, and value series for
//! plotting. The log is streamed one line at a time; memory stays bounded by
//! the number of buckets or measurements in a report, not the size of the log.
//!
//! # Example
//!
//! ```rust,no_run
//! use tallylog::{AggregateMode, BucketMode, ErrorPolicy, Tracker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tracker = Tracker::new('\t', ErrorPolicy::Abort);
//!
//!     // Daily maximum of the "pulse" measurement
//!     let file = tokio::fs::File::open("health.log").await?;
//!     let rows = tracker
//!         .filter_rows(file, "pulse", BucketMode::Daily, AggregateMode::Max)
//!         .await?;
//!     for row in rows {
//!         println!("{}", row.join("\t"));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregation;
pub mod config;
pub mod error;
pub mod interval;
pub mod logging;
pub mod reader;
pub mod record;
pub mod sink;
pub mod tracker;
pub mod tests;

pub use aggregation::{Accumulator, AggregateMode, BucketMode, Filter, Group, GroupKey};
pub use config::{CliArgs, Settings};
pub use error::{Error, ParseError, Result};
pub use interval::{IntervalTracker, RoundUnit};
pub use reader::{apply_policy, ErrorPolicy, LogReader, RecordStream};
pub use record::{Record, TIMESTAMP_FORMAT};
pub use sink::{Clock, DelimitedWriter, Plotter, RowSink, SystemClock};
pub use tracker::Tracker;
