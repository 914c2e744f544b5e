//! Gaps between consecutive events of one measurement.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};

use crate::error::{Error, Result};
use crate::record::{format_value, Record, TIMESTAMP_FORMAT};

/// Unit an interval is rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoundUnit {
    /// Whole seconds, truncated
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl RoundUnit {
    pub fn format(&self, duration: Duration) -> String {
        let secs = duration.num_milliseconds() as f64 / 1_000.0;
        match self {
            RoundUnit::Seconds => duration.num_seconds().to_string(),
            RoundUnit::Minutes => format_value(secs / 60.0),
            RoundUnit::Hours => format_value(secs / 3_600.0),
            RoundUnit::Days => format_value(secs / 3_600.0 / 24.0),
        }
    }
}

impl Display for RoundUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundUnit::Seconds => write!(f, "seconds"),
            RoundUnit::Minutes => write!(f, "minutes"),
            RoundUnit::Hours => write!(f, "hours"),
            RoundUnit::Days => write!(f, "days"),
        }
    }
}

impl FromStr for RoundUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "seconds" => Ok(RoundUnit::Seconds),
            "minutes" => Ok(RoundUnit::Minutes),
            "hours" => Ok(RoundUnit::Hours),
            "days" => Ok(RoundUnit::Days),
            other => Err(Error::UnknownMode {
                kind: "rounding unit",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    Idle,
    Tracking { last: Record },
}

/// Emits `[timestamp, measurement, gap]` for every repeat of one measurement.
///
/// Calling [`IntervalTracker::finish`] at end of stream adds one row for
/// the time elapsed since the last event. That row carries the last event's
/// timestamp rather than the time it was measured at.
#[derive(Debug, Clone)]
pub struct IntervalTracker {
    measure: String,
    unit: RoundUnit,
    state: State,
}

impl IntervalTracker {
    pub fn new(measure: impl Into<String>, unit: RoundUnit) -> Self {
        Self {
            measure: measure.into(),
            unit,
            state: State::Idle,
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, State::Tracking { .. })
    }

    pub fn observe(&mut self, record: &Record) -> Option<Vec<String>> {
        if record.measurement() != self.measure {
            return None;
        }
        let previous = std::mem::replace(
            &mut self.state,
            State::Tracking {
                last: record.clone(),
            },
        );
        match previous {
            State::Idle => None,
            State::Tracking { last } => Some(self.row(
                record.timestamp(),
                record.timestamp() - last.timestamp(),
            )),
        }
    }

    /// Ends tracking. Emits the gap between the last event and `now`, if any.
    pub fn finish(self, now: NaiveDateTime) -> Option<Vec<String>> {
        match &self.state {
            State::Idle => None,
            State::Tracking { last } => {
                Some(self.row(last.timestamp(), now - last.timestamp()))
            }
        }
    }

    fn row(&self, label: NaiveDateTime, gap: Duration) -> Vec<String> {
        vec![
            label.format(TIMESTAMP_FORMAT).to_string(),
            self.measure.clone(),
            self.unit.format(gap),
        ]
    }
}
