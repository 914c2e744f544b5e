//! One timestamped measurement and its delimited-line representation.

use chrono::{NaiveDateTime, Timelike};

use crate::error::ParseError;

/// Timestamp layout used in the log file and in every emitted row.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders a value the way every row carries it.
pub fn format_value(value: f64) -> String {
    format!("{:.3}", value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    timestamp: NaiveDateTime,
    measurement: String,
    value: f64,
    name: String,
    description: String,
}

impl Record {
    /// Builds a record for manual entry. Empty `name`/`description` mean absent.
    pub fn new(
        timestamp: NaiveDateTime,
        measurement: impl Into<String>,
        value: f64,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(ParseError::EmptyMeasurement);
        }
        let record = Self {
            // Sub-second precision is not representable in the log.
            timestamp: truncate_to_second(timestamp),
            measurement,
            value,
            name: name.into(),
            description: description.into(),
        };
        record.check_fields(&['\n', '\r'])?;
        Ok(record)
    }

    /// Rejects a record that would not survive being written with `delimiter`.
    pub fn check_delimiter(&self, delimiter: char) -> Result<(), ParseError> {
        self.check_fields(&[delimiter])
    }

    fn check_fields(&self, forbidden: &[char]) -> Result<(), ParseError> {
        let fields = [
            ("measurement", &self.measurement),
            ("name", &self.name),
            ("description", &self.description),
        ];
        for (field, text) in fields {
            if let Some(found) = text.chars().find(|c| forbidden.contains(c)) {
                return Err(ParseError::ForbiddenCharacter { field, found });
            }
        }
        Ok(())
    }

    /// Parses `[timestamp, measurement, value, name, description]`.
    ///
    /// Missing trailing fields default to empty strings and anything past the
    /// fifth field is ignored.
    pub fn from_fields(fields: &[&str]) -> Result<Self, ParseError> {
        let field = |n: usize| fields.get(n).copied().unwrap_or("");

        let raw_value = field(2);
        let value: f64 = raw_value
            .parse()
            .map_err(|_| ParseError::InvalidValue(raw_value.to_string()))?;

        let raw_timestamp = field(0);
        let timestamp = NaiveDateTime::parse_from_str(raw_timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| ParseError::InvalidTimestamp(raw_timestamp.to_string()))?;

        Self::new(timestamp, field(1), value, field(3), field(4))
    }

    /// Serializes the record for output.
    ///
    /// With `relative_to` set, a human relative age measured against that
    /// instant is inserted right after the timestamp. Name and description are only
    /// written when present, so the arity varies; an empty name is still
    /// written as an empty slot when a description follows it.
    pub fn to_fields(&self, relative_to: Option<NaiveDateTime>) -> Vec<String> {
        let mut fields = vec![self.timestamp.format(TIMESTAMP_FORMAT).to_string()];
        if let Some(now) = relative_to {
            fields.push(relative(self.timestamp, now));
        }
        fields.push(self.measurement.clone());
        fields.push(format_value(self.value));
        if !self.name.is_empty() || !self.description.is_empty() {
            fields.push(self.name.clone());
        }
        if !self.description.is_empty() {
            fields.push(self.description.clone());
        }
        fields
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Formats the distance between `then` and `now` as `"3h ago"` / `"in 2d"`.
pub fn relative(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let delta = now.signed_duration_since(then);
    let secs = delta.num_seconds();
    if secs == 0 {
        return "now".to_string();
    }

    let abs = secs.unsigned_abs();
    let (amount, unit) = match abs {
        s if s < 60 => (s, "s"),
        s if s < 3_600 => (s / 60, "m"),
        s if s < 86_400 => (s / 3_600, "h"),
        s => (s / 86_400, "d"),
    };

    if secs > 0 {
        format!("{}{} ago", amount, unit)
    } else {
        format!("in {}{}", amount, unit)
    }
}
