//! Streaming log reader.
//!
//! Turns an async byte source into a lazy, strictly ordered stream of parsed
//! records. Nothing is buffered beyond the current line: either the stream
//! is driven on the consumer's own task ([`LogReader::stream`]) or parsing
//! runs on a separate task behind a capacity-1 channel ([`LogReader::spawn`]),
//! so the producer is never more than one record ahead of the consumer.

use std::str::FromStr;

use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::error::{Error, ParseError, Result};
use crate::record::Record;

pub type RecordStream = BoxStream<'static, Result<Record>>;

/// What to do with a line that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Surface the first malformed line and end the sequence.
    #[default]
    Abort,
    /// Log and drop malformed lines, keep reading.
    Skip,
}

impl FromStr for ErrorPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort" => Ok(ErrorPolicy::Abort),
            "skip" => Ok(ErrorPolicy::Skip),
            other => Err(Error::UnknownMode {
                kind: "error policy",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LogReader {
    delimiter: char,
}

impl LogReader {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Parses one raw line. `None` for blank lines.
    pub fn parse_line(&self, line: &str) -> Option<std::result::Result<Record, ParseError>> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            return None;
        }
        let fields: Vec<&str> = line.split(self.delimiter).collect();
        Some(Record::from_fields(&fields))
    }

    /// Lazily reads `reader` on the polling task.
    ///
    /// Every line yields either a record or an [`Error::Parse`]; a read
    /// failure yields [`Error::Io`] and ends the stream.
    pub fn stream<R>(&self, reader: R) -> RecordStream
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let this = *self;
        Box::pin(stream! {
            let mut lines = BufReader::new(reader).lines();
            let mut line_number = 0usize;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        line_number += 1;
                        match this.parse_line(&line) {
                            Some(Ok(record)) => {
                                yield Ok(record);
                            }
                            Some(Err(source)) => {
                                yield Err(Error::Parse { line: line_number, source });
                            }
                            None => continue,
                        }
                    }
                    Ok(None) => {
                        debug!(lines = line_number, "log stream exhausted");
                        break;
                    }
                    Err(e) => {
                        yield Err(Error::Io(e));
                        break;
                    }
                }
            }
        })
    }

    /// Reads `reader` on a separate task, handing results over a channel of
    /// capacity 1. The producer stops as soon as the returned stream is dropped.
    pub fn spawn<R>(&self, reader: R) -> RecordStream
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let mut source = self.stream(reader);
        tokio::spawn(async move {
            while let Some(item) = source.next().await {
                if tx.send(item).await.is_err() {
                    debug!("log consumer went away, stopping reader");
                    break;
                }
            }
        });
        Box::pin(ReceiverStream::new(rx))
    }
}

/// Applies one error policy to a record stream.
///
/// I/O failures end the stream under either policy.
pub fn apply_policy(mut records: RecordStream, policy: ErrorPolicy) -> RecordStream {
    Box::pin(stream! {
        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    yield Ok(record);
                }
                Err(e) if e.is_parse() && policy == ErrorPolicy::Skip => {
                    warn!(error = %e, "skipping malformed log line");
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    })
}
