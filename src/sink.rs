//! Collaborators at the edges of the engine: where rows go, how series are
//! drawn and where "now" comes from.

use std::io::Write;

use chrono::NaiveDateTime;

use crate::error::Result;

/// Destination for ordered output rows.
pub trait RowSink {
    fn write_row(&mut self, row: &[String]) -> Result<()>;
}

/// Collects rows in memory, in write order.
impl RowSink for Vec<Vec<String>> {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.push(row.to_vec());
        Ok(())
    }
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        (**self).write_row(row)
    }
}

/// Writes each row as one delimiter-joined, newline-terminated line.
pub struct DelimitedWriter<W: Write> {
    inner: W,
    delimiter: char,
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(inner: W, delimiter: char) -> Self {
        Self { inner, delimiter }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> RowSink for DelimitedWriter<W> {
    fn write_row(&mut self, row: &[String]) -> Result<()> {
        let mut sep = [0u8; 4];
        let sep = self.delimiter.encode_utf8(&mut sep);
        let line = row.join(sep);
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }
}

/// Turns an ordered series of values into a printable picture.
pub trait Plotter {
    fn render(&self, values: &[f64]) -> String;
}

/// Source of the current wall-clock time, in the log's local naive form.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
