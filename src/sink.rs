//! Interval records and where they go.
//!
//! Every closed interval produces one [`IntervalRecord`]. Records are handed to
//! a [`RecordSink`] in interval order. The text encoding is one line per
//! interval:
//!
//! ```text
//! <e0> <e1> ... <eE-1> <phase id>
//! ```
//!
//! Elements are decimal integers in dimension order, separated by single
//! spaces; the phase id is always the last field. Consumers split on
//! whitespace and rely on this order.

use alloc::vec::Vec;
use core::fmt;

use crate::error::PhaseError;
use crate::phase::PhaseId;
use crate::signature::Signature;

/// Output for one closed interval.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalRecord {
    /// Interval index, 1-based.
    pub interval: u64,
    /// Signature the interval was classified with.
    pub signature: Signature,
    /// `true` when the signature holds 6-bit codes, `false` for the
    /// low-activity raw fallback.
    pub coded: bool,
    /// Assigned phase.
    pub phase: PhaseId,
    /// `true` when this interval created its phase.
    pub is_new: bool,
}

impl fmt::Display for IntervalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.signature, self.phase)
    }
}

/// Append-only destination for interval records.
pub trait RecordSink {
    /// Append one record.
    fn emit(&mut self, record: &IntervalRecord) -> Result<(), PhaseError>;

    /// Push buffered output to its destination.
    fn flush(&mut self) -> Result<(), PhaseError> {
        Ok(())
    }
}

impl RecordSink for Vec<IntervalRecord> {
    fn emit(&mut self, record: &IntervalRecord) -> Result<(), PhaseError> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn emit(&mut self, record: &IntervalRecord) -> Result<(), PhaseError> {
        (**self).emit(record)
    }

    fn flush(&mut self) -> Result<(), PhaseError> {
        (**self).flush()
    }
}

#[cfg(feature = "std")]
pub use self::writer::WriterSink;

#[cfg(feature = "std")]
mod writer {
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use std::path::Path;

    use super::{IntervalRecord, RecordSink};
    use crate::error::PhaseError;

    /// Writes one text line per record to any [`Write`] destination.
    #[derive(Debug)]
    pub struct WriterSink<W: Write> {
        writer: W,
        lines: u64,
    }

    impl WriterSink<BufWriter<File>> {
        /// Create (truncating) the output file at `path`.
        ///
        /// Fails before any event is processed if the destination cannot be
        /// opened.
        pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, PhaseError> {
            let path = path.as_ref();
            let file = File::create(path)?;
            tracing::info!(path = %path.display(), "opened interval output");
            Ok(Self::new(BufWriter::new(file)))
        }
    }

    impl<W: Write> WriterSink<W> {
        /// Wrap an already-open writer.
        pub fn new(writer: W) -> Self {
            Self { writer, lines: 0 }
        }

        /// Lines written so far.
        pub fn lines(&self) -> u64 {
            self.lines
        }

        /// Flush and return the inner writer.
        pub fn into_inner(mut self) -> Result<W, PhaseError> {
            self.writer.flush()?;
            Ok(self.writer)
        }
    }

    impl<W: Write> RecordSink for WriterSink<W> {
        fn emit(&mut self, record: &IntervalRecord) -> Result<(), PhaseError> {
            writeln!(self.writer, "{record}")?;
            self.lines += 1;
            Ok(())
        }

        fn flush(&mut self) -> Result<(), PhaseError> {
            self.writer.flush()?;
            Ok(())
        }
    }
}
