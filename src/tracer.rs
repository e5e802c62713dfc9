/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! The tracing context: one stream's accumulator plus everything an interval
//! boundary drives.
//!
//! ```text
//! event ─► IntervalAccumulator ─(boundary)─► project ─► quantize ─► classify ─► sink
//! ```
//!
//! [`PhaseTracer`] owns the accumulator, the shared projection matrix, the
//! quantizer, a [`PhaseClassifier`] and a [`RecordSink`]. There is no global
//! state: several tracers (one per instruction stream) can run side by side,
//! sharing the matrix and, through `sync::SharedPhaseTable`, the phase table.

use alloc::sync::Arc;

use hashbrown::HashMap;

use crate::accumulator::{ExecutionEvent, IntervalAccumulator};
use crate::config::TracerConfig;
use crate::error::PhaseError;
use crate::phase::{PhaseClassifier, PhaseId, PhaseTable};
use crate::projection::ProjectionMatrix;
use crate::quantize::Quantizer;
use crate::sink::{IntervalRecord, RecordSink};
use crate::vector::FrequencyVector;

// ─── RunSummary ─────────────────────────────────────────────────────────────

/// Totals reported when a run finishes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    /// Intervals closed, including a flushed final partial interval.
    pub intervals: u64,
    /// Instructions observed.
    pub instructions: u64,
    /// Memory accesses observed (sum of qualifying weights).
    pub memory_accesses: u64,
    /// Intervals that created a new phase.
    pub phases_discovered: u64,
    /// Intervals that fell back to raw (unquantized) signatures.
    pub low_activity_intervals: u64,
    /// Phases evicted from a bounded table during this run.
    pub evictions: u64,
    /// Intervals assigned to each phase id, evicted phases included.
    pub per_phase: HashMap<PhaseId, u64>,
}

impl RunSummary {
    /// Phase with the most intervals; the lowest id wins ties.
    pub fn dominant_phase(&self) -> Option<(PhaseId, u64)> {
        self.per_phase
            .iter()
            .map(|(&id, &n)| (id, n))
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    }
}

// ─── PhaseTracer ────────────────────────────────────────────────────────────

/// Drives interval accumulation, signature derivation and classification for
/// one instruction stream.
pub struct PhaseTracer<C: PhaseClassifier, S: RecordSink> {
    accumulator: IntervalAccumulator,
    matrix: Arc<ProjectionMatrix>,
    quantizer: Quantizer,
    classifier: C,
    sink: S,
    summary: RunSummary,
}

impl<S: RecordSink> PhaseTracer<PhaseTable, S> {
    /// Build a tracer that owns a fresh phase table configured from `config`.
    pub fn new(
        config: &TracerConfig,
        matrix: impl Into<Arc<ProjectionMatrix>>,
        sink: S,
    ) -> Result<Self, PhaseError> {
        let table = PhaseTable::with_capacity(config.threshold, config.capacity)?;
        Self::with_classifier(config, matrix, table, sink)
    }
}

impl<C: PhaseClassifier, S: RecordSink> PhaseTracer<C, S> {
    /// Build a tracer around an existing classifier (for instance a shared
    /// table or one restored from a snapshot).
    ///
    /// The matrix must be `signature_len × vector_len`.
    pub fn with_classifier(
        config: &TracerConfig,
        matrix: impl Into<Arc<ProjectionMatrix>>,
        classifier: C,
        sink: S,
    ) -> Result<Self, PhaseError> {
        config.validate()?;
        let matrix = matrix.into();
        if matrix.rows() != config.signature_len {
            return Err(PhaseError::LengthMismatch {
                expected: config.signature_len,
                found: matrix.rows(),
            });
        }
        if matrix.cols() != config.vector_len {
            return Err(PhaseError::LengthMismatch {
                expected: config.vector_len,
                found: matrix.cols(),
            });
        }
        Ok(Self {
            accumulator: IntervalAccumulator::new(config.vector_len, config.interval_size)?,
            matrix,
            quantizer: Quantizer::new(config.low_activity),
            classifier,
            sink,
            summary: RunSummary::default(),
        })
    }

    /// Feed one observed event; returns the record of the interval it closed.
    pub fn observe(&mut self, event: &ExecutionEvent) -> Result<Option<IntervalRecord>, PhaseError> {
        match self.accumulator.observe(event)? {
            Some(snapshot) => self.close_interval(snapshot).map(Some),
            None => Ok(None),
        }
    }

    /// Feed one instruction with an explicit qualifying weight.
    pub fn record(
        &mut self,
        address: u64,
        is_transfer: bool,
        weight: u64,
    ) -> Result<Option<IntervalRecord>, PhaseError> {
        match self.accumulator.record(address, is_transfer, weight)? {
            Some(snapshot) => self.close_interval(snapshot).map(Some),
            None => Ok(None),
        }
    }

    /// Flush the final partial interval (if it sampled anything), flush the
    /// sink and report run totals.
    pub fn finish(&mut self) -> Result<RunSummary, PhaseError> {
        if let Some(partial) = self.accumulator.flush_partial() {
            tracing::info!(
                interval = self.accumulator.intervals(),
                samples = partial.samples(),
                "flushing final partial interval"
            );
            self.close_interval(partial)?;
        }
        self.sink.flush()?;

        let mut summary = self.summary.clone();
        summary.intervals = self.accumulator.intervals();
        summary.instructions = self.accumulator.instructions();
        summary.memory_accesses = self.accumulator.memory_accesses();
        tracing::info!(
            intervals = summary.intervals,
            memory_accesses = summary.memory_accesses,
            phases = summary.phases_discovered,
            "run finished"
        );
        Ok(summary)
    }

    fn close_interval(&mut self, snapshot: FrequencyVector) -> Result<IntervalRecord, PhaseError> {
        let raw = self.matrix.project(&snapshot)?;
        let quantized = self.quantizer.apply(&raw)?;
        let coded = quantized.is_coded();
        let signature = quantized.into_signature();

        let decision = self.classifier.classify(signature.clone())?;
        let record = IntervalRecord {
            interval: self.accumulator.intervals(),
            signature,
            coded,
            phase: decision.id,
            is_new: decision.is_new,
        };
        self.sink.emit(&record)?;

        if decision.is_new {
            self.summary.phases_discovered += 1;
        }
        if decision.evicted.is_some() {
            self.summary.evictions += 1;
        }
        if !coded {
            self.summary.low_activity_intervals += 1;
        }
        *self.summary.per_phase.entry(decision.id).or_insert(0) += 1;
        Ok(record)
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    /// The stream's accumulator.
    pub fn accumulator(&self) -> &IntervalAccumulator {
        &self.accumulator
    }

    /// The classifier intervals are matched against.
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// The record sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the tracer, returning its classifier and sink.
    pub fn into_parts(self) -> (C, S) {
        (self.classifier, self.sink)
    }
}

impl<C: PhaseClassifier, S: RecordSink> core::fmt::Debug for PhaseTracer<C, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PhaseTracer")
            .field("accumulator", &self.accumulator)
            .field("signature_len", &self.matrix.rows())
            .field("quantizer", &self.quantizer)
            .field("intervals", &self.accumulator.intervals())
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
