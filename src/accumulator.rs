/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Per-stream interval accumulation.
//!
//! - [`ExecutionEvent`]: one observed instruction, as reported by the host
//!   instrumentation.
//! - [`IntervalAccumulator`]: samples control-flow transfers into a
//!   [`FrequencyVector`] and detects interval boundaries.
//!
//! # Event handling
//!
//! ```text
//! instructions += 1; straight_line += 1
//! pending += weight                       (weight = memory flags set, 0..=3)
//! if transfer: vector[address & (B-1)] += straight_line; straight_line = 0
//! if pending >= interval_size: pending -= interval_size → boundary
//! ```
//!
//! # Invariants
//!
//! - **IA-001**: at most one boundary per event; the residual above the
//!   interval size is carried into the next interval, never dropped.
//! - **IA-002**: at a boundary the vector is handed out as a snapshot and
//!   cleared, so the next event accumulates into a fresh interval.
//! - **IA-003**: one accumulator serves one instruction stream. Streams that
//!   run concurrently each need their own accumulator.

use crate::error::PhaseError;
use crate::vector::FrequencyVector;

// ─── ExecutionEvent ─────────────────────────────────────────────────────────

/// One executed instruction as observed by the instrumentation host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionEvent {
    /// Instruction address.
    pub address: u64,
    /// Call, branch or return.
    pub is_transfer: bool,
    /// Reads memory.
    pub reads_memory: bool,
    /// Writes memory.
    pub writes_memory: bool,
    /// Has a second memory read operand.
    pub reads_memory_twice: bool,
}

impl ExecutionEvent {
    /// A straight-line instruction with no memory traffic.
    pub fn instruction(address: u64) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// A control-flow transfer with no memory traffic.
    pub fn transfer(address: u64) -> Self {
        Self {
            address,
            is_transfer: true,
            ..Self::default()
        }
    }

    /// Mark the instruction as reading memory.
    pub fn with_read(mut self) -> Self {
        self.reads_memory = true;
        self
    }

    /// Mark the instruction as writing memory.
    pub fn with_write(mut self) -> Self {
        self.writes_memory = true;
        self
    }

    /// Mark the instruction as having a second memory read.
    pub fn with_second_read(mut self) -> Self {
        self.reads_memory_twice = true;
        self
    }

    /// Qualifying weight: number of memory-access flags set.
    pub fn memory_weight(&self) -> u64 {
        self.reads_memory as u64 + self.writes_memory as u64 + self.reads_memory_twice as u64
    }
}

// ─── IntervalAccumulator ────────────────────────────────────────────────────

/// Builds one basic block vector per interval of qualifying events.
#[derive(Clone, Debug)]
pub struct IntervalAccumulator {
    vector: FrequencyVector,
    interval_size: u64,
    /// Qualifying weight accumulated toward the next boundary.
    pending: u64,
    /// Instructions since the last control-flow transfer.
    straight_line: u64,
    instructions: u64,
    memory_accesses: u64,
    intervals: u64,
}

impl IntervalAccumulator {
    /// Construct an accumulator over a `vector_len`-bucket histogram that
    /// closes an interval every `interval_size` qualifying events.
    pub fn new(vector_len: usize, interval_size: u64) -> Result<Self, PhaseError> {
        if interval_size == 0 {
            return Err(PhaseError::InvalidConfig("interval size must be non-zero"));
        }
        Ok(Self {
            vector: FrequencyVector::new(vector_len)?,
            interval_size,
            pending: 0,
            straight_line: 0,
            instructions: 0,
            memory_accesses: 0,
            intervals: 0,
        })
    }

    /// Feed one observed event. Returns the finished interval's vector when
    /// this event crosses a boundary.
    pub fn observe(&mut self, event: &ExecutionEvent) -> Result<Option<FrequencyVector>, PhaseError> {
        self.record(event.address, event.is_transfer, event.memory_weight())
    }

    /// Feed one instruction with an explicit qualifying weight.
    pub fn record(
        &mut self,
        address: u64,
        is_transfer: bool,
        weight: u64,
    ) -> Result<Option<FrequencyVector>, PhaseError> {
        self.instructions += 1;
        self.straight_line += 1;
        self.pending = self.pending.saturating_add(weight);
        self.memory_accesses = self.memory_accesses.saturating_add(weight);

        if is_transfer {
            let bucket = self.vector.bucket_for(address);
            self.vector.sample(bucket, self.straight_line)?;
            self.straight_line = 0;
        }

        if self.pending >= self.interval_size {
            self.pending -= self.interval_size;
            self.intervals += 1;
            return Ok(Some(self.vector.take_snapshot()));
        }
        Ok(None)
    }

    /// Close the current partial interval at end of stream.
    ///
    /// Returns `None` when nothing was sampled since the last boundary.
    pub fn flush_partial(&mut self) -> Option<FrequencyVector> {
        if self.vector.samples() == 0 {
            return None;
        }
        self.pending = 0;
        self.intervals += 1;
        Some(self.vector.take_snapshot())
    }

    // ── Read accessors ─────────────────────────────────────────────────────

    /// Histogram of the interval in progress.
    pub fn vector(&self) -> &FrequencyVector {
        &self.vector
    }

    /// Qualifying events per interval.
    pub fn interval_size(&self) -> u64 {
        self.interval_size
    }

    /// Qualifying weight carried toward the next boundary.
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Instructions since the last control-flow transfer.
    pub fn straight_line(&self) -> u64 {
        self.straight_line
    }

    /// Instructions observed since construction.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Memory accesses (total qualifying weight) since construction.
    pub fn memory_accesses(&self) -> u64 {
        self.memory_accesses
    }

    /// Intervals closed so far, the flushed partial one included.
    pub fn intervals(&self) -> u64 {
        self.intervals
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
