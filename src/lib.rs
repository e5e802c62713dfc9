//! # bbv-phase
//!
//! Online program phase classification from basic block vectors.
//!
//! ---
//!
//! A running program is cut into intervals of a fixed number of memory
//! accesses. Each interval is summarised as a histogram of where execution
//! went (a basic block vector), squeezed through a fixed random projection
//! into a handful of dimensions, quantized to 6 bits per element and matched
//! against the phases seen so far. A close match reuses that phase's id;
//! anything else becomes a new phase.
//!
//! Capturing the raw instruction stream is the host's job. This crate only
//! consumes `(address, transfer?, memory flags)` events in arrival order.
//!
//! ## The pipeline
//!
//! ```text
//! ExecutionEvent → IntervalAccumulator → FrequencyVector
//!                        │ (boundary)
//!                        ▼
//!        ProjectionMatrix::project → Quantizer → PhaseTable::find → RecordSink
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`vector`] | [`FrequencyVector`] | Power-of-two histogram over code-location buckets |
//! | [`projection`] | [`ProjectionMatrix`] | `E × B` random projection to a raw signature |
//! | [`signature`] | [`Signature`] | Signature storage and normalized Manhattan distance |
//! | [`quantize`] | [`Quantizer`], [`LowActivityPolicy`] | Magnitude-adaptive 6-bit encoding |
//! | [`phase`] | [`PhaseTable`], [`PhaseClassifier`] | Nearest-neighbour phase matching with optional LRU bound |
//! | [`accumulator`] | [`IntervalAccumulator`], [`ExecutionEvent`] | Event sampling and interval boundaries |
//! | [`tracer`] | [`PhaseTracer`], [`RunSummary`] | Per-stream context tying the pipeline together |
//! | [`sink`] | [`RecordSink`], [`IntervalRecord`] | One text line per interval |
//! | [`config`] | [`TracerConfig`] | Tunables with validated defaults |
//! | `sync` | `SharedPhaseTable` | Lock-guarded table shared by several streams (requires `std`) |
//! | `snapshot` | `PhaseTableSnapshot` | Persist and restore a table (requires `serde`) |
//!
//! ## `no_std`
//!
//! The crate is `#![no_std]` (with `alloc`) by default. Enable `std` for the
//! file-backed `sink::WriterSink` and the shared table; enable `serde` for
//! serialization of configs, signatures, records and table snapshots.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod accumulator;
pub mod config;
pub mod error;
pub mod phase;
pub mod projection;
pub mod quantize;
pub mod signature;
pub mod sink;
pub mod tracer;
pub mod vector;

#[cfg(feature = "serde")]
pub mod snapshot;

#[cfg(feature = "std")]
pub mod sync;

pub use accumulator::{ExecutionEvent, IntervalAccumulator};
pub use config::TracerConfig;
pub use error::PhaseError;
pub use phase::{PhaseClassifier, PhaseEntry, PhaseId, PhaseMatch, PhaseTable};
pub use projection::ProjectionMatrix;
pub use quantize::{LowActivityPolicy, Quantized, Quantizer};
pub use signature::Signature;
pub use sink::{IntervalRecord, RecordSink};
pub use tracer::{PhaseTracer, RunSummary};
pub use vector::FrequencyVector;
