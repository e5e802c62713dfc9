//! Classify a synthetic instruction stream and print one line per interval.
//!
//! The stream alternates between three loop nests with different control-flow
//! footprints. The projection matrix is filled from a fixed-seed generator so
//! every run prints the same phase ids.
//!
//! ```text
//! cargo run --example synthetic_trace --features std [OUTPUT]
//! ```
//!
//! With `OUTPUT` the records go to that file instead of stdout.

use std::io;

use bbv_phase::sink::WriterSink;
use bbv_phase::{ExecutionEvent, PhaseError, PhaseTracer, ProjectionMatrix, RecordSink, TracerConfig};

const SIGNATURE_LEN: usize = 16;
const VECTOR_LEN: usize = 1024;
const INTERVAL_SIZE: u64 = 20_000;

/// xorshift64*; only used to fill the matrix and jitter the loops.
struct Rng(u64);

impl Rng {
    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        self.0.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    /// Uniform in `[-1, 1)`.
    fn next_weight(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 52) as f64 - 1.0
    }
}

fn random_matrix(rng: &mut Rng) -> Result<ProjectionMatrix, PhaseError> {
    let weights = (0..SIGNATURE_LEN * VECTOR_LEN)
        .map(|_| rng.next_weight())
        .collect();
    ProjectionMatrix::new(SIGNATURE_LEN, VECTOR_LEN, weights)
}

/// A loop nest: basic blocks given as `(start address, length)`.
struct LoopNest {
    blocks: Vec<(u64, u64)>,
}

impl LoopNest {
    fn new(rng: &mut Rng, base: u64, blocks: usize) -> Self {
        let blocks = (0..blocks as u64)
            .map(|i| (base + i * 0x9c + (rng.next_u64() & 0x1c), 3 + rng.next_u64() % 12))
            .collect();
        Self { blocks }
    }

    /// Run the nest `iterations` times. Every third instruction touches memory.
    fn run<S: RecordSink>(
        &self,
        tracer: &mut PhaseTracer<bbv_phase::PhaseTable, S>,
        iterations: usize,
    ) -> Result<(), PhaseError> {
        for _ in 0..iterations {
            for &(start, len) in &self.blocks {
                for k in 0..len {
                    let addr = start + k * 4;
                    let mut ev = if k + 1 == len {
                        ExecutionEvent::transfer(addr)
                    } else {
                        ExecutionEvent::instruction(addr)
                    };
                    if addr % 3 == 0 {
                        ev = ev.with_read();
                    }
                    if addr % 7 == 0 {
                        ev = ev.with_write();
                    }
                    tracer.observe(&ev)?;
                }
            }
        }
        Ok(())
    }
}

fn drive<S: RecordSink>(sink: S) -> Result<(), PhaseError> {
    let mut rng = Rng(0x9e37_79b9_7f4a_7c15);
    let config = TracerConfig {
        signature_len: SIGNATURE_LEN,
        vector_len: VECTOR_LEN,
        interval_size: INTERVAL_SIZE,
        ..TracerConfig::default()
    };
    let matrix = random_matrix(&mut rng)?;
    let mut tracer = PhaseTracer::new(&config, matrix, sink)?;

    let init = LoopNest::new(&mut rng, 0x40_1000, 6);
    let compute = LoopNest::new(&mut rng, 0x40_8000, 14);
    let reduce = LoopNest::new(&mut rng, 0x41_2000, 4);

    init.run(&mut tracer, 2_000)?;
    for _ in 0..3 {
        compute.run(&mut tracer, 4_000)?;
        reduce.run(&mut tracer, 3_000)?;
    }
    init.run(&mut tracer, 500)?;

    let summary = tracer.finish()?;
    eprintln!(
        "{} intervals, {} instructions, {} memory accesses, {} phases",
        summary.intervals, summary.instructions, summary.memory_accesses, summary.phases_discovered
    );
    if let Some((id, n)) = summary.dominant_phase() {
        eprintln!("dominant phase {id}: {n} intervals");
    }
    Ok(())
}

fn main() -> Result<(), PhaseError> {
    match std::env::args().nth(1) {
        Some(path) => drive(WriterSink::create(path)?),
        None => drive(WriterSink::new(io::stdout().lock())),
    }
}
