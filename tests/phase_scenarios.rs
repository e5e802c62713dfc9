//! End-to-end phase tracking scenarios.
//!
//! Drives a [`PhaseTracer`] with synthetic instruction streams and checks the
//! histograms, signatures and phase ids that come out the other end.

use bbv_phase::{
    ExecutionEvent, IntervalRecord, LowActivityPolicy, PhaseError, PhaseId, PhaseTable,
    PhaseTracer, ProjectionMatrix, TracerConfig,
};

// ─── helpers ─────────────────────────────────────────────────────────────────

/// `rows × (rows · width)` matrix whose row `i` sums buckets `[i·width, (i+1)·width)`.
fn block_matrix(rows: usize, width: usize) -> ProjectionMatrix {
    let cols = rows * width;
    let weights = (0..rows * cols)
        .map(|k| if (k % cols) / width == k / cols { 1.0 } else { 0.0 })
        .collect();
    ProjectionMatrix::new(rows, cols, weights).unwrap()
}

fn halves_matrix() -> ProjectionMatrix {
    ProjectionMatrix::from_rows(&[
        [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
    ])
    .unwrap()
}

fn small_config(interval_size: u64) -> TracerConfig {
    TracerConfig {
        signature_len: 2,
        vector_len: 8,
        interval_size,
        threshold: 0.5,
        ..TracerConfig::default()
    }
}

/// Events yielding histogram `[2, 0, 1, 0, 0, 3, 0, 1]` and 4 memory accesses.
fn scenario_interval() -> Vec<ExecutionEvent> {
    vec![
        ExecutionEvent::instruction(0x100).with_read(),
        ExecutionEvent::transfer(0x100),
        ExecutionEvent::transfer(0x102).with_write(),
        ExecutionEvent::instruction(0x105),
        ExecutionEvent::instruction(0x105).with_read(),
        ExecutionEvent::transfer(0x105),
        ExecutionEvent::transfer(0x107).with_read(),
    ]
}

/// One loop iteration: for each `(straight_line, bucket)` pair, execute
/// `straight_line - 1` plain instructions then a transfer landing in `bucket`.
/// Every instruction reads memory.
fn loop_body(base: u64, body: &[(u64, u64)]) -> Vec<ExecutionEvent> {
    let mut events = Vec::new();
    for &(run, bucket) in body {
        for _ in 1..run {
            events.push(ExecutionEvent::instruction(base + 0x40 * 3 + 1).with_read());
        }
        events.push(ExecutionEvent::transfer(base + bucket).with_read());
    }
    events
}

fn run_iterations<S: bbv_phase::RecordSink>(
    tracer: &mut PhaseTracer<PhaseTable, S>,
    body: &[ExecutionEvent],
    iterations: usize,
) -> Vec<IntervalRecord> {
    let mut records = Vec::new();
    for _ in 0..iterations {
        for ev in body {
            if let Some(r) = tracer.observe(ev).unwrap() {
                records.push(r);
            }
        }
    }
    records
}

// Rows 0..3 weighted 4, 3, 2, 1 per iteration.
const LOOP_A: &[(u64, u64)] = &[(4, 0), (3, 8), (2, 16), (1, 24)];
// Rows 4..7 weighted 1, 2, 3, 4 per iteration.
const LOOP_B: &[(u64, u64)] = &[(1, 32), (2, 40), (3, 48), (4, 56)];

// ─── scenario 1: first interval creates phase 1 ─────────────────────────────

#[test]
fn test_first_interval_creates_new_phase() {
    let mut tracer =
        PhaseTracer::new(&small_config(4), halves_matrix(), Vec::<IntervalRecord>::new()).unwrap();

    let events = scenario_interval();
    let (last, head) = events.split_last().unwrap();
    for ev in head {
        assert!(tracer.observe(ev).unwrap().is_none());
        assert_eq!(tracer.accumulator().intervals(), 0);
    }
    // Histogram just before the boundary event.
    assert_eq!(tracer.accumulator().vector().bins(), &[2, 0, 1, 0, 0, 3, 0, 0]);

    let record = tracer.observe(last).unwrap().expect("boundary");
    assert_eq!(record.signature.elements(), &[3, 4]);
    assert!(!record.coded, "avg 3 is below the quantization floor");
    assert!(record.is_new);
    assert_eq!(record.phase, PhaseId(1));

    let table = tracer.classifier();
    assert_eq!(table.len(), 1);
    assert_eq!(table.entries()[0].signature.elements(), &[3, 4]);
    assert_eq!(table.entries()[0].occurrences, 1);
}

// ─── scenario 2: identical interval matches phase 1 ─────────────────────────

#[test]
fn test_identical_interval_matches_existing_phase() {
    let mut tracer =
        PhaseTracer::new(&small_config(4), halves_matrix(), Vec::<IntervalRecord>::new()).unwrap();

    for ev in scenario_interval().iter().chain(scenario_interval().iter()) {
        tracer.observe(ev).unwrap();
    }

    let records = tracer.sink();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].signature.elements(), &[3, 4]);
    assert_eq!(records[1].phase, PhaseId(1));
    assert!(!records[1].is_new);

    let entry = tracer.classifier().get(PhaseId(1)).unwrap();
    assert_eq!(entry.occurrences, 2);
    assert_eq!(entry.reuse_distance, 1);
    assert_eq!(tracer.classifier().len(), 1);
}

// ─── low-activity intervals ─────────────────────────────────────────────────

#[test]
fn test_low_activity_intervals_counted_in_summary() {
    let mut tracer =
        PhaseTracer::new(&small_config(4), halves_matrix(), Vec::<IntervalRecord>::new()).unwrap();
    for ev in scenario_interval().iter().chain(scenario_interval().iter()) {
        tracer.observe(ev).unwrap();
    }
    let summary = tracer.finish().unwrap();
    assert_eq!(summary.intervals, 2);
    assert_eq!(summary.low_activity_intervals, 2);
    assert!(tracer.sink().iter().all(|r| !r.coded));
}

#[test]
fn test_reject_policy_consumes_interval_and_reports_error() {
    let cfg = TracerConfig {
        low_activity: LowActivityPolicy::Reject,
        ..small_config(4)
    };
    let mut tracer = PhaseTracer::new(&cfg, halves_matrix(), Vec::<IntervalRecord>::new()).unwrap();

    let events = scenario_interval();
    let (last, head) = events.split_last().unwrap();
    for ev in head {
        assert!(tracer.observe(ev).unwrap().is_none());
    }
    // Raw [3, 4]: avg 3 has its top bit at index 1.
    let err = tracer.observe(last).unwrap_err();
    assert!(matches!(err, PhaseError::InsufficientRange { shift: 1 }));
    assert_eq!(tracer.accumulator().intervals(), 1);
    assert_eq!(tracer.accumulator().vector().samples(), 0);
    assert!(tracer.sink().is_empty());
    assert!(tracer.classifier().is_empty());

    // A busy interval afterwards classifies normally: raw [40, 0], avg 20.
    for _ in 0..39 {
        assert!(tracer.record(0x1, false, 0).unwrap().is_none());
    }
    let record = tracer.record(0x1, true, 4).unwrap().expect("boundary");
    assert!(record.coded);
    assert_eq!(record.signature.elements(), &[40, 0]);
    assert_eq!(record.phase, PhaseId(1));

    let summary = tracer.finish().unwrap();
    assert_eq!(summary.intervals, 2);
    assert_eq!(summary.low_activity_intervals, 0);
    assert_eq!(summary.phases_discovered, 1);
}

// ─── scenario 3: residual carries across the boundary ───────────────────────

#[test]
fn test_boundary_residual_carries() {
    let matrix = block_matrix(2, 4);
    let mut tracer = PhaseTracer::new(&small_config(10), matrix, Vec::<IntervalRecord>::new()).unwrap();

    assert!(tracer.record(0x1, true, 3).unwrap().is_none());
    assert!(tracer.record(0x2, true, 3).unwrap().is_none());
    let closed = tracer.record(0x3, true, 5).unwrap();
    assert!(closed.is_some(), "cumulative 11 must close the interval");
    assert_eq!(tracer.accumulator().pending(), 1);

    // The residual does not trigger a second boundary on its own.
    assert!(tracer.record(0x4, true, 0).unwrap().is_none());
    assert!(tracer.record(0x5, true, 8).unwrap().is_none());
    assert!(tracer.record(0x6, true, 1).unwrap().is_some());
    assert_eq!(tracer.sink().len(), 2);
}

// ─── scenario 4: recurring program phases ───────────────────────────────────

#[test]
fn test_recurring_loops_map_to_stable_ids() {
    let cfg = TracerConfig {
        signature_len: 8,
        vector_len: 64,
        interval_size: 1000,
        threshold: 0.4,
        ..TracerConfig::default()
    };
    let mut tracer =
        PhaseTracer::new(&cfg, block_matrix(8, 8), Vec::<IntervalRecord>::new()).unwrap();

    let a = loop_body(0x40_0000, LOOP_A);
    let b = loop_body(0x40_0000, LOOP_B);
    assert_eq!(a.len(), 10);
    assert_eq!(b.len(), 10);

    // 100 iterations of 10 reads = one interval.
    let mut records = run_iterations(&mut tracer, &a, 300);
    records.extend(run_iterations(&mut tracer, &b, 200));
    records.extend(run_iterations(&mut tracer, &a, 100));

    let ids: Vec<u32> = records.iter().map(|r| r.phase.0).collect();
    assert_eq!(ids, vec![1, 1, 1, 2, 2, 1]);
    assert!(records.iter().all(|r| r.coded));

    // Rows 400/300/200/100: avg 125 → shift 2, ceiling 250.
    assert_eq!(records[0].signature.elements(), &[63, 63, 50, 25, 0, 0, 0, 0]);
    assert_eq!(records[3].signature.elements(), &[0, 0, 0, 0, 25, 50, 63, 63]);

    // Half an interval of loop B: smaller magnitudes, same 6-bit signature.
    run_iterations(&mut tracer, &b, 50);
    let summary = tracer.finish().unwrap();
    let last = tracer.sink().last().unwrap();
    assert_eq!(last.signature.elements(), &[0, 0, 0, 0, 25, 50, 63, 63]);
    assert_eq!(last.phase, PhaseId(2));

    assert_eq!(summary.intervals, 7);
    assert_eq!(summary.phases_discovered, 2);
    assert_eq!(summary.low_activity_intervals, 0);
    assert_eq!(summary.memory_accesses, 6500);
    assert_eq!(summary.instructions, 6500);
    assert_eq!(summary.per_phase[&PhaseId(1)], 4);
    assert_eq!(summary.per_phase[&PhaseId(2)], 3);
    assert_eq!(summary.dominant_phase(), Some((PhaseId(1), 4)));

    let table = tracer.classifier();
    let a_entry = table.get(PhaseId(1)).unwrap();
    assert_eq!(a_entry.occurrences, 4);
    // Last two matches of A were intervals 3 and 6.
    assert_eq!(a_entry.reuse_distance, 3);
}

#[test]
fn test_bounded_table_rediscovers_evicted_phase() {
    let cfg = TracerConfig {
        signature_len: 8,
        vector_len: 64,
        interval_size: 1000,
        threshold: 0.4,
        capacity: Some(1),
        ..TracerConfig::default()
    };
    let mut tracer =
        PhaseTracer::new(&cfg, block_matrix(8, 8), Vec::<IntervalRecord>::new()).unwrap();

    let a = loop_body(0x40_0000, LOOP_A);
    let b = loop_body(0x40_0000, LOOP_B);
    let mut records = run_iterations(&mut tracer, &a, 100);
    records.extend(run_iterations(&mut tracer, &b, 100));
    records.extend(run_iterations(&mut tracer, &a, 100));

    let ids: Vec<u32> = records.iter().map(|r| r.phase.0).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(records.iter().all(|r| r.is_new));

    let summary = tracer.finish().unwrap();
    assert_eq!(summary.evictions, 2);
    assert_eq!(tracer.classifier().len(), 1);
}

#[test]
fn test_repeated_runs_are_deterministic() {
    let run = || {
        let cfg = TracerConfig {
            signature_len: 8,
            vector_len: 64,
            interval_size: 700,
            threshold: 0.3,
            ..TracerConfig::default()
        };
        let mut tracer =
            PhaseTracer::new(&cfg, block_matrix(8, 8), Vec::<IntervalRecord>::new()).unwrap();
        let a = loop_body(0x1000, LOOP_A);
        let b = loop_body(0x1000, LOOP_B);
        for (body, n) in [(&a, 130), (&b, 90), (&a, 45), (&b, 200), (&a, 70)] {
            run_iterations(&mut tracer, body, n);
        }
        tracer.finish().unwrap();
        let (_, sink) = tracer.into_parts();
        sink.iter().map(|r| r.to_string()).collect::<Vec<_>>()
    };
    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}

// ─── shared table across streams ────────────────────────────────────────────

#[cfg(feature = "std")]
#[test]
fn test_two_streams_share_one_table() {
    use bbv_phase::sync::SharedPhaseTable;

    let cfg = TracerConfig {
        signature_len: 8,
        vector_len: 64,
        interval_size: 1000,
        threshold: 0.4,
        ..TracerConfig::default()
    };
    let matrix = std::sync::Arc::new(block_matrix(8, 8));
    let shared = SharedPhaseTable::new(PhaseTable::new(cfg.threshold).unwrap());

    let mut first = PhaseTracer::with_classifier(
        &cfg,
        matrix.clone(),
        shared.clone(),
        Vec::<IntervalRecord>::new(),
    )
    .unwrap();
    let mut second = PhaseTracer::with_classifier(
        &cfg,
        matrix,
        shared.clone(),
        Vec::<IntervalRecord>::new(),
    )
    .unwrap();

    let a = loop_body(0x40_0000, LOOP_A);
    let b = loop_body(0x40_0000, LOOP_B);
    for _ in 0..100 {
        for ev in &a {
            first.observe(ev).unwrap();
        }
        for ev in &b {
            second.observe(ev).unwrap();
        }
    }
    // Second stream now runs loop A and must reuse the first stream's phase.
    for _ in 0..100 {
        for ev in &a {
            second.observe(ev).unwrap();
        }
    }

    assert_eq!(first.sink()[0].phase, PhaseId(1));
    assert_eq!(second.sink()[0].phase, PhaseId(2));
    assert_eq!(second.sink()[1].phase, PhaseId(1));
    assert_eq!(shared.len(), 2);
}
