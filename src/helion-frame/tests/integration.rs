//! Integration tests for the helion-frame crate.
//!
//! These tests verify end-to-end analysis chains over the in-memory
//! backend: booking, lazy execution, per-slot parallelism, merging and
//! reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common_config::{ExecutionConfig, HelionConfig};
use common_error::HelionError;
use helion_core::ArrayView;
use helion_frame::{EventFrame, FrameValue, ResultHandle};
use helion_hist::{Hist1D, Hist2D, Histogram};
use helion_storage::{EventTable, MemoryStorage, MemoryTable};

/// Frame over a single i32 column `x`.
fn int_frame(values: Vec<i32>) -> EventFrame {
    let table = MemoryTable::builder("events")
        .with_i32("x", values)
        .build()
        .unwrap();
    EventFrame::new(Arc::new(table), &["x"])
}

/// Frame over a single f64 column `v`, which is also the default column.
fn float_frame(values: Vec<f64>) -> EventFrame {
    let table = MemoryTable::builder("events")
        .with_f64("v", values)
        .build()
        .unwrap();
    EventFrame::new(Arc::new(table), &["v"])
}

fn parallel_config(n: usize) -> HelionConfig {
    HelionConfig {
        execution: ExecutionConfig::with_parallelism(n),
        ..HelionConfig::default()
    }
}

// =============================================================================
// Counting and filtering
// =============================================================================

#[test]
fn test_count_with_filter() {
    let frame = int_frame(vec![1, 2, 3, 4, 5]);
    let count = frame.filter(|x: i32| x > 2, &["x"]).unwrap().count().unwrap();
    assert_eq!(*count.get().unwrap(), 3);
}

#[test]
fn test_count_without_filter() {
    let frame = int_frame(vec![1, 2, 3]);
    assert_eq!(*frame.count().unwrap().get().unwrap(), 3);
}

#[test]
fn test_chained_filters_short_circuit() {
    let second_calls = Arc::new(AtomicUsize::new(0));
    let frame = int_frame((1..=10).collect());

    let counting = Arc::clone(&second_calls);
    let count = frame
        .filter(|x: i32| x % 2 == 0, &["x"])
        .unwrap()
        .filter(
            move |x: i32| {
                counting.fetch_add(1, Ordering::SeqCst);
                x > 5
            },
            &["x"],
        )
        .unwrap()
        .count()
        .unwrap();

    assert_eq!(*count.get().unwrap(), 3);
    // The second predicate only ran on the five rows the first accepted.
    assert_eq!(second_calls.load(Ordering::SeqCst), 5);
}

// =============================================================================
// Laziness
// =============================================================================

#[test]
fn test_booking_is_lazy() {
    let calls = Arc::new(AtomicUsize::new(0));
    let frame = int_frame(vec![1, 2, 3, 4]);

    let counting = Arc::clone(&calls);
    let count = frame
        .filter(
            move |_x: i32| {
                counting.fetch_add(1, Ordering::SeqCst);
                true
            },
            &["x"],
        )
        .unwrap()
        .count()
        .unwrap();

    // Booking alone reads nothing and invokes nothing.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!count.is_ready());

    assert_eq!(*count.get().unwrap(), 4);
    assert!(count.is_ready());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_one_pass_serves_all_bookings() {
    let calls = Arc::new(AtomicUsize::new(0));
    let frame = int_frame(vec![1, 2, 3, 4, 5]);

    let counting = Arc::clone(&calls);
    let filtered = frame
        .filter(
            move |x: i32| {
                counting.fetch_add(1, Ordering::SeqCst);
                x > 1
            },
            &["x"],
        )
        .unwrap();

    let count = filtered.count().unwrap();
    let taken = filtered.take::<i32>("x").unwrap();

    // First dereference triggers the single pass for both actions; the
    // shared filter is evaluated once per row.
    assert_eq!(*count.get().unwrap(), 4);
    assert!(taken.is_ready());
    assert_eq!(*taken.get().unwrap(), vec![2, 3, 4, 5]);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn test_booking_after_run_reexecutes() {
    let frame = int_frame(vec![1, 2, 3]);
    let first = frame.count().unwrap();
    assert_eq!(*first.get().unwrap(), 3);

    let second = frame.filter(|x: i32| x > 1, &["x"]).unwrap().count().unwrap();
    assert!(!second.is_ready());
    assert_eq!(*second.get().unwrap(), 2);
    assert!(first.is_ready());
    assert_eq!(*first.get().unwrap(), 3);
}

// =============================================================================
// Default columns
// =============================================================================

#[test]
fn test_mean_with_default_column() {
    let frame = float_frame(vec![1.0, 2.0, 3.0, 4.0]);
    let mean = frame.mean("").unwrap();
    assert_eq!(*mean.get().unwrap(), 2.5);
}

#[test]
fn test_insufficient_defaults_fails_at_booking() {
    let table = MemoryTable::builder("events")
        .with_i32("x", vec![1])
        .build()
        .unwrap();
    let frame = EventFrame::new(Arc::new(table), &[]);

    let err = frame.mean("").unwrap_err();
    assert!(matches!(err, HelionError::InsufficientDefaults(_)));
}

// =============================================================================
// Derived columns
// =============================================================================

#[test]
fn test_define_and_histogram() {
    let frame = int_frame(vec![0, 1, 2, 3]);
    let hist = frame
        .define("y", |x: i32| 2 * x, &["x"])
        .unwrap()
        .histo1d(Hist1D::new(4, 0.0, 8.0), "y")
        .unwrap();

    let hist = hist.get().unwrap();
    assert_eq!(hist.values(), &[1.0, 1.0, 1.0, 1.0]);
    assert_eq!(hist.entries(), 4);
}

#[test]
fn test_define_evaluated_once_per_row() {
    let calls = Arc::new(AtomicUsize::new(0));
    let frame = int_frame(vec![1, 2, 3, 4]);

    let counting = Arc::clone(&calls);
    let defined = frame
        .define(
            "y",
            move |x: i32| {
                counting.fetch_add(1, Ordering::SeqCst);
                x * 10
            },
            &["x"],
        )
        .unwrap();

    // Two consumers of the same derived column.
    let sum = defined.reduce(|a: i32, b: i32| a + b, "y").unwrap();
    let taken = defined.take::<i32>("y").unwrap();

    assert_eq!(*sum.get().unwrap(), 100);
    assert_eq!(*taken.get().unwrap(), vec![10, 20, 30, 40]);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_define_record_type_flows_downstream() {
    #[derive(Clone)]
    struct Candidate {
        pt: f64,
        charge: i32,
    }
    impl FrameValue for Candidate {}

    let table = MemoryTable::builder("events")
        .with_f64("pt", vec![0.5, 1.5, 2.5])
        .with_i32("q", vec![1, -1, 1])
        .build()
        .unwrap();
    let frame = EventFrame::new(Arc::new(table), &[]);

    let count = frame
        .define(
            "cand",
            |pt: f64, q: i32| Candidate { pt, charge: q },
            &["pt", "q"],
        )
        .unwrap()
        .filter(|c: Candidate| c.pt > 1.0 && c.charge > 0, &["cand"])
        .unwrap()
        .count()
        .unwrap();

    assert_eq!(*count.get().unwrap(), 1);
}

#[test]
fn test_duplicate_define_rejected() {
    let frame = int_frame(vec![1]);
    let defined = frame.define("y", |x: i32| x, &["x"]).unwrap();

    let err = defined.define("y", |x: i32| x + 1, &["x"]).unwrap_err();
    assert!(matches!(err, HelionError::DuplicateColumn(_)));

    let err = defined.define("x", |x: i32| x, &["x"]).unwrap_err();
    assert!(matches!(err, HelionError::DuplicateColumn(_)));
}

// =============================================================================
// Booking-time validation
// =============================================================================

#[test]
fn test_unknown_column_fails_at_booking() {
    let frame = int_frame(vec![1]);
    let err = frame.filter(|x: i32| x > 0, &["missing"]).unwrap_err();
    assert!(matches!(err, HelionError::ColumnNotFound(_)));
}

#[test]
fn test_declared_type_mismatch_fails_at_booking() {
    let frame = int_frame(vec![1]);
    let err = frame.filter(|x: f64| x > 0.0, &["x"]).unwrap_err();
    assert!(matches!(err, HelionError::TypeError(_)));
}

#[test]
fn test_uninferable_type_fails_at_booking() {
    let table = MemoryTable::builder("events")
        .with_i64("t", vec![1, 2, 3])
        .build()
        .unwrap();
    let frame = EventFrame::new(Arc::new(table), &[]);

    // Int64 is outside the inferable set; the typed variant still works.
    let err = frame.min("t").unwrap_err();
    assert!(matches!(err, HelionError::CannotInferType(_)));

    let min = frame.min_typed::<i64>("t").unwrap();
    assert_eq!(*min.get().unwrap(), 1.0);
}

// =============================================================================
// Reductions
// =============================================================================

#[test]
fn test_reduce_sum() {
    let frame = float_frame(vec![1.5, 2.5, 4.0]);
    let sum = frame.reduce_with(|a: f64, b: f64| a + b, "v", 0.0).unwrap();
    assert_eq!(*sum.get().unwrap(), 8.0);
}

#[test]
fn test_reduce_sum_parallel_matches_serial() {
    let table = MemoryTable::builder("events")
        .with_f64("v", vec![1.5, 2.5, 4.0])
        .build()
        .unwrap();
    let frame = EventFrame::with_config(Arc::new(table), &["v"], &parallel_config(3));
    assert_eq!(frame.n_slots(), 3);

    let sum = frame.reduce_with(|a: f64, b: f64| a + b, "v", 0.0).unwrap();
    assert_eq!(*sum.get().unwrap(), 8.0);
}

#[test]
fn test_min_max_mean() {
    let frame = int_frame(vec![5, -3, 9, 1]);
    let min = frame.min("x").unwrap();
    let max = frame.max("x").unwrap();
    let mean = frame.mean("x").unwrap();

    assert_eq!(*min.get().unwrap(), -3.0);
    assert_eq!(*max.get().unwrap(), 9.0);
    assert_eq!(*mean.get().unwrap(), 3.0);
}

#[test]
fn test_min_of_empty_selection_is_seed() {
    let frame = int_frame(vec![1, 2, 3]);
    let min = frame
        .filter(|x: i32| x > 100, &["x"])
        .unwrap()
        .min("x")
        .unwrap();
    assert_eq!(*min.get().unwrap(), f64::INFINITY);
}

// =============================================================================
// Take
// =============================================================================

#[test]
fn test_take_preserves_row_order_across_slots() {
    let rows = vec![3, 1, 4, 1, 5, 9, 2, 6];
    let table = MemoryTable::builder("events")
        .with_i32("x", rows.clone())
        .build()
        .unwrap();
    let frame = EventFrame::with_config(Arc::new(table), &[], &parallel_config(2));

    let taken = frame.take::<i32>("x").unwrap();
    assert_eq!(*taken.get().unwrap(), rows);
}

#[test]
fn test_take_into_alternative_collection() {
    let frame = int_frame(vec![2, 1, 2]);
    let taken = frame
        .take_into::<i32, std::collections::VecDeque<i32>>("x")
        .unwrap();
    let deque = taken.cloned().unwrap();
    assert_eq!(Vec::from(deque), vec![2, 1, 2]);
}

// =============================================================================
// Array columns
// =============================================================================

#[test]
fn test_array_column_samples() {
    let table = MemoryTable::builder("events")
        .with_f64_lists("jets", vec![vec![1.0, 2.0], vec![], vec![3.0, 4.0, 5.0]])
        .build()
        .unwrap();
    let frame = EventFrame::new(Arc::new(table), &[]);

    // Arrays contribute one sample per element.
    let mean = frame.mean("jets").unwrap();
    assert_eq!(*mean.get().unwrap(), 3.0);

    let njets = frame
        .define("njets", |jets: ArrayView<f64>| jets.len() as i64, &["jets"])
        .unwrap()
        .take::<i64>("njets")
        .unwrap();
    assert_eq!(*njets.get().unwrap(), vec![2, 0, 3]);
}

// =============================================================================
// Histograms
// =============================================================================

#[test]
fn test_histo1d_deferred_limits() {
    let frame = float_frame(vec![0.0, 1.0, 2.0, 4.0]);
    let hist = frame.histo1d(Hist1D::new(4, 0.0, 0.0), "v").unwrap();

    let hist = hist.get().unwrap();
    assert!(hist.has_axis_limits());
    assert_eq!(hist.axis().low(), 0.0);
    assert_eq!(hist.axis().high(), 4.0);
    assert_eq!(hist.entries(), 4);
    assert_eq!(hist.underflow() + hist.overflow(), 0.0);
}

#[test]
fn test_histo1d_weighted() {
    let table = MemoryTable::builder("events")
        .with_f64("v", vec![0.5, 0.5, 1.5])
        .with_f64("w", vec![2.0, 3.0, 0.5])
        .build()
        .unwrap();
    let frame = EventFrame::new(Arc::new(table), &[]);

    let hist = frame
        .histo1d_weighted::<f64, f64>(Hist1D::new(2, 0.0, 2.0), "v", "w")
        .unwrap();
    let hist = hist.get().unwrap();
    assert_eq!(hist.value(0), 5.0);
    assert_eq!(hist.value(1), 0.5);
}

#[test]
fn test_histo2d_requires_axis_limits() {
    let frame = float_frame(vec![1.0]);
    let err = frame
        .histo2d::<f64, f64>(Hist2D::new(2, 0.0, 0.0, 2, 0.0, 2.0), "v", "v")
        .unwrap_err();
    assert!(matches!(err, HelionError::ValueError(_)));
}

#[test]
fn test_histo2d_fill() {
    let table = MemoryTable::builder("events")
        .with_f64("a", vec![0.5, 0.5, 1.5])
        .with_f64("b", vec![0.5, 1.5, 1.5])
        .build()
        .unwrap();
    let frame = EventFrame::new(Arc::new(table), &[]);

    let hist = frame
        .histo2d::<f64, f64>(Hist2D::new(2, 0.0, 2.0, 2, 0.0, 2.0), "a", "b")
        .unwrap();
    let hist = hist.get().unwrap();
    assert_eq!(hist.value(0, 0), 1.0);
    assert_eq!(hist.value(0, 1), 1.0);
    assert_eq!(hist.value(1, 1), 1.0);
    assert_eq!(hist.value(1, 0), 0.0);
}

#[test]
fn test_histogram_parallel_matches_serial() {
    let values: Vec<f64> = (0..100).map(|i| f64::from(i) * 0.1).collect();

    let serial = {
        let frame = float_frame(values.clone());
        frame
            .histo1d(Hist1D::new(10, 0.0, 10.0), "v")
            .unwrap()
            .cloned()
            .unwrap()
    };
    let parallel = {
        let table = MemoryTable::builder("events")
            .with_f64("v", values)
            .build()
            .unwrap();
        let frame = EventFrame::with_config(Arc::new(table), &[], &parallel_config(4));
        frame
            .histo1d(Hist1D::new(10, 0.0, 10.0), "v")
            .unwrap()
            .cloned()
            .unwrap()
    };

    assert_eq!(serial, parallel);
}

// =============================================================================
// Instant actions
// =============================================================================

#[test]
fn test_foreach_is_instant() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let frame = int_frame(vec![1, 2, 3]);

    let sink = Arc::clone(&seen);
    frame
        .foreach(move |x: i32| sink.lock().unwrap().push(x), &["x"])
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_foreach_slot_receives_slot_index() {
    let frame = int_frame(vec![1, 2, 3, 4]);
    let max_slot = Arc::new(AtomicUsize::new(0));

    let sink = Arc::clone(&max_slot);
    frame
        .foreach_slot(
            move |slot: usize, _x: i32| {
                sink.fetch_max(slot, Ordering::SeqCst);
            },
            &["x"],
        )
        .unwrap();

    // Serial frame: every row runs on slot zero.
    assert_eq!(max_slot.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Reports
// =============================================================================

#[test]
fn test_named_filter_report() {
    let frame = int_frame((1..=10).collect());
    let chained = frame
        .filter_named("even", |x: i32| x % 2 == 0, &["x"])
        .unwrap()
        .filter_named("big", |x: i32| x > 5, &["x"])
        .unwrap();

    let count = chained.count().unwrap();
    assert_eq!(*count.get().unwrap(), 3);

    let report = frame.report().unwrap();
    let stats = report.stats();
    assert_eq!(stats.len(), 2);

    assert_eq!(stats[0].name(), "even");
    assert_eq!(stats[0].seen(), 10);
    assert_eq!(stats[0].accepted(), 5);

    assert_eq!(stats[1].name(), "big");
    assert_eq!(stats[1].seen(), 5);
    assert_eq!(stats[1].accepted(), 3);
}

#[test]
fn test_report_before_run_fails() {
    let frame = int_frame(vec![1]);
    let _ = frame
        .filter_named("cut", |x: i32| x > 0, &["x"])
        .unwrap()
        .count()
        .unwrap();

    let err = frame.report().unwrap_err();
    assert!(matches!(err, HelionError::NotYetRun(_)));
}

#[test]
fn test_node_report_covers_chain_to_node() {
    let frame = int_frame((1..=10).collect());
    let even = frame
        .filter_named("even", |x: i32| x % 2 == 0, &["x"])
        .unwrap();
    let big = even
        .filter_named("big", |x: i32| x > 5, &["x"])
        .unwrap();
    let _other = frame
        .filter_named("odd", |x: i32| x % 2 == 1, &["x"])
        .unwrap()
        .count()
        .unwrap();

    let count = big.count().unwrap();
    assert_eq!(*count.get().unwrap(), 3);

    // A node-scoped report only covers the chain between root and node.
    let report = big.report().unwrap();
    let names: Vec<_> = report.iter().map(|s| s.name().to_string()).collect();
    assert_eq!(names, vec!["even", "big"]);

    // The root report carries every named filter in booking order.
    let report = frame.report().unwrap();
    let names: Vec<_> = report.iter().map(|s| s.name().to_string()).collect();
    assert_eq!(names, vec!["even", "big", "odd"]);
}

// =============================================================================
// Graph rendering
// =============================================================================

#[test]
fn test_explain_renders_graph() {
    let frame = int_frame(vec![1, 2, 3]);
    let filtered = frame.filter_named("cut", |x: i32| x > 1, &["x"]).unwrap();
    let _count = filtered.count().unwrap();
    let _mean = frame.mean("x").unwrap();

    let rendered = frame.explain();
    assert!(rendered.contains("events (3 rows)"));
    assert!(rendered.contains("Filter 'cut' [x]"));
    assert!(rendered.contains("Count"));
    assert!(rendered.contains("Mean(x)"));
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn test_panicking_predicate_aborts_run() {
    let frame = int_frame(vec![1, 2, 3]);
    let count = frame
        .filter(
            |x: i32| {
                assert!(x < 2, "boom");
                true
            },
            &["x"],
        )
        .unwrap()
        .count()
        .unwrap();

    let err = count.get().unwrap_err();
    assert!(matches!(err, HelionError::ExecutionError(_)));
    assert!(!count.is_ready());
}

#[test]
fn test_engine_gone() {
    let count: ResultHandle<u64> = {
        let frame = int_frame(vec![1, 2, 3]);
        frame.count().unwrap()
    };
    let err = count.get().unwrap_err();
    assert!(matches!(err, HelionError::EngineGone(_)));
}

// =============================================================================
// Storage catalog round trip
// =============================================================================

#[tokio::test]
async fn test_open_from_catalog() {
    let storage = MemoryStorage::new();
    storage
        .register_table(
            MemoryTable::builder("muons")
                .with_f64("pt", vec![10.0, 30.0, 50.0])
                .build()
                .unwrap(),
        )
        .unwrap();

    let frame = EventFrame::open(&storage, "muons", &["pt"]).await.unwrap();
    assert_eq!(frame.table_name(), "muons");
    assert_eq!(frame.row_count(), 3);

    let count = frame
        .filter(|pt: f64| pt > 20.0, &["pt"])
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(*count.get().unwrap(), 2);

    let err = EventFrame::open(&storage, "electrons", &[]).await.unwrap_err();
    assert!(matches!(err, HelionError::TableNotFound(_)));
}

#[test]
fn test_row_count_and_partitions_exposed() {
    let table = MemoryTable::builder("events")
        .with_i32("x", (0..7).collect())
        .build()
        .unwrap();
    let parts = table.partitions(2);
    assert_eq!(parts.iter().map(|r| r.len()).sum::<u64>(), 7);

    let frame = EventFrame::new(Arc::new(table), &["x"]);
    assert_eq!(frame.row_count(), 7);
    assert_eq!(frame.default_columns(), &["x".to_string()]);
    assert_eq!(frame.n_slots(), 1);
}
