//! Property-based tests for batch streams and time-sliced processing.

mod common;

use std::time::Duration;

use conflux_buffer::MemoryBufferManager;
use conflux_common::config::RetryPolicy;
use conflux_common::types::{Row, TupleBatch};
use conflux_exec::{BatchCollector, BatchIterator, BatchProducer, Progress, VecProducer};
use proptest::prelude::*;

use common::{buffer_rows, processor, rows, schema, ScriptedPlan};

/// Strategy for batch layouts: up to 12 batches of 0..8 rows each.
fn arb_sizes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..8, 1..12)
}

/// Strategy for a layout together with the batch indexes that stall first.
fn arb_stalled_layout() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    arb_sizes().prop_flat_map(|sizes| {
        let count = sizes.len();
        (Just(sizes), prop::collection::vec(0..count, 0..count))
    })
}

/// Pulls every batch, retrying on not-ready.
fn drain(producer: &mut impl BatchProducer) -> Vec<TupleBatch> {
    let mut batches = Vec::new();
    loop {
        match producer.next_batch().expect("producer should not fail") {
            Progress::Ready(batch) => {
                let terminal = batch.is_terminal();
                batches.push(batch);
                if terminal {
                    return batches;
                }
            }
            Progress::NotReady => continue,
        }
    }
}

fn iterate(mut iterator: BatchIterator<ScriptedPlan>) -> Vec<Row> {
    let mut out = Vec::new();
    loop {
        match iterator.next_tuple().expect("iterator should not fail") {
            Progress::Ready(Some(row)) => out.push(row),
            Progress::Ready(None) => return out,
            Progress::NotReady => continue,
        }
    }
}

proptest! {
    #[test]
    fn prop_batches_are_contiguous(row_count in 0usize..200, batch_size in 1usize..17) {
        let mut producer = VecProducer::new(schema(), rows(1, row_count as u64), batch_size);
        let batches = drain(&mut producer);

        prop_assert_eq!(batches.iter().filter(|b| b.is_terminal()).count(), 1);
        prop_assert_eq!(batches[0].begin_row(), 1);
        for pair in batches.windows(2) {
            prop_assert!(pair[1].follows(&pair[0]));
        }
        let numbers: Vec<u64> = batches
            .iter()
            .flat_map(|b| b.numbered_rows().map(|(n, _)| n))
            .collect();
        prop_assert_eq!(numbers, (1..=row_count as u64).collect::<Vec<_>>());
    }

    #[test]
    fn prop_scripted_layouts_are_contiguous((sizes, stalls) in arb_stalled_layout()) {
        let mut plan = ScriptedPlan::new(&sizes).with_stalls(stalls);
        let batches = drain(&mut plan);
        let last = batches.last().map(|b| b.is_terminal());
        prop_assert_eq!(last, Some(true));
        for pair in batches.windows(2) {
            prop_assert!(pair[1].follows(&pair[0]));
            prop_assert!(!pair[0].is_terminal());
        }
    }

    #[test]
    fn prop_not_ready_is_transparent_to_collector((sizes, stalls) in arb_stalled_layout()) {
        let manager = MemoryBufferManager::default();
        let total = ScriptedPlan::total_rows(&sizes);

        let plan = ScriptedPlan::new(&sizes).with_stalls(stalls);
        let mut collector = BatchCollector::with_manager(plan, &manager).unwrap();
        let buffer = loop {
            if let Progress::Ready(buffer) = collector.collect_tuples().unwrap() {
                break buffer;
            }
        };
        prop_assert_eq!(buffer_rows(&buffer), rows(1, total));
        prop_assert_eq!(collector.row_count(), total);
    }

    #[test]
    fn prop_not_ready_is_transparent_to_iterator((sizes, stalls) in arb_stalled_layout()) {
        let plain = iterate(BatchIterator::new(ScriptedPlan::new(&sizes)));
        let stalled = iterate(BatchIterator::new(ScriptedPlan::new(&sizes).with_stalls(stalls)));
        prop_assert_eq!(&plain, &stalled);
        prop_assert_eq!(plain, rows(1, ScriptedPlan::total_rows(&sizes)));
    }

    #[test]
    fn prop_time_sliced_matches_blocking(
        (sizes, stalls) in arb_stalled_layout(),
        slice_micros in 0u64..50,
    ) {
        let plan = ScriptedPlan::new(&sizes).with_stalls(stalls.clone());
        let mut blocking = processor(plan).with_retry_policy(RetryPolicy::fixed(Duration::ZERO));
        blocking.process_blocking().unwrap();

        let mut sliced = processor(ScriptedPlan::new(&sizes).with_stalls(stalls));
        let slice = Duration::from_micros(slice_micros);
        while sliced.process(slice).unwrap() != Progress::Ready(true) {}

        prop_assert!(sliced.is_done());
        prop_assert_eq!(buffer_rows(sliced.buffer()), buffer_rows(blocking.buffer()));
        prop_assert_eq!(sliced.high_row(), ScriptedPlan::total_rows(&sizes));
    }
}
