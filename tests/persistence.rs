//! Property and persistence tests.
//!
//! These tests verify:
//! 1. Serial state counts and folding for arbitrary axis layouts
//! 2. Snapshot round trips after arbitrary state/increment sequences
//! 3. Reset idempotence
//! 4. Snapshot files on disk

use multistate_stats::{
    MultiStateStats, SnapshotFile, StateAxis, StateSpaceFactory, TagDocument, TagReader,
    TagWriter,
};
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

/// (tracked, cardinality) per axis.
fn axis_layouts() -> impl Strategy<Value = Vec<(bool, usize)>> {
    prop::collection::vec((any::<bool>(), 2usize..6), 0..5)
}

fn build_factory(layout: &[(bool, usize)], dimension_count: usize) -> StateSpaceFactory {
    let axes = layout
        .iter()
        .enumerate()
        .map(|(i, &(tracked, count))| {
            StateAxis::new(format!("axis{}", i), tracked, (0..count).map(|v| format!("v{}", v)))
                .unwrap()
        })
        .collect();
    StateSpaceFactory::new(dimension_count, axes).unwrap()
}

/// Every full combination of axis values, untracked axes included.
fn all_values(factory: &StateSpaceFactory) -> Vec<Vec<u32>> {
    let mut all = vec![Vec::new()];
    for axis in factory.axes() {
        all = all
            .into_iter()
            .flat_map(|prefix| {
                (0..axis.cardinality() as u32).map(move |v| {
                    let mut next = prefix.clone();
                    next.push(v);
                    next
                })
            })
            .collect();
    }
    all
}

fn power_factory() -> Arc<StateSpaceFactory> {
    Arc::new(
        StateSpaceFactory::new(
            2,
            vec![
                StateAxis::new("battery", true, ["off", "on"]).unwrap(),
                StateAxis::new("screen", false, ["off", "on"]).unwrap(),
                StateAxis::new("procstate", true, ["none", "top", "bg"]).unwrap(),
            ],
        )
        .unwrap(),
    )
}

#[derive(Clone, Debug)]
enum Op {
    SetState { axis: usize, value: u32, advance: i64 },
    Increment { delta: [i64; 2], advance: i64 },
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        (0usize..3, 0u32..3, 0i64..500).prop_map(|(axis, value, advance)| Op::SetState {
            axis,
            value,
            advance
        }),
        (0i64..10_000, 0i64..10_000, 1i64..500).prop_map(|(a, b, advance)| Op::Increment {
            delta: [a, b],
            advance
        }),
    ];
    prop::collection::vec(op, 0..40)
}

fn apply(factory: &Arc<StateSpaceFactory>, ops: &[Op]) -> MultiStateStats {
    let mut stats = factory.create();
    let mut now = 0;
    for op in ops {
        match op {
            Op::SetState {
                axis,
                value,
                advance,
            } => {
                now += advance;
                let value = value % factory.axes()[*axis].cardinality() as u32;
                stats.set_state(*axis, value, now).unwrap();
            }
            Op::Increment { delta, advance } => {
                now += advance;
                stats.increment(delta, now).unwrap();
            }
        }
    }
    stats
}

proptest! {
    #[test]
    fn prop_serial_count_is_tracked_product(layout in axis_layouts()) {
        let factory = build_factory(&layout, 1);
        let expected: usize = layout
            .iter()
            .filter(|(tracked, _)| *tracked)
            .map(|(_, count)| count)
            .product();
        prop_assert_eq!(factory.serial_state_count(), expected);
    }

    #[test]
    fn prop_untracked_axes_fold(layout in axis_layouts()) {
        let factory = build_factory(&layout, 1);
        for values in all_values(&factory) {
            let serial = factory.serial_state_for(&values).unwrap();
            prop_assert!(serial.index() < factory.serial_state_count());

            let mut base = values.clone();
            for (value, axis) in base.iter_mut().zip(factory.axes()) {
                if !axis.is_tracked() {
                    *value = 0;
                }
            }
            prop_assert_eq!(factory.serial_state_for(&base).unwrap(), serial);
        }
    }

    #[test]
    fn prop_tracked_combinations_are_distinct(layout in axis_layouts()) {
        let factory = build_factory(&layout, 1);
        let mut serials: Vec<_> = factory
            .combinations()
            .map(|values| factory.serial_state_for(&values).unwrap())
            .collect();
        serials.sort();
        serials.dedup();
        prop_assert_eq!(serials.len(), factory.serial_state_count());
    }

    #[test]
    fn prop_snapshot_roundtrip(ops in ops()) {
        let factory = power_factory();
        let stats = apply(&factory, &ops);

        let doc = stats.to_document().unwrap();
        let mut restored = factory.create();
        restored.read_document(&doc).unwrap();

        for values in all_values(&factory) {
            prop_assert_eq!(stats.stats(&values).unwrap(), restored.stats(&values).unwrap());
        }
    }

    #[test]
    fn prop_reset_zeroes_everything(ops in ops()) {
        let factory = power_factory();
        let mut stats = apply(&factory, &ops);
        stats.reset();

        prop_assert!(!stats.is_tracking());
        for values in all_values(&factory) {
            prop_assert_eq!(stats.stats(&values).unwrap(), vec![0, 0]);
        }
        prop_assert_eq!(stats.dump_to_string(), "");
    }
}

#[test]
fn test_snapshot_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("power_stats.bin");
    let factory = power_factory();

    let mut stats = factory.create();
    stats.set_state(0, 1, 0).unwrap();
    stats.set_state(2, 2, 0).unwrap();
    stats.increment(&[600, 6], 60_000).unwrap();
    stats.set_state(0, 0, 60_000).unwrap();
    stats.increment(&[100, 1], 120_000).unwrap();

    SnapshotFile::save(&path, &stats.to_document().unwrap()).unwrap();

    let mut restored = factory.create();
    let doc = SnapshotFile::load(&path).unwrap();
    assert_eq!(restored.read_document(&doc).unwrap(), 2);
    assert_eq!(restored.stats(&[1, 0, 2]).unwrap(), vec![600, 6]);
    assert_eq!(restored.stats(&[0, 1, 2]).unwrap(), vec![100, 1]);
    assert_eq!(restored.dump_to_string(), stats.dump_to_string());
}

#[test]
fn test_json_snapshot_roundtrip() {
    let factory = power_factory();
    let mut stats = factory.create();
    stats.set_state(2, 1, 0).unwrap();
    stats.increment(&[0, 12], 10).unwrap();

    let json = stats.to_document().unwrap().to_json().unwrap();
    let doc = TagDocument::from_json(&json).unwrap();

    let mut restored = factory.create();
    restored.read_document(&doc).unwrap();
    assert_eq!(restored.stats(&[0, 0, 1]).unwrap(), vec![0, 12]);
}

#[test]
fn test_snapshot_embedded_in_larger_document() {
    let factory = power_factory();
    let mut stats = factory.create();
    stats.set_state(0, 1, 0).unwrap();
    stats.increment(&[4, 4], 10).unwrap();

    let mut doc = TagDocument::new();
    doc.start_tag("battery_usage").unwrap();
    doc.start_tag("uid_stats").unwrap();
    doc.attribute_long("uid", 10_123).unwrap();
    stats.write_snapshot(&mut doc).unwrap();
    doc.end_tag("uid_stats").unwrap();
    doc.start_tag("uid_stats").unwrap();
    doc.attribute_long("uid", 10_124).unwrap();
    doc.end_tag("uid_stats").unwrap();
    doc.end_tag("battery_usage").unwrap();

    // Position the reader on the first <uid_stats>
    let mut reader = doc.reader();
    reader.next().unwrap();
    assert_eq!(reader.name(), Some("uid_stats"));

    let mut restored = factory.create();
    assert_eq!(restored.read_snapshot(&mut reader).unwrap(), 1);
    assert_eq!(reader.name(), Some("uid_stats"));
    assert_eq!(restored.stats(&[1, 0, 0]).unwrap(), vec![4, 4]);
}
