use super::*;
use crate::telemetry::{parse_update, Field, FieldUpdate};
use chrono::Utc;
use std::sync::Arc;
use std::thread;

fn vehicle(id: u64, speed: f64, dist: f64) -> VehicleRecord {
    let mut record = VehicleRecord::new(id, Utc::now());
    record.vehicle_speed = speed;
    record.target_dist = dist;
    record
}

fn with_speeds(speeds: &[f64]) -> Vec<VehicleRecord> {
    speeds
        .iter()
        .enumerate()
        .map(|(i, &s)| vehicle(i as u64, s, 0.0))
        .collect()
}

fn with_distances(dists: &[f64]) -> Vec<VehicleRecord> {
    dists
        .iter()
        .enumerate()
        .map(|(i, &d)| vehicle(i as u64, 0.0, d))
        .collect()
}

#[test]
fn test_merge_creates_record_with_defaults() {
    let store = StateStore::new();

    let merged = store.merge(3, &[FieldUpdate::new(Field::Fuel, 0.5)]);

    assert_eq!(merged.id, 3);
    assert_eq!(merged.fuel, 0.5);
    assert_eq!(merged.vehicle_speed, 0.0);
    assert_eq!(merged.target_dist, 0.0);
    assert_eq!(store.get(3), Some(merged));
}

#[test]
fn test_partial_update_keeps_unmentioned_fields() {
    let store = StateStore::new();

    store.merge(
        1,
        &[
            FieldUpdate::new(Field::GpsX, 10.0),
            FieldUpdate::new(Field::GpsY, 20.0),
        ],
    );
    store.merge(1, &[FieldUpdate::new(Field::GpsY, 25.0)]);

    let record = store.get(1).unwrap();
    assert_eq!(record.gps_x, 10.0);
    assert_eq!(record.gps_y, 25.0);
}

#[test]
fn test_bad_value_leaves_field_unchanged_and_applies_the_rest() {
    let store = StateStore::new();
    store.merge(1, &[FieldUpdate::new(Field::Fuel, 0.9)]);

    let parsed = parse_update([
        ("id", "1"),
        ("fuel", "empty"),
        ("target_dir", "270"),
    ]);
    store.merge(parsed.id, &parsed.updates);

    let record = store.get(1).unwrap();
    assert_eq!(record.fuel, 0.9);
    assert_eq!(record.target_dir, 270.0);
}

#[test]
fn test_repeated_field_keeps_first_value_after_merge() {
    let store = StateStore::new();

    let parsed = parse_update([("id", "1"), ("vehicle_speed", "10"), ("vehicle_speed", "20")]);
    store.merge(parsed.id, &parsed.updates);
    assert_eq!(store.get(1).unwrap().vehicle_speed, 10.0);

    let parsed = parse_update([("id", "2"), ("fuel", "bad"), ("fuel", "5")]);
    store.merge(parsed.id, &parsed.updates);
    assert_eq!(store.get(2).unwrap().fuel, 0.0);
}

#[test]
fn test_merge_refreshes_last_update() {
    let store = StateStore::new();

    let first = store.merge(5, &[]);
    thread::sleep(std::time::Duration::from_millis(5));
    let second = store.merge(5, &[]);

    assert!(second.last_update > first.last_update);
}

#[test]
fn test_snapshot_is_sorted_by_id() {
    let store = StateStore::new();

    for id in [42, 7, 0, 19] {
        store.merge(id, &[]);
    }

    assert_eq!(store.snapshot().ids(), vec![0, 7, 19, 42]);
}

#[test]
fn test_snapshot_is_not_affected_by_later_merges() {
    let store = StateStore::new();
    store.merge(1, &[FieldUpdate::new(Field::VehicleSpeed, 10.0)]);

    let before = store.snapshot();
    store.merge(1, &[FieldUpdate::new(Field::VehicleSpeed, 99.0)]);
    store.merge(2, &[]);
    let after = store.snapshot();

    assert_eq!(before.len(), 1);
    assert_eq!(before.vehicles[0].vehicle_speed, 10.0);
    assert_eq!(after.len(), 2);
    assert_eq!(after.vehicles[0].vehicle_speed, 99.0);
    assert!(after.generation > before.generation);
}

#[test]
fn test_concurrent_merges_to_different_ids() {
    let store = Arc::new(StateStore::new());
    let mut handles = vec![];

    for i in 0..10u64 {
        let store_clone = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for n in 0..100 {
                store_clone.merge(i, &[FieldUpdate::new(Field::Fuel, n as f64)]);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 10);
    assert_eq!(snapshot.generation, 1000);
    // Each id only ever saw its own thread's sequence
    assert!(snapshot.vehicles.iter().all(|v| v.fuel == 99.0));
}

#[test]
fn test_concurrent_merges_to_same_id_touch_independent_fields() {
    let store = Arc::new(StateStore::new());
    let mut handles = vec![];

    for field in Field::ALL {
        let store_clone = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for n in 1..=50 {
                store_clone.merge(8, &[FieldUpdate::new(field, n as f64)]);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let record = store.get(8).unwrap();
    for field in Field::ALL {
        assert_eq!(record.get(field), 50.0, "field {}", field);
    }
}

#[test]
fn test_snapshot_never_sees_torn_record() {
    let store = Arc::new(StateStore::new());
    let writer_store = Arc::clone(&store);

    // Every update writes the same value to all fields
    let writer = thread::spawn(move || {
        for n in 0..2000 {
            let updates: Vec<FieldUpdate> = Field::ALL
                .iter()
                .map(|&field| FieldUpdate::new(field, n as f64))
                .collect();
            writer_store.merge(1, &updates);
        }
    });

    for _ in 0..500 {
        for record in store.snapshot().vehicles {
            let first = record.get(Field::ALL[0]);
            assert!(Field::ALL.iter().all(|&f| record.get(f) == first));
        }
    }

    writer.join().unwrap();
}

#[test]
fn test_median_speed() {
    assert_eq!(median_speed(&[]), 0.0);
    assert_eq!(median_speed(&with_speeds(&[42.0])), 42.0);
    assert_eq!(median_speed(&with_speeds(&[30.0, 10.0, 20.0])), 20.0);
    // Upper-middle for even counts
    assert_eq!(median_speed(&with_speeds(&[40.0, 10.0, 30.0, 20.0])), 30.0);
}

#[test]
fn test_mean_speed() {
    assert_eq!(mean_speed(&[]), 0.0);
    assert_eq!(mean_speed(&with_speeds(&[90.0, 30.0])), 60.0);
}

#[test]
fn test_active_count_threshold_is_inclusive() {
    assert_eq!(active_count(&with_speeds(&[79.9, 80.0, 80.1])), 2);
    assert_eq!(active_count(&[]), 0);
}

#[test]
fn test_delta_distance_accumulators_start_at_zero() {
    assert_eq!(delta_distance(&[]), 0.0);
    // min stays 0.0 when all distances are positive
    assert_eq!(delta_distance(&with_distances(&[5.0, 12.0])), 12.0);
    // max stays 0.0 when all distances are negative
    assert_eq!(delta_distance(&with_distances(&[-3.0, -8.0])), 8.0);
    assert_eq!(delta_distance(&with_distances(&[-2.0, 6.0])), 8.0);
}

#[test]
fn test_aggregates_end_to_end() {
    let store = StateStore::new();

    let first = parse_update([("id", "1"), ("vehicle_speed", "90"), ("target_dist", "12")]);
    store.merge(first.id, &first.updates);
    let second = parse_update([("id", "2"), ("vehicle_speed", "30"), ("target_dist", "5")]);
    store.merge(second.id, &second.updates);

    let snapshot = store.snapshot();
    assert_eq!(snapshot.ids(), vec![1, 2]);

    let aggregates = Aggregates::compute(&snapshot.vehicles);
    assert_eq!(aggregates.mean_speed, 60.0);
    assert_eq!(aggregates.median_speed, 90.0);
    assert_eq!(aggregates.delta_distance, 12.0);
    assert_eq!(aggregates.active_count, 1);
}

#[test]
fn test_staleness() {
    let now = Utc::now();
    let mut record = VehicleRecord::new(1, now - chrono::Duration::seconds(30));

    assert!(record.is_stale(now, chrono::Duration::seconds(10)));
    record.last_update = now;
    assert!(!record.is_stale(now, chrono::Duration::seconds(10)));
}
