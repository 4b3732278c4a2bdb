use crate::state::entity::VehicleRecord;
use crate::telemetry::FieldUpdate;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

/// Point-in-time copy of every vehicle record, ordered by ascending id.
///
/// Owned data only: later merges never show through a snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    /// Number of merges the store had completed when the copy was taken
    pub generation: u64,
    pub taken_at: DateTime<Utc>,
    pub vehicles: Vec<VehicleRecord>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.vehicles.iter().map(|v| v.id).collect()
    }
}

struct Inner {
    vehicles: HashMap<u64, VehicleRecord>,
    generation: u64,
}

/// Shared vehicle state.
///
/// One mutex guards the whole map. Expected cardinality is a few dozen
/// vehicles, so merges and snapshot copies stay short; a much larger fleet
/// would want a sharded map instead.
pub struct StateStore {
    inner: Mutex<Inner>,

    /// Merge generation, bumped once per merge while the lock is held
    changes: watch::Sender<u64>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner {
                vehicles: HashMap::with_capacity(capacity),
                generation: 0,
            }),
            changes,
        }
    }

    // Records are only replaced field by field under the lock; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Merge a partial update into the record for `id`, creating it if needed.
    ///
    /// Returns a copy of the merged record. Waiters on [`StateStore::subscribe`]
    /// are woken once the new state is visible.
    pub fn merge(&self, id: u64, updates: &[FieldUpdate]) -> VehicleRecord {
        let now = Utc::now();
        let mut inner = self.lock();

        let record = inner
            .vehicles
            .entry(id)
            .or_insert_with(|| VehicleRecord::new(id, now));
        record.apply(updates, now);
        let merged = record.clone();

        inner.generation += 1;
        let generation = inner.generation;
        self.changes.send_replace(generation);
        drop(inner);

        debug!(id = id, fields = updates.len(), generation, "merged update");
        merged
    }

    /// Copy all records out under the lock, then sort outside it.
    pub fn snapshot(&self) -> Snapshot {
        let (generation, mut vehicles) = {
            let inner = self.lock();
            let vehicles: Vec<VehicleRecord> = inner.vehicles.values().cloned().collect();
            (inner.generation, vehicles)
        };

        vehicles.sort_by_key(|v| v.id);

        Snapshot {
            generation,
            taken_at: Utc::now(),
            vehicles,
        }
    }

    pub fn get(&self, id: u64) -> Option<VehicleRecord> {
        self.lock().vehicles.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Change notification.
    ///
    /// The receiver starts with the current generation marked as seen and is
    /// woken by every later merge. Several merges between two waits collapse
    /// into one wake-up; after waking, take a fresh [`StateStore::snapshot`].
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
