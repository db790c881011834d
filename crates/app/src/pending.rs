//! Pending-delete set — marks devices whose deletion was initiated locally so
//! the bus echo of our own `deleteNVS` is not mistaken for a remote deletion.
//!
//! A mark is taken with [`PendingDeletes::mark`], which returns a guard:
//!
//! - dropping the guard (failed delete) releases the mark immediately;
//! - [`PendingDeleteGuard::commit`] (successful delete) arms the mark with a
//!   deadline, after which it expires on its own;
//! - consuming the echo with [`PendingDeletes::take_echo`] releases it early.
//!
//! Marks therefore never outlive the delete operation by more than the echo
//! window, even if the echo never arrives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use lightsync_domain::device::DeviceId;

/// Where a marked device is in its local deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingPhase {
    /// The store delete / publish has not completed yet.
    InFlight,
    /// The delete completed; waiting for the bus echo or the deadline.
    AwaitingEcho,
}

#[derive(Debug, Clone, Copy)]
enum Mark {
    InFlight,
    Armed(Instant),
}

/// Shared set of device ids with a locally initiated deletion.
#[derive(Debug, Clone)]
pub struct PendingDeletes {
    marks: Arc<Mutex<HashMap<DeviceId, Mark>>>,
    echo_window: Duration,
}

impl PendingDeletes {
    /// Create an empty set whose committed marks live for `echo_window`.
    #[must_use]
    pub fn new(echo_window: Duration) -> Self {
        Self {
            marks: Arc::default(),
            echo_window,
        }
    }

    /// Mark `id` as being deleted locally.
    #[must_use = "dropping the guard releases the mark"]
    pub fn mark(&self, id: DeviceId) -> PendingDeleteGuard {
        self.with_marks(|marks| marks.insert(id.clone(), Mark::InFlight));
        PendingDeleteGuard {
            set: self.clone(),
            id: Some(id),
        }
    }

    /// Current phase of `id`, ignoring expired marks.
    #[must_use]
    pub fn phase(&self, id: &DeviceId) -> Option<PendingPhase> {
        self.phase_at(id, Instant::now())
    }

    #[must_use]
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.phase(id).is_some()
    }

    /// Consume the mark for `id` if present. Returns `true` when the caller
    /// is looking at the echo of a local deletion.
    pub fn take_echo(&self, id: &DeviceId) -> bool {
        let now = Instant::now();
        self.with_marks(|marks| {
            Self::purge(marks, now);
            marks.remove(id).is_some()
        })
    }

    /// Drop the mark for `id` regardless of its phase.
    pub fn release(&self, id: &DeviceId) {
        self.with_marks(|marks| marks.remove(id));
    }

    /// Number of live marks.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.with_marks(|marks| {
            Self::purge(marks, now);
            marks.len()
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn phase_at(&self, id: &DeviceId, now: Instant) -> Option<PendingPhase> {
        self.with_marks(|marks| {
            Self::purge(marks, now);
            marks.get(id).map(|mark| match mark {
                Mark::InFlight => PendingPhase::InFlight,
                Mark::Armed(_) => PendingPhase::AwaitingEcho,
            })
        })
    }

    fn arm(&self, id: DeviceId) {
        let deadline = Instant::now() + self.echo_window;
        self.with_marks(|marks| marks.insert(id, Mark::Armed(deadline)));
    }

    fn purge(marks: &mut HashMap<DeviceId, Mark>, now: Instant) {
        marks.retain(|_, mark| match mark {
            Mark::InFlight => true,
            Mark::Armed(deadline) => *deadline > now,
        });
    }

    fn with_marks<R>(&self, f: impl FnOnce(&mut HashMap<DeviceId, Mark>) -> R) -> R {
        let mut guard = self.marks.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Scoped ownership of a pending-delete mark.
#[derive(Debug)]
pub struct PendingDeleteGuard {
    set: PendingDeletes,
    id: Option<DeviceId>,
}

impl PendingDeleteGuard {
    /// The delete went through: keep the mark until the echo arrives or the
    /// echo window elapses.
    pub fn commit(mut self) {
        if let Some(id) = self.id.take() {
            self.set.arm(id);
        }
    }
}

impl Drop for PendingDeleteGuard {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.set.release(&id);
        }
    }
}
