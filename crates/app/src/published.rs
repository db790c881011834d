//! Recently published device commands.
//!
//! The engine subscribes to the same wildcard it publishes on, so every
//! `on`/`off`/`onRGB`/`offRGB` it sends comes back from the broker. Each
//! publish is recorded here with a deadline one echo window away, and an
//! inbound payload that matches the oldest live entry for its device is
//! consumed as that echo instead of being applied as a device report.
//!
//! Entries are matched in publish order, so a quick `on`, `off` sequence
//! followed by its two echoes leaves the state at `off`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lightsync_domain::device::DeviceId;

#[derive(Debug)]
struct Sent {
    payload: String,
    deadline: Instant,
}

/// Per-device queue of payloads still expected back from the bus.
#[derive(Debug)]
pub struct PublishedCommands {
    sent: Mutex<HashMap<DeviceId, VecDeque<Sent>>>,
    echo_window: Duration,
}

impl PublishedCommands {
    #[must_use]
    pub fn new(echo_window: Duration) -> Self {
        Self {
            sent: Mutex::default(),
            echo_window,
        }
    }

    /// Remember that `payload` was published for `id`.
    pub fn record(&self, id: &DeviceId, payload: &str) {
        let now = Instant::now();
        let deadline = now + self.echo_window;
        self.with_sent(|sent| {
            Self::purge(sent, now);
            sent.entry(id.clone()).or_default().push_back(Sent {
                payload: payload.to_string(),
                deadline,
            });
        });
    }

    /// Consume the oldest live entry for `id` if it carries `payload`.
    /// Returns `true` when the caller is looking at the echo of a local
    /// publish.
    pub fn take_echo(&self, id: &DeviceId, payload: &str) -> bool {
        self.take_echo_at(id, payload, Instant::now())
    }

    /// Drop everything recorded for `id`.
    pub fn forget(&self, id: &DeviceId) {
        self.with_sent(|sent| sent.remove(id));
    }

    /// Number of live entries across all devices.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.with_sent(|sent| {
            Self::purge(sent, now);
            sent.values().map(VecDeque::len).sum()
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_echo_at(&self, id: &DeviceId, payload: &str, now: Instant) -> bool {
        self.with_sent(|sent| {
            Self::purge(sent, now);
            let Some(queue) = sent.get_mut(id) else {
                return false;
            };
            if queue.front().is_none_or(|front| front.payload != payload) {
                return false;
            }
            queue.pop_front();
            if queue.is_empty() {
                sent.remove(id);
            }
            true
        })
    }

    fn purge(sent: &mut HashMap<DeviceId, VecDeque<Sent>>, now: Instant) {
        sent.retain(|_, queue| {
            while queue.front().is_some_and(|front| front.deadline <= now) {
                queue.pop_front();
            }
            !queue.is_empty()
        });
    }

    fn with_sent<R>(&self, f: impl FnOnce(&mut HashMap<DeviceId, VecDeque<Sent>>) -> R) -> R {
        let mut guard = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
