use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::Mutex;
use shakemap_common::SessionKey;

use super::{AdmissionConfig, QueueCounts, QueueState, QueueStatus};

/// A session waiting for an active slot.
struct Waiting {
    key: SessionKey,
    enqueued_at: Instant,
}

struct QueueInner {
    /// Active sessions and when they were last heard from.
    active: HashMap<SessionKey, Instant>,
    /// Waiting sessions, oldest first.
    waiting: VecDeque<Waiting>,
}

/// What a single maintenance pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired: usize,
    pub promoted: usize,
}

/// In-memory admission queue.
///
/// Every operation takes the one lock covering both the active set and the
/// wait queue, runs a maintenance pass (expiry + promotion), then applies its
/// own change. Expiry is lazy: nothing happens until the next operation or
/// an explicit [`sweep`](Self::sweep).
pub struct AdmissionQueue {
    config: AdmissionConfig,
    inner: Mutex<QueueInner>,
}

impl AdmissionQueue {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(QueueInner {
                active: HashMap::new(),
                waiting: VecDeque::new(),
            }),
        }
    }

    /// Ask for an active slot. Queues the session at the tail if none is free.
    pub fn enter(&self, key: &SessionKey) -> QueueStatus {
        self.enter_at(key, Instant::now())
    }

    /// Report where the session stands without refreshing it.
    pub fn status(&self, key: &SessionKey) -> QueueStatus {
        self.status_at(key, Instant::now())
    }

    /// Like [`status`](Self::status), but keeps an active session alive.
    pub fn heartbeat(&self, key: &SessionKey) -> QueueStatus {
        self.heartbeat_at(key, Instant::now())
    }

    /// Drop the session from both the active set and the wait queue.
    /// Unknown sessions are a no-op.
    pub fn leave(&self, key: &SessionKey) -> QueueCounts {
        self.leave_at(key, Instant::now())
    }

    /// Run one maintenance pass with no session attached.
    pub fn sweep(&self) -> MaintenanceReport {
        let mut inner = self.inner.lock();
        inner.maintain(&self.config, Instant::now())
    }

    fn enter_at(&self, key: &SessionKey, now: Instant) -> QueueStatus {
        let mut inner = self.inner.lock();
        inner.maintain(&self.config, now);

        if let Some(last_seen) = inner.active.get_mut(key) {
            *last_seen = now;
            return inner.status(&self.config, QueueState::Active, None);
        }

        if inner.active.len() < self.config.max_active {
            // A queued session that finds a free slot takes it directly.
            inner.remove_waiting(key);
            inner.active.insert(key.clone(), now);
            tracing::debug!(session = %key, active = inner.active.len(), "session admitted");
            return inner.status(&self.config, QueueState::Active, None);
        }

        if inner.position(key).is_none() {
            inner.waiting.push_back(Waiting {
                key: key.clone(),
                enqueued_at: now,
            });
            tracing::debug!(session = %key, waiting = inner.waiting.len(), "session queued");
        }
        let position = inner.position(key);
        inner.status(&self.config, QueueState::Queued, position)
    }

    fn status_at(&self, key: &SessionKey, now: Instant) -> QueueStatus {
        let mut inner = self.inner.lock();
        inner.maintain(&self.config, now);
        inner.lookup(&self.config, key)
    }

    fn heartbeat_at(&self, key: &SessionKey, now: Instant) -> QueueStatus {
        let mut inner = self.inner.lock();
        inner.maintain(&self.config, now);
        if let Some(last_seen) = inner.active.get_mut(key) {
            *last_seen = now;
        }
        inner.lookup(&self.config, key)
    }

    fn leave_at(&self, key: &SessionKey, now: Instant) -> QueueCounts {
        let mut inner = self.inner.lock();
        let was_active = inner.active.remove(key).is_some();
        let was_waiting = inner.remove_waiting(key);
        if was_active || was_waiting {
            tracing::debug!(session = %key, was_active, "session left");
        }
        // Maintain after removal so the freed slot is handed out immediately.
        inner.maintain(&self.config, now);

        QueueCounts {
            active_count: inner.active.len(),
            waiting_count: inner.waiting.len(),
            limit: self.config.max_active,
        }
    }
}

impl QueueInner {
    /// Evict silent sessions, then promote waiters into free slots, at most
    /// `promote_batch` per pass.
    fn maintain(&mut self, config: &AdmissionConfig, now: Instant) -> MaintenanceReport {
        let before = self.active.len();
        self.active
            .retain(|_, last_seen| now.saturating_duration_since(*last_seen) <= config.heartbeat_timeout);
        let expired = before - self.active.len();

        let mut slots = config.max_active.saturating_sub(self.active.len());
        let mut promoted = 0;
        while slots > 0 && promoted < config.promote_batch {
            let Some(next) = self.waiting.pop_front() else {
                break;
            };
            // Already active: drop the stale queue entry without using a slot.
            if self.active.contains_key(&next.key) {
                continue;
            }
            tracing::debug!(
                session = %next.key,
                waited_ms = now.saturating_duration_since(next.enqueued_at).as_millis() as u64,
                "session promoted"
            );
            self.active.insert(next.key, now);
            slots -= 1;
            promoted += 1;
        }

        if expired > 0 || promoted > 0 {
            tracing::debug!(expired, promoted, active = self.active.len(), "admission maintenance");
        }

        MaintenanceReport { expired, promoted }
    }

    /// 1-based position in the wait queue.
    fn position(&self, key: &SessionKey) -> Option<usize> {
        self.waiting
            .iter()
            .position(|w| &w.key == key)
            .map(|idx| idx + 1)
    }

    /// Remove the first queue entry for `key`. Returns whether one was found.
    fn remove_waiting(&mut self, key: &SessionKey) -> bool {
        match self.waiting.iter().position(|w| &w.key == key) {
            Some(idx) => {
                self.waiting.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Active wins over queued if a key is somehow in both.
    fn lookup(&self, config: &AdmissionConfig, key: &SessionKey) -> QueueStatus {
        if self.active.contains_key(key) {
            return self.status(config, QueueState::Active, None);
        }
        match self.position(key) {
            Some(position) => self.status(config, QueueState::Queued, Some(position)),
            None => self.status(config, QueueState::None, None),
        }
    }

    fn status(&self, config: &AdmissionConfig, state: QueueState, position: Option<usize>) -> QueueStatus {
        QueueStatus {
            state,
            position,
            active_count: self.active.len(),
            limit: config.max_active,
        }
    }
}
