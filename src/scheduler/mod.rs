pub mod runner;

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::debug;

/// What a timer is for. Part of the dedupe key, so an assignment holds at
/// most one timer per purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    DeadlineCheck,
    ConfirmationReminder { hours_before: i64 },
    GameDayReminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub assignment_id: i64,
    pub purpose: TimerPurpose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TimerEntry {
    fire_at: DateTime<Utc>,
    seq: u64,
    key: TimerKey,
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.fire_at
            .cmp(&other.fire_at)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct TimerState {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    live: HashMap<TimerKey, u64>,
    next_seq: u64,
}

/// In-process timer queue shared between the server, the timer loop and the
/// assignment lifecycle. Scheduling an already-present key replaces the old
/// timer; superseded and cancelled heap entries are invalidated lazily via a
/// sequence number checked at drain time.
#[derive(Clone)]
pub struct TimerService {
    inner: Arc<Mutex<TimerState>>,
}

impl TimerService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimerState {
                heap: BinaryHeap::new(),
                live: HashMap::new(),
                next_seq: 0,
            })),
        }
    }

    pub fn schedule(&self, key: TimerKey, fire_at: DateTime<Utc>) {
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.live.insert(key, seq);
        state.heap.push(Reverse(TimerEntry { fire_at, seq, key }));
        debug!(
            "Scheduled {:?} for assignment {} at {}",
            key.purpose, key.assignment_id, fire_at
        );
    }

    pub fn cancel(&self, key: &TimerKey) {
        let mut state = self.lock();
        if state.live.remove(key).is_some() {
            debug!(
                "Cancelled {:?} for assignment {}",
                key.purpose, key.assignment_id
            );
        }
    }

    /// Removes and returns every live timer due at `now`, earliest first.
    /// Entries whose sequence no longer matches the live table were
    /// superseded or cancelled and are discarded silently.
    pub fn take_due(&self, now: DateTime<Utc>) -> Vec<TimerKey> {
        let mut state = self.lock();
        let mut due = Vec::new();

        while let Some(Reverse(entry)) = state.heap.peek() {
            if entry.fire_at > now {
                break;
            }
            let Some(Reverse(entry)) = state.heap.pop() else {
                break;
            };
            if state.live.get(&entry.key) == Some(&entry.seq) {
                state.live.remove(&entry.key);
                due.push(entry.key);
            }
        }

        due
    }

    pub fn pending(&self) -> usize {
        self.lock().live.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
