//! Per-user cooldowns.
//!
//! A [`CooldownTracker`] remembers when each user last completed a gated action
//! and answers whether a new action falls inside a caller-supplied window. The
//! map lives for the lifetime of the process; nothing is persisted.

use std::{
    collections::HashMap,
    ops::Deref,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};

use crate::base::{config::Config, types::UserId};

// Clocks.

/// Source of "now" for cooldown comparisons.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += to_delta(by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn to_delta(window: Duration) -> TimeDelta {
    TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX)
}

// Tracker.

/// Per-user "last action" clock.
///
/// This is trivially cloneable; clones share the same map.
#[derive(Clone)]
pub struct CooldownTracker {
    inner: Arc<CooldownTrackerInner>,
}

impl Deref for CooldownTracker {
    type Target = CooldownTrackerInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct CooldownTrackerInner {
    clock: Arc<dyn Clock>,
    last_actions: Mutex<HashMap<UserId, DateTime<Utc>>>,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownTracker {
    /// Create a tracker driven by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a tracker driven by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(CooldownTrackerInner {
                clock,
                last_actions: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<UserId, DateTime<Utc>>> {
        self.last_actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` iff `user` has a recorded action less than `window` ago.
    pub fn needs_cooldown(&self, user: UserId, window: Duration) -> bool {
        let now = self.clock.now();
        let entries = self.entries();

        entries.get(&user).is_some_and(|last| now.signed_duration_since(*last) < to_delta(window))
    }

    /// Record that `user` just completed a gated action.
    pub fn record_action(&self, user: UserId) {
        let now = self.clock.now();
        let mut entries = self.entries();

        stamp(&mut entries, user, now);
    }

    /// Atomically check the cooldown and, if clear, reserve the slot.
    ///
    /// Returns `None` while `user` is cooling down. Otherwise the returned permit
    /// holds the reservation: [`CooldownPermit::commit`] keeps it, and dropping
    /// the permit uncommitted rolls the entry back to its previous value.
    pub fn try_acquire(&self, user: UserId, window: Duration) -> Option<CooldownPermit> {
        let now = self.clock.now();
        let mut entries = self.entries();

        let previous = entries.get(&user).copied();

        if previous.is_some_and(|last| now.signed_duration_since(last) < to_delta(window)) {
            return None;
        }

        let stamped = stamp(&mut entries, user, now);

        Some(CooldownPermit {
            tracker: self.clone(),
            user,
            previous,
            stamped,
            committed: false,
        })
    }
}

/// Store `now` for `user` without ever moving the entry backwards.
fn stamp(entries: &mut HashMap<UserId, DateTime<Utc>>, user: UserId, now: DateTime<Utc>) -> DateTime<Utc> {
    let entry = entries.entry(user).or_insert(now);
    *entry = (*entry).max(now);
    *entry
}

/// A reserved cooldown slot; see [`CooldownTracker::try_acquire`].
#[must_use = "dropping a permit without committing releases the cooldown"]
pub struct CooldownPermit {
    tracker: CooldownTracker,
    user: UserId,
    previous: Option<DateTime<Utc>>,
    stamped: DateTime<Utc>,
    committed: bool,
}

impl CooldownPermit {
    /// Keep the reservation as a recorded action.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for CooldownPermit {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        let mut entries = self.tracker.entries();

        // Someone else recorded after us; their stamp wins.
        if entries.get(&self.user) != Some(&self.stamped) {
            return;
        }

        match self.previous {
            Some(previous) => {
                entries.insert(self.user, previous);
            }
            None => {
                entries.remove(&self.user);
            }
        }
    }
}

// Bundle.

/// The three gated actions, each with its own tracker and window.
#[derive(Clone)]
pub struct Cooldowns {
    /// Reacting to a user's message.
    pub reaction: CooldownTracker,
    pub reaction_window: Duration,
    /// Replying with the help text.
    pub help: CooldownTracker,
    pub help_window: Duration,
    /// Replying with a rejected `set` argument.
    pub rejection: CooldownTracker,
    pub rejection_window: Duration,
}

impl Cooldowns {
    /// Create wall-clock trackers using the configured windows.
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create trackers sharing `clock`, using the configured windows.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            reaction: CooldownTracker::with_clock(clock.clone()),
            reaction_window: config.reaction_cooldown(),
            help: CooldownTracker::with_clock(clock.clone()),
            help_window: config.help_cooldown(),
            rejection: CooldownTracker::with_clock(clock),
            rejection_window: config.rejection_cooldown(),
        }
    }
}

// Tests.
