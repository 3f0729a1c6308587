//! Staleness rule shared by all backends.
//!
//! Entries carry no expiry date of their own. An entry is stale once its
//! last-modified time differs from the current time by more than the
//! configured threshold, in either direction.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current time
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    pub fn set(&self, moment: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = moment;
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Threshold-based expiry check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    threshold: TimeDelta,
}

impl ExpiryPolicy {
    pub fn from_seconds(seconds: u64) -> Self {
        let threshold = i64::try_from(seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self { threshold }
    }

    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// Signed age of an entry modified at `modified`, as seen at `now`
    pub fn age(now: DateTime<Utc>, modified: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(modified)
    }

    /// `|now - modified| > threshold`
    ///
    /// A timestamp in the future counts as stale too, so clock skew between
    /// writer and sweeper can remove a fresh entry early.
    pub fn is_expired(&self, now: DateTime<Utc>, modified: DateTime<Utc>) -> bool {
        Self::age(now, modified).abs() > self.threshold
    }
}
