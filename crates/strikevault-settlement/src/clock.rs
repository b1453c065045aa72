//! Series expiration gate.
//!
//! [`SeriesClock`] decides whether an operation may run in the series'
//! current state. Mint, burn, and exercise need `NOT_EXPIRED`; withdraw
//! needs `EXPIRED`. Expiry is a plain comparison of "now" against the
//! configured instant, never a scheduled callback, so the clock takes the
//! current time as an argument and the vault reads it from a
//! [`TimeSource`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use strikevault_types::{Address, ExpirationPolicy, Result, SeriesState, StrikevaultError};

/// Where the vault reads the current time from.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time that only moves when told to. Used for simulations and tests.
#[derive(Debug)]
pub struct ManualTimeSource {
    now: RwLock<DateTime<Utc>>,
}

impl ManualTimeSource {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Two-state expiration gate for one series.
///
/// The latched state only ever moves `NOT_EXPIRED → EXPIRED`. Once the
/// configured instant has passed, the series counts as expired whether or
/// not the latch has been recorded yet.
#[derive(Debug, Clone)]
pub struct SeriesClock {
    policy: ExpirationPolicy,
    latched: SeriesState,
}

impl SeriesClock {
    /// Create a clock starting in `NOT_EXPIRED`.
    #[must_use]
    pub fn new(policy: ExpirationPolicy) -> Self {
        Self {
            policy,
            latched: SeriesState::NotExpired,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &ExpirationPolicy {
        &self.policy
    }

    /// Effective state at `now`.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> SeriesState {
        if self.latched.is_expired() || self.policy.is_due(now) {
            SeriesState::Expired
        } else {
            SeriesState::NotExpired
        }
    }

    #[must_use]
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now).is_expired()
    }

    /// Record a time-driven expiry. Returns `true` only for the call that
    /// performed the transition.
    pub fn observe(&mut self, now: DateTime<Utc>) -> bool {
        if !self.latched.is_expired() && self.policy.is_due(now) {
            self.latched = SeriesState::Expired;
            return true;
        }
        false
    }

    /// Guard an operation that needs a live series.
    ///
    /// # Errors
    /// Returns `PreconditionFailed` once the series has expired.
    pub fn ensure_not_expired(&self, operation: &'static str, now: DateTime<Utc>) -> Result<()> {
        match self.state_at(now) {
            SeriesState::NotExpired => Ok(()),
            state => Err(StrikevaultError::PreconditionFailed { operation, state }),
        }
    }

    /// Guard an operation that needs an expired series.
    ///
    /// # Errors
    /// Returns `PreconditionFailed` while the series is live.
    pub fn ensure_expired(&self, operation: &'static str, now: DateTime<Utc>) -> Result<()> {
        match self.state_at(now) {
            SeriesState::Expired => Ok(()),
            state => Err(StrikevaultError::PreconditionFailed { operation, state }),
        }
    }

    /// Manually expire the series on behalf of `caller`.
    ///
    /// # Errors
    /// - `AlreadyExpired` if the series is already expired, latched or by time
    /// - `ExpirationDenied` if `caller` is not the policy's admin
    pub fn force(&mut self, caller: &Address, now: DateTime<Utc>) -> Result<()> {
        if self.has_expired(now) {
            return Err(StrikevaultError::AlreadyExpired);
        }
        if !self.policy.is_admin(caller) {
            return Err(StrikevaultError::ExpirationDenied { caller: *caller });
        }
        self.latched = SeriesState::Expired;
        Ok(())
    }
}
