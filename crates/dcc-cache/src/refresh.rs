//! # Refresh Gating
//!
//! A [`RefreshGate`] decides whether a cache refresh may run now. A refresh
//! runs only if the download interval has elapsed since the last
//! successful one, and only one refresh per cache runs at a time. A refresh
//! that holds the gate for longer than the lock limit is considered hung;
//! the next caller takes the gate over.
//!
//! The caller supplies `now`, so schedules are testable without sleeping.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::DownloadSchedule;

/// What a refresh attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
    /// The loader ran and the snapshot was replaced.
    Refreshed,
    /// The interval since the last refresh has not elapsed.
    NotDue,
    /// Another refresh holds the gate within its lock limit.
    Skipped,
}

impl RefreshOutcome {
    /// Returns the outcome name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refreshed => "refreshed",
            Self::NotDue => "not_due",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct GateState {
    last_refresh: Option<DateTime<Utc>>,
    holder: Option<Holder>,
    next_token: u64,
}

#[derive(Debug, Clone, Copy)]
struct Holder {
    token: u64,
    since: DateTime<Utc>,
}

/// Proof of holding a [`RefreshGate`]. Returned to
/// [`RefreshGate::release()`].
#[derive(Debug)]
#[must_use = "a held gate must be released"]
pub struct GateTicket {
    token: u64,
    started: DateTime<Utc>,
}

/// Interval and lock-limit gate for one cache.
#[derive(Debug)]
pub struct RefreshGate {
    name: &'static str,
    schedule: DownloadSchedule,
    state: Mutex<GateState>,
}

impl RefreshGate {
    /// Create a gate for the cache called `name`.
    pub fn new(name: &'static str, schedule: DownloadSchedule) -> Self {
        Self {
            name,
            schedule,
            state: Mutex::new(GateState::default()),
        }
    }

    /// The schedule this gate enforces.
    pub fn schedule(&self) -> DownloadSchedule {
        self.schedule
    }

    /// Instant of the last successful refresh.
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_refresh
    }

    /// Try to take the gate at `now`.
    ///
    /// Returns the ticket, or the reason the refresh must not run.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> Result<GateTicket, RefreshOutcome> {
        let mut state = self.state.lock();

        if let Some(last) = state.last_refresh {
            if now - last < self.schedule.interval() {
                return Err(RefreshOutcome::NotDue);
            }
        }

        if let Some(holder) = state.holder {
            let held_for = now - holder.since;
            if held_for < self.schedule.lock_limit() {
                tracing::warn!(
                    cache = self.name,
                    held_secs = held_for.num_seconds(),
                    "refresh skipped, another refresh is running"
                );
                return Err(RefreshOutcome::Skipped);
            }
            tracing::warn!(
                cache = self.name,
                held_secs = held_for.num_seconds(),
                "taking over refresh lock held past its limit"
            );
        }

        state.next_token += 1;
        let token = state.next_token;
        state.holder = Some(Holder { token, since: now });
        Ok(GateTicket {
            token,
            started: now,
        })
    }

    /// Release the gate. A successful refresh becomes the new interval
    /// baseline.
    ///
    /// A ticket whose hold was taken over does not clear the new holder.
    pub fn release(&self, ticket: GateTicket, succeeded: bool) {
        let mut state = self.state.lock();
        if state.holder.is_some_and(|h| h.token == ticket.token) {
            state.holder = None;
        }
        if succeeded && state.last_refresh.map_or(true, |l| ticket.started > l) {
            state.last_refresh = Some(ticket.started);
        }
    }

    /// Run `loader` under the gate and hand its result to `apply`.
    ///
    /// `apply` runs only when the loader succeeds, so a failing loader
    /// leaves the current snapshot untouched.
    pub fn run<T, E: std::fmt::Display>(
        &self,
        now: DateTime<Utc>,
        loader: impl FnOnce() -> Result<T, E>,
        apply: impl FnOnce(T),
    ) -> Result<RefreshOutcome, E> {
        let ticket = match self.try_acquire(now) {
            Ok(ticket) => ticket,
            Err(outcome) => return Ok(outcome),
        };
        match loader() {
            Ok(value) => {
                apply(value);
                self.release(ticket, true);
                tracing::info!(cache = self.name, "snapshot refreshed");
                Ok(RefreshOutcome::Refreshed)
            }
            Err(e) => {
                self.release(ticket, false);
                tracing::warn!(cache = self.name, error = %e, "snapshot refresh failed, keeping previous snapshot");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap()
    }

    fn gate() -> RefreshGate {
        RefreshGate::new("test", DownloadSchedule::new(300, 3600))
    }

    #[test]
    fn first_refresh_is_due() {
        let g = gate();
        let out = g.run(t0(), || Ok::<_, String>(1), |_| {}).unwrap();
        assert_eq!(out, RefreshOutcome::Refreshed);
        assert_eq!(g.last_refresh(), Some(t0()));
    }

    #[test]
    fn refresh_within_interval_is_not_due() {
        let g = gate();
        g.run(t0(), || Ok::<_, String>(()), |_| {}).unwrap();
        let out = g
            .run(t0() + Duration::seconds(299), || Ok::<_, String>(()), |_| {})
            .unwrap();
        assert_eq!(out, RefreshOutcome::NotDue);
        let out = g
            .run(t0() + Duration::seconds(300), || Ok::<_, String>(()), |_| {})
            .unwrap();
        assert_eq!(out, RefreshOutcome::Refreshed);
    }

    #[test]
    fn held_gate_skips_until_lock_limit() {
        let g = gate();
        let first = g.try_acquire(t0()).unwrap();
        assert_eq!(
            g.try_acquire(t0() + Duration::seconds(3599)).unwrap_err(),
            RefreshOutcome::Skipped
        );

        let second = g.try_acquire(t0() + Duration::seconds(3600)).unwrap();
        // the stale holder finishing late does not free the new holder
        g.release(first, false);
        assert_eq!(
            g.try_acquire(t0() + Duration::seconds(3601)).unwrap_err(),
            RefreshOutcome::Skipped
        );
        g.release(second, true);
        assert_eq!(g.last_refresh(), Some(t0() + Duration::seconds(3600)));
    }

    #[test]
    fn failed_loader_keeps_snapshot_and_retries() {
        let g = gate();
        let mut applied = false;
        let err = g
            .run(t0(), || Err::<u8, _>("gateway down".to_string()), |_| applied = true)
            .unwrap_err();
        assert_eq!(err, "gateway down");
        assert!(!applied);
        assert!(g.last_refresh().is_none());

        let out = g
            .run(t0() + Duration::seconds(1), || Ok::<_, String>(2u8), |_| applied = true)
            .unwrap();
        assert_eq!(out, RefreshOutcome::Refreshed);
        assert!(applied);
    }

    proptest! {
        #[test]
        fn outcome_depends_only_on_elapsed_time(elapsed in 0i64..10_000) {
            let g = gate();
            g.run(t0(), || Ok::<_, String>(()), |_| {}).unwrap();
            let out = g
                .run(t0() + Duration::seconds(elapsed), || Ok::<_, String>(()), |_| {})
                .unwrap();
            let expected = if elapsed < 300 {
                RefreshOutcome::NotDue
            } else {
                RefreshOutcome::Refreshed
            };
            prop_assert_eq!(out, expected);
        }
    }
}
