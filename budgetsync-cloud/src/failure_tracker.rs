//! Bounded memory of recent decrypt failures.
//!
//! Each failure is keyed by a typed signature (session, phase, kind). The map
//! evicts entries older than the TTL and, past its capacity, the least
//! recently seen ones.

use crate::config::IntegrityConfig;
use crate::error::DecryptFailureKind;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FailureSignature {
    pub session: String,
    /// Where the failure happened, e.g. `"manifest"`.
    pub phase: &'static str,
    pub kind: DecryptFailureKind,
}

impl FailureSignature {
    pub fn new(session: impl Into<String>, phase: &'static str, kind: DecryptFailureKind) -> Self {
        Self {
            session: session.into(),
            phase,
            kind,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FailureRecord {
    /// Occurrences inside the corruption window.
    count: u32,
    /// Consecutive occurrences each inside the backoff window of the last.
    streak: u32,
    last_seen: i64,
}

/// Result of recording one failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recorded {
    /// Occurrences of this signature inside the corruption window.
    pub count: u32,
    /// The same signature was already seen inside the backoff window.
    pub recurring: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedFailure {
    pub session: String,
    pub phase: String,
    pub kind: String,
    pub count: u32,
    pub last_seen: i64,
}

#[derive(Debug)]
pub struct FailureTracker {
    limits: IntegrityConfig,
    entries: HashMap<FailureSignature, FailureRecord>,
}

impl FailureTracker {
    pub fn new(limits: IntegrityConfig) -> Self {
        Self {
            limits,
            entries: HashMap::new(),
        }
    }

    pub fn record(&mut self, signature: FailureSignature, now: i64) -> Recorded {
        self.evict(now);

        let backoff = self.limits.decrypt_backoff_ms as i64;
        let window = self.limits.corruption_window_ms as i64;
        let entry = self.entries.entry(signature).or_insert(FailureRecord {
            count: 0,
            streak: 0,
            last_seen: i64::MIN,
        });

        let age = now.saturating_sub(entry.last_seen);
        let recurring = entry.count > 0 && age < backoff;
        entry.count = if entry.count > 0 && age < window {
            entry.count + 1
        } else {
            1
        };
        entry.streak = if recurring { entry.streak + 1 } else { 1 };
        entry.last_seen = now;

        let recorded = Recorded {
            count: entry.count,
            recurring,
        };
        self.enforce_capacity();
        recorded
    }

    /// Whether loads for `session` should be skipped: some non-transient
    /// signature recurred within the backoff window, and the backoff since
    /// its last occurrence has not run out.
    pub fn should_skip(&self, session: &str, now: i64) -> bool {
        let backoff = self.limits.decrypt_backoff_ms as i64;
        self.entries.iter().any(|(sig, rec)| {
            sig.session == session
                && !sig.kind.is_transient()
                && rec.streak >= 2
                && now.saturating_sub(rec.last_seen) < backoff
        })
    }

    /// Recent failures for `session` carrying the known corruption signature.
    pub fn recent_corruption_count(&self, session: &str, now: i64) -> u32 {
        let window = self.limits.corruption_window_ms as i64;
        self.entries
            .iter()
            .filter(|(sig, rec)| {
                sig.session == session
                    && sig.kind.is_known_corruption()
                    && now.saturating_sub(rec.last_seen) < window
            })
            .map(|(_, rec)| rec.count)
            .sum()
    }

    pub fn clear_session(&mut self, session: &str) {
        self.entries.retain(|sig, _| sig.session != session);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<TrackedFailure> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .map(|(sig, rec)| TrackedFailure {
                session: crate::redact(&sig.session),
                phase: sig.phase.to_string(),
                kind: sig.kind.to_string(),
                count: rec.count,
                last_seen: rec.last_seen,
            })
            .collect();
        out.sort_by_key(|f| std::cmp::Reverse(f.last_seen));
        out
    }

    fn evict(&mut self, now: i64) {
        let ttl = self.limits.failure_ttl_ms as i64;
        let before = self.entries.len();
        self.entries
            .retain(|_, rec| now.saturating_sub(rec.last_seen) < ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "expired decrypt failure signatures");
        }
    }

    fn enforce_capacity(&mut self) {
        while self.entries.len() > self.limits.max_tracked_failures {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, rec)| rec.last_seen)
                .map(|(sig, _)| sig.clone());
            match oldest {
                Some(sig) => {
                    self.entries.remove(&sig);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 60 * 1000;

    fn sig(kind: DecryptFailureKind) -> FailureSignature {
        FailureSignature::new("budget-1", "manifest", kind)
    }

    #[test]
    fn second_failure_in_backoff_is_recurring_and_skips() {
        let mut tracker = FailureTracker::new(IntegrityConfig::default());
        let first = tracker.record(sig(DecryptFailureKind::Truncated), 0);
        assert_eq!(first, Recorded { count: 1, recurring: false });
        assert!(!tracker.should_skip("budget-1", MIN));

        let second = tracker.record(sig(DecryptFailureKind::Truncated), MIN);
        assert_eq!(second, Recorded { count: 2, recurring: true });
        assert!(tracker.should_skip("budget-1", 2 * MIN));
        assert!(!tracker.should_skip("budget-1", 7 * MIN));
        assert!(!tracker.should_skip("budget-2", 2 * MIN));
    }

    #[test]
    fn failures_spaced_beyond_backoff_do_not_skip() {
        let mut tracker = FailureTracker::new(IntegrityConfig::default());
        tracker.record(sig(DecryptFailureKind::KeyMismatchOrCorruption), 0);
        let second = tracker.record(sig(DecryptFailureKind::KeyMismatchOrCorruption), 8 * MIN);
        assert_eq!(second, Recorded { count: 2, recurring: false });
        assert!(!tracker.should_skip("budget-1", 8 * MIN + 1));

        tracker.record(sig(DecryptFailureKind::KeyMismatchOrCorruption), 9 * MIN);
        assert!(tracker.should_skip("budget-1", 9 * MIN + 1));
    }

    #[test]
    fn transient_failures_never_skip() {
        let mut tracker = FailureTracker::new(IntegrityConfig::default());
        tracker.record(sig(DecryptFailureKind::Transient), 0);
        tracker.record(sig(DecryptFailureKind::Transient), 1);
        assert!(!tracker.should_skip("budget-1", 2));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut tracker = FailureTracker::new(IntegrityConfig::default());
        tracker.record(sig(DecryptFailureKind::Truncated), 0);
        tracker.record(FailureSignature::new("other", "manifest", DecryptFailureKind::Malformed), 31 * MIN);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.recent_corruption_count("budget-1", 31 * MIN), 0);
    }

    #[test]
    fn capacity_evicts_least_recent() {
        let limits = IntegrityConfig {
            max_tracked_failures: 2,
            ..IntegrityConfig::default()
        };
        let mut tracker = FailureTracker::new(limits);
        for (i, session) in ["a", "b", "c"].into_iter().enumerate() {
            tracker.record(
                FailureSignature::new(session, "manifest", DecryptFailureKind::Malformed),
                i as i64,
            );
        }
        assert_eq!(tracker.len(), 2);
        let sessions: Vec<_> = tracker.snapshot().into_iter().map(|f| f.session).collect();
        assert!(!sessions.iter().any(|s| s.starts_with("a")));
    }
}
