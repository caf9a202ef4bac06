//! Artifact Accumulator
//!
//! Grows the artifact buffer one fragment at a time and decides when the
//! surface should see it. Appending is cheap and silent; publishing is
//! coalesced so a burst of fragments produces one update.
//!
//! # Coalescing
//!
//! Every [`Accumulator::request_publish`] replaces the pending deadline with
//! `now + window` (a trailing debounce). With `max_wait` set, the deadline is
//! additionally capped at `first_request + max_wait`, so a stream that never
//! pauses still publishes periodically.
//!
//! The accumulator holds no timer of its own. The owner sleeps until
//! [`Accumulator::deadline`] and then calls [`Accumulator::take_due`], which
//! makes cancellation a matter of dropping the deadline.

use std::time::Duration;

use tokio::time::Instant;

/// Default coalescing window
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(50);

/// How mid-stream publishes are coalesced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoalescePolicy {
    /// Quiet period after the last request before publishing
    pub window: Duration,
    /// Upper bound on how long a requested publish may be deferred
    pub max_wait: Option<Duration>,
}

impl Default for CoalescePolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_COALESCE_WINDOW,
            max_wait: None,
        }
    }
}

impl CoalescePolicy {
    /// Policy with the given window and no max wait
    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            max_wait: None,
        }
    }

    /// Set the max wait
    #[must_use]
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

/// Accumulator counters for the current cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccumulatorStats {
    /// Fragments appended
    pub appends: u64,
    /// Publish requests received
    pub requests: u64,
    /// Snapshots handed out (coalesced and final)
    pub publishes: u64,
}

/// Artifact buffer with a coalesced publish schedule
#[derive(Debug)]
pub struct Accumulator {
    buffer: String,
    policy: CoalescePolicy,
    /// When the pending publish becomes due
    deadline: Option<Instant>,
    /// First request since the last publish
    pending_since: Option<Instant>,
    stats: AccumulatorStats,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new(CoalescePolicy::default())
    }
}

impl Accumulator {
    /// Create an empty accumulator
    #[must_use]
    pub fn new(policy: CoalescePolicy) -> Self {
        Self {
            buffer: String::new(),
            policy,
            deadline: None,
            pending_since: None,
            stats: AccumulatorStats::default(),
        }
    }

    /// Coalescing policy in effect
    #[must_use]
    pub fn policy(&self) -> CoalescePolicy {
        self.policy
    }

    /// Counters for the current cycle
    #[must_use]
    pub fn stats(&self) -> AccumulatorStats {
        self.stats
    }

    /// Start a new cycle: empty buffer, nothing pending
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cancel();
        self.stats = AccumulatorStats::default();
    }

    /// Append a fragment
    pub fn append(&mut self, fragment: &str) {
        self.buffer.push_str(fragment);
        self.stats.appends += 1;
    }

    /// Ask for the current buffer to be published
    ///
    /// Replaces any pending deadline rather than adding another one.
    pub fn request_publish(&mut self, now: Instant) {
        self.stats.requests += 1;
        let since = *self.pending_since.get_or_insert(now);

        let mut deadline = now + self.policy.window;
        if let Some(max_wait) = self.policy.max_wait {
            deadline = deadline.min(since + max_wait);
        }
        self.deadline = Some(deadline);
    }

    /// When the pending publish becomes due, if one is pending
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a publish is pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Take a snapshot if the pending publish is due at `now`
    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.cancel();
                self.stats.publishes += 1;
                Some(self.buffer.clone())
            }
            _ => None,
        }
    }

    /// Cancel any pending publish and return the full buffer
    ///
    /// Called unconditionally at the end of a stream so the surface ends up
    /// with exactly the accumulated text.
    pub fn flush(&mut self) -> String {
        self.cancel();
        self.stats.publishes += 1;
        self.buffer.clone()
    }

    /// Drop the pending publish, if any
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending_since = None;
    }

    /// Current buffer contents
    #[must_use]
    pub fn content(&self) -> &str {
        &self.buffer
    }

    /// Current buffer length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
