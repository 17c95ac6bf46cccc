//! One-shot phase countdown for Quizforge room actors.
//!
//! A room needs exactly one pending deadline at a time: the live
//! question's countdown, the results display interval, or the
//! finished/abandoned linger. [`Countdown`] models that as a re-armable
//! one-shot timer designed to sit in the room actor's `tokio::select!`
//! loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* player actions */ }
//!         expiry = countdown.wait() => { /* phase deadline hit */ }
//!     }
//! }
//! ```
//!
//! # Idle behavior
//!
//! While unarmed, [`Countdown::wait`] pends forever — the select loop
//! simply never takes that branch. This is the correct behavior for a
//! lobby, where nothing is time-driven.
//!
//! # One-shot semantics
//!
//! A deadline fires at most once: `wait` disarms the countdown as it
//! resolves, so a stale `wait` after the actor already advanced the phase
//! can never fire a second time. Re-arming before expiry replaces the
//! pending deadline.

use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::trace;

/// Details of a fired deadline, returned by [`Countdown::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    /// The duration the countdown was armed with.
    pub armed_for: Duration,
    /// How late the wakeup was relative to the deadline. Normally within
    /// scheduler noise; large values indicate an overloaded runtime.
    pub late_by: Duration,
}

/// A re-armable one-shot deadline.
///
/// One `Countdown` per room actor; the actor owns it exclusively, so no
/// internal synchronization is needed.
#[derive(Debug, Default)]
pub struct Countdown {
    deadline: Option<(TokioInstant, Duration)>,
}

impl Countdown {
    /// Creates an unarmed countdown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms (or re-arms) the countdown to fire after `duration`.
    ///
    /// Any previously pending deadline is replaced.
    pub fn arm(&mut self, duration: Duration) {
        self.deadline = Some((TokioInstant::now() + duration, duration));
        trace!(?duration, "countdown armed");
    }

    /// Clears any pending deadline. Safe to call when already unarmed.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            trace!("countdown cancelled");
        }
    }

    /// Whether a deadline is currently pending.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time until the pending deadline, or `None` when unarmed.
    /// Saturates at zero once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|(at, _)| at.saturating_duration_since(TokioInstant::now()))
    }

    /// Waits for the pending deadline.
    ///
    /// Pends forever while unarmed. On expiry the countdown disarms
    /// itself before returning, so the deadline fires exactly once.
    pub async fn wait(&mut self) -> Expiry {
        let (at, armed_for) = match self.deadline {
            Some(d) => d,
            None => {
                // Unarmed: never resolves. select! takes other branches.
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        time::sleep_until(at).await;
        self.deadline = None;

        let late_by = TokioInstant::now().saturating_duration_since(at);
        trace!(?armed_for, ?late_by, "countdown fired");
        Expiry { armed_for, late_by }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_countdown_is_unarmed() {
        let c = Countdown::new();
        assert!(!c.is_armed());
        assert_eq!(c.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_sets_remaining() {
        let mut c = Countdown::new();
        c.arm(Duration::from_secs(30));
        assert!(c.is_armed());
        let remaining = c.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(30));
        assert!(remaining >= Duration::from_secs(29));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_disarms() {
        let mut c = Countdown::new();
        c.arm(Duration::from_secs(5));
        c.cancel();
        assert!(!c.is_armed());
    }

    #[test]
    fn test_cancel_when_unarmed_is_noop() {
        let mut c = Countdown::new();
        c.cancel();
        assert!(!c.is_armed());
    }
}
