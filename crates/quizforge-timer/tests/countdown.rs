//! Integration tests for the phase countdown.
//!
//! Uses `tokio::test(start_paused = true)` so `sleep_until` resolves
//! deterministically as the test advances the clock — no real waiting,
//! no flakiness.

use std::time::Duration;

use quizforge_timer::Countdown;

#[tokio::test(start_paused = true)]
async fn test_wait_fires_after_armed_duration() {
    let mut c = Countdown::new();
    c.arm(Duration::from_secs(30));

    let expiry = c.wait().await;

    assert_eq!(expiry.armed_for, Duration::from_secs(30));
    assert!(!c.is_armed(), "countdown should disarm itself on expiry");
}

#[tokio::test(start_paused = true)]
async fn test_wait_is_one_shot() {
    // After firing once, a second wait must pend forever rather than
    // fire again — a stale timer branch in the actor loop must be inert.
    let mut c = Countdown::new();
    c.arm(Duration::from_secs(1));
    let _ = c.wait().await;

    let second = tokio::time::timeout(Duration::from_secs(60), c.wait()).await;
    assert!(second.is_err(), "disarmed countdown should never fire");
}

#[tokio::test(start_paused = true)]
async fn test_unarmed_wait_pends_forever() {
    let mut c = Countdown::new();
    let result = tokio::time::timeout(Duration::from_secs(3600), c.wait()).await;
    assert!(result.is_err(), "unarmed countdown should never fire");
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_pending_deadline() {
    let mut c = Countdown::new();
    c.arm(Duration::from_secs(30));
    // Re-arm with a shorter deadline; the original must be discarded.
    c.arm(Duration::from_secs(5));

    let start = tokio::time::Instant::now();
    let expiry = c.wait().await;

    assert_eq!(expiry.armed_for, Duration::from_secs(5));
    assert!(start.elapsed() < Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_firing() {
    let mut c = Countdown::new();
    c.arm(Duration::from_secs(1));
    c.cancel();

    let result = tokio::time::timeout(Duration::from_secs(60), c.wait()).await;
    assert!(result.is_err(), "cancelled countdown should never fire");
}

#[tokio::test(start_paused = true)]
async fn test_countdown_in_select_loop() {
    // The intended integration shape: a command channel racing the
    // countdown inside select!. The command arrives first; the deadline
    // must still be pending afterwards.
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&'static str>(4);
    let mut c = Countdown::new();
    c.arm(Duration::from_secs(30));

    tx.send("submit").await.unwrap();

    tokio::select! {
        cmd = rx.recv() => {
            assert_eq!(cmd, Some("submit"));
        }
        _ = c.wait() => {
            panic!("countdown should not fire before the command");
        }
    }

    assert!(c.is_armed(), "deadline should survive losing the race");
    let expiry = c.wait().await;
    assert_eq!(expiry.armed_for, Duration::from_secs(30));
}
