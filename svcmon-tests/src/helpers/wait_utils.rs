//! Polling utilities for eventually-consistent assertions.

use std::time::Duration;

use svcmon_core::notification::NotificationReceiver;
use svcmon_core::Notification;
use tokio::time::{sleep, timeout, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Poll `condition` until it holds or `deadline` elapses.
pub async fn wait_until<F>(mut condition: F, deadline: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        sleep(POLL_INTERVAL).await;
    }
    condition()
}

/// Drain `events` until one matches `predicate`, or `deadline` elapses.
pub async fn wait_for_event<F>(
    events: &mut NotificationReceiver,
    mut predicate: F,
    deadline: Duration,
) -> Option<Notification>
where
    F: FnMut(&Notification) -> bool,
{
    let start = Instant::now();
    loop {
        let remaining = deadline.checked_sub(start.elapsed())?;
        match timeout(remaining, events.recv()).await {
            Ok(Some(notification)) if predicate(&notification) => return Some(notification),
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return None,
        }
    }
}
