//! The listener worker loop shared by the per-service and manager-level
//! listeners.
//!
//! One iteration: check halt, arm the subscription, sit in a bounded
//! alertable wait, emit whatever completed. Arming and waiting happen on the
//! same worker thread; the bounded wait doubles as the halt check, so the
//! worst-case shutdown latency is one wait interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use svcmon_scm::{ScmError, ServiceNotify, TransitionMask};

use crate::notification::{Notification, NotificationSender};

/// How long each alertable wait lasts before re-checking halt.
pub(crate) const WAIT_INTERVAL: Duration = Duration::from_millis(1000);

/// How long a producer waits for channel room before dropping an update.
pub(crate) const SEND_RETRY_DELAY: Duration = Duration::from_millis(50);

/// The arm/wait pair a listener loop drives. Implemented by the real
/// status-change subscription; test doubles script the sequence.
pub(crate) trait StatusWaiter {
    fn arm(&mut self, mask: TransitionMask) -> Result<(), ScmError>;
    fn wait(&mut self, timeout: Duration) -> Option<ServiceNotify>;
}

pub(crate) struct ListenerConfig {
    /// Name for logs and (unless `join_names`) for outgoing notifications.
    pub name: String,
    pub mask: TransitionMask,
    /// Manager-level listeners name notifications after the comma-joined
    /// service list carried in the payload.
    pub join_names: bool,
    /// Per-service listeners terminate once `DELETE_PENDING` is observed.
    pub exit_on_delete_pending: bool,
}

/// Drive a listener until a terminal condition. Emits exactly one final
/// notification with [`MonitorAction::Delete`] on the way out, whatever the
/// reason for termination.
///
/// [`MonitorAction::Delete`]: crate::notification::MonitorAction::Delete
pub(crate) fn run<W: StatusWaiter>(
    mut waiter: W,
    config: ListenerConfig,
    updates: NotificationSender,
    halt: Arc<AtomicBool>,
) {
    loop {
        if halt.load(Ordering::SeqCst) {
            debug!(listener = %config.name, "halt requested");
            break;
        }

        if let Err(err) = waiter.arm(config.mask) {
            warn!(listener = %config.name, %err, "failed to arm status notification");
            break;
        }

        let notify = match waiter.wait(WAIT_INTERVAL) {
            Some(notify) => notify,
            None => continue,
        };

        let name = if config.join_names {
            notify.service_names.join(",")
        } else {
            config.name.clone()
        };
        let deleting = config.exit_on_delete_pending
            && notify.triggered.contains(TransitionMask::DELETE_PENDING);

        send_or_drop(&updates, &config.name, Notification::success(name, notify));

        if deleting {
            debug!(listener = %config.name, "service is being deleted");
            break;
        }
    }

    send_or_drop(&updates, &config.name, Notification::terminal(&config.name));
}

/// Backpressure by drop: try, give the consumer one grace interval, then log
/// and discard. Listeners never block on a slow supervisor.
pub(crate) fn send_or_drop(updates: &NotificationSender, listener: &str, notification: Notification) {
    match updates.try_send(notification) {
        Ok(()) => {}
        Err(TrySendError::Closed(_)) => {
            debug!(listener, "update channel closed, discarding notification");
        }
        Err(TrySendError::Full(notification)) => {
            std::thread::sleep(SEND_RETRY_DELAY);
            match updates.try_send(notification) {
                Ok(()) => {}
                Err(TrySendError::Closed(_)) => {
                    debug!(listener, "update channel closed, discarding notification");
                }
                Err(TrySendError::Full(notification)) => {
                    warn!(
                        listener,
                        action = ?notification.action,
                        "update channel full, dropping notification"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
