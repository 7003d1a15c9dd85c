//! The unit of communication between listeners and the supervisor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use svcmon_scm::ServiceNotify;
use tokio::sync::mpsc;

/// What the supervisor should do with a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorAction {
    /// Consume normally.
    Success,
    /// The listener is terminating; drop its record.
    Delete,
    /// Close the service handle and reopen it.
    Reload,
}

/// One event from a listener.
///
/// `name` is the service name for per-service listeners; manager-level
/// listeners carry the comma-joined names of the affected services, with the
/// individual names in `notify.service_names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub name: String,
    pub notify: Option<ServiceNotify>,
    pub action: MonitorAction,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn success(name: impl Into<String>, notify: ServiceNotify) -> Notification {
        Notification {
            name: name.into(),
            notify: Some(notify),
            action: MonitorAction::Success,
            timestamp: Utc::now(),
        }
    }

    /// The single terminal notification a listener emits as it shuts down.
    pub fn terminal(name: impl Into<String>) -> Notification {
        Notification {
            name: name.into(),
            notify: None,
            action: MonitorAction::Delete,
            timestamp: Utc::now(),
        }
    }
}

/// Capacity of each listener's update channel.
pub const LISTENER_CHANNEL_CAPACITY: usize = 10;

/// Capacity of the supervisor's merged event channel.
pub const EVENTS_CHANNEL_CAPACITY: usize = 200;

pub type NotificationSender = mpsc::Sender<Notification>;
pub type NotificationReceiver = mpsc::Receiver<Notification>;

/// Channel pair for one listener.
pub fn listener_channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::channel(LISTENER_CHANNEL_CAPACITY)
}
