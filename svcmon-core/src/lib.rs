//! Event-driven model of the Windows service set.
//!
//! A [`Supervisor`] subscribes to the service control manager's create/delete
//! notifications and to every admitted service's lifecycle transitions, then
//! keeps a filtered in-process map of services current without polling.
//! Consumers read point-in-time snapshots with `services()` and react to the
//! merged notification stream from `events()`.

pub mod errors;
// The loop itself is platform-neutral; only the real waiters are not.
#[cfg_attr(not(windows), allow(dead_code))]
mod listener;
pub mod notification;

#[cfg(windows)]
pub mod scm_listener;
#[cfg(windows)]
pub mod service_listener;
#[cfg(windows)]
pub mod supervisor;

pub use errors::SupervisorError;
pub use notification::{MonitorAction, Notification};

#[cfg(windows)]
pub use supervisor::{Filter, ServiceRecord, Supervisor};
