//! Create/delete listener bound to the manager handle.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use svcmon_scm::{ScmError, ScmManager, ServiceNotify, StatusSubscription, TransitionMask};

use crate::listener::{self, ListenerConfig, StatusWaiter};
use crate::notification::{listener_channel, NotificationReceiver, NotificationSender};

struct ManagerWaiter {
    subscription: StatusSubscription,
    // Keeps the manager connection alive for as long as the subscription
    // can still arm against its handle.
    _manager: Arc<ScmManager>,
}

impl StatusWaiter for ManagerWaiter {
    fn arm(&mut self, mask: TransitionMask) -> Result<(), ScmError> {
        self.subscription.arm(mask)
    }

    fn wait(&mut self, timeout: Duration) -> Option<ServiceNotify> {
        self.subscription.wait(timeout)
    }
}

/// Subscribes to SCM-level `CREATED`/`DELETED` events.
///
/// Same worker shape as a service listener, but bound to the supervisor's
/// manager handle (shared, read-only: the worker only arms against it and
/// never closes it). Notifications are named after the comma-joined service
/// list they report.
pub struct ScmListener {
    manager: Arc<ScmManager>,
    updates_tx: NotificationSender,
    updates_rx: Option<NotificationReceiver>,
    halt: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ScmListener {
    pub fn new(manager: Arc<ScmManager>) -> ScmListener {
        let (updates_tx, updates_rx) = listener_channel();
        ScmListener {
            manager,
            updates_tx,
            updates_rx: Some(updates_rx),
            halt: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// The receiver half of the update channel. Yields `None` once taken.
    pub fn updates(&mut self) -> Option<NotificationReceiver> {
        self.updates_rx.take()
    }

    pub fn start(&mut self) -> Result<(), io::Error> {
        let config = ListenerConfig {
            name: "scm".to_string(),
            mask: TransitionMask::SCM_EVENTS,
            join_names: true,
            exit_on_delete_pending: false,
        };
        let manager = self.manager.clone();
        let updates = self.updates_tx.clone();
        let halt = self.halt.clone();
        let worker = thread::Builder::new()
            .name("scm-listener".to_string())
            .spawn(move || {
                let waiter = ManagerWaiter {
                    subscription: StatusSubscription::new(manager.raw()),
                    _manager: manager,
                };
                listener::run(waiter, config, updates, halt);
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    pub fn close(&self) {
        self.halt.store(true, Ordering::SeqCst);
    }

    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("scm listener worker panicked");
            }
        }
    }
}

impl Drop for ScmListener {
    fn drop(&mut self) {
        self.close();
    }
}
