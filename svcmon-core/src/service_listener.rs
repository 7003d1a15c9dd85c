//! Lifecycle listener for one service.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use svcmon_scm::{ScmError, ScmService, ServiceNotify, StatusSubscription, TransitionMask};

use crate::listener::{self, ListenerConfig, StatusWaiter};
use crate::notification::{listener_channel, NotificationReceiver, NotificationSender};

struct ServiceWaiter {
    subscription: StatusSubscription,
}

impl StatusWaiter for ServiceWaiter {
    fn arm(&mut self, mask: TransitionMask) -> Result<(), ScmError> {
        self.subscription.arm(mask)
    }

    fn wait(&mut self, timeout: Duration) -> Option<ServiceNotify> {
        self.subscription.wait(timeout)
    }
}

/// Subscribes to one service's lifecycle transitions on a dedicated worker
/// thread and streams them over a bounded channel.
///
/// The worker owns the service handle; it is closed exactly once, when the
/// worker exits. Termination (delete observed, arming failure, or a
/// [`close`](ServiceListener::close) request) always ends with a single
/// terminal notification carrying [`MonitorAction::Delete`].
///
/// [`MonitorAction::Delete`]: crate::notification::MonitorAction::Delete
pub struct ServiceListener {
    name: String,
    service: Option<ScmService>,
    updates_tx: NotificationSender,
    updates_rx: Option<NotificationReceiver>,
    halt: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ServiceListener {
    pub fn new(name: impl Into<String>, service: ScmService) -> ServiceListener {
        let (updates_tx, updates_rx) = listener_channel();
        ServiceListener {
            name: name.into(),
            service: Some(service),
            updates_tx,
            updates_rx: Some(updates_rx),
            halt: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The receiver half of the update channel. Yields `None` once taken.
    pub fn updates(&mut self) -> Option<NotificationReceiver> {
        self.updates_rx.take()
    }

    /// Launch the worker. Called once, before the listener is shared.
    pub fn start(&mut self) -> Result<(), io::Error> {
        let Some(service) = self.service.take() else {
            return Ok(());
        };
        let config = ListenerConfig {
            name: self.name.clone(),
            mask: TransitionMask::LIFECYCLE,
            join_names: false,
            exit_on_delete_pending: true,
        };
        let updates = self.updates_tx.clone();
        let halt = self.halt.clone();
        let worker = thread::Builder::new()
            .name(format!("svc-listener-{}", self.name))
            .spawn(move || {
                let waiter = ServiceWaiter {
                    subscription: StatusSubscription::new(service.raw()),
                };
                listener::run(waiter, config, updates, halt);
                // `service` drops here: the handle closes on the worker, after
                // its last wait.
                drop(service);
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Request shutdown. Safe to call any number of times, from any thread;
    /// the worker notices within one wait interval.
    pub fn close(&self) {
        self.halt.store(true, Ordering::SeqCst);
    }

    /// Wait for the worker to exit. The handle is closed once this returns.
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!(listener = %self.name, "listener worker panicked");
            }
        }
    }
}

impl Drop for ServiceListener {
    fn drop(&mut self) {
        self.close();
        // An unjoined worker detaches; it observes halt and closes the
        // handle on its way out.
    }
}
