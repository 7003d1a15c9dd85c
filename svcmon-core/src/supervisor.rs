//! The supervisor: owns the filtered service map and reconciles it against
//! both event sources.
//!
//! Admission happens exactly once per service lifetime, at which point the
//! filter sees the name and the static config snapshot. Once admitted, a
//! service stays in the map until the SCM reports it deleted, its own
//! listener observes `DELETE_PENDING`, or the supervisor closes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use svcmon_scm::{
    ControlsAccepted, ScmError, ScmManager, ServiceConfig, ServiceEnumState, ServiceKind,
    ServiceState, TransitionMask,
};

use crate::errors::{Result, SupervisorError};
use crate::notification::{
    MonitorAction, Notification, NotificationReceiver, EVENTS_CHANNEL_CAPACITY,
};
use crate::scm_listener::ScmListener;
use crate::service_listener::ServiceListener;

/// Admission predicate over a service's name and static configuration.
/// Applied exactly once per service lifetime; it may be expensive.
pub type Filter = Box<dyn Fn(&str, &ServiceConfig) -> bool + Send + Sync>;

/// The supervisor's view of one monitored service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRecord {
    /// Service name, preserved verbatim (lookups are case-insensitive).
    pub name: String,
    /// Static config captured at admission; not refreshed.
    pub config: ServiceConfig,
    /// Last observed lifecycle state; `None` until the first transition.
    pub state: Option<ServiceState>,
    pub controls_accepted: ControlsAccepted,
}

struct Monitored {
    record: ServiceRecord,
    listener: ServiceListener,
}

struct Shared {
    manager: Arc<ScmManager>,
    filter: Filter,
    services: RwLock<HashMap<String, Monitored>>,
    events_tx: mpsc::Sender<Notification>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closing: AtomicBool,
}

/// Map key for a service name. The SCM treats names case-insensitively.
fn service_key(name: &str) -> String {
    name.to_lowercase()
}

/// Watches the SCM and keeps a filtered model of the host's services current.
///
/// Construct with [`Supervisor::new`], read snapshots with
/// [`services`](Supervisor::services), drain the merged stream from
/// [`events`](Supervisor::events), and tear down with
/// [`close`](Supervisor::close).
pub struct Supervisor {
    shared: Arc<Shared>,
    scm_listener: Mutex<Option<ScmListener>>,
    events_rx: Mutex<Option<NotificationReceiver>>,
    closed: AtomicBool,
}

impl Supervisor {
    /// Connect to the SCM, subscribe to create/delete events, enumerate the
    /// WIN32 services and admit every match. Returns once the initial
    /// reconciliation is complete.
    ///
    /// `ACCESS_DENIED` and services that vanish mid-enumeration are skipped;
    /// any other admission failure is remembered, the pass completes, and the
    /// first such error is returned after teardown.
    pub async fn new<F>(filter: F) -> Result<Supervisor>
    where
        F: Fn(&str, &ServiceConfig) -> bool + Send + Sync + 'static,
    {
        let manager = Arc::new(ScmManager::connect().map_err(SupervisorError::Connect)?);
        let (events_tx, events_rx) = mpsc::channel(EVENTS_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            manager: manager.clone(),
            filter: Box::new(filter),
            services: RwLock::new(HashMap::new()),
            events_tx,
            tasks: Mutex::new(Vec::new()),
            closing: AtomicBool::new(false),
        });

        let mut scm_listener = ScmListener::new(manager);
        let scm_updates = scm_listener
            .updates()
            .expect("update receiver is present until taken");
        scm_listener.start().map_err(|source| SupervisorError::Worker {
            name: "scm".to_string(),
            source,
        })?;

        let supervisor = Supervisor {
            shared: shared.clone(),
            scm_listener: Mutex::new(Some(scm_listener)),
            events_rx: Mutex::new(Some(events_rx)),
            closed: AtomicBool::new(false),
        };

        let enumerated = match shared
            .manager
            .enumerate(ServiceKind::WIN32, ServiceEnumState::All)
        {
            Ok(enumerated) => enumerated,
            Err(source) => {
                let err = SupervisorError::Enumerate(source);
                let _ = supervisor.close().await;
                return Err(err);
            }
        };

        let mut first_err = None;
        for entry in &enumerated {
            if entry.name.is_empty() {
                continue;
            }
            match try_admit(&shared, &entry.name) {
                Ok(()) => {}
                Err(SupervisorError::Admit { ref name, ref source }) if source.is_gone() => {
                    debug!(service = %name, "service vanished during enumeration");
                }
                Err(err) => {
                    warn!(%err, "admission failed during initial enumeration");
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
        if let Some(err) = first_err {
            let _ = supervisor.close().await;
            return Err(err);
        }

        let scm_task = tokio::spawn(scm_worker(shared.clone(), scm_updates));
        shared.tasks.lock().push(scm_task);

        info!(
            services = supervisor.shared.services.read().len(),
            "supervisor started"
        );
        Ok(supervisor)
    }

    /// A consistent point-in-time snapshot of the monitored services.
    pub fn services(&self) -> Vec<ServiceRecord> {
        self.shared
            .services
            .read()
            .values()
            .map(|monitored| monitored.record.clone())
            .collect()
    }

    /// The merged notification stream (SCM events and every service
    /// listener's events, fairly interleaved). Single consumer: yields
    /// `None` once the receiver has been taken.
    pub fn events(&self) -> Option<NotificationReceiver> {
        self.events_rx.lock().take()
    }

    /// Shut everything down: stop the SCM listener, drain the map, join
    /// every worker, close the manager handle. Idempotent.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.closing.store(true, Ordering::SeqCst);

        // The SCM listener goes first so no new admissions race the drain.
        let scm_listener = self.scm_listener.lock().take();
        if let Some(listener) = scm_listener {
            listener.close();
            let _ = tokio::task::spawn_blocking(move || {
                let mut listener = listener;
                listener.join();
            })
            .await;
        }

        let drained: Vec<Monitored> = {
            let mut services = self.shared.services.write();
            services.drain().map(|(_, monitored)| monitored).collect()
        };
        for monitored in &drained {
            monitored.listener.close();
        }
        if !drained.is_empty() {
            let _ = tokio::task::spawn_blocking(move || {
                let mut drained = drained;
                for monitored in &mut drained {
                    monitored.listener.join();
                }
            })
            .await;
        }

        // Every sender is gone; the reconciliation workers drain and exit.
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.shared.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }

        self.shared
            .manager
            .disconnect()
            .map_err(SupervisorError::Disconnect)?;
        info!("supervisor closed");
        Ok(())
    }
}

/// Open, snapshot, filter, and start monitoring one service.
///
/// `ACCESS_DENIED` is not an error: the service is silently skipped. If the
/// name is already monitored the first admission wins and the fresh handle
/// is closed.
fn try_admit(shared: &Arc<Shared>, name: &str) -> Result<()> {
    if shared.closing.load(Ordering::SeqCst) {
        return Ok(());
    }
    let service = match shared.manager.open_service(name) {
        Ok(service) => service,
        Err(ScmError::AccessDenied) => {
            debug!(service = name, "access denied, skipping");
            return Ok(());
        }
        Err(source) => {
            return Err(SupervisorError::Admit {
                name: name.to_string(),
                source,
            })
        }
    };

    let config = match service.query_config() {
        Ok(config) => config,
        // The handle closes with `service`.
        Err(source) => {
            return Err(SupervisorError::Admit {
                name: name.to_string(),
                source,
            })
        }
    };

    if !(shared.filter)(name, &config) {
        return Ok(());
    }

    let key = service_key(name);
    let mut listener = ServiceListener::new(name, service);
    let updates = listener
        .updates()
        .expect("update receiver is present until taken");

    {
        let mut services = shared.services.write();
        // Re-checked under the map lock: close() flips the flag before it
        // drains, so an admission that gets here late must not insert.
        if shared.closing.load(Ordering::SeqCst) || services.contains_key(&key) {
            return Ok(());
        }
        listener.start().map_err(|source| SupervisorError::Worker {
            name: name.to_string(),
            source,
        })?;
        services.insert(
            key.clone(),
            Monitored {
                record: ServiceRecord {
                    name: name.to_string(),
                    config,
                    state: None,
                    controls_accepted: ControlsAccepted::empty(),
                },
                listener,
            },
        );
        // Registered while the lock is held so close() is guaranteed to
        // see and await this worker.
        let task = tokio::spawn(service_worker(shared.clone(), key, updates));
        shared.tasks.lock().push(task);
    }

    info!(service = name, "monitoring service");
    Ok(())
}

/// Drop a record and stop its listener. The worker detaches, observes halt
/// within one wait interval, and closes the service handle on its way out.
fn remove_record(shared: &Shared, key: &str) -> bool {
    match shared.services.write().remove(key) {
        Some(monitored) => {
            monitored.listener.close();
            true
        }
        None => false,
    }
}

/// Consumes one service listener's updates: state transitions, the delete
/// paths, and reload requests.
async fn service_worker(shared: Arc<Shared>, key: String, mut updates: NotificationReceiver) {
    while let Some(notification) = updates.recv().await {
        match notification.action {
            MonitorAction::Success => {
                let mut deleting = false;
                if let Some(notify) = &notification.notify {
                    {
                        let mut services = shared.services.write();
                        if let Some(monitored) = services.get_mut(&key) {
                            if let Some(state) = notify.service_status.current_state {
                                monitored.record.state = Some(state);
                            } else if let Some(state) =
                                ServiceState::from_transition(notify.triggered)
                            {
                                monitored.record.state = Some(state);
                            }
                            monitored.record.controls_accepted =
                                notify.service_status.controls_accepted;
                        }
                    }
                    deleting = notify.triggered.contains(TransitionMask::DELETE_PENDING);
                }
                if deleting && remove_record(&shared, &key) {
                    debug!(service = %key, "delete pending, record dropped");
                }
            }
            MonitorAction::Delete => {
                if remove_record(&shared, &key) {
                    debug!(service = %key, "listener terminated, record dropped");
                }
            }
            MonitorAction::Reload => {
                let name = shared
                    .services
                    .read()
                    .get(&key)
                    .map(|monitored| monitored.record.name.clone());
                remove_record(&shared, &key);
                if let Some(name) = name {
                    if let Err(err) = try_admit(&shared, &name) {
                        warn!(service = %name, %err, "failed to re-admit service");
                    }
                }
            }
        }
        forward(&shared, notification);
    }
}

/// Consumes the SCM listener's updates: admissions for created services,
/// authoritative removal for deleted ones.
async fn scm_worker(shared: Arc<Shared>, mut updates: NotificationReceiver) {
    while let Some(notification) = updates.recv().await {
        match notification.action {
            MonitorAction::Success => {
                if let Some(notify) = &notification.notify {
                    if notify.triggered.contains(TransitionMask::CREATED) {
                        for name in &notify.service_names {
                            if let Err(err) = try_admit(&shared, name) {
                                warn!(service = %name, %err, "failed to admit created service");
                            }
                        }
                    }
                    if notify.triggered.contains(TransitionMask::DELETED) {
                        for name in &notify.service_names {
                            if remove_record(&shared, &service_key(name)) {
                                info!(service = %name, "service deleted, record dropped");
                            }
                        }
                    }
                }
                forward(&shared, notification);
            }
            MonitorAction::Delete => {
                if shared.closing.load(Ordering::SeqCst) {
                    debug!("scm listener stopped");
                } else {
                    error!("scm subscription lost; create/delete tracking has stopped");
                }
                forward(&shared, notification);
                break;
            }
            MonitorAction::Reload => forward(&shared, notification),
        }
    }
}

/// Push onto the merged stream without ever blocking reconciliation. A full
/// stream drops the event, same policy as the listeners' own channels.
fn forward(shared: &Shared, notification: Notification) {
    use tokio::sync::mpsc::error::TrySendError;

    match shared.events_tx.try_send(notification) {
        Ok(()) => {}
        Err(TrySendError::Full(notification)) => {
            warn!(name = %notification.name, "event stream full, dropping notification");
        }
        Err(TrySendError::Closed(_)) => {}
    }
}

#[cfg(test)]
mod tests;
