use std::collections::VecDeque;

use svcmon_scm::{ControlsAccepted, ServiceKind, ServiceState, ServiceStatusProcess};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use super::*;
use crate::notification::{listener_channel, MonitorAction};

fn status(triggered: TransitionMask) -> ServiceStatusProcess {
    ServiceStatusProcess {
        service_type: ServiceKind::WIN32_OWN_PROCESS,
        current_state: ServiceState::from_transition(triggered),
        controls_accepted: ControlsAccepted::STOP,
        win32_exit_code: 0,
        service_specific_exit_code: 0,
        check_point: 0,
        wait_hint: 0,
        process_id: 4242,
        service_flags: 0,
    }
}

fn notify(triggered: TransitionMask) -> ServiceNotify {
    ServiceNotify {
        notification_status: 0,
        service_status: status(triggered),
        triggered,
        service_names: Vec::new(),
    }
}

fn scm_notify(triggered: TransitionMask, names: &[&str]) -> ServiceNotify {
    ServiceNotify {
        service_names: names.iter().map(|n| n.to_string()).collect(),
        ..notify(triggered)
    }
}

/// Scripted arm/wait sequence. Once the wait script runs dry the fake raises
/// halt so the loop winds down the way a close() would.
struct FakeWaiter {
    arm_results: VecDeque<Result<(), ScmError>>,
    waits: VecDeque<Option<ServiceNotify>>,
    halt: Arc<AtomicBool>,
    armed_with: Vec<TransitionMask>,
}

impl FakeWaiter {
    fn new(waits: Vec<Option<ServiceNotify>>, halt: Arc<AtomicBool>) -> FakeWaiter {
        FakeWaiter {
            arm_results: VecDeque::new(),
            waits: waits.into(),
            halt,
            armed_with: Vec::new(),
        }
    }
}

impl StatusWaiter for FakeWaiter {
    fn arm(&mut self, mask: TransitionMask) -> Result<(), ScmError> {
        self.armed_with.push(mask);
        self.arm_results.pop_front().unwrap_or(Ok(()))
    }

    fn wait(&mut self, _timeout: Duration) -> Option<ServiceNotify> {
        match self.waits.pop_front() {
            Some(outcome) => outcome,
            None => {
                self.halt.store(true, Ordering::SeqCst);
                None
            }
        }
    }
}

fn service_config(name: &str) -> ListenerConfig {
    ListenerConfig {
        name: name.to_string(),
        mask: TransitionMask::LIFECYCLE,
        join_names: false,
        exit_on_delete_pending: true,
    }
}

fn drain(rx: &mut mpsc::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

#[test]
fn transitions_flow_in_order_and_end_with_one_terminal() {
    let halt = Arc::new(AtomicBool::new(false));
    let waiter = FakeWaiter::new(
        vec![
            Some(notify(TransitionMask::START_PENDING)),
            None,
            Some(notify(TransitionMask::RUNNING)),
        ],
        halt.clone(),
    );
    let (tx, mut rx) = listener_channel();

    run(waiter, service_config("spooler"), tx, halt);

    let got = drain(&mut rx);
    assert_eq!(got.len(), 3);
    assert_eq!(got[0].action, MonitorAction::Success);
    assert_eq!(
        got[0].notify.as_ref().unwrap().triggered,
        TransitionMask::START_PENDING
    );
    assert_eq!(
        got[1].notify.as_ref().unwrap().triggered,
        TransitionMask::RUNNING
    );
    assert_eq!(got[2].action, MonitorAction::Delete);
    assert!(got[2].notify.is_none());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
}

#[test]
fn delete_pending_terminates_the_listener() {
    let halt = Arc::new(AtomicBool::new(false));
    let waiter = FakeWaiter::new(
        vec![
            Some(notify(TransitionMask::RUNNING)),
            Some(notify(TransitionMask::DELETE_PENDING)),
            // Never reached; the loop must exit on DELETE_PENDING.
            Some(notify(TransitionMask::STOPPED)),
        ],
        halt.clone(),
    );
    let (tx, mut rx) = listener_channel();

    run(waiter, service_config("doomed"), tx, halt);

    let got = drain(&mut rx);
    assert_eq!(got.len(), 3);
    assert_eq!(
        got[1].notify.as_ref().unwrap().triggered,
        TransitionMask::DELETE_PENDING
    );
    assert_eq!(got[2].action, MonitorAction::Delete);
}

#[test]
fn no_success_is_emitted_after_the_terminal_delete() {
    let halt = Arc::new(AtomicBool::new(false));
    let waiter = FakeWaiter::new(
        vec![Some(notify(TransitionMask::DELETE_PENDING))],
        halt.clone(),
    );
    let (tx, mut rx) = listener_channel();

    run(waiter, service_config("doomed"), tx, halt);

    let got = drain(&mut rx);
    let terminal = got
        .iter()
        .position(|n| n.action == MonitorAction::Delete)
        .expect("terminal notification");
    assert!(got[terminal + 1..]
        .iter()
        .all(|n| n.action != MonitorAction::Success));
    assert_eq!(terminal, got.len() - 1);
}

#[test]
fn arm_failure_is_fatal_and_yields_a_bare_terminal() {
    let halt = Arc::new(AtomicBool::new(false));
    let mut waiter = FakeWaiter::new(vec![], halt.clone());
    waiter.arm_results.push_back(Err(ScmError::InvalidHandle));
    let (tx, mut rx) = listener_channel();

    run(waiter, service_config("vanished"), tx, halt);

    let got = drain(&mut rx);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].action, MonitorAction::Delete);
    assert!(got[0].notify.is_none());
}

#[test]
fn halt_before_the_first_arm_skips_straight_to_terminal() {
    let halt = Arc::new(AtomicBool::new(true));
    let waiter = FakeWaiter::new(vec![Some(notify(TransitionMask::RUNNING))], halt.clone());
    let (tx, mut rx) = listener_channel();

    run(waiter, service_config("halted"), tx, halt);

    let got = drain(&mut rx);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].action, MonitorAction::Delete);
}

#[test]
fn manager_listener_names_events_after_the_payload() {
    let halt = Arc::new(AtomicBool::new(false));
    let waiter = FakeWaiter::new(
        vec![Some(scm_notify(TransitionMask::CREATED, &["alpha", "beta"]))],
        halt.clone(),
    );
    let (tx, mut rx) = listener_channel();

    run(
        waiter,
        ListenerConfig {
            name: "scm".to_string(),
            mask: TransitionMask::SCM_EVENTS,
            join_names: true,
            exit_on_delete_pending: false,
        },
        tx,
        halt,
    );

    let got = drain(&mut rx);
    assert_eq!(got[0].name, "alpha,beta");
    assert_eq!(
        got[0].notify.as_ref().unwrap().service_names,
        vec!["alpha", "beta"]
    );
    // Terminal notifications keep the listener's own name.
    assert_eq!(got.last().unwrap().name, "scm");
}

#[test]
fn the_listener_arms_with_its_configured_mask() {
    let halt = Arc::new(AtomicBool::new(false));
    let mut waiter = FakeWaiter::new(vec![None], halt.clone());
    let (tx, _rx) = listener_channel();

    run(&mut waiter, service_config("masked"), tx, halt);

    assert!(!waiter.armed_with.is_empty());
    assert!(waiter
        .armed_with
        .iter()
        .all(|m| *m == TransitionMask::LIFECYCLE));
}

impl<W: StatusWaiter> StatusWaiter for &mut W {
    fn arm(&mut self, mask: TransitionMask) -> Result<(), ScmError> {
        (**self).arm(mask)
    }

    fn wait(&mut self, timeout: Duration) -> Option<ServiceNotify> {
        (**self).wait(timeout)
    }
}

#[test]
fn a_full_channel_drops_the_update_after_one_grace_interval() {
    let (tx, mut rx) = mpsc::channel(1);
    send_or_drop(&tx, "busy", Notification::terminal("busy"));
    send_or_drop(&tx, "busy", Notification::success("busy", notify(TransitionMask::RUNNING)));

    assert_eq!(drain(&mut rx).len(), 1);
}

#[test]
fn a_closed_channel_is_not_an_error() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    send_or_drop(&tx, "gone", Notification::terminal("gone"));
}
