use super::*;

#[test]
fn transition_mask_values_match_the_wire() {
    assert_eq!(TransitionMask::STOPPED.bits(), 0x1);
    assert_eq!(TransitionMask::START_PENDING.bits(), 0x2);
    assert_eq!(TransitionMask::STOP_PENDING.bits(), 0x4);
    assert_eq!(TransitionMask::RUNNING.bits(), 0x8);
    assert_eq!(TransitionMask::CONTINUE_PENDING.bits(), 0x10);
    assert_eq!(TransitionMask::PAUSE_PENDING.bits(), 0x20);
    assert_eq!(TransitionMask::PAUSED.bits(), 0x40);
    assert_eq!(TransitionMask::CREATED.bits(), 0x80);
    assert_eq!(TransitionMask::DELETED.bits(), 0x100);
    assert_eq!(TransitionMask::DELETE_PENDING.bits(), 0x200);
}

#[test]
fn lifecycle_mask_covers_every_service_transition() {
    let lifecycle = TransitionMask::LIFECYCLE;
    assert!(lifecycle.contains(TransitionMask::STOPPED));
    assert!(lifecycle.contains(TransitionMask::DELETE_PENDING));
    assert!(!lifecycle.intersects(TransitionMask::SCM_EVENTS));
    assert_eq!(lifecycle.bits(), 0x27F);
}

#[test]
fn masks_render_as_pipe_joined_names() {
    let mask = TransitionMask::RUNNING | TransitionMask::STOPPED;
    let rendered = mask.to_string();
    assert!(rendered.contains("RUNNING"));
    assert!(rendered.contains("STOPPED"));
    assert!(rendered.contains('|'));
    assert_eq!(TransitionMask::empty().to_string(), "0x0");
}

#[test]
fn service_state_round_trips_raw_values() {
    for raw in 1..=7 {
        let state = ServiceState::from_raw(raw).expect("valid state");
        assert_eq!(state as u32, raw);
    }
    assert_eq!(ServiceState::from_raw(0), None);
    assert_eq!(ServiceState::from_raw(8), None);
    assert_eq!(ServiceState::from_raw(0xFFFF_FFFF), None);
}

#[test]
fn service_state_from_single_transition_bit() {
    assert_eq!(
        ServiceState::from_transition(TransitionMask::RUNNING),
        Some(ServiceState::Running)
    );
    assert_eq!(
        ServiceState::from_transition(TransitionMask::STOPPED),
        Some(ServiceState::Stopped)
    );
    assert_eq!(ServiceState::from_transition(TransitionMask::DELETE_PENDING), None);
    assert_eq!(ServiceState::from_transition(TransitionMask::CREATED), None);
}

#[test]
fn service_state_displays_scm_names() {
    assert_eq!(ServiceState::Running.to_string(), "SERVICE_RUNNING");
    assert_eq!(ServiceState::StopPending.to_string(), "SERVICE_STOP_PENDING");
}

#[test]
fn start_type_falls_back_to_demand() {
    assert_eq!(StartType::from_raw(2), StartType::Auto);
    assert_eq!(StartType::from_raw(4), StartType::Disabled);
    assert_eq!(StartType::from_raw(99), StartType::Demand);
}

#[test]
fn win32_kind_is_the_union_of_own_and_shared() {
    assert_eq!(ServiceKind::WIN32.bits(), 0x30);
    assert!(ServiceKind::WIN32.contains(ServiceKind::WIN32_OWN_PROCESS));
    assert!(ServiceKind::WIN32.contains(ServiceKind::WIN32_SHARE_PROCESS));
    assert!(!ServiceKind::WIN32.intersects(ServiceKind::DRIVER));
}

#[test]
fn created_names_lose_their_slash_prefix() {
    let mut names = vec!["/alpha".to_string(), "beta".to_string()];
    ServiceNotify::strip_created_prefix(TransitionMask::CREATED, &mut names);
    assert_eq!(names, vec!["alpha", "beta"]);
}

#[test]
fn deleted_names_are_left_untouched() {
    let mut names = vec!["/gamma".to_string()];
    ServiceNotify::strip_created_prefix(TransitionMask::DELETED, &mut names);
    assert_eq!(names, vec!["/gamma"]);
}

#[test]
fn only_one_leading_slash_is_stripped() {
    let mut names = vec!["//double".to_string()];
    ServiceNotify::strip_created_prefix(TransitionMask::CREATED, &mut names);
    assert_eq!(names, vec!["/double"]);
}

#[test]
fn controls_accepted_renders_known_bits() {
    let controls = ControlsAccepted::STOP | ControlsAccepted::SHUTDOWN;
    let rendered = controls.to_string();
    assert!(rendered.contains("STOP"));
    assert!(rendered.contains("SHUTDOWN"));
}
