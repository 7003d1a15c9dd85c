//! Exercises the SCM binding against the live service control manager.
//! These run as an ordinary user; nothing here installs or controls services.

#![cfg(windows)]

use svcmon_scm::{is_valid_handle, ScmManager, ServiceEnumState, ServiceKind};

#[test]
fn the_scm_reports_win32_services() {
    let manager = ScmManager::connect().expect("connect to SCM");
    let services = manager
        .enumerate(ServiceKind::WIN32, ServiceEnumState::All)
        .expect("enumerate services");
    assert!(
        !services.is_empty(),
        "a Windows host always has WIN32 services"
    );
    assert!(services.iter().all(|s| !s.name.is_empty()));
    manager.disconnect().expect("disconnect");
}

#[test]
fn enumerated_services_expose_their_static_config() {
    let manager = ScmManager::connect().expect("connect to SCM");
    let services = manager
        .enumerate(ServiceKind::WIN32, ServiceEnumState::All)
        .expect("enumerate services");

    // Not every service grants query access to an ordinary user; one
    // readable service is enough to prove the config path.
    let config = services.iter().find_map(|entry| {
        let service = manager.open_service(&entry.name).ok()?;
        service.query_config().ok()
    });
    let config = config.expect("at least one queryable service");
    assert!(!config.binary_path_name.is_empty());
}

#[test]
fn closed_handles_fail_validation() {
    let manager = ScmManager::connect().expect("connect to SCM");
    let services = manager
        .enumerate(ServiceKind::WIN32, ServiceEnumState::All)
        .expect("enumerate services");

    let service = services
        .iter()
        .find_map(|entry| manager.open_service(&entry.name).ok())
        .expect("at least one openable service");
    let raw = service.raw();
    assert!(is_valid_handle(raw));

    drop(service);
    assert!(!is_valid_handle(raw));
}

#[test]
fn disconnect_is_idempotent() {
    let manager = ScmManager::connect().expect("connect to SCM");
    manager.disconnect().expect("first disconnect");
    manager.disconnect().expect("second disconnect");
}
