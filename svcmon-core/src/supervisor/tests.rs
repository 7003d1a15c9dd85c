use super::*;

use svcmon_scm::{ErrorControl, StartType};

fn config() -> ServiceConfig {
    ServiceConfig {
        service_type: ServiceKind::WIN32_OWN_PROCESS,
        start_type: StartType::Demand,
        error_control: ErrorControl::Normal,
        binary_path_name: r"C:\svc\agent.exe".to_string(),
        load_order_group: String::new(),
        tag_id: 0,
        dependencies: Vec::new(),
        service_start_name: "LocalSystem".to_string(),
        display_name: "Agent".to_string(),
        description: Some("vcap".to_string()),
    }
}

#[test]
fn keys_fold_case_but_records_keep_the_name_verbatim() {
    assert_eq!(service_key("Spooler"), service_key("spooler"));
    assert_eq!(service_key("SPOOLER"), "spooler");

    let record = ServiceRecord {
        name: "Spooler".to_string(),
        config: config(),
        state: None,
        controls_accepted: ControlsAccepted::empty(),
    };
    assert_eq!(record.name, "Spooler");
}

#[test]
fn fresh_records_have_no_observed_state() {
    let record = ServiceRecord {
        name: "agent".to_string(),
        config: config(),
        state: None,
        controls_accepted: ControlsAccepted::empty(),
    };
    assert!(record.state.is_none());
    assert!(record.controls_accepted.is_empty());
}

#[test]
fn records_serialize_for_the_json_front_end() {
    let record = ServiceRecord {
        name: "agent".to_string(),
        config: config(),
        state: Some(ServiceState::Running),
        controls_accepted: ControlsAccepted::STOP,
    };
    let json = serde_json::to_string(&record).expect("serialize");
    assert!(json.contains("\"agent\""));
    assert!(json.contains("Running"));
}
