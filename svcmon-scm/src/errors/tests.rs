use super::*;

#[test]
fn access_denied_maps_to_its_own_kind() {
    assert_eq!(ScmError::from_code(ERROR_ACCESS_DENIED), ScmError::AccessDenied);
}

#[test]
fn missing_and_deleting_services_both_map_to_not_found() {
    assert_eq!(
        ScmError::from_code(ERROR_SERVICE_DOES_NOT_EXIST),
        ScmError::NotFound
    );
    assert_eq!(
        ScmError::from_code(ERROR_SERVICE_MARKED_FOR_DELETE),
        ScmError::NotFound
    );
}

#[test]
fn programming_errors_keep_their_code() {
    assert_eq!(
        ScmError::from_code(ERROR_INVALID_PARAMETER),
        ScmError::InvalidArgument(ERROR_INVALID_PARAMETER)
    );
    assert_eq!(
        ScmError::from_code(ERROR_INVALID_LEVEL),
        ScmError::InvalidArgument(ERROR_INVALID_LEVEL)
    );
}

#[test]
fn unknown_codes_are_preserved_verbatim() {
    let err = ScmError::from_code(31);
    assert_eq!(err, ScmError::Os(31));
    assert_eq!(err.code(), 31);
}

#[test]
fn gone_covers_not_found_and_invalid_handle() {
    assert!(ScmError::NotFound.is_gone());
    assert!(ScmError::InvalidHandle.is_gone());
    assert!(!ScmError::AccessDenied.is_gone());
    assert!(!ScmError::ShuttingDown.is_gone());
}

#[test]
fn shutdown_round_trips_through_code() {
    let err = ScmError::from_code(ERROR_SHUTDOWN_IN_PROGRESS);
    assert_eq!(err, ScmError::ShuttingDown);
    assert_eq!(err.code(), ERROR_SHUTDOWN_IN_PROGRESS);
}
