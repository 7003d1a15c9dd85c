//! The type layer shared by the binding and everything above it.
//!
//! Numeric values mirror the SCM wire values exactly; nothing here may be
//! renumbered without breaking the OS contract.

use std::fmt;

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Status-change transitions a subscription can be armed for.
    ///
    /// The lifecycle bits are valid on a service handle; `CREATED` and
    /// `DELETED` only on a manager handle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TransitionMask: u32 {
        const STOPPED          = 0x0000_0001;
        const START_PENDING    = 0x0000_0002;
        const STOP_PENDING     = 0x0000_0004;
        const RUNNING          = 0x0000_0008;
        const CONTINUE_PENDING = 0x0000_0010;
        const PAUSE_PENDING    = 0x0000_0020;
        const PAUSED           = 0x0000_0040;
        const CREATED          = 0x0000_0080;
        const DELETED          = 0x0000_0100;
        const DELETE_PENDING   = 0x0000_0200;

        /// Everything a per-service listener subscribes to.
        const LIFECYCLE = Self::STOPPED.bits()
            | Self::START_PENDING.bits()
            | Self::STOP_PENDING.bits()
            | Self::RUNNING.bits()
            | Self::CONTINUE_PENDING.bits()
            | Self::PAUSE_PENDING.bits()
            | Self::PAUSED.bits()
            | Self::DELETE_PENDING.bits();

        /// Everything a manager-level listener subscribes to.
        const SCM_EVENTS = Self::CREATED.bits() | Self::DELETED.bits();
    }
}

impl fmt::Display for TransitionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("0x0");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

bitflags::bitflags! {
    /// Control requests a running service reports it accepts.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ControlsAccepted: u32 {
        const STOP                    = 0x0000_0001;
        const PAUSE_CONTINUE          = 0x0000_0002;
        const SHUTDOWN                = 0x0000_0004;
        const PARAMCHANGE             = 0x0000_0008;
        const NETBINDCHANGE           = 0x0000_0010;
        const HARDWAREPROFILECHANGE   = 0x0000_0020;
        const POWEREVENT              = 0x0000_0040;
        const SESSIONCHANGE           = 0x0000_0080;
    }
}

impl fmt::Display for ControlsAccepted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("0x0");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

bitflags::bitflags! {
    /// Service type bits, used both in config snapshots and as the
    /// enumeration type mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ServiceKind: u32 {
        const KERNEL_DRIVER       = 0x0000_0001;
        const FILE_SYSTEM_DRIVER  = 0x0000_0002;
        const WIN32_OWN_PROCESS   = 0x0000_0010;
        const WIN32_SHARE_PROCESS = 0x0000_0020;

        const DRIVER = 0x0000_000B;
        const WIN32  = Self::WIN32_OWN_PROCESS.bits() | Self::WIN32_SHARE_PROCESS.bits();
    }
}

/// Lifecycle state of a service as the SCM reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ServiceState {
    Stopped = 1,
    StartPending = 2,
    StopPending = 3,
    Running = 4,
    ContinuePending = 5,
    PausePending = 6,
    Paused = 7,
}

impl ServiceState {
    pub fn from_raw(raw: u32) -> Option<ServiceState> {
        match raw {
            1 => Some(ServiceState::Stopped),
            2 => Some(ServiceState::StartPending),
            3 => Some(ServiceState::StopPending),
            4 => Some(ServiceState::Running),
            5 => Some(ServiceState::ContinuePending),
            6 => Some(ServiceState::PausePending),
            7 => Some(ServiceState::Paused),
            _ => None,
        }
    }

    /// The state a single-bit transition mask reports, if it names one.
    pub fn from_transition(mask: TransitionMask) -> Option<ServiceState> {
        // Lifecycle transition bits are the state values shifted: bit n-1
        // announces state n.
        if mask.bits().count_ones() != 1 || !TransitionMask::LIFECYCLE.contains(mask) {
            return None;
        }
        if mask == TransitionMask::DELETE_PENDING {
            return None;
        }
        ServiceState::from_raw(mask.bits().trailing_zeros() + 1)
    }

    /// The SCM's own name for the state, as it appears in system tooling.
    pub fn scm_name(&self) -> &'static str {
        match self {
            ServiceState::Stopped => "SERVICE_STOPPED",
            ServiceState::StartPending => "SERVICE_START_PENDING",
            ServiceState::StopPending => "SERVICE_STOP_PENDING",
            ServiceState::Running => "SERVICE_RUNNING",
            ServiceState::ContinuePending => "SERVICE_CONTINUE_PENDING",
            ServiceState::PausePending => "SERVICE_PAUSE_PENDING",
            ServiceState::Paused => "SERVICE_PAUSED",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scm_name())
    }
}

/// How a service is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum StartType {
    Boot = 0,
    System = 1,
    Auto = 2,
    Demand = 3,
    Disabled = 4,
}

impl StartType {
    /// Unknown values fall back to `Demand`, the SCM default for tools that
    /// cannot interpret a newer start type.
    pub fn from_raw(raw: u32) -> StartType {
        match raw {
            0 => StartType::Boot,
            1 => StartType::System,
            2 => StartType::Auto,
            4 => StartType::Disabled,
            _ => StartType::Demand,
        }
    }
}

/// Severity the SCM assigns to a failed service start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorControl {
    Ignore = 0,
    Normal = 1,
    Severe = 2,
    Critical = 3,
}

impl ErrorControl {
    pub fn from_raw(raw: u32) -> ErrorControl {
        match raw {
            0 => ErrorControl::Ignore,
            2 => ErrorControl::Severe,
            3 => ErrorControl::Critical,
            _ => ErrorControl::Normal,
        }
    }
}

/// Which services an enumeration covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ServiceEnumState {
    Active = 1,
    Inactive = 2,
    All = 3,
}

/// Owned copy of the SCM's `SERVICE_STATUS_PROCESS` structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatusProcess {
    pub service_type: ServiceKind,
    pub current_state: Option<ServiceState>,
    pub controls_accepted: ControlsAccepted,
    pub win32_exit_code: u32,
    pub service_specific_exit_code: u32,
    pub check_point: u32,
    pub wait_hint: u32,
    pub process_id: u32,
    pub service_flags: u32,
}

#[cfg(windows)]
impl ServiceStatusProcess {
    pub(crate) fn from_raw(
        raw: &windows_sys::Win32::System::Services::SERVICE_STATUS_PROCESS,
    ) -> ServiceStatusProcess {
        ServiceStatusProcess {
            service_type: ServiceKind::from_bits_retain(raw.dwServiceType),
            current_state: ServiceState::from_raw(raw.dwCurrentState),
            controls_accepted: ControlsAccepted::from_bits_retain(raw.dwControlsAccepted),
            win32_exit_code: raw.dwWin32ExitCode,
            service_specific_exit_code: raw.dwServiceSpecificExitCode,
            check_point: raw.dwCheckPoint,
            wait_hint: raw.dwWaitHint,
            process_id: raw.dwProcessId,
            service_flags: raw.dwServiceFlags,
        }
    }
}

/// Static configuration captured when a service is admitted. Not refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub service_type: ServiceKind,
    pub start_type: StartType,
    pub error_control: ErrorControl,
    pub binary_path_name: String,
    pub load_order_group: String,
    pub tag_id: u32,
    pub dependencies: Vec<String>,
    pub service_start_name: String,
    pub display_name: String,
    pub description: Option<String>,
}

/// One row of a service enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumeratedService {
    pub name: String,
    pub display_name: String,
    pub status: ServiceStatusProcess,
}

/// Owned copy of an OS status-change notification payload.
///
/// `service_names` is populated only for manager-level `CREATED`/`DELETED`
/// notifications; created names arrive with a `/` prefix on the wire and are
/// stored here with the prefix already stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNotify {
    pub notification_status: u32,
    pub service_status: ServiceStatusProcess,
    pub triggered: TransitionMask,
    pub service_names: Vec<String>,
}

impl ServiceNotify {
    /// Strip the `/` marker the SCM prefixes onto created names so they can
    /// be told apart from deleted names in a mixed batch.
    pub fn strip_created_prefix(triggered: TransitionMask, names: &mut [String]) {
        if !triggered.contains(TransitionMask::CREATED) {
            return;
        }
        for name in names {
            if let Some(stripped) = name.strip_prefix('/') {
                *name = stripped.to_string();
            }
        }
    }
}

impl fmt::Display for ServiceNotify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{status: {}, triggered: {}, names: [{}]}}",
            self.notification_status,
            self.triggered,
            self.service_names.join(", ")
        )
    }
}

#[cfg(test)]
mod tests;
