//! Safe wrappers over the Windows Service Control Manager.
//!
//! This crate owns every `unsafe` call the monitor makes: connecting to the
//! SCM, opening service handles, enumerating services, querying static
//! configuration, and arming status-change notifications with the alertable
//! wait they require. The type layer (states, masks, config snapshots, the
//! owned notification payload) and the UTF-16 utilities are plain Rust and
//! compile on every platform so the logic built on top of them can be tested
//! anywhere.

pub mod errors;
pub mod types;
pub mod wide;

#[cfg(windows)]
pub mod manager;
#[cfg(windows)]
pub mod notify;
#[cfg(windows)]
pub mod service;

pub use errors::ScmError;
pub use types::{
    ControlsAccepted, EnumeratedService, ErrorControl, ServiceConfig, ServiceEnumState,
    ServiceKind, ServiceNotify, ServiceState, ServiceStatusProcess, StartType, TransitionMask,
};

#[cfg(windows)]
pub use manager::ScmManager;
#[cfg(windows)]
pub use notify::StatusSubscription;
#[cfg(windows)]
pub use service::{is_valid_handle, ScmService};

/// Raw SCM handle, identical in layout to the `SC_HANDLE` the OS hands out.
pub type RawScHandle = *mut core::ffi::c_void;
