//! Connection to the service control manager.

use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;
use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::System::Services::{
    CloseServiceHandle, EnumServicesStatusExW, OpenSCManagerW, OpenServiceW,
    ENUM_SERVICE_STATUS_PROCESSW, SC_ENUM_PROCESS_INFO, SC_MANAGER_CONNECT,
    SC_MANAGER_ENUMERATE_SERVICE, SERVICE_QUERY_CONFIG, SERVICE_QUERY_STATUS,
};

use crate::errors::{ScmError, ERROR_MORE_DATA};
use crate::service::ScmService;
use crate::types::{EnumeratedService, ServiceEnumState, ServiceKind, ServiceStatusProcess};
use crate::wide::{from_wide_ptr, to_wide};
use crate::RawScHandle;

/// Per-iteration ceiling on the enumeration buffer. Larger result sets are
/// paginated through the OS resume handle.
const MAX_ENUM_BUFFER: u32 = 256 * 1024;

/// An open connection to the SCM. Disconnected exactly once, either
/// explicitly through [`ScmManager::disconnect`] or on drop.
#[derive(Debug)]
pub struct ScmManager {
    handle: RawScHandle,
    disconnected: AtomicBool,
}

// SCM handles are process-wide and may be used from any thread; the SCM
// serializes operations on them internally.
unsafe impl Send for ScmManager {}
unsafe impl Sync for ScmManager {}

pub(crate) fn last_error() -> ScmError {
    ScmError::from_code(unsafe { GetLastError() })
}

impl ScmManager {
    /// Connect to the local SCM with connect + enumerate access.
    pub fn connect() -> Result<ScmManager, ScmError> {
        let handle = unsafe {
            OpenSCManagerW(
                ptr::null(),
                ptr::null(),
                SC_MANAGER_CONNECT | SC_MANAGER_ENUMERATE_SERVICE,
            )
        };
        if handle.is_null() {
            return Err(last_error());
        }
        trace!(?handle, "connected to service control manager");
        Ok(ScmManager {
            handle,
            disconnected: AtomicBool::new(false),
        })
    }

    /// The raw handle, for arming manager-level notifications.
    pub fn raw(&self) -> RawScHandle {
        self.handle
    }

    /// Close the manager handle. Safe to call more than once; only the first
    /// call touches the OS.
    pub fn disconnect(&self) -> Result<(), ScmError> {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let ok = unsafe { CloseServiceHandle(self.handle) };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(())
    }

    /// Open a service by name with query access.
    pub fn open_service(&self, name: &str) -> Result<ScmService, ScmError> {
        let wide_name = to_wide(name);
        let handle = unsafe {
            OpenServiceW(
                self.handle,
                wide_name.as_ptr(),
                SERVICE_QUERY_CONFIG | SERVICE_QUERY_STATUS,
            )
        };
        if handle.is_null() {
            return Err(last_error());
        }
        Ok(ScmService::from_raw(handle))
    }

    /// Enumerate services of the given kind.
    ///
    /// Follows the two-call sizing protocol: the first call reports the byte
    /// count, then pages of at most [`MAX_ENUM_BUFFER`] bytes are fetched
    /// through the resume handle until the OS reports nothing left.
    pub fn enumerate(
        &self,
        kind: ServiceKind,
        state: ServiceEnumState,
    ) -> Result<Vec<EnumeratedService>, ScmError> {
        let mut bytes_needed = 0u32;
        let mut returned = 0u32;
        let mut resume = 0u32;

        let ok = unsafe {
            EnumServicesStatusExW(
                self.handle,
                SC_ENUM_PROCESS_INFO,
                kind.bits(),
                state as u32,
                ptr::null_mut(),
                0,
                &mut bytes_needed,
                &mut returned,
                &mut resume,
                ptr::null(),
            )
        };
        if ok == 0 {
            let code = unsafe { GetLastError() };
            if code != ERROR_MORE_DATA {
                return Err(ScmError::from_code(code));
            }
        }

        let mut services = Vec::new();
        while bytes_needed > 0 {
            let size = bytes_needed.min(MAX_ENUM_BUFFER);
            // ENUM_SERVICE_STATUS_PROCESSW carries pointers; a u64 buffer
            // keeps the required 8-byte alignment.
            let mut buffer = vec![0u64; (size as usize).div_ceil(8)];
            let done = unsafe {
                EnumServicesStatusExW(
                    self.handle,
                    SC_ENUM_PROCESS_INFO,
                    kind.bits(),
                    state as u32,
                    buffer.as_mut_ptr().cast(),
                    size,
                    &mut bytes_needed,
                    &mut returned,
                    &mut resume,
                    ptr::null(),
                )
            };
            if done == 0 {
                let code = unsafe { GetLastError() };
                if code != ERROR_MORE_DATA {
                    return Err(ScmError::from_code(code));
                }
            } else {
                bytes_needed = 0;
            }

            let entries = unsafe {
                std::slice::from_raw_parts(
                    buffer.as_ptr().cast::<ENUM_SERVICE_STATUS_PROCESSW>(),
                    returned as usize,
                )
            };
            for entry in entries {
                services.push(EnumeratedService {
                    name: unsafe { from_wide_ptr(entry.lpServiceName) },
                    display_name: unsafe { from_wide_ptr(entry.lpDisplayName) },
                    status: ServiceStatusProcess::from_raw(&entry.ServiceStatusProcess),
                });
            }
        }

        trace!(count = services.len(), "enumerated services");
        Ok(services)
    }
}

impl Drop for ScmManager {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}
