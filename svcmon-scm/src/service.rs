//! An open handle to one service.

use std::mem;

use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::System::Services::{
    CloseServiceHandle, QueryServiceConfig2W, QueryServiceConfigW, QueryServiceStatusEx,
    QUERY_SERVICE_CONFIGW, SC_STATUS_PROCESS_INFO, SERVICE_CONFIG_DESCRIPTION,
    SERVICE_DESCRIPTIONW, SERVICE_STATUS_PROCESS,
};

use crate::errors::{
    ScmError, ERROR_INSUFFICIENT_BUFFER, ERROR_INVALID_HANDLE,
};
use crate::manager::last_error;
use crate::types::{ErrorControl, ServiceConfig, ServiceKind, StartType};
use crate::wide::{from_wide_ptr, multi_from_wide_ptr};
use crate::RawScHandle;

/// An open service handle. Exclusively owned; the handle is closed exactly
/// once, when the value is dropped.
#[derive(Debug)]
pub struct ScmService {
    handle: RawScHandle,
}

// Service handles are process-wide and the SCM serializes operations on
// them; ownership still confines active use to one listener worker.
unsafe impl Send for ScmService {}
unsafe impl Sync for ScmService {}

impl ScmService {
    pub(crate) fn from_raw(handle: RawScHandle) -> ScmService {
        ScmService { handle }
    }

    pub fn raw(&self) -> RawScHandle {
        self.handle
    }

    /// Snapshot the service's static configuration.
    pub fn query_config(&self) -> Result<ServiceConfig, ScmError> {
        let mut needed = 0u32;
        let ok = unsafe { QueryServiceConfigW(self.handle, std::ptr::null_mut(), 0, &mut needed) };
        if ok == 0 {
            let code = unsafe { GetLastError() };
            if code != ERROR_INSUFFICIENT_BUFFER {
                return Err(ScmError::from_code(code));
            }
        }

        // QUERY_SERVICE_CONFIGW carries pointers into the same allocation;
        // a u64 buffer keeps the alignment they need.
        let mut buffer = vec![0u64; (needed as usize).div_ceil(8)];
        let ok = unsafe {
            QueryServiceConfigW(self.handle, buffer.as_mut_ptr().cast(), needed, &mut needed)
        };
        if ok == 0 {
            return Err(last_error());
        }

        let raw = unsafe { &*buffer.as_ptr().cast::<QUERY_SERVICE_CONFIGW>() };
        Ok(ServiceConfig {
            service_type: ServiceKind::from_bits_retain(raw.dwServiceType),
            start_type: StartType::from_raw(raw.dwStartType),
            error_control: ErrorControl::from_raw(raw.dwErrorControl),
            binary_path_name: unsafe { from_wide_ptr(raw.lpBinaryPathName) },
            load_order_group: unsafe { from_wide_ptr(raw.lpLoadOrderGroup) },
            tag_id: raw.dwTagId,
            dependencies: unsafe { multi_from_wide_ptr(raw.lpDependencies) },
            service_start_name: unsafe { from_wide_ptr(raw.lpServiceStartName) },
            display_name: unsafe { from_wide_ptr(raw.lpDisplayName) },
            description: self.query_description(),
        })
    }

    // The description lives behind the level-2 query. Services without one
    // report a null pointer; query failures degrade to no description.
    fn query_description(&self) -> Option<String> {
        let mut needed = 0u32;
        let ok = unsafe {
            QueryServiceConfig2W(
                self.handle,
                SERVICE_CONFIG_DESCRIPTION,
                std::ptr::null_mut(),
                0,
                &mut needed,
            )
        };
        if ok == 0 && unsafe { GetLastError() } != ERROR_INSUFFICIENT_BUFFER {
            return None;
        }
        if needed == 0 {
            return None;
        }

        let mut buffer = vec![0u64; (needed as usize).div_ceil(8)];
        let ok = unsafe {
            QueryServiceConfig2W(
                self.handle,
                SERVICE_CONFIG_DESCRIPTION,
                buffer.as_mut_ptr().cast(),
                needed,
                &mut needed,
            )
        };
        if ok == 0 {
            return None;
        }

        let raw = unsafe { &*buffer.as_ptr().cast::<SERVICE_DESCRIPTIONW>() };
        if raw.lpDescription.is_null() {
            return None;
        }
        let description = unsafe { from_wide_ptr(raw.lpDescription) };
        if description.is_empty() {
            None
        } else {
            Some(description)
        }
    }
}

impl Drop for ScmService {
    fn drop(&mut self) {
        unsafe {
            CloseServiceHandle(self.handle);
        }
    }
}

/// Whether a raw service handle still refers to an open handle.
///
/// Probes with a status query: only `ERROR_INVALID_HANDLE` marks the handle
/// dead, any other answer means the OS still recognizes it.
pub fn is_valid_handle(handle: RawScHandle) -> bool {
    let mut status: SERVICE_STATUS_PROCESS = unsafe { mem::zeroed() };
    let mut needed = 0u32;
    let ok = unsafe {
        QueryServiceStatusEx(
            handle,
            SC_STATUS_PROCESS_INFO,
            (&mut status as *mut SERVICE_STATUS_PROCESS).cast(),
            mem::size_of::<SERVICE_STATUS_PROCESS>() as u32,
            &mut needed,
        )
    };
    if ok != 0 {
        return true;
    }
    unsafe { GetLastError() != ERROR_INVALID_HANDLE }
}
