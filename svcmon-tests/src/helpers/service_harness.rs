//! Installs and deletes the dummy services the end-to-end suites exercise.
//!
//! The installed service points at an executable that is never started by
//! most tests; create/delete notifications and config queries do not require
//! the service to run.

use std::ptr;
use std::time::{SystemTime, UNIX_EPOCH};

use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::System::Services::{
    ChangeServiceConfig2W, CloseServiceHandle, CreateServiceW, DeleteService, OpenSCManagerW,
    StartServiceW, SC_MANAGER_CONNECT, SC_MANAGER_CREATE_SERVICE, SERVICE_ALL_ACCESS,
    SERVICE_CONFIG_DESCRIPTION, SERVICE_DESCRIPTIONW, SERVICE_DEMAND_START, SERVICE_ERROR_NORMAL,
    SERVICE_WIN32_OWN_PROCESS,
};

use svcmon_scm::errors::ScmError;
use svcmon_scm::wide::to_wide;
use svcmon_scm::RawScHandle;

const DUMMY_BINARY: &str = r"C:\Windows\System32\svchost.exe -k svcmon-test";

fn last_error() -> ScmError {
    ScmError::from_code(unsafe { GetLastError() })
}

/// A dummy service registered with the SCM for the duration of a test.
/// Deleted (best-effort) on drop.
pub struct TestService {
    name: String,
    scm: RawScHandle,
    service: RawScHandle,
}

// Raw handles; used from the owning test only.
unsafe impl Send for TestService {}

impl TestService {
    /// A name no other test run will collide with.
    pub fn unique_name() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        format!("svcmon-test-{nanos}")
    }

    /// Register a demand-start dummy service with the given description.
    pub fn install(name: &str, description: &str) -> Result<TestService, ScmError> {
        let scm = unsafe {
            OpenSCManagerW(
                ptr::null(),
                ptr::null(),
                SC_MANAGER_CONNECT | SC_MANAGER_CREATE_SERVICE,
            )
        };
        if scm.is_null() {
            return Err(last_error());
        }

        let wide_name = to_wide(name);
        let binary = to_wide(DUMMY_BINARY);
        let service = unsafe {
            CreateServiceW(
                scm,
                wide_name.as_ptr(),
                wide_name.as_ptr(),
                SERVICE_ALL_ACCESS,
                SERVICE_WIN32_OWN_PROCESS,
                SERVICE_DEMAND_START,
                SERVICE_ERROR_NORMAL,
                binary.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
                ptr::null(),
                ptr::null(),
                ptr::null(),
            )
        };
        if service.is_null() {
            let err = last_error();
            unsafe { CloseServiceHandle(scm) };
            return Err(err);
        }

        let installed = TestService {
            name: name.to_string(),
            scm,
            service,
        };
        installed.set_description(description)?;
        Ok(installed)
    }

    fn set_description(&self, description: &str) -> Result<(), ScmError> {
        let mut wide_description = to_wide(description);
        let info = SERVICE_DESCRIPTIONW {
            lpDescription: wide_description.as_mut_ptr(),
        };
        let ok = unsafe {
            ChangeServiceConfig2W(
                self.service,
                SERVICE_CONFIG_DESCRIPTION,
                (&info as *const SERVICE_DESCRIPTIONW).cast(),
            )
        };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> RawScHandle {
        self.service
    }

    /// Ask the SCM to start the service. The dummy binary never completes the
    /// service handshake; only tests that watch for `START_PENDING` use this.
    pub fn start(&self) -> Result<(), ScmError> {
        let ok = unsafe { StartServiceW(self.service, 0, ptr::null()) };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(())
    }

    /// Mark the service for deletion.
    pub fn delete(&self) -> Result<(), ScmError> {
        let ok = unsafe { DeleteService(self.service) };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(())
    }
}

impl Drop for TestService {
    fn drop(&mut self) {
        unsafe {
            DeleteService(self.service);
            CloseServiceHandle(self.service);
            CloseServiceHandle(self.scm);
        }
    }
}
