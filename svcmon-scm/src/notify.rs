//! Status-change subscriptions.
//!
//! The SCM delivers a status-change notification by queueing an asynchronous
//! procedure call to the thread that armed it; the callback only runs while
//! that same thread sits in an alertable wait. A [`StatusSubscription`]
//! therefore has thread affinity: `arm` and `wait` must both be called on the
//! worker that owns it, which also makes the callback's stash slot a plain
//! thread-local with no cross-thread synchronization.

use std::cell::Cell;
use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::time::Duration;

use tracing::trace;
use windows_sys::Win32::Foundation::LocalFree;
use windows_sys::Win32::System::Services::{
    NotifyServiceStatusChangeW, SERVICE_NOTIFY_2W, SERVICE_NOTIFY_STATUS_CHANGE,
};
use windows_sys::Win32::System::Threading::SleepEx;

use crate::errors::{ScmError, ERROR_SUCCESS};
use crate::types::{ServiceNotify, ServiceStatusProcess, TransitionMask};
use crate::RawScHandle;

const WAIT_IO_COMPLETION: u32 = 0x0000_00C0;

thread_local! {
    // Written by the APC callback, read after the alertable wait returns.
    static COMPLETED: Cell<*mut SERVICE_NOTIFY_2W> = const { Cell::new(ptr::null_mut()) };
}

unsafe extern "system" fn status_change_callback(parameter: *mut c_void) {
    if !parameter.is_null() {
        COMPLETED.with(|slot| slot.set(parameter.cast()));
    }
}

/// A status-change subscription bound to one handle and one worker thread.
///
/// The notify buffer is boxed so its address stays stable while the OS holds
/// a pointer to it between `arm` and the callback.
pub struct StatusSubscription {
    handle: RawScHandle,
    buffer: Box<SERVICE_NOTIFY_2W>,
    armed: bool,
}

impl StatusSubscription {
    /// Create a subscription for `handle`. The handle stays owned by the
    /// caller and must outlive the subscription.
    pub fn new(handle: RawScHandle) -> StatusSubscription {
        StatusSubscription {
            handle,
            buffer: Box::new(unsafe { mem::zeroed() }),
            armed: false,
        }
    }

    /// Register for the next transition covered by `mask`.
    ///
    /// A registration stays pending across timed-out waits; arming again
    /// while one is outstanding would fail with ERROR_ALREADY_REGISTERED, so
    /// that case is a no-op.
    pub fn arm(&mut self, mask: TransitionMask) -> Result<(), ScmError> {
        if self.armed {
            return Ok(());
        }
        let notify = self.buffer.as_mut();
        *notify = unsafe { mem::zeroed() };
        notify.dwVersion = SERVICE_NOTIFY_STATUS_CHANGE;
        notify.pfnNotifyCallback = Some(status_change_callback);

        let rc = unsafe {
            NotifyServiceStatusChangeW(self.handle, mask.bits(), self.buffer.as_mut())
        };
        if rc != ERROR_SUCCESS {
            return Err(ScmError::from_code(rc));
        }
        self.armed = true;
        Ok(())
    }

    /// Sleep alertably for up to `timeout`. Returns the owned notification if
    /// the pending registration completed, `None` on a plain timeout.
    pub fn wait(&mut self, timeout: Duration) -> Option<ServiceNotify> {
        let rc = unsafe { SleepEx(timeout.as_millis() as u32, 1) };
        if rc != WAIT_IO_COMPLETION {
            return None;
        }
        let completed = COMPLETED.with(|slot| slot.replace(ptr::null_mut()));
        if completed.is_null() || completed != self.buffer.as_mut() as *mut SERVICE_NOTIFY_2W {
            // Some other APC woke the thread; our registration is still live.
            return None;
        }
        self.armed = false;
        let notify = unsafe { owned_notify(self.buffer.as_mut()) };
        trace!(triggered = %notify.triggered, "status change notification");
        Some(notify)
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        if self.armed {
            // The OS holds the registered pointer until the callback fires or
            // the watched handle closes; a pending buffer must outlive us.
            let buffer = mem::replace(&mut self.buffer, Box::new(unsafe { mem::zeroed() }));
            Box::leak(buffer);
        }
    }
}

/// Copy an OS notification payload into owned storage.
///
/// The service-name block is OS-allocated and must be released by the callee;
/// it is decoded, freed exactly once, and the pointer cleared so it cannot
/// escape or be freed again.
///
/// # Safety
///
/// `raw` must be a notify buffer the OS just completed.
unsafe fn owned_notify(raw: &mut SERVICE_NOTIFY_2W) -> ServiceNotify {
    let triggered = TransitionMask::from_bits_retain(raw.dwNotificationTriggered);

    let mut service_names = Vec::new();
    if !raw.pszServiceNames.is_null() {
        service_names = crate::wide::multi_from_wide_ptr(raw.pszServiceNames);
        LocalFree(raw.pszServiceNames.cast());
        raw.pszServiceNames = ptr::null_mut();
    }
    ServiceNotify::strip_created_prefix(triggered, &mut service_names);

    ServiceNotify {
        notification_status: raw.dwNotificationStatus,
        service_status: ServiceStatusProcess::from_raw(&raw.ServiceStatus),
        triggered,
        service_names,
    }
}
