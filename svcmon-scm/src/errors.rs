use thiserror::Error;

// Win32 error codes the monitor cares about. Values are stable OS ABI.
pub const ERROR_SUCCESS: u32 = 0;
pub const ERROR_ACCESS_DENIED: u32 = 5;
pub const ERROR_INVALID_HANDLE: u32 = 6;
pub const ERROR_INVALID_PARAMETER: u32 = 87;
pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;
pub const ERROR_INVALID_LEVEL: u32 = 124;
pub const ERROR_MORE_DATA: u32 = 234;
pub const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;
pub const ERROR_SERVICE_MARKED_FOR_DELETE: u32 = 1072;
pub const ERROR_SHUTDOWN_IN_PROGRESS: u32 = 1115;

/// Failure of a service control operation, classified by what the caller can
/// do about it. The raw Win32 code is always recoverable via [`ScmError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScmError {
    #[error("access to the service was denied")]
    AccessDenied,

    #[error("the service does not exist")]
    NotFound,

    #[error("the service handle is no longer valid")]
    InvalidHandle,

    #[error("the service control manager is shutting down")]
    ShuttingDown,

    #[error("invalid argument to a service control API (win32 error {0})")]
    InvalidArgument(u32),

    #[error("service control operation failed (win32 error {0})")]
    Os(u32),
}

impl ScmError {
    /// Classify a raw Win32 error code.
    pub fn from_code(code: u32) -> ScmError {
        match code {
            ERROR_ACCESS_DENIED => ScmError::AccessDenied,
            ERROR_INVALID_HANDLE => ScmError::InvalidHandle,
            ERROR_SERVICE_DOES_NOT_EXIST | ERROR_SERVICE_MARKED_FOR_DELETE => ScmError::NotFound,
            ERROR_SHUTDOWN_IN_PROGRESS => ScmError::ShuttingDown,
            ERROR_INVALID_PARAMETER | ERROR_INVALID_LEVEL => ScmError::InvalidArgument(code),
            other => ScmError::Os(other),
        }
    }

    /// The underlying Win32 error code.
    pub fn code(&self) -> u32 {
        match *self {
            ScmError::AccessDenied => ERROR_ACCESS_DENIED,
            ScmError::NotFound => ERROR_SERVICE_DOES_NOT_EXIST,
            ScmError::InvalidHandle => ERROR_INVALID_HANDLE,
            ScmError::ShuttingDown => ERROR_SHUTDOWN_IN_PROGRESS,
            ScmError::InvalidArgument(code) | ScmError::Os(code) => code,
        }
    }

    /// True for the "service disappeared" family: the record should be
    /// dropped, nothing is wrong with the caller.
    pub fn is_gone(&self) -> bool {
        matches!(self, ScmError::NotFound | ScmError::InvalidHandle)
    }
}

#[cfg(test)]
mod tests;
