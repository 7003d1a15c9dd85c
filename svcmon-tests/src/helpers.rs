#[cfg(windows)]
pub mod service_harness;
pub mod wait_utils;
