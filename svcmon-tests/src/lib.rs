//! Shared helpers for the svcmon integration suites: a dummy-service
//! install/delete harness and polling utilities for eventually-consistent
//! assertions.

pub mod helpers;
