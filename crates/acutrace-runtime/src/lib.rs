//! Stateful side of AcuTrace.
//!
//! Owns the session (persisted storage, auth gate, current payload) and the
//! upload state machine that feeds it from the remote analysis service.

pub mod auth;
pub mod http_client;
pub mod progress;
pub mod service;
pub mod session;
pub mod storage;
pub mod upload;

pub use acutrace_core as core;
pub use acutrace_data as data;
