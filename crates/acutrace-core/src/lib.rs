//! Shared domain layer for AcuTrace.
//!
//! Holds the canonical analysis data model, the error taxonomy, lenient
//! field conversion, statement-date handling, display formatting and the
//! command-line configuration.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{AcuTraceError, Result};
