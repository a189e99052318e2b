//! Pure data layer for AcuTrace.
//!
//! Turns a raw analysis response into the canonical payload, then filters,
//! totals and exports it. Nothing in this crate performs I/O or holds state.

pub mod aggregator;
pub mod export;
pub mod filters;
pub mod normalizer;

pub use acutrace_core as core;
