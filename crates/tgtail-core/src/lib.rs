//! Core domain + orchestration logic for `tgtail`.
//!
//! This crate is intentionally backend-agnostic. TDLib lives behind the
//! `SessionPort` trait, implemented in the `tgtail-tdjson` adapter crate.

pub mod bootstrap;
pub mod config;
pub mod consumer;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod ports;
pub mod runtime;
pub mod shutdown;
pub mod updates;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
