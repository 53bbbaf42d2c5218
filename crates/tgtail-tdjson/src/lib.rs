//! TDLib adapter.
//!
//! `TdClient` implements the `tgtail-core` session port on top of any
//! `TdBackend`. The production backend wraps `rust-tdlib` and is only built
//! with the `tdjson` feature, since it links the native `libtdjson`.

pub mod backend;
pub mod client;
#[cfg(feature = "tdjson")]
mod convert;
#[cfg(feature = "tdjson")]
pub mod tdlib;

pub use backend::TdBackend;
pub use client::TdClient;
#[cfg(feature = "tdjson")]
pub use tdlib::RustTdlib;
