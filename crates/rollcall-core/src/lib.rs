//! # rollcall-core
//!
//! Foundation crate for the rollcall attendance system.
//!
//! - **Configuration**: [`config::RecognitionConfig`] — match threshold and
//!   storage locations, loaded from compiled defaults, an optional JSON file,
//!   and `ROLLCALL_*` environment overrides
//! - **Logging**: [`logging::init`] — tracing-subscriber setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other rollcall crates.

#![deny(unsafe_code)]

pub mod config;
pub mod logging;

pub use config::{ConfigError, RecognitionConfig};
