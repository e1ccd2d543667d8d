//! Arkiv Telemetry - logging for the Arkiv back office.
//!
//! This crate provides:
//! - Configurable logging setup (pretty, compact or JSON; stdout, stderr or
//!   rolling files)
//! - [`RunGuard`], which frames a long-running unit of work such as a
//!   reconstruction window or an evidence audit
//!
//! # Example
//!
//! ```rust,no_run
//! use arkiv_telemetry::{LogConfig, LogFormat, RunGuard, setup_logging};
//!
//! # fn main() -> Result<(), arkiv_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("arkiv_reconstruction=debug");
//! setup_logging(&config)?;
//!
//! let _run = RunGuard::enter("reconstruction", tracing::info_span!("tenant", tenant = 10));
//! tracing::info!("replaying window");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod guard;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use guard::RunGuard;
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
