//! Arkiv Core - shared types for the archive consistency subsystem.
//!
//! This crate provides:
//! - [`TenantContext`]: the tenant-scoped execution context threaded through
//!   every public operation
//! - [`StatusCode`]: graded outcomes (`STARTED`, `OK`, `WARNING`, `KO`, `FATAL`)
//! - [`OperationId`]: identifier of a journal operation
//! - [`EntityKind`]: the archival entity kinds that can be sealed and audited
//! - Timestamp helpers producing the fixed-width, sortable date format used
//!   in persisted documents
//!
//! # Example
//!
//! ```
//! use arkiv_core::{StatusCode, TenantContext};
//!
//! let ctx = TenantContext::new(10).with_contract("ContractA");
//! assert_eq!(ctx.tenant_id(), 10);
//!
//! let worst = StatusCode::Ok.worst(StatusCode::Warning);
//! assert_eq!(worst, StatusCode::Warning);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod status;
mod time;
mod types;

pub use context::TenantContext;
pub use error::{CoreError, CoreResult};
pub use status::StatusCode;
pub use time::{format_timestamp, now, parse_timestamp};
pub use types::{EntityKind, OperationId};
