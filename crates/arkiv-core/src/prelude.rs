//! Prelude module - commonly used types for convenient import.
//!
//! Use `use arkiv_core::prelude::*;` to import all essential types.

pub use crate::{CoreError, CoreResult};

pub use crate::{EntityKind, OperationId, StatusCode, TenantContext};

pub use crate::{format_timestamp, now, parse_timestamp};
