//! Arkiv Config - layered TOML configuration.
//!
//! A single [`Config`] gathers the settings of every subsystem: object
//! storage defaults, the operation journal (backup strategy, alert rules),
//! reconstruction bulk size, evidence audit seal lookup and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use arkiv_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("bulk size: {}", resolved.config.reconstruction.bulk_size);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`ARKIV_*`)
//! 2. **Explicit file** passed to [`Config::load`]
//! 3. **System** (`/etc/arkiv/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit)
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
