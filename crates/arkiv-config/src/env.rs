//! `ARKIV_*` environment overrides.
//!
//! Overrides win over every file layer. Only the variables listed in
//! [`ENV_MAPPINGS`] are read.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::set_path;

/// Type a field's raw string is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Integer,
}

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "ARKIV_STORAGE_DEFAULT_STRATEGY",
        field_path: "storage.default_strategy",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "ARKIV_STORAGE_TMP_DIR",
        field_path: "storage.tmp_dir",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "ARKIV_JOURNAL_BACKUP_STRATEGY",
        field_path: "journal.backup_strategy",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "ARKIV_RECONSTRUCTION_BULK_SIZE",
        field_path: "reconstruction.bulk_size",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "ARKIV_EVIDENCE_SEAL_EVENT_TYPE",
        field_path: "evidence.seal_event_type",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "ARKIV_EVIDENCE_SEAL_STRATEGY",
        field_path: "evidence.seal_strategy",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "ARKIV_EVIDENCE_TMP_DIR",
        field_path: "evidence.tmp_dir",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "ARKIV_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "ARKIV_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::Text,
    },
];

/// Snapshot the `ARKIV_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("ARKIV_"))
        .collect()
}

/// Apply every mapped variable present in `env_vars` to the merged tree.
///
/// Returns the number of overrides applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric field is given a value
/// that is not an integer.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;
    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        debug!(var = mapping.var_name, field = mapping.field_path, "applying env override");
        set_path(merged, mapping.field_path, coerce(mapping, raw)?);
        count = count.saturating_add(1);
    }
    Ok(count)
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    match mapping.kind {
        FieldKind::Text => Ok(toml::Value::String(raw.to_owned())),
        FieldKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|e| ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("expected an integer, got '{raw}': {e}"),
            }),
    }
}
