//! Sealed ledger lines and archive encoding.

use std::io::{BufRead, Cursor, Write};

use arkiv_core::EntityKind;
use serde::{Deserialize, Serialize};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{EvidenceError, EvidenceResult};

/// Name of the ledger file inside a sealed archive.
pub const LEDGER_FILE_NAME: &str = "data.txt";

/// One entity as it was sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceabilityLine {
    /// Id of the sealed entity.
    pub entity_id: String,
    /// Kind of the sealed entity.
    pub entity_kind: EntityKind,
    /// Lifecycle version at sealing time.
    pub version: u64,
    /// Digest of the metadata document.
    pub metadata_digest: String,
    /// Digest of the lifecycle document.
    pub lifecycle_digest: String,
    /// Digest of the backup object, as reported by storage.
    pub storage_digest: String,
}

/// Scan a ledger for the line of one entity.
///
/// Blank lines are skipped. Returns `Ok(None)` if no line matches.
///
/// # Errors
///
/// Returns a `FATAL` verdict on the first line that cannot be parsed, even
/// when a later line would have matched.
pub fn find_line(
    ledger: impl BufRead,
    kind: EntityKind,
    entity_id: &str,
) -> EvidenceResult<Option<TraceabilityLine>> {
    for line in ledger.lines() {
        let line = line.map_err(|e| EvidenceError::fatal_from("Could not read traceability file", e))?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: TraceabilityLine = serde_json::from_str(&line).map_err(|_| {
            EvidenceError::fatal(format!(
                "Could not parse traceability file information line '{line}'"
            ))
        })?;
        if parsed.entity_id.is_empty() {
            return Err(EvidenceError::fatal(format!(
                "Could not parse traceability file information line '{line}'"
            )));
        }
        if parsed.entity_kind == kind && parsed.entity_id == entity_id {
            return Ok(Some(parsed));
        }
    }
    Ok(None)
}

/// Encode ledger lines as a sealed archive holding a single ledger file.
///
/// # Errors
///
/// Returns a `FATAL` verdict if a line cannot be serialized or the archive
/// cannot be written.
pub fn encode_archive(lines: &[TraceabilityLine]) -> EvidenceResult<Vec<u8>> {
    let archive_error = |e: &dyn std::fmt::Display| EvidenceError::fatal_from("Could not build archive", e);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(LEDGER_FILE_NAME, SimpleFileOptions::default())
        .map_err(|e| archive_error(&e))?;
    for line in lines {
        let json = serde_json::to_string(line).map_err(|e| archive_error(&e))?;
        writeln!(writer, "{json}").map_err(|e| archive_error(&e))?;
    }
    let cursor = writer.finish().map_err(|e| archive_error(&e))?;
    Ok(cursor.into_inner())
}
