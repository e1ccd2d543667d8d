//! Scoped temporary files of one audit run.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use arkiv_crypto::{DigestReader, DigestType};
use tempfile::TempDir;
use zip::ZipArchive;

use crate::error::{EvidenceError, EvidenceResult};
use crate::ledger::LEDGER_FILE_NAME;

const ARCHIVE_FILE: &str = "seal.zip";

/// The downloaded seal archive and its extracted ledger.
///
/// Everything lives in a private temporary directory removed when the guard
/// is dropped, whatever path the run takes.
#[derive(Debug)]
pub struct SealArtifacts {
    dir: TempDir,
    archive: Option<PathBuf>,
    ledger: Option<PathBuf>,
}

impl SealArtifacts {
    /// Create the temporary directory, under `root` when given.
    ///
    /// # Errors
    ///
    /// Returns a `FATAL` verdict if the directory cannot be created.
    pub fn new(root: Option<&Path>) -> EvidenceResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("evidence-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| EvidenceError::fatal_from("Could not create temporary folder", e))?;
        Ok(Self {
            dir,
            archive: None,
            ledger: None,
        })
    }

    /// Directory holding the artifacts.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copy the archive to disk, digesting it on the way, and check the
    /// digest against the one recorded by the seal.
    ///
    /// # Errors
    ///
    /// Returns a `FATAL` verdict if the copy fails or the digest differs.
    pub fn download(
        &mut self,
        file_name: &str,
        source: impl Read,
        algorithm: DigestType,
        expected: &str,
    ) -> EvidenceResult<()> {
        let path = self.dir.path().join(ARCHIVE_FILE);
        let retrieval_error =
            |e: io::Error| EvidenceError::fatal_from(&format!("Could not retrieve traceability zip file '{file_name}'"), e);

        let mut reader = DigestReader::new(source, algorithm);
        let mut file = File::create(&path).map_err(retrieval_error)?;
        io::copy(&mut reader, &mut file).map_err(retrieval_error)?;
        let digest = reader.finish();
        if !digest.matches_encoded(expected) {
            return Err(EvidenceError::fatal(format!(
                "Traceability file digest mismatch for '{file_name}'"
            )));
        }
        tracing::debug!(file_name, %algorithm, "seal archive downloaded");
        self.archive = Some(path);
        Ok(())
    }

    /// Extract the ledger from the downloaded archive.
    ///
    /// Takes the `data.txt` entry, or the only entry of a single-file
    /// archive.
    ///
    /// # Errors
    ///
    /// Returns a `FATAL` verdict if nothing was downloaded or the archive
    /// cannot be read.
    pub fn extract_ledger(&mut self) -> EvidenceResult<&Path> {
        let archive_path = self
            .archive
            .clone()
            .ok_or_else(|| EvidenceError::fatal("No traceability file downloaded"))?;
        let extract_error = |e: &dyn std::fmt::Display| {
            EvidenceError::fatal_from(&format!("Could not extract zip file {}", archive_path.display()), e)
        };

        let file = File::open(&archive_path).map_err(|e| extract_error(&e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| extract_error(&e))?;
        let index = match archive.index_for_name(LEDGER_FILE_NAME) {
            Some(index) => index,
            None if archive.len() == 1 => 0,
            None => return Err(extract_error(&format!("no {LEDGER_FILE_NAME} entry"))),
        };
        let mut entry = archive.by_index(index).map_err(|e| extract_error(&e))?;

        let ledger_path = self.dir.path().join(LEDGER_FILE_NAME);
        let mut out = File::create(&ledger_path).map_err(|e| extract_error(&e))?;
        io::copy(&mut entry, &mut out).map_err(|e| extract_error(&e))?;
        let ledger = self.ledger.insert(ledger_path);
        Ok(ledger.as_path())
    }

    /// Open the extracted ledger for line-by-line reading.
    ///
    /// # Errors
    ///
    /// Returns a `FATAL` verdict if no ledger was extracted or it cannot be
    /// opened.
    pub fn open_ledger(&self) -> EvidenceResult<BufReader<File>> {
        let path = self
            .ledger
            .as_ref()
            .ok_or_else(|| EvidenceError::fatal("No traceability ledger extracted"))?;
        File::open(path)
            .map(BufReader::new)
            .map_err(|e| EvidenceError::fatal_from(&format!("Could not open file {}", path.display()), e))
    }
}
