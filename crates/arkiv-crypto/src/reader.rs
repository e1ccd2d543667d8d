//! In-stream digest computation.

use std::io::{self, Read};

use crate::digest::{Digest, DigestType, Hasher};

/// A reader that hashes every byte it yields.
///
/// Wrap a download stream in a `DigestReader`, copy it to its destination,
/// then call [`finish`](Self::finish) to obtain the digest of exactly what
/// was read.
#[derive(Debug)]
pub struct DigestReader<R> {
    inner: R,
    hasher: Hasher,
    bytes_read: u64,
}

impl<R: Read> DigestReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R, algorithm: DigestType) -> Self {
        Self {
            inner,
            hasher: Hasher::new(algorithm),
            bytes_read: 0,
        }
    }

    /// Number of bytes read so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Consume the reader and return the digest of everything read.
    #[must_use]
    pub fn finish(self) -> Digest {
        self.hasher.finalize()
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(chunk) = buf.get(..n) {
            self.hasher.update(chunk);
        }
        self.bytes_read = self
            .bytes_read
            .saturating_add(u64::try_from(n).unwrap_or(u64::MAX));
        Ok(n)
    }
}
