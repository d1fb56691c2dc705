use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use seqpack_pipeline::{DEFAULT_DIGEST_BUFFER_SIZE, Instrumentation};
use sha2::{Digest, Sha256};

use crate::{DigestError, Result};

/// Single-pass SHA-256 over a file, read in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct StreamingDigestComputer {
    buffer_size: usize,
}

impl Default for StreamingDigestComputer {
    fn default() -> Self {
        Self::new(DEFAULT_DIGEST_BUFFER_SIZE)
    }
}

impl StreamingDigestComputer {
    /// If `buffer_size` is 0, [`DEFAULT_DIGEST_BUFFER_SIZE`] (32 MiB) is used.
    pub fn new(buffer_size: usize) -> Self {
        let buffer_size = if buffer_size == 0 {
            DEFAULT_DIGEST_BUFFER_SIZE
        } else {
            buffer_size
        };
        Self { buffer_size }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Digests the file at `path`, lowercase hex.
    pub fn digest(&self, path: &Path, instrumentation: &Instrumentation) -> Result<String> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                DigestError::NotFound(path.to_path_buf())
            } else {
                DigestError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        tracing::debug!(
            path = %path.display(),
            buffer = self.buffer_size,
            "computing sha256"
        );
        self.digest_reader(file, instrumentation)
            .map_err(|source| DigestError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Digests everything `reader` yields. Every chunk read goes through the
    /// instrumented wrapper, so pauses land between chunks.
    pub fn digest_reader<R: Read>(
        &self,
        reader: R,
        instrumentation: &Instrumentation,
    ) -> io::Result<String> {
        let mut reader = instrumentation.wrap(reader);
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}
