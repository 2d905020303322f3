//! Chunked upload engine.
//!
//! Splits a local file into sequential chunks and emits a header frame
//! plus a raw payload frame per chunk onto the connection. Reads are
//! strictly sequential - one in-flight chunk at a time - so transmission
//! order always matches `sequence` order. There is no acknowledgement
//! protocol: chunks are fired as fast as they read.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

use crate::connection::{Transport, TransportError};
use crate::dispatch::UploadJob;
use crate::logger::ChunkProgress;
use crate::protocol::{ChunkFile, ChunkHeader};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("chunk {sequence} read failed for `{name}`")]
    Read {
        name: String,
        sequence: u64,
        #[source]
        source: io::Error,
    },

    #[error("chunk header encoding failed")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Totals for one completed upload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadStats {
    pub chunks: u64,
    pub bytes: u64,
}

// =============================================================================
// Chunk Sources
// =============================================================================

/// Byte-range reads over one local file.
pub trait ChunkSource {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    fn read_range(&mut self, start: u64, len: u64) -> io::Result<Vec<u8>>;
}

/// [`ChunkSource`] over a filesystem file.
pub struct FileSource {
    name: String,
    size: u64,
    file: File,
}

impl FileSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, size, file })
    }
}

impl ChunkSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&mut self, start: u64, len: u64) -> io::Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; len as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

// =============================================================================
// Upload Loop
// =============================================================================

/// Upload one file: `ceil(size / chunk_size)` header+payload pairs.
///
/// The job's chunk size defaults to the full file size (a single chunk)
/// when the peer did not override it. A read failure aborts the
/// remaining chunks of this file rather than sending corrupt data.
pub fn run(
    transport: &mut dyn Transport,
    job: &UploadJob,
    source: &mut dyn ChunkSource,
) -> Result<UploadStats, UploadError> {
    let size = source.size();
    let nominal = job.chunk_size.filter(|c| *c > 0).unwrap_or(size);
    let total = if size == 0 { 0 } else { size.div_ceil(nominal) };

    let progress = ChunkProgress::for_transfer(source.name(), total);
    let mut stats = UploadStats::default();
    let mut sequence = 0u64;
    let mut start = 0u64;

    while start < size {
        let len = nominal.min(size - start);
        let header = ChunkHeader {
            file: ChunkFile {
                chunk_size: len,
                size,
                name: source.name().to_string(),
                source: job.request.source.clone(),
                kind: job.request.kind.clone(),
                start,
                sequence,
            },
            reader: job.reader.clone(),
            update: job.request.update.clone(),
            progress: job.request.progress.clone(),
            chunk_size: nominal,
        };

        // One in-flight read at a time keeps completion order equal to
        // sequence order
        let bytes = source.read_range(start, len).map_err(|e| UploadError::Read {
            name: source.name().to_string(),
            sequence,
            source: e,
        })?;

        transport.send_text(&serde_json::to_string(&header)?)?;
        transport.send_binary(&bytes)?;

        if let Some(progress) = &progress {
            progress.inc();
        }
        stats.chunks += 1;
        stats.bytes += len;
        sequence += 1;
        start += nominal;
    }

    if let Some(progress) = progress {
        progress.finish();
    }
    Ok(stats)
}

// =============================================================================
// Tests
// =============================================================================
