//! Binary storage for the search index snapshot.
//!
//! File format: search_index.bin
//!
//! Header (51 bytes):
//! - magic: [u8; 4] (b"PFIX")
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated):
//! - document_len: u32 (little-endian)
//! - document: [u8; document_len] (JSON object)
//! - embedding: [f32; dimensions] (little-endian)
//!
//! Trailer:
//! - body_checksum: u32 (CRC32 of all entry bytes)

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::documents::Document;
use crate::semantic::index::Corpus;

const MAGIC: &[u8; 4] = b"PFIX";

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: magic(4) + version(1) + model_id(32) + dimensions(2) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 51;

/// Offset of the header checksum
const CHECKSUM_OFFSET: usize = HEADER_SIZE - 4;

/// Refuse single documents larger than this when reading
const MAX_DOCUMENT_LEN: u32 = 64 * 1024 * 1024;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: index was built with a different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Header fields of a saved snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub model_id: [u8; 32],
    pub dimensions: usize,
    pub entry_count: u64,
}

/// Storage manager for index snapshots.
pub struct SnapshotStorage {
    path: PathBuf,
}

impl SnapshotStorage {
    /// Create a new storage manager for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the storage file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read only the header of the snapshot, without touching the entries.
    ///
    /// Returns `Ok(None)` when there is no file.
    pub fn inspect(&self) -> Result<Option<SnapshotInfo>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let header = read_header(&mut BufReader::new(file))?;
        Ok(Some(SnapshotInfo {
            model_id: header.model_id,
            dimensions: header.dimensions as usize,
            entry_count: header.entry_count,
        }))
    }

    /// Load a snapshot from storage.
    ///
    /// Returns `Ok(None)` when there is no file. A file that exists but
    /// cannot be read back completely is always an error.
    ///
    /// # Arguments
    /// * `expected_model_id` - SHA256 hash of the expected model name
    /// * `expected_dimensions` - Expected embedding dimensions
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<Option<Corpus>, StorageError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        validate_header(&header, expected_model_id, expected_dimensions)?;

        let mut body = BodyReader {
            inner: &mut reader,
            hasher: crc32fast::Hasher::new(),
        };

        let count = usize::try_from(header.entry_count)
            .map_err(|_| StorageError::InvalidFormat("entry count overflows".to_string()))?;
        let dimensions = header.dimensions as usize;

        // entry_count is untrusted until the body checksum matches
        let mut documents = Vec::with_capacity(count.min(4096));
        let mut vectors = Vec::with_capacity(count.min(4096));

        for _ in 0..count {
            let (document, embedding) = read_entry(&mut body, dimensions)?;
            documents.push(document);
            vectors.push(embedding);
        }

        let computed = body.hasher.finalize();
        let stored = read_u32(&mut reader)?;
        if stored != computed {
            return Err(StorageError::ChecksumMismatch);
        }

        let mut rest = [0u8; 1];
        if reader.read(&mut rest)? != 0 {
            return Err(StorageError::InvalidFormat(
                "trailing bytes after snapshot".to_string(),
            ));
        }

        let corpus = Corpus::new(documents, vectors, dimensions)
            .map_err(|err| StorageError::InvalidFormat(err.to_string()))?;

        Ok(Some(corpus))
    }

    /// Save a snapshot to storage.
    ///
    /// Uses atomic write: temp file in the same directory -> fsync -> rename
    pub fn save(&self, corpus: &Corpus, model_id: &[u8; 32]) -> Result<(), StorageError> {
        let dimensions = u16::try_from(corpus.dimensions()).map_err(|_| {
            StorageError::InvalidFormat(format!(
                "{} dimensions do not fit the format",
                corpus.dimensions()
            ))
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Dropping the temp file on an early return removes it
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write_snapshot(&mut writer, corpus, model_id, dimensions)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|err| err.error)?;

        Ok(())
    }
}

/// File header structure.
#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
}

fn write_snapshot<W: Write>(
    writer: &mut W,
    corpus: &Corpus,
    model_id: &[u8; 32],
    dimensions: u16,
) -> Result<(), StorageError> {
    let header = Header {
        version: FORMAT_VERSION,
        model_id: *model_id,
        dimensions,
        entry_count: corpus.len() as u64,
    };
    write_header(writer, &header)?;

    let mut hasher = crc32fast::Hasher::new();
    for (document, embedding) in corpus.iter() {
        let entry = encode_entry(document, embedding)?;
        hasher.update(&entry);
        writer.write_all(&entry)?;
    }

    writer.write_all(&hasher.finalize().to_le_bytes())?;

    Ok(())
}

/// Read header from file.
fn read_header<R: Read>(reader: &mut R) -> Result<Header, StorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes).map_err(truncated)?;

    if &header_bytes[0..4] != MAGIC {
        return Err(StorageError::InvalidFormat(
            "not a search index snapshot".to_string(),
        ));
    }

    let stored_checksum = u32::from_le_bytes([
        header_bytes[47],
        header_bytes[48],
        header_bytes[49],
        header_bytes[50],
    ]);

    // Verify checksum (computed over header without checksum field)
    let computed_checksum = crc32fast::hash(&header_bytes[0..CHECKSUM_OFFSET]);
    if stored_checksum != computed_checksum {
        return Err(StorageError::ChecksumMismatch);
    }

    let version = header_bytes[4];
    if version != FORMAT_VERSION {
        return Err(StorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&header_bytes[5..37]);

    let dimensions = u16::from_le_bytes([header_bytes[37], header_bytes[38]]);

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header_bytes[39..47]);
    let entry_count = u64::from_le_bytes(count_bytes);

    Ok(Header {
        version,
        model_id,
        dimensions,
        entry_count,
    })
}

/// Validate header against expected values.
fn validate_header(
    header: &Header,
    expected_model_id: &[u8; 32],
    expected_dimensions: usize,
) -> Result<(), StorageError> {
    if header.model_id != *expected_model_id {
        return Err(StorageError::ModelMismatch);
    }

    if header.dimensions as usize != expected_dimensions {
        return Err(StorageError::DimensionMismatch {
            expected: expected_dimensions,
            got: header.dimensions as usize,
        });
    }

    Ok(())
}

/// Write header to file.
fn write_header<W: Write>(writer: &mut W, header: &Header) -> Result<(), StorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0..4].copy_from_slice(MAGIC);
    header_bytes[4] = header.version;
    header_bytes[5..37].copy_from_slice(&header.model_id);
    header_bytes[37..39].copy_from_slice(&header.dimensions.to_le_bytes());
    header_bytes[39..47].copy_from_slice(&header.entry_count.to_le_bytes());

    // Compute and store checksum
    let checksum = crc32fast::hash(&header_bytes[0..CHECKSUM_OFFSET]);
    header_bytes[CHECKSUM_OFFSET..HEADER_SIZE].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&header_bytes)?;
    Ok(())
}

/// Encode a single entry.
fn encode_entry(document: &Document, embedding: &[f32]) -> Result<Vec<u8>, StorageError> {
    let json = serde_json::to_vec(document)
        .map_err(|err| StorageError::InvalidFormat(format!("cannot encode document: {err}")))?;
    let len = u32::try_from(json.len())
        .ok()
        .filter(|len| *len <= MAX_DOCUMENT_LEN)
        .ok_or_else(|| StorageError::InvalidFormat("document too large".to_string()))?;

    let mut entry = Vec::with_capacity(4 + json.len() + embedding.len() * 4);
    entry.extend_from_slice(&len.to_le_bytes());
    entry.extend_from_slice(&json);
    for &value in embedding {
        entry.extend_from_slice(&value.to_le_bytes());
    }

    Ok(entry)
}

/// Read a single entry from file.
fn read_entry<R: Read>(
    reader: &mut R,
    dimensions: usize,
) -> Result<(Document, Vec<f32>), StorageError> {
    let len = read_u32(reader)?;
    if len > MAX_DOCUMENT_LEN {
        return Err(StorageError::InvalidFormat(format!(
            "document length {len} is out of range"
        )));
    }

    let mut json = vec![0u8; len as usize];
    reader.read_exact(&mut json).map_err(truncated)?;
    let document: Document = serde_json::from_slice(&json)
        .map_err(|err| StorageError::InvalidFormat(format!("malformed document: {err}")))?;

    let mut embedding = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        let mut float_bytes = [0u8; 4];
        reader.read_exact(&mut float_bytes).map_err(truncated)?;
        embedding.push(f32::from_le_bytes(float_bytes));
    }

    Ok((document, embedding))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, StorageError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes).map_err(truncated)?;
    Ok(u32::from_le_bytes(bytes))
}

/// A short read means the file was cut off, not that it is missing.
fn truncated(err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        StorageError::InvalidFormat("file is truncated".to_string())
    } else {
        StorageError::Io(err)
    }
}

/// Reader that checksums everything passing through it.
struct BodyReader<'a, R> {
    inner: &'a mut R,
    hasher: crc32fast::Hasher,
}

impl<R: Read> Read for BodyReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}
