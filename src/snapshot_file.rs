//! On-disk snapshot files.
//!
//! A snapshot file holds one [`TagDocument`], framed so that truncated or
//! corrupted files are detected on load:
//!
//! ```text
//! magic "MSS\0" | version u8 | payload length u32 LE | payload | crc32 u32 LE
//! ```
//!
//! The payload is the MessagePack encoding of the document. Saves hold an
//! exclusive lock on a sibling `.lock` file while writing a sibling `.tmp`
//! file, which is renamed into place once synced.

use crate::error::{Result, StatsError};
use crate::tags::TagDocument;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Magic bytes for snapshot files.
const SNAPSHOT_MAGIC: &[u8; 4] = b"MSS\0";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u8 = 1;

/// Largest payload accepted on save and load.
const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Reads and writes framed snapshot documents.
pub struct SnapshotFile;

impl SnapshotFile {
    /// Atomically replace the snapshot at `path` with `doc`.
    ///
    /// Fails with [`StatsError::Locked`] while another save of the same path
    /// is in progress.
    pub fn save(path: impl AsRef<Path>, doc: &TagDocument) -> Result<()> {
        let path = path.as_ref();
        let _lock = Self::acquire_lock(path)?;

        let encoded = rmp_serde::to_vec(doc)?;
        let len = Self::payload_len(encoded.len())?;

        let tmp_path = Self::sibling(path, ".tmp");
        if let Err(e) = Self::write_frame(&tmp_path, &encoded, len) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = encoded.len(), "Saved stats snapshot");
        Ok(())
    }

    /// Load and verify the snapshot at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<TagDocument> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(StatsError::InvalidFormat("Invalid snapshot magic".into()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(StatsError::InvalidFormat(format!(
                "Unsupported snapshot version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_PAYLOAD_BYTES {
            return Err(StatsError::Corruption("Snapshot payload too large".into()));
        }

        let mut encoded = vec![0u8; len];
        reader.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);
        let computed = crc32fast::hash(&encoded);
        if stored != computed {
            return Err(StatsError::Corruption(format!(
                "Snapshot checksum mismatch: expected {:08x}, got {:08x}",
                stored, computed
            )));
        }

        let doc = rmp_serde::from_slice(&encoded)?;
        debug!(path = %path.display(), bytes = len, "Loaded stats snapshot");
        Ok(doc)
    }

    fn write_frame(tmp_path: &Path, encoded: &[u8], len: u32) -> Result<()> {
        let mut writer = BufWriter::new(File::create(tmp_path)?);
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&[SNAPSHOT_VERSION])?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(encoded)?;
        writer.write_all(&crc32fast::hash(encoded).to_le_bytes())?;
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| StatsError::Io(e.into_error()))?;
        file.sync_all()?;
        Ok(())
    }

    fn payload_len(len: usize) -> Result<u32> {
        if len > MAX_PAYLOAD_BYTES {
            return Err(StatsError::InvalidArgument(format!(
                "Snapshot payload of {} bytes exceeds the {} byte limit",
                len, MAX_PAYLOAD_BYTES
            )));
        }
        u32::try_from(len)
            .map_err(|_| StatsError::InvalidArgument(format!("Snapshot payload too large: {}", len)))
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(Self::sibling(path, ".lock"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StatsError::Locked)?;

        Ok(lock_file)
    }

    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }
}
