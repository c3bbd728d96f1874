//! Snapshot storage with integrity and compression
//!
//! A snapshot is the resting order set for one symbol plus the last
//! event sequence it covers. Serialization is bincode over the
//! deterministically-ordered [`BookSnapshot`]; integrity is a SHA-256
//! hash of the serialized state; compression (zstd) is optional. Writes
//! are atomic: tmp file, fsync, rename.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use types::events::BookSnapshot;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Integrity check failed: expected {expected}, got {actual}")]
    IntegrityFailure { expected: String, actual: String },

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("No snapshots found")]
    NoSnapshots,
}

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Deterministic SHA-256 hash of a book snapshot
pub fn state_hash(state: &BookSnapshot) -> String {
    let bytes = bincode::serialize(state).expect("BookSnapshot serialization should never fail");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{:x}", hasher.finalize())
}

/// On-disk snapshot envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Format version for forward compatibility
    pub version: u32,
    /// Last applied event sequence
    pub sequence: u64,
    /// Unix nanos when the snapshot was taken
    pub timestamp: i64,
    pub state: BookSnapshot,
    /// SHA-256 hash of the serialized state
    pub checksum: String,
}

impl SnapshotFile {
    /// Wrap a book snapshot with its integrity hash
    pub fn new(state: BookSnapshot) -> Self {
        let checksum = state_hash(&state);
        Self {
            version: SNAPSHOT_VERSION,
            sequence: state.sequence,
            timestamp: state.timestamp,
            state,
            checksum,
        }
    }

    /// Verify the integrity hash
    pub fn verify_integrity(&self) -> bool {
        self.checksum == state_hash(&self.state)
    }
}

/// Writes snapshots to disk with optional zstd compression
pub struct SnapshotWriter {
    dir: PathBuf,
    compress: bool,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>, compress: bool) -> Self {
        Self {
            dir: dir.into(),
            compress,
        }
    }

    /// Write a snapshot atomically: serialize → compress → tmp → fsync → rename
    pub fn write(&self, state: BookSnapshot) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir)?;

        let snapshot = SnapshotFile::new(state);
        let data = bincode::serialize(&snapshot)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        let (final_data, ext) = if self.compress {
            let compressed = zstd::encode_all(data.as_slice(), 3)
                .map_err(|e| SnapshotError::Compression(e.to_string()))?;
            (compressed, "snap.zst")
        } else {
            (data, "snap")
        };

        let filename = format!("snapshot-{:012}.{}", snapshot.sequence, ext);
        let path = self.dir.join(&filename);
        let tmp_path = self.dir.join(format!("{}.tmp", filename));

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&final_data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        info!(
            sequence = snapshot.sequence,
            orders = snapshot.state.order_count(),
            path = %path.display(),
            "snapshot written"
        );
        Ok(path)
    }

    /// Delete all but the newest `keep` snapshots
    pub fn cleanup(&self, keep: usize) -> Result<(), SnapshotError> {
        let loader = SnapshotLoader::new(&self.dir);
        let mut snapshots = loader.list_snapshots()?;
        if snapshots.len() <= keep {
            return Ok(());
        }
        snapshots.sort_by_key(|(sequence, _)| *sequence);
        let excess = snapshots.len() - keep;
        for (_, path) in snapshots.into_iter().take(excess) {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Loads snapshots from disk, verifying integrity
pub struct SnapshotLoader {
    dir: PathBuf,
}

impl SnapshotLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load a specific snapshot file
    pub fn load(&self, path: &Path) -> Result<SnapshotFile, SnapshotError> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let is_compressed = path
            .to_string_lossy()
            .ends_with(".snap.zst");

        let decompressed = if is_compressed {
            zstd::decode_all(data.as_slice())
                .map_err(|e| SnapshotError::Compression(e.to_string()))?
        } else {
            data
        };

        let snapshot: SnapshotFile = bincode::deserialize(&decompressed)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }

        if !snapshot.verify_integrity() {
            let actual = state_hash(&snapshot.state);
            return Err(SnapshotError::IntegrityFailure {
                expected: snapshot.checksum.clone(),
                actual,
            });
        }

        Ok(snapshot)
    }

    /// Load the latest snapshot (highest sequence number)
    pub fn load_latest(&self) -> Result<SnapshotFile, SnapshotError> {
        let path = self.find_latest()?;
        self.load(&path)
    }

    /// Find the path to the latest snapshot
    pub fn find_latest(&self) -> Result<PathBuf, SnapshotError> {
        let mut snapshots = self.list_snapshots()?;
        snapshots.sort_by(|a, b| b.0.cmp(&a.0));
        snapshots
            .into_iter()
            .next()
            .map(|(_, path)| path)
            .ok_or(SnapshotError::NoSnapshots)
    }

    /// List all snapshots as (sequence, path) pairs
    pub fn list_snapshots(&self) -> Result<Vec<(u64, PathBuf)>, SnapshotError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("snapshot-")
                && (name.ends_with(".snap") || name.ends_with(".snap.zst"))
            {
                if let Some(sequence) = Self::parse_sequence(&name) {
                    results.push((sequence, entry.path()));
                }
            }
        }
        results.sort_by_key(|(sequence, _)| *sequence);
        Ok(results)
    }

    fn parse_sequence(filename: &str) -> Option<u64> {
        let stripped = filename
            .trim_start_matches("snapshot-")
            .trim_end_matches(".snap.zst")
            .trim_end_matches(".snap");
        stripped.parse::<u64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use types::ids::Symbol;
    use types::numeric::{Price, Quantity};
    use types::order::{Order, OrderType, Side};

    fn sample_state(sequence: u64) -> BookSnapshot {
        let order = Order::new(
            Symbol::new("BTC-USDT"),
            Side::Buy,
            OrderType::Limit,
            Some(Price::from_u64(50000)),
            Quantity::from_str("1.5").unwrap(),
            1,
            1_708_123_456_789_000_000,
        );
        BookSnapshot {
            symbol: Symbol::new("BTC-USDT"),
            sequence,
            timestamp: 1_708_123_456_789_000_000,
            bids: vec![order],
            asks: vec![],
        }
    }

    #[test]
    fn test_integrity_hash() {
        let snapshot = SnapshotFile::new(sample_state(10));
        assert!(snapshot.verify_integrity());
    }

    #[test]
    fn test_tampered_state_fails_integrity() {
        let mut snapshot = SnapshotFile::new(sample_state(10));
        snapshot.state.sequence = 99;
        assert!(!snapshot.verify_integrity());
    }

    #[test]
    fn test_write_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(tmp.path(), false);
        let loader = SnapshotLoader::new(tmp.path());

        let state = sample_state(10);
        writer.write(state.clone()).unwrap();

        let loaded = loader.load_latest().unwrap();
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.sequence, 10);
    }

    #[test]
    fn test_compressed_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(tmp.path(), true);
        let loader = SnapshotLoader::new(tmp.path());

        let state = sample_state(11);
        let path = writer.write(state.clone()).unwrap();
        assert!(path.to_string_lossy().ends_with(".snap.zst"));

        let loaded = loader.load_latest().unwrap();
        assert_eq!(loaded.state, state);
    }

    #[test]
    fn test_serialized_roundtrip_is_byte_equal() {
        let snapshot = SnapshotFile::new(sample_state(10));
        let first = bincode::serialize(&snapshot).unwrap();
        let decoded: SnapshotFile = bincode::deserialize(&first).unwrap();
        let second = bincode::serialize(&decoded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_latest_wins() {
        let tmp = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(tmp.path(), false);
        let loader = SnapshotLoader::new(tmp.path());

        writer.write(sample_state(5)).unwrap();
        writer.write(sample_state(20)).unwrap();
        writer.write(sample_state(12)).unwrap();

        assert_eq!(loader.load_latest().unwrap().sequence, 20);
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let tmp = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(tmp.path(), false);
        let loader = SnapshotLoader::new(tmp.path());

        for sequence in [1, 2, 3, 4, 5] {
            writer.write(sample_state(sequence)).unwrap();
        }
        writer.cleanup(2).unwrap();

        let remaining = loader.list_snapshots().unwrap();
        let sequences: Vec<u64> = remaining.iter().map(|(s, _)| *s).collect();
        assert_eq!(sequences, vec![4, 5]);
    }

    #[test]
    fn test_no_snapshots() {
        let tmp = TempDir::new().unwrap();
        let loader = SnapshotLoader::new(tmp.path());
        assert!(matches!(
            loader.load_latest(),
            Err(SnapshotError::NoSnapshots)
        ));
    }
}
