//! Append-only event journal
//!
//! Events are stored as length-delimited frames:
//!
//! ```text
//! [body_len: u32 LE][crc: u32 LE][body: bincode(JournalEntry)]
//! ```
//!
//! The body is the bincode encoding of the whole entry; the CRC32C in
//! the header covers the body bytes, so any bit flip or torn write is
//! caught before decoding. Batches commit with a single flush + fsync;
//! files rotate at a configurable size.

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use types::events::EngineEvent;

/// Frame header: body length + CRC32C, both u32 little-endian
const FRAME_HEADER_BYTES: usize = 8;

/// Bodies beyond this are treated as corruption, not allocation requests
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Frame truncated: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    #[error("Frame corrupt: {0}")]
    Corrupt(String),

    #[error("Sequence error: expected {expected}, got {got}")]
    SequenceError { expected: u64, got: u64 },
}

/// A single journal entry representing one persisted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Per-symbol monotonic sequence number
    pub sequence: u64,
    /// Unix nanosecond timestamp
    pub timestamp: i64,
    /// Event type tag from the taxonomy
    pub event_type: String,
    /// Bincode-serialized event payload
    pub payload: Vec<u8>,
}

impl JournalEntry {
    pub fn new(sequence: u64, timestamp: i64, event_type: String, payload: Vec<u8>) -> Self {
        Self {
            sequence,
            timestamp,
            event_type,
            payload,
        }
    }

    /// Build an entry from an engine event
    pub fn from_event(event: &EngineEvent) -> Result<Self, JournalError> {
        let payload = bincode::serialize(event)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        Ok(Self::new(
            event.sequence(),
            event.timestamp(),
            event.event_type().to_string(),
            payload,
        ))
    }

    /// Decode the payload back into an engine event
    pub fn decode_event(&self) -> Result<EngineEvent, JournalError> {
        bincode::deserialize(&self.payload)
            .map_err(|e| JournalError::Serialization(e.to_string()))
    }

    /// Encode this entry as one framed record
    pub fn to_frame(&self) -> Result<Vec<u8>, JournalError> {
        let body =
            bincode::serialize(self).map_err(|e| JournalError::Serialization(e.to_string()))?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_BYTES + body.len());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc32c(&body).to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Decode one frame from the start of `data`
    ///
    /// Returns `(entry, frame_len)` on success. Short reads report
    /// [`JournalError::Truncated`]; failed CRC or an implausible length
    /// report [`JournalError::Corrupt`].
    pub fn from_frame(data: &[u8]) -> Result<(Self, usize), JournalError> {
        let header = data.get(..FRAME_HEADER_BYTES).ok_or(JournalError::Truncated {
            needed: FRAME_HEADER_BYTES,
            have: data.len(),
        })?;
        let body_len =
            u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let stored_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if body_len > MAX_BODY_BYTES {
            return Err(JournalError::Corrupt(format!(
                "frame body of {} bytes exceeds the {} byte limit",
                body_len, MAX_BODY_BYTES
            )));
        }

        let frame_len = FRAME_HEADER_BYTES + body_len;
        let body = data
            .get(FRAME_HEADER_BYTES..frame_len)
            .ok_or(JournalError::Truncated {
                needed: frame_len,
                have: data.len(),
            })?;

        if crc32c(body) != stored_crc {
            return Err(JournalError::Corrupt("CRC32C mismatch".to_string()));
        }

        let entry: JournalEntry =
            bincode::deserialize(body).map_err(|e| JournalError::Corrupt(e.to_string()))?;
        Ok((entry, frame_len))
    }
}

/// Configuration for the journal writer
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Directory for journal files
    pub dir: PathBuf,
    /// Maximum file size in bytes before rotation (default 64 MiB)
    pub max_file_size: u64,
}

impl JournalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_file_size: 64 * 1024 * 1024,
        }
    }
}

/// Append-only journal writer with rotation and batch commit
pub struct JournalWriter {
    config: JournalConfig,
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_file_size: u64,
    next_sequence: u64,
    file_index: u64,
}

impl JournalWriter {
    /// Open a journal writer, creating the directory if needed
    pub fn open(config: JournalConfig) -> Result<Self, JournalError> {
        fs::create_dir_all(&config.dir)?;

        let file_index = Self::find_latest_index(&config.dir);
        let current_file = Self::journal_path(&config.dir, file_index);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current_file)?;

        let current_file_size = file.metadata()?.len();

        Ok(Self {
            config,
            writer: BufWriter::new(file),
            current_file,
            current_file_size,
            next_sequence: 0, // set by the caller after recovery
            file_index,
        })
    }

    /// Set the next expected sequence number (used after recovery)
    pub fn set_next_sequence(&mut self, sequence: u64) {
        self.next_sequence = sequence;
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn current_file_path(&self) -> &Path {
        &self.current_file
    }

    /// Append a batch of entries and commit with one flush + fsync
    ///
    /// Sequence contiguity is validated per entry; the batch is the
    /// durability unit.
    pub fn append_batch(&mut self, entries: &[JournalEntry]) -> Result<(), JournalError> {
        for entry in entries {
            self.append(entry)?;
        }
        self.sync()
    }

    /// Append one entry without committing
    fn append(&mut self, entry: &JournalEntry) -> Result<(), JournalError> {
        if self.next_sequence > 0 && entry.sequence != self.next_sequence {
            return Err(JournalError::SequenceError {
                expected: self.next_sequence,
                got: entry.sequence,
            });
        }

        if self.current_file_size >= self.config.max_file_size {
            self.rotate()?;
        }

        let frame = entry.to_frame()?;
        self.writer.write_all(&frame)?;
        self.current_file_size += frame.len() as u64;
        self.next_sequence = entry.sequence + 1;
        Ok(())
    }

    /// Force flush + fsync (batch commit and shutdown)
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), JournalError> {
        self.sync()?;

        self.file_index += 1;
        self.current_file = Self::journal_path(&self.config.dir, self.file_index);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.current_file)?;

        self.writer = BufWriter::new(file);
        self.current_file_size = 0;
        Ok(())
    }

    pub(crate) fn journal_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("journal-{:06}.bin", index))
    }

    pub(crate) fn find_latest_index(dir: &Path) -> u64 {
        fs::read_dir(dir)
            .ok()
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| {
                        let name = e.file_name().to_string_lossy().to_string();
                        if name.starts_with("journal-") && name.ends_with(".bin") {
                            name.trim_start_matches("journal-")
                                .trim_end_matches(".bin")
                                .parse::<u64>()
                                .ok()
                        } else {
                            None
                        }
                    })
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}
