//! Journal reader
//!
//! Iterates entries across rotated journal files in index order. Frame
//! decoding verifies the CRC32C header; a corrupt or truncated tail
//! stops iteration with a warning rather than failing recovery, since
//! everything before the corruption point was committed with fsync and
//! is trustworthy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::journal::{JournalEntry, JournalError};

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),
}

/// Sequential reader over a journal directory
pub struct JournalReader {
    files: Vec<PathBuf>,
    file_index: usize,
    buffer: Vec<u8>,
    position: usize,
    min_sequence: u64,
}

impl JournalReader {
    /// Open a reader over all journal files in `dir`, in rotation order
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let dir = dir.as_ref();
        let mut files: Vec<(u64, PathBuf)> = Vec::new();

        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with("journal-") && name.ends_with(".bin") {
                    if let Ok(index) = name
                        .trim_start_matches("journal-")
                        .trim_end_matches(".bin")
                        .parse::<u64>()
                    {
                        files.push((index, entry.path()));
                    }
                }
            }
        }
        files.sort_by_key(|(index, _)| *index);

        Ok(Self {
            files: files.into_iter().map(|(_, path)| path).collect(),
            file_index: 0,
            buffer: Vec::new(),
            position: 0,
            min_sequence: 0,
        })
    }

    /// Skip entries below `sequence`; subsequent reads start there
    pub fn seek_to_sequence(&mut self, sequence: u64) {
        self.min_sequence = sequence;
    }

    /// Read the next entry, or None at end of journal
    ///
    /// Entries below the seek point are skipped. Corruption ends the
    /// stream: a truncated or CRC-failing frame returns None after
    /// logging, matching fsync-on-batch-commit tail semantics.
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>, ReaderError> {
        loop {
            if self.position >= self.buffer.len() {
                if !self.advance_file()? {
                    return Ok(None);
                }
            }

            match JournalEntry::from_frame(&self.buffer[self.position..]) {
                Ok((entry, consumed)) => {
                    self.position += consumed;
                    if entry.sequence < self.min_sequence {
                        continue;
                    }
                    return Ok(Some(entry));
                }
                Err(e) => {
                    warn!(error = %e, "corrupt journal tail; stopping replay");
                    return Ok(None);
                }
            }
        }
    }

    /// Load the next file into the buffer; false when exhausted
    fn advance_file(&mut self) -> Result<bool, ReaderError> {
        while self.file_index < self.files.len() {
            let path = &self.files[self.file_index];
            self.file_index += 1;

            let buffer = fs::read(path)?;
            if buffer.is_empty() {
                continue;
            }
            self.buffer = buffer;
            self.position = 0;
            return Ok(true);
        }
        Ok(false)
    }
}
