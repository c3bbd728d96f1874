//! Recovery flow: snapshot restore + journal replay
//!
//! Runs at engine startup, before ingress is enabled:
//! 1. Load the latest snapshot (if any) and restore the resting set.
//! 2. Open the journal and seek past the snapshot's sequence.
//! 3. Replay every subsequent event in order.
//!
//! The book crate owns replay semantics through [`EventApplier`]; this
//! module owns orchestration, timing, and diagnostics.

use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};
use types::events::{BookSnapshot, EngineEvent};

use crate::reader::{JournalReader, ReaderError};
use crate::snapshot::{SnapshotError, SnapshotLoader};

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("Journal error: {0}")]
    Journal(#[from] crate::journal::JournalError),

    #[error("Recovery failed: {0}")]
    Failed(String),
}

/// Applies restored state and replayed events to the consumer's book
pub trait EventApplier {
    fn restore(&mut self, snapshot: &BookSnapshot) -> Result<(), String>;
    fn apply(&mut self, event: &EngineEvent) -> Result<(), String>;
}

/// Outcome of one recovery run
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryReport {
    /// Sequence of the loaded snapshot (0 when none existed)
    pub snapshot_sequence: u64,
    /// Number of journal events replayed after the snapshot
    pub replayed: u64,
    /// Highest sequence applied; the engine resumes at final + 1
    pub final_sequence: u64,
    pub elapsed_ms: u64,
}

/// Orchestrates snapshot load + journal replay for one symbol
pub struct RecoveryManager {
    snapshot_dir: PathBuf,
    journal_dir: PathBuf,
}

impl RecoveryManager {
    pub fn new(snapshot_dir: impl Into<PathBuf>, journal_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            journal_dir: journal_dir.into(),
        }
    }

    /// Execute full recovery against the given applier
    pub fn recover(&self, applier: &mut dyn EventApplier) -> Result<RecoveryReport, RecoveryError> {
        let started = Instant::now();

        // Step 1: latest snapshot, if any
        let loader = SnapshotLoader::new(&self.snapshot_dir);
        let snapshot_sequence = match loader.load_latest() {
            Ok(snapshot) => {
                info!(
                    sequence = snapshot.sequence,
                    orders = snapshot.state.order_count(),
                    "restoring from snapshot"
                );
                applier
                    .restore(&snapshot.state)
                    .map_err(RecoveryError::Failed)?;
                snapshot.sequence
            }
            Err(SnapshotError::NoSnapshots) => {
                info!("no snapshot found, replaying journal from the beginning");
                0
            }
            Err(e) => return Err(e.into()),
        };

        // Step 2: journal tail
        let mut reader = JournalReader::open(&self.journal_dir)?;
        if snapshot_sequence > 0 {
            reader.seek_to_sequence(snapshot_sequence + 1);
        }

        // Step 3: replay
        let mut replayed = 0u64;
        let mut final_sequence = snapshot_sequence;
        while let Some(entry) = reader.next_entry()? {
            let event = entry.decode_event()?;
            applier.apply(&event).map_err(RecoveryError::Failed)?;
            final_sequence = entry.sequence;
            replayed += 1;
        }

        let report = RecoveryReport {
            snapshot_sequence,
            replayed,
            final_sequence,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if replayed == 0 && snapshot_sequence == 0 {
            info!("cold start: empty journal and no snapshot");
        } else {
            info!(
                snapshot_sequence = report.snapshot_sequence,
                replayed = report.replayed,
                final_sequence = report.final_sequence,
                elapsed_ms = report.elapsed_ms,
                "recovery complete"
            );
        }
        if report.final_sequence < report.snapshot_sequence {
            warn!("journal ends before snapshot sequence; journal may have been truncated");
        }

        Ok(report)
    }
}
