//! Durable state for the matching engine
//!
//! Two kinds of durable state per symbol:
//! - an append-only **journal** of engine events with CRC32C checksums,
//!   written in batches with one fsync per batch commit;
//! - periodic **snapshots** of the resting order set with SHA-256
//!   integrity hashes and optional zstd compression.
//!
//! Recovery loads the latest snapshot and replays the journal tail,
//! reconstructing a book whose resting set equals the book at the tail
//! of the log.

pub mod journal;
pub mod reader;
pub mod recovery;
pub mod snapshot;
pub mod worker;

pub use journal::{JournalConfig, JournalEntry, JournalError, JournalWriter};
pub use reader::{JournalReader, ReaderError};
pub use recovery::{EventApplier, RecoveryError, RecoveryManager, RecoveryReport};
pub use snapshot::{SnapshotError, SnapshotFile, SnapshotLoader, SnapshotWriter};
pub use worker::{PersistenceWorker, WorkerHealth};
