//! Batched persistence worker
//!
//! Drains the engine's bounded event queue in batches: up to
//! `batch_size` events or `batch_interval`, whichever comes first, then
//! commits the batch to the journal with a single fsync. Write failures
//! never reach the matching path; they bump a counter and latch a
//! health-degraded flag surfaced through metrics.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info};
use types::events::EngineEvent;

use crate::journal::{JournalEntry, JournalWriter};

/// Consecutive failures before the health flag latches
const FAILURE_THRESHOLD: u64 = 3;

/// Shared health state for the persistence pipeline
#[derive(Debug, Default)]
pub struct WorkerHealth {
    events_written: AtomicU64,
    batches_committed: AtomicU64,
    write_failures: AtomicU64,
    consecutive_failures: AtomicU64,
    degraded: AtomicBool,
}

impl WorkerHealth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events_written(&self) -> u64 {
        self.events_written.load(Ordering::Relaxed)
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed.load(Ordering::Relaxed)
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn record_success(&self, events: u64) {
        self.events_written.fetch_add(events, Ordering::Relaxed);
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
        let consecutive = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if consecutive >= FAILURE_THRESHOLD {
            self.degraded.store(true, Ordering::Relaxed);
        }
    }
}

/// Drains engine events into the journal in durable batches
pub struct PersistenceWorker {
    rx: mpsc::Receiver<EngineEvent>,
    journal: JournalWriter,
    batch_size: usize,
    batch_interval: Duration,
    health: Arc<WorkerHealth>,
}

impl PersistenceWorker {
    pub fn new(
        rx: mpsc::Receiver<EngineEvent>,
        journal: JournalWriter,
        batch_size: usize,
        batch_interval: Duration,
        health: Arc<WorkerHealth>,
    ) -> Self {
        Self {
            rx,
            journal,
            batch_size: batch_size.max(1),
            batch_interval,
            health,
        }
    }

    /// Run until the event channel closes, then flush and exit
    pub async fn run(mut self) {
        info!(path = %self.journal.current_file_path().display(), "persistence worker started");

        loop {
            // Block for the first event of the batch
            let Some(first) = self.rx.recv().await else {
                break;
            };

            let mut batch = Vec::with_capacity(self.batch_size);
            batch.push(first);

            // Fill the batch until size or deadline
            let deadline = Instant::now() + self.batch_interval;
            let mut closed = false;
            while batch.len() < self.batch_size {
                match timeout_at(deadline, self.rx.recv()).await {
                    Ok(Some(event)) => batch.push(event),
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break, // deadline reached
                }
            }

            self.commit(&batch);

            if closed {
                break;
            }
        }

        if let Err(e) = self.journal.sync() {
            error!(error = %e, "final journal sync failed");
        }
        info!("persistence worker stopped");
    }

    fn commit(&mut self, batch: &[EngineEvent]) {
        let entries: Vec<JournalEntry> = match batch
            .iter()
            .map(JournalEntry::from_event)
            .collect::<Result<_, _>>()
        {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "failed to encode journal batch");
                self.health.record_failure();
                return;
            }
        };

        match self.journal.append_batch(&entries) {
            Ok(()) => {
                self.health.record_success(entries.len() as u64);
                debug!(events = entries.len(), "journal batch committed");
            }
            Err(e) => {
                error!(error = %e, events = entries.len(), "journal batch write failed");
                self.health.record_failure();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalConfig;
    use crate::reader::JournalReader;
    use tempfile::TempDir;
    use types::ids::Symbol;
    use types::numeric::{Price, Quantity};
    use types::order::{Order, OrderType, Side};

    fn admitted(sequence: u64) -> EngineEvent {
        EngineEvent::OrderAdmitted(Order::new(
            Symbol::new("BTC-USDT"),
            Side::Buy,
            OrderType::Limit,
            Some(Price::from_u64(100)),
            Quantity::from_str("1.0").unwrap(),
            sequence,
            1_000 + sequence as i64,
        ))
    }

    #[tokio::test]
    async fn test_drains_and_commits_all_events() {
        let tmp = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel(100);
        let mut journal = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        journal.set_next_sequence(1);
        let health = WorkerHealth::new();

        let worker = PersistenceWorker::new(
            rx,
            journal,
            10,
            Duration::from_millis(20),
            Arc::clone(&health),
        );
        let handle = tokio::spawn(worker.run());

        for sequence in 1..=25 {
            tx.send(admitted(sequence)).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(health.events_written(), 25);
        assert!(health.batches_committed() >= 3);
        assert!(!health.is_degraded());

        let mut reader = JournalReader::open(tmp.path()).unwrap();
        let mut count = 0;
        while reader.next_entry().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 25);
    }

    #[tokio::test]
    async fn test_interval_flush_without_full_batch() {
        let tmp = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel(100);
        let mut journal = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        journal.set_next_sequence(1);
        let health = WorkerHealth::new();

        let worker = PersistenceWorker::new(
            rx,
            journal,
            1000, // never fills
            Duration::from_millis(10),
            Arc::clone(&health),
        );
        let handle = tokio::spawn(worker.run());

        tx.send(admitted(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(health.events_written(), 1);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sequence_gap_latches_degraded() {
        let tmp = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel(100);
        let mut journal = JournalWriter::open(JournalConfig::new(tmp.path())).unwrap();
        journal.set_next_sequence(1);
        let health = WorkerHealth::new();

        let worker = PersistenceWorker::new(
            rx,
            journal,
            1,
            Duration::from_millis(5),
            Arc::clone(&health),
        );
        let handle = tokio::spawn(worker.run());

        // Sequences with gaps fail the journal's contiguity check
        for sequence in [1u64, 5, 9, 13] {
            tx.send(admitted(sequence)).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert!(health.write_failures() >= FAILURE_THRESHOLD);
        assert!(health.is_degraded());
    }
}
