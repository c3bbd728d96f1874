//! Service bootstrap
//!
//! Builds the full per-symbol pipeline: recovery (snapshot + journal
//! replay) before ingress, then engine, persistence worker, market-data
//! publisher, snapshot task, and the shared broadcast aggregator.

use std::sync::Arc;
use std::time::Duration;

use market_data::BroadcastAggregator;
use matching_engine::engine::{spawn_market_data_publisher, SymbolEngine};
use matching_engine::orderbook::OrderBook;
use matching_engine::EngineRouter;
use persistence::journal::{JournalConfig, JournalWriter};
use persistence::recovery::{EventApplier, RecoveryManager, RecoveryReport};
use persistence::snapshot::SnapshotWriter;
use persistence::worker::{PersistenceWorker, WorkerHealth};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use types::config::EngineConfig;
use types::events::{BookSnapshot, EngineEvent};
use types::ids::Symbol;

use crate::dispatch::Dispatcher;

/// Replay seam between the persistence crate and the order book
struct BookApplier<'a> {
    book: &'a mut OrderBook,
}

impl EventApplier for BookApplier<'_> {
    fn restore(&mut self, snapshot: &BookSnapshot) -> Result<(), String> {
        self.book.restore(snapshot);
        Ok(())
    }

    fn apply(&mut self, event: &EngineEvent) -> Result<(), String> {
        self.book.apply_event(event);
        Ok(())
    }
}

/// Recover one symbol's book from disk
///
/// Exposed for tests and tooling; `App::build` calls it per symbol
/// before the engine accepts traffic.
pub fn recover_book(
    config: &EngineConfig,
    symbol: &Symbol,
) -> Result<(OrderBook, RecoveryReport), anyhow::Error> {
    let mut book = OrderBook::new(symbol.clone());
    let manager = RecoveryManager::new(
        config.snapshot_dir(symbol.as_str()),
        config.journal_dir(symbol.as_str()),
    );
    let report = manager.recover(&mut BookApplier { book: &mut book })?;
    Ok((book, report))
}

/// The assembled service
pub struct App {
    pub config: Arc<EngineConfig>,
    pub router: Arc<EngineRouter>,
    pub aggregator: Arc<BroadcastAggregator>,
    pub dispatcher: Dispatcher,
    health: Arc<WorkerHealth>,
    tasks: Vec<JoinHandle<()>>,
}

impl App {
    /// Build engines for every configured symbol, recovering each from
    /// its journal and snapshots first
    pub async fn build(config: EngineConfig) -> Result<Self, anyhow::Error> {
        let config = Arc::new(config);
        let router = Arc::new(EngineRouter::new());
        let aggregator =
            BroadcastAggregator::new(config.broadcast_window_ms, config.subscriber_queue_capacity);
        let health = WorkerHealth::new();
        let mut tasks = Vec::new();

        for name in &config.symbols {
            let Some(symbol) = Symbol::try_new(name.clone()) else {
                warn!(symbol = %name, "skipping configured symbol with invalid format");
                continue;
            };

            let (book, report) = recover_book(&config, &symbol)?;
            info!(
                symbol = %symbol,
                resting_orders = book.order_count(),
                replayed = report.replayed,
                "engine recovered"
            );

            let mut journal =
                JournalWriter::open(JournalConfig::new(config.journal_dir(symbol.as_str())))?;
            journal.set_next_sequence(report.final_sequence + 1);

            let (tx, rx) = mpsc::channel(config.persistence_queue_capacity);
            let worker = PersistenceWorker::new(
                rx,
                journal,
                config.persistence_batch_size,
                Duration::from_millis(config.persistence_batch_interval_ms),
                Arc::clone(&health),
            );
            tasks.push(tokio::spawn(worker.run()));

            let engine = SymbolEngine::new(
                symbol.clone(),
                Arc::clone(&config),
                book,
                report.final_sequence + 1,
                tx,
                Arc::clone(&aggregator),
            );

            tasks.push(spawn_market_data_publisher(
                Arc::clone(&engine),
                config.md_publish_interval_ms,
            ));
            tasks.push(spawn_snapshot_task(Arc::clone(&engine), Arc::clone(&config)));

            router.insert(engine);
        }

        tasks.push(Arc::clone(&aggregator).spawn());

        let dispatcher = Dispatcher::new(
            Arc::clone(&router),
            Arc::clone(&aggregator),
            Arc::clone(&config),
            Arc::clone(&health),
        );

        Ok(Self {
            config,
            router,
            aggregator,
            dispatcher,
            health,
            tasks,
        })
    }

    pub fn health(&self) -> &Arc<WorkerHealth> {
        &self.health
    }

    /// Graceful shutdown: halt ingress, drain persistence, final
    /// snapshots, then stop background tasks
    pub async fn shutdown(mut self) {
        info!("shutting down");

        for engine in self.router.engines() {
            engine.halt();
        }

        // Let the workers drain what the engines already queued
        tokio::time::sleep(Duration::from_millis(
            2 * self.config.persistence_batch_interval_ms,
        ))
        .await;

        for engine in self.router.engines() {
            let snapshot = engine.book_snapshot().await;
            let writer = SnapshotWriter::new(
                self.config.snapshot_dir(engine.symbol().as_str()),
                true,
            );
            match writer.write(snapshot) {
                Ok(_) => {
                    if let Err(e) = writer.cleanup(self.config.snapshots_to_keep) {
                        warn!(error = %e, "snapshot cleanup failed");
                    }
                }
                Err(e) => error!(symbol = %engine.symbol(), error = %e, "final snapshot failed"),
            }
        }

        self.aggregator.flush_window();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("shutdown complete");
    }
}

/// Periodic snapshot task for one engine
fn spawn_snapshot_task(engine: Arc<SymbolEngine>, config: Arc<EngineConfig>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(config.snapshot_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so startup is quiet
        ticker.tick().await;

        let writer = SnapshotWriter::new(config.snapshot_dir(engine.symbol().as_str()), true);
        loop {
            ticker.tick().await;
            let snapshot = engine.book_snapshot().await;
            match writer.write(snapshot) {
                Ok(_) => {
                    if let Err(e) = writer.cleanup(config.snapshots_to_keep) {
                        warn!(symbol = %engine.symbol(), error = %e, "snapshot cleanup failed");
                    }
                }
                Err(e) => {
                    error!(symbol = %engine.symbol(), error = %e, "periodic snapshot failed")
                }
            }
        }
    })
}
