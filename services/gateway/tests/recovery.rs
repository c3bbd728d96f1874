//! Crash-recovery fidelity
//!
//! Runs a live session against a temp data directory, kills it without
//! a final snapshot, recovers a fresh engine from disk, and checks the
//! rebuilt resting set is identical (ids, prices, remainders, FIFO
//! positions). Covers journal-only recovery, snapshot + tail replay,
//! and id uniqueness across restarts.

use std::sync::Arc;
use std::time::Duration;

use gateway::boot::recover_book;
use market_data::BroadcastAggregator;
use matching_engine::engine::SymbolEngine;
use persistence::journal::{JournalConfig, JournalWriter};
use persistence::snapshot::SnapshotWriter;
use persistence::worker::{PersistenceWorker, WorkerHealth};
use tokio::sync::mpsc;
use types::config::EngineConfig;
use types::events::BookSnapshot;
use types::ids::{Symbol, TradeId};
use types::numeric::{Price, Quantity};
use types::order::{OrderRequest, OrderType, Side};
use types::trade::Trade;

const SYMBOL: &str = "BTC-USDT";

fn test_config(data_dir: &std::path::Path) -> EngineConfig {
    EngineConfig {
        symbols: vec![SYMBOL.to_string()],
        persistence_batch_size: 10,
        persistence_batch_interval_ms: 5,
        data_dir: data_dir.to_path_buf(),
        ..EngineConfig::default()
    }
}

/// One live engine session backed by real persistence
struct Session {
    engine: Arc<SymbolEngine>,
    worker: tokio::task::JoinHandle<()>,
    health: Arc<WorkerHealth>,
}

impl Session {
    fn start(config: &EngineConfig) -> Self {
        let symbol = Symbol::new(SYMBOL);
        let (book, report) = recover_book(config, &symbol).unwrap();

        let mut journal =
            JournalWriter::open(JournalConfig::new(config.journal_dir(SYMBOL))).unwrap();
        journal.set_next_sequence(report.final_sequence + 1);

        let (tx, rx) = mpsc::channel(config.persistence_queue_capacity);
        let health = WorkerHealth::new();
        let worker = tokio::spawn(
            PersistenceWorker::new(
                rx,
                journal,
                config.persistence_batch_size,
                Duration::from_millis(config.persistence_batch_interval_ms),
                Arc::clone(&health),
            )
            .run(),
        );

        let engine = SymbolEngine::new(
            symbol.clone(),
            Arc::new(config.clone()),
            book,
            report.final_sequence + 1,
            tx,
            BroadcastAggregator::new(5, 64),
        );

        Self {
            engine,
            worker,
            health,
        }
    }

    async fn submit(
        &self,
        side: Side,
        order_type: OrderType,
        price: Option<u64>,
        quantity: &str,
    ) -> (types::order::Order, Vec<Trade>) {
        let report = self
            .engine
            .submit(OrderRequest {
                symbol: Symbol::new(SYMBOL),
                side,
                order_type,
                price: price.map(Price::from_u64),
                quantity: Quantity::from_str(quantity).unwrap(),
                user_id: None,
                client_order_id: None,
            })
            .await
            .unwrap();
        (report.order, report.trades)
    }

    async fn book_state(&self) -> BookSnapshot {
        self.engine.book_snapshot().await
    }

    /// Stop without writing a final snapshot: the journal alone must
    /// carry the tail
    async fn crash(self) -> Arc<WorkerHealth> {
        drop(self.engine); // closes the event channel; worker drains and exits
        self.worker.await.unwrap();
        self.health
    }
}

/// Resting sets must agree on ids, prices, remainders, and FIFO order
fn assert_same_resting_set(before: &BookSnapshot, after: &BookSnapshot) {
    let key = |orders: &[types::order::Order]| -> Vec<(String, String, String)> {
        orders
            .iter()
            .map(|o| {
                (
                    o.order_id.to_string(),
                    o.price.map(|p| p.to_string()).unwrap_or_default(),
                    o.remaining_quantity().to_string(),
                )
            })
            .collect()
    };
    assert_eq!(key(&before.bids), key(&after.bids), "bid side diverged");
    assert_eq!(key(&before.asks), key(&after.asks), "ask side diverged");
}

#[tokio::test]
async fn recovery_from_journal_only() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = test_config(tmp.path());

    let session = Session::start(&config);
    session.submit(Side::Sell, OrderType::Limit, Some(100), "1.0").await;
    session.submit(Side::Sell, OrderType::Limit, Some(100), "2.0").await;
    session.submit(Side::Sell, OrderType::Limit, Some(101), "1.5").await;
    session.submit(Side::Buy, OrderType::Limit, Some(100), "1.5").await; // partial against FIFO
    session.submit(Side::Buy, OrderType::Limit, Some(95), "3.0").await;
    let (cancel_me, _) = session.submit(Side::Buy, OrderType::Limit, Some(94), "1.0").await;
    session.engine.cancel(&cancel_me.order_id).await.unwrap();

    let before = session.book_state().await;
    let health = session.crash().await;
    assert_eq!(health.write_failures(), 0);

    let symbol = Symbol::new(SYMBOL);
    let (recovered, report) = recover_book(&config, &symbol).unwrap();
    assert!(report.replayed > 0);
    assert_eq!(report.snapshot_sequence, 0);

    let after = recovered.snapshot(report.final_sequence, 0);
    assert_same_resting_set(&before, &after);
}

#[tokio::test]
async fn recovery_from_snapshot_plus_tail() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = test_config(tmp.path());

    let session = Session::start(&config);

    // Phase 1: activity covered by the snapshot
    session.submit(Side::Sell, OrderType::Limit, Some(100), "1.0").await;
    session.submit(Side::Buy, OrderType::Limit, Some(99), "2.0").await;
    session.submit(Side::Buy, OrderType::Limit, Some(99), "0.5").await;

    let mid = session.book_state().await;
    SnapshotWriter::new(config.snapshot_dir(SYMBOL), true)
        .write(mid.clone())
        .unwrap();

    // Phase 2: activity only in the journal tail
    session.submit(Side::Buy, OrderType::Limit, Some(100), "0.4").await; // trades
    session.submit(Side::Sell, OrderType::Limit, Some(102), "3.0").await;
    session.submit(Side::Buy, OrderType::Ioc, Some(102), "1.0").await; // trades, no residence

    let before = session.book_state().await;
    session.crash().await;

    let symbol = Symbol::new(SYMBOL);
    let (recovered, report) = recover_book(&config, &symbol).unwrap();
    assert_eq!(report.snapshot_sequence, mid.sequence);
    assert!(report.replayed > 0);

    let after = recovered.snapshot(report.final_sequence, 0);
    assert_same_resting_set(&before, &after);
}

#[tokio::test]
async fn recovery_resumes_unique_ids_and_sequences() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = test_config(tmp.path());

    let mut all_trade_ids: Vec<TradeId> = Vec::new();
    let mut last_sequence = 0u64;

    // Session 1: produce trades, crash
    let session = Session::start(&config);
    session.submit(Side::Sell, OrderType::Limit, Some(100), "2.0").await;
    let (_, trades) = session.submit(Side::Buy, OrderType::Limit, Some(100), "1.0").await;
    all_trade_ids.extend(trades.iter().map(|t| t.trade_id));
    last_sequence = last_sequence.max(trades.iter().map(|t| t.sequence).max().unwrap());
    session.crash().await;

    // Session 2: trade stream resumes, ids stay unique, sequences grow
    let session = Session::start(&config);
    let (_, trades) = session.submit(Side::Buy, OrderType::Limit, Some(100), "1.0").await;
    assert_eq!(trades.len(), 1, "recovered maker remainder must match");
    assert!(trades[0].sequence > last_sequence);
    all_trade_ids.extend(trades.iter().map(|t| t.trade_id));

    let health = session.crash().await;
    assert_eq!(health.write_failures(), 0, "resumed journal must stay contiguous");

    let unique: std::collections::HashSet<_> = all_trade_ids.iter().collect();
    assert_eq!(unique.len(), all_trade_ids.len(), "trade ids must be unique");
}

#[tokio::test]
async fn double_recovery_is_stable() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = test_config(tmp.path());

    let session = Session::start(&config);
    session.submit(Side::Buy, OrderType::Limit, Some(98), "1.0").await;
    session.submit(Side::Sell, OrderType::Limit, Some(103), "2.0").await;
    let before = session.book_state().await;
    session.crash().await;

    let symbol = Symbol::new(SYMBOL);
    let (first, first_report) = recover_book(&config, &symbol).unwrap();
    let (second, second_report) = recover_book(&config, &symbol).unwrap();

    assert_eq!(first_report.final_sequence, second_report.final_sequence);
    let snap_a = first.snapshot(first_report.final_sequence, 0);
    let snap_b = second.snapshot(second_report.final_sequence, 0);
    assert_same_resting_set(&before, &snap_a);
    assert_same_resting_set(&snap_a, &snap_b);
}
