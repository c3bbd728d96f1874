//! Per-symbol engine
//!
//! Owns the symbol's order book behind an async mutex. The critical
//! section covers exactly: sequence assignment, matching, trade history,
//! and the dirty flag. Validation runs before the lock; persistence
//! enqueueing, broadcast publication, and metrics run after it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use market_data::records::{BboSide, BboView, DepthLevels, LevelView, MarketDataRecord, TradeRecord};
use market_data::BroadcastAggregator;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use types::config::EngineConfig;
use types::errors::{CancelError, SubmitError};
use types::events::{BookSnapshot, EngineEvent};
use types::ids::{OrderId, Symbol};
use types::order::{Order, OrderRequest, OrderStatus};
use types::time::now_nanos;
use types::trade::Trade;

use crate::matching::executor::TradeExecutor;
use crate::matching::{match_order, MatchContext};
use crate::metrics::EngineMetrics;
use crate::orderbook::{Bbo, DepthView, OrderBook};
use crate::validation;

/// Result of a successful submission
#[derive(Debug, Clone)]
pub struct SubmitReport {
    /// Final state of the incoming order
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// State guarded by the symbol lock
struct EngineCore {
    book: OrderBook,
    executor: TradeExecutor,
    /// Next event sequence; admissions, trades, cancels, and status
    /// transitions all draw from this counter in emission order
    next_sequence: u64,
    /// Recent trades, FIFO-evicted at the configured cap
    trade_history: VecDeque<Trade>,
}

impl EngineCore {
    fn next_seq(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

/// Matching engine for a single symbol
pub struct SymbolEngine {
    symbol: Symbol,
    config: Arc<EngineConfig>,
    core: Mutex<EngineCore>,
    /// Set under the lock on any book mutation; sampled by the publisher
    md_dirty: AtomicBool,
    /// Latched on invariant violation; rejects all further ingress
    halted: AtomicBool,
    persist_tx: mpsc::Sender<EngineEvent>,
    broadcast: Arc<BroadcastAggregator>,
    metrics: Arc<EngineMetrics>,
}

impl SymbolEngine {
    /// Create an engine over a (possibly recovered) book
    ///
    /// `next_sequence` continues the journal's ordering: 1 for a fresh
    /// book, last recovered sequence + 1 otherwise.
    pub fn new(
        symbol: Symbol,
        config: Arc<EngineConfig>,
        book: OrderBook,
        next_sequence: u64,
        persist_tx: mpsc::Sender<EngineEvent>,
        broadcast: Arc<BroadcastAggregator>,
    ) -> Arc<Self> {
        let trade_history_cap = config.trade_history_cap;
        let executor = TradeExecutor::new(config.fee_schedule());

        Arc::new(Self {
            symbol,
            config,
            core: Mutex::new(EngineCore {
                book,
                executor,
                next_sequence: next_sequence.max(1),
                trade_history: VecDeque::with_capacity(trade_history_cap.min(1024)),
            }),
            md_dirty: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            persist_tx,
            broadcast,
            metrics: Arc::new(EngineMetrics::new()),
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Stop accepting ingress (shutdown or invariant breach)
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Release);
    }

    /// Submit an order: validate, match under the lock, then persist and
    /// broadcast outside it
    pub async fn submit(&self, mut request: OrderRequest) -> Result<SubmitReport, SubmitError> {
        let started = Instant::now();

        if self.is_halted() {
            return Err(SubmitError::Halted {
                symbol: self.symbol.as_str().to_string(),
            });
        }

        if let Err(reason) = validation::validate(&mut request, &self.symbol, &self.config) {
            self.metrics.record_reject();
            return Err(reason.into());
        }

        let (order, trades, events) = {
            let mut core = self.core.lock().await;

            let sequence = core.next_seq();
            let mut order = Order::from_request(request, sequence, now_nanos());

            let mut events = Vec::with_capacity(4);
            events.push(EngineEvent::OrderAdmitted(order.clone()));

            let EngineCore {
                book,
                executor,
                next_sequence,
                ..
            } = &mut *core;

            let mut ctx = MatchContext {
                book,
                executor,
                next_sequence,
                now: order.accepted_at,
            };
            let result = match_order(&mut ctx, &mut order);
            events.extend(result.events);

            // Terminal record for the taker: marketable orders always
            // close here, limit orders only when fully filled
            if order.order_type.is_marketable() || order.status == OrderStatus::Filled {
                let sequence = core.next_seq();
                events.push(EngineEvent::OrderStatusChanged {
                    sequence,
                    order_id: order.order_id,
                    status: order.status,
                    filled_quantity: order.filled_quantity,
                    timestamp: order.accepted_at,
                });
            }

            if !result.trades.is_empty() || !order.status.is_terminal() {
                self.md_dirty.store(true, Ordering::Release);
            }

            for trade in &result.trades {
                if core.trade_history.len() >= self.config.trade_history_cap {
                    core.trade_history.pop_front();
                }
                core.trade_history.push_back(trade.clone());
            }

            if core.book.is_crossed() {
                self.halt();
                error!(
                    symbol = %self.symbol,
                    "book crossed after matching; halting ingress for symbol"
                );
            }

            (order, result.trades, events)
        };

        self.persist_events(events).await;

        for trade in &trades {
            self.broadcast.publish_trade(TradeRecord::from(trade));
        }

        self.metrics.record_accept();
        self.metrics.record_trades(trades.len() as u64);
        self.metrics.record_submit_latency(started.elapsed());

        Ok(SubmitReport { order, trades })
    }

    /// Cancel a resting order under the symbol lock
    pub async fn cancel(&self, order_id: &OrderId) -> Result<Order, CancelError> {
        let (order, event) = {
            let mut core = self.core.lock().await;
            match core.book.cancel(order_id) {
                Some(order) => {
                    let sequence = core.next_seq();
                    self.md_dirty.store(true, Ordering::Release);
                    let event = EngineEvent::OrderCancelled {
                        sequence,
                        order_id: order.order_id,
                        timestamp: now_nanos(),
                    };
                    (order, event)
                }
                None => {
                    return Err(CancelError::UnknownOrder {
                        order_id: order_id.to_string(),
                    })
                }
            }
        };

        self.persist_events(vec![event]).await;
        self.metrics.record_cancel();
        Ok(order)
    }

    /// Enqueue events for the batched journal writer
    ///
    /// Fast path is non-blocking. When the queue is full the lag counter
    /// is bumped and the submitter waits for capacity: durable records
    /// are never dropped silently, and matching has already completed.
    async fn persist_events(&self, events: Vec<EngineEvent>) {
        for event in events {
            match self.persist_tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(event)) => {
                    self.metrics.record_persistence_lag();
                    warn!(symbol = %self.symbol, "persistence queue full, applying backpressure");
                    if self.persist_tx.send(event).await.is_err() {
                        self.metrics.record_persistence_failure();
                        error!(symbol = %self.symbol, "persistence channel closed");
                        return;
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    self.metrics.record_persistence_failure();
                    error!(symbol = %self.symbol, "persistence channel closed");
                    return;
                }
            }
        }
    }

    /// Current best bid/offer
    pub async fn bbo(&self) -> Bbo {
        self.core.lock().await.book.bbo()
    }

    /// Aggregated depth, default levels when None
    pub async fn depth(&self, levels: Option<usize>) -> DepthView {
        let levels = levels.unwrap_or(self.config.depth_levels_default);
        self.core.lock().await.book.depth(levels)
    }

    /// Recent trades, newest last
    pub async fn recent_trades(&self, limit: usize) -> Vec<Trade> {
        let core = self.core.lock().await;
        core.trade_history
            .iter()
            .rev()
            .take(limit)
            .rev()
            .cloned()
            .collect()
    }

    /// Consume the dirty flag
    pub fn take_dirty(&self) -> bool {
        self.md_dirty.swap(false, Ordering::AcqRel)
    }

    /// Consistent market-data record: BBO and depth captured under one
    /// lock acquisition
    pub async fn market_data_record(&self) -> MarketDataRecord {
        let (bbo, depth) = {
            let core = self.core.lock().await;
            (
                core.book.bbo(),
                core.book.depth(self.config.depth_levels_default),
            )
        };

        MarketDataRecord {
            symbol: self.symbol.clone(),
            timestamp: now_nanos(),
            bbo: BboView {
                spread: bbo
                    .spread()
                    .and_then(types::numeric::Price::try_new),
                best_bid: bbo.best_bid.map(|(price, quantity)| BboSide { price, quantity }),
                best_ask: bbo.best_ask.map(|(price, quantity)| BboSide { price, quantity }),
            },
            depth: DepthLevels {
                bids: depth
                    .bids
                    .into_iter()
                    .map(|(price, quantity)| LevelView(price, quantity))
                    .collect(),
                asks: depth
                    .asks
                    .into_iter()
                    .map(|(price, quantity)| LevelView(price, quantity))
                    .collect(),
            },
        }
    }

    /// Capture the resting set at the current sequence
    pub async fn book_snapshot(&self) -> BookSnapshot {
        let core = self.core.lock().await;
        core.book.snapshot(core.next_sequence - 1, now_nanos())
    }
}

/// Publisher task: samples the dirty flag outside the lock on each tick
/// and queues one consistent market-data record when the book changed
pub fn spawn_market_data_publisher(
    engine: Arc<SymbolEngine>,
    interval_ms: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(symbol = %engine.symbol(), "market data publisher started");
        loop {
            ticker.tick().await;
            if engine.take_dirty() {
                let record = engine.market_data_record().await;
                engine.broadcast.publish_market_data(record);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::{Price, Quantity};
    use types::order::{OrderType, Side};

    fn engine() -> (Arc<SymbolEngine>, mpsc::Receiver<EngineEvent>) {
        let config = Arc::new(EngineConfig::default());
        let (tx, rx) = mpsc::channel(1024);
        let broadcast = BroadcastAggregator::new(5, 16);
        let symbol = Symbol::new("BTC-USDT");
        let engine = SymbolEngine::new(
            symbol.clone(),
            config,
            OrderBook::new(symbol),
            1,
            tx,
            broadcast,
        );
        (engine, rx)
    }

    fn request(side: Side, order_type: OrderType, price: Option<u64>, qty: &str) -> OrderRequest {
        OrderRequest {
            symbol: Symbol::new("BTC-USDT"),
            side,
            order_type,
            price: price.map(Price::from_u64),
            quantity: Quantity::from_str(qty).unwrap(),
            user_id: None,
            client_order_id: None,
        }
    }

    #[tokio::test]
    async fn test_submit_resting_then_match() {
        let (engine, mut rx) = engine();

        let sell = engine
            .submit(request(Side::Sell, OrderType::Limit, Some(50000), "1.0"))
            .await
            .unwrap();
        assert_eq!(sell.order.status, OrderStatus::Pending);
        assert!(sell.trades.is_empty());

        let buy = engine
            .submit(request(Side::Buy, OrderType::Limit, Some(50000), "1.0"))
            .await
            .unwrap();
        assert_eq!(buy.order.status, OrderStatus::Filled);
        assert_eq!(buy.trades.len(), 1);
        assert_eq!(buy.trades[0].price, Price::from_u64(50000));
        assert_eq!(buy.trades[0].maker_order_id, sell.order.order_id);

        // Journal stream: admit(sell), admit(buy), trade, maker status, taker status
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.event_type());
        }
        assert_eq!(
            kinds,
            vec![
                "order_admitted",
                "order_admitted",
                "trade_executed",
                "order_status_changed",
                "order_status_changed",
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_order_not_journaled() {
        let (engine, mut rx) = engine();

        let result = engine
            .submit(request(Side::Buy, OrderType::Limit, None, "1.0"))
            .await;
        assert!(matches!(result, Err(SubmitError::Rejected(_))));
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.metrics().snapshot().orders_rejected, 1);
    }

    #[tokio::test]
    async fn test_cancel_then_no_match() {
        let (engine, _rx) = engine();

        let buy = engine
            .submit(request(Side::Buy, OrderType::Limit, Some(50), "1.0"))
            .await
            .unwrap();
        let cancelled = engine.cancel(&buy.order.order_id).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let sell = engine
            .submit(request(Side::Sell, OrderType::Limit, Some(50), "1.0"))
            .await
            .unwrap();
        assert!(sell.trades.is_empty());
        assert_eq!(sell.order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let (engine, _rx) = engine();
        let result = engine.cancel(&OrderId::new()).await;
        assert!(matches!(result, Err(CancelError::UnknownOrder { .. })));
    }

    #[tokio::test]
    async fn test_dirty_flag_lifecycle() {
        let (engine, _rx) = engine();
        assert!(!engine.take_dirty());

        engine
            .submit(request(Side::Buy, OrderType::Limit, Some(50), "1.0"))
            .await
            .unwrap();
        assert!(engine.take_dirty());
        assert!(!engine.take_dirty());

        // FOK that cannot fill leaves the book untouched
        engine
            .submit(request(Side::Sell, OrderType::Fok, Some(100), "5.0"))
            .await
            .unwrap();
        assert!(!engine.take_dirty());
    }

    #[tokio::test]
    async fn test_market_data_record_consistency() {
        let (engine, _rx) = engine();
        engine
            .submit(request(Side::Buy, OrderType::Limit, Some(50), "1.0"))
            .await
            .unwrap();
        engine
            .submit(request(Side::Sell, OrderType::Limit, Some(60), "2.0"))
            .await
            .unwrap();

        let record = engine.market_data_record().await;
        assert_eq!(record.bbo.best_bid.as_ref().unwrap().price, Price::from_u64(50));
        assert_eq!(record.bbo.best_ask.as_ref().unwrap().price, Price::from_u64(60));
        assert_eq!(record.bbo.spread.unwrap(), Price::from_u64(10));
        assert_eq!(record.depth.bids.len(), 1);
        assert_eq!(record.depth.asks.len(), 1);
    }

    #[tokio::test]
    async fn test_halted_engine_rejects() {
        let (engine, _rx) = engine();
        engine.halt();
        let result = engine
            .submit(request(Side::Buy, OrderType::Limit, Some(50), "1.0"))
            .await;
        assert!(matches!(result, Err(SubmitError::Halted { .. })));
    }

    #[tokio::test]
    async fn test_trade_history_ring() {
        let (engine, _rx) = engine();

        for _ in 0..3 {
            engine
                .submit(request(Side::Sell, OrderType::Limit, Some(100), "1.0"))
                .await
                .unwrap();
            engine
                .submit(request(Side::Buy, OrderType::Limit, Some(100), "1.0"))
                .await
                .unwrap();
        }

        let trades = engine.recent_trades(10).await;
        assert_eq!(trades.len(), 3);
        // Newest last, sequences ascending
        assert!(trades.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }
}
