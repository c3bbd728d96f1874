//! Windowed broadcast aggregator
//!
//! Records accumulate per symbol inside the current window; every window
//! tick the pending batch for each stream is serialized exactly once and
//! the resulting payload is fanned out to all matching subscribers.
//! Serialization cost is paid once per window per symbol regardless of
//! subscriber count.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::records::{MarketDataRecord, OutboundRecord, TradeRecord};
use crate::subscription::{StreamKind, SubscriberHandle, SubscriberRegistry, SubscriptionSpec};

/// Records queued for the current window, split by stream
#[derive(Debug, Default)]
struct PendingWindow {
    trades: Vec<OutboundRecord>,
    market_data: Vec<OutboundRecord>,
}

/// Coalesces outbound records and fans them out on a fixed window
pub struct BroadcastAggregator {
    registry: SubscriberRegistry,
    pending: DashMap<String, PendingWindow>,
    window: Duration,
    subscriber_capacity: usize,
}

impl BroadcastAggregator {
    pub fn new(window_ms: u64, subscriber_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            registry: SubscriberRegistry::new(),
            pending: DashMap::new(),
            window: Duration::from_millis(window_ms.max(1)),
            subscriber_capacity,
        })
    }

    /// Register a subscriber and prime it with current snapshots
    ///
    /// Each snapshot is delivered immediately, before any windowed
    /// payload, so a new subscriber always starts from a consistent view.
    pub fn subscribe(
        &self,
        spec: SubscriptionSpec,
        snapshots: Vec<MarketDataRecord>,
    ) -> SubscriberHandle {
        let (handle, tx) = self.registry.register(&spec, self.subscriber_capacity);

        if spec.market_data {
            for snapshot in snapshots {
                let record = vec![OutboundRecord::MarketData(snapshot)];
                match serde_json::to_string(&record) {
                    Ok(payload) => {
                        let _ = tx.try_send(payload);
                    }
                    Err(e) => error!(error = %e, "failed to serialize subscription snapshot"),
                }
            }
        }

        handle
    }

    /// Drop a subscriber from every symbol
    pub fn unsubscribe(&self, id: crate::subscription::SubscriberId) {
        self.registry.remove(id);
    }

    /// Queue a trade record for the current window
    pub fn publish_trade(&self, record: TradeRecord) {
        let symbol = record.symbol.as_str().to_string();
        self.pending
            .entry(symbol)
            .or_default()
            .trades
            .push(OutboundRecord::Trade(record));
    }

    /// Queue a market-data record for the current window
    pub fn publish_market_data(&self, record: MarketDataRecord) {
        let symbol = record.symbol.as_str().to_string();
        self.pending
            .entry(symbol)
            .or_default()
            .market_data
            .push(OutboundRecord::MarketData(record));
    }

    /// Drain every symbol's pending window and fan out the payloads
    ///
    /// Public so tests (and shutdown) can force a flush without waiting
    /// for the timer.
    pub fn flush_window(&self) {
        let symbols: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();

        for symbol in symbols {
            let Some((_, window)) = self.pending.remove(&symbol) else {
                continue;
            };

            self.send_batch(&symbol, window.trades, StreamKind::Trades);
            self.send_batch(&symbol, window.market_data, StreamKind::MarketData);
        }
    }

    fn send_batch(&self, symbol: &str, records: Vec<OutboundRecord>, stream: StreamKind) {
        if records.is_empty() {
            return;
        }
        // Serialize once; the same bytes go to every subscriber
        match serde_json::to_string(&records) {
            Ok(payload) => {
                let delivered = self.registry.fan_out(symbol, &payload, stream);
                debug!(symbol, records = records.len(), delivered, "window flushed");
            }
            Err(e) => error!(symbol, error = %e, "failed to serialize broadcast batch"),
        }
    }

    /// Run the window timer until aborted
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.window);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.flush_window();
            }
        })
    }

    /// Number of subscribers attached to a symbol
    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.registry.subscriber_count(symbol)
    }
}
