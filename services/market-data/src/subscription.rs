//! Subscriber registry
//!
//! A subscriber declares symbols and which streams it wants; the registry
//! keeps a per-symbol list of subscriber entries sharing one bounded
//! outbound channel per subscriber. Slow consumers are disconnected so
//! one lagging client can never delay the rest.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::warn;

pub type SubscriberId = u64;

/// Which streams a subscriber receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    pub symbols: Vec<String>,
    pub trades: bool,
    pub market_data: bool,
}

/// Stream discriminator used when fanning out a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Trades,
    MarketData,
}

/// Handle returned to the transport layer
///
/// Dropping the receiver disconnects the subscriber; the registry prunes
/// it on the next send attempt.
pub struct SubscriberHandle {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Subscriber {
    pub id: SubscriberId,
    pub trades: bool,
    pub market_data: bool,
    pub tx: mpsc::Sender<String>,
}

impl Subscriber {
    fn wants(&self, stream: StreamKind) -> bool {
        match stream {
            StreamKind::Trades => self.trades,
            StreamKind::MarketData => self.market_data,
        }
    }
}

/// Per-symbol subscriber lists
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    by_symbol: DashMap<String, Vec<Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber across all requested symbols
    ///
    /// Returns the handle plus a sender for priming the initial snapshot.
    pub(crate) fn register(
        &self,
        spec: &SubscriptionSpec,
        capacity: usize,
    ) -> (SubscriberHandle, mpsc::Sender<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let subscriber = Subscriber {
            id,
            trades: spec.trades,
            market_data: spec.market_data,
            tx: tx.clone(),
        };
        for symbol in &spec.symbols {
            self.by_symbol
                .entry(symbol.clone())
                .or_default()
                .push(subscriber.clone());
        }

        (SubscriberHandle { id, receiver: rx }, tx)
    }

    /// Remove a subscriber from every symbol list
    pub fn remove(&self, id: SubscriberId) {
        for mut entry in self.by_symbol.iter_mut() {
            entry.value_mut().retain(|sub| sub.id != id);
        }
    }

    /// Number of subscribers attached to a symbol
    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.by_symbol
            .get(symbol)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Send one serialized payload to every matching subscriber
    ///
    /// Each send is independent: a full or closed channel drops only that
    /// subscriber. Returns the number of successful sends.
    pub(crate) fn fan_out(&self, symbol: &str, payload: &str, stream: StreamKind) -> usize {
        let Some(mut subscribers) = self.by_symbol.get_mut(symbol) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dropped: Vec<SubscriberId> = Vec::new();

        for subscriber in subscribers.iter() {
            if !subscriber.wants(stream) {
                continue;
            }
            match subscriber.tx.try_send(payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    warn!(
                        symbol,
                        subscriber = subscriber.id,
                        "dropping lagging subscriber"
                    );
                    dropped.push(subscriber.id);
                }
            }
        }

        if !dropped.is_empty() {
            subscribers.retain(|sub| !dropped.contains(&sub.id));
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(symbols: &[&str]) -> SubscriptionSpec {
        SubscriptionSpec {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            trades: true,
            market_data: true,
        }
    }

    #[tokio::test]
    async fn test_register_and_fan_out() {
        let registry = SubscriberRegistry::new();
        let (mut handle, _tx) = registry.register(&spec(&["BTC-USDT"]), 8);

        assert_eq!(registry.subscriber_count("BTC-USDT"), 1);
        assert_eq!(registry.fan_out("BTC-USDT", "payload", StreamKind::Trades), 1);
        assert_eq!(handle.receiver.recv().await.unwrap(), "payload");
    }

    #[tokio::test]
    async fn test_stream_filtering() {
        let registry = SubscriberRegistry::new();
        let mut trades_only = spec(&["BTC-USDT"]);
        trades_only.market_data = false;
        let (_handle, _tx) = registry.register(&trades_only, 8);

        assert_eq!(registry.fan_out("BTC-USDT", "md", StreamKind::MarketData), 0);
        assert_eq!(registry.fan_out("BTC-USDT", "trade", StreamKind::Trades), 1);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_is_dropped() {
        let registry = SubscriberRegistry::new();
        let (_handle, _tx) = registry.register(&spec(&["BTC-USDT"]), 1);

        // First send fills the queue; second overflows and drops the client
        assert_eq!(registry.fan_out("BTC-USDT", "a", StreamKind::Trades), 1);
        assert_eq!(registry.fan_out("BTC-USDT", "b", StreamKind::Trades), 0);
        assert_eq!(registry.subscriber_count("BTC-USDT"), 0);
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = SubscriberRegistry::new();
        let (handle, _tx) = registry.register(&spec(&["BTC-USDT", "ETH-USDT"]), 8);

        registry.remove(handle.id);
        assert_eq!(registry.subscriber_count("BTC-USDT"), 0);
        assert_eq!(registry.subscriber_count("ETH-USDT"), 0);
    }
}
