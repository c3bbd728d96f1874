//! Market data pipeline
//!
//! Produces the public egress streams: per-trade records and BBO/depth
//! market-data records, coalesced per symbol into one serialized payload
//! per broadcast window and fanned out to subscribers over independent
//! bounded channels.
//!
//! # Architecture
//!
//! ```text
//! engine trades ──▶ ┌────────────────────┐
//!                   │ BroadcastAggregator │ ── window tick ──▶ serialize once
//! publisher ticks ─▶│  (pending/symbol)   │                      │
//!                   └────────────────────┘              fan out per subscriber
//! ```

pub mod broadcast;
pub mod records;
pub mod subscription;

pub use broadcast::BroadcastAggregator;
pub use records::{BboSide, BboView, DepthLevels, LevelView, MarketDataRecord, OutboundRecord, TradeRecord};
pub use subscription::{SubscriberHandle, SubscriberId, SubscriptionSpec};
