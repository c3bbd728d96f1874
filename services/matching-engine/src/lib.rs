//! Per-symbol matching engine
//!
//! Implements the order book, the price-time priority matching algorithms
//! for MARKET / LIMIT / IOC / FOK orders, validation, the per-symbol
//! engine with its locking discipline, and the symbol router.
//!
//! # Architecture
//!
//! ```text
//! ingress ──▶ EngineRouter ──▶ SymbolEngine (one per symbol)
//!                                 │  validate (no lock)
//!                                 │  lock ▶ match ▶ dirty flag ▶ unlock
//!                                 ├──▶ persistence queue (bounded)
//!                                 └──▶ broadcast aggregator
//! ```

pub mod book;
pub mod engine;
pub mod matching;
pub mod metrics;
pub mod orderbook;
pub mod router;
pub mod validation;

pub use engine::{SubmitReport, SymbolEngine};
pub use orderbook::{Bbo, DepthView, OrderBook};
pub use router::EngineRouter;
