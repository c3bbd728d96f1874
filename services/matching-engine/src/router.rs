//! Symbol router
//!
//! Thin dispatch layer above the per-symbol engines. Stateless except
//! for the symbol → engine map established at startup; no global lock
//! and no cross-symbol ordering.

use std::sync::Arc;

use dashmap::DashMap;
use types::errors::{CancelError, RejectReason, SubmitError};
use types::ids::OrderId;
use types::order::{Order, OrderRequest};

use crate::engine::{SubmitReport, SymbolEngine};
use crate::metrics::MetricsSnapshot;

/// Routes requests to the owning symbol engine
#[derive(Default)]
pub struct EngineRouter {
    engines: DashMap<String, Arc<SymbolEngine>>,
}

impl EngineRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under its symbol
    pub fn insert(&self, engine: Arc<SymbolEngine>) {
        self.engines
            .insert(engine.symbol().as_str().to_string(), engine);
    }

    /// Look up the engine for a symbol
    pub fn get(&self, symbol: &str) -> Option<Arc<SymbolEngine>> {
        self.engines.get(symbol).map(|entry| Arc::clone(&entry))
    }

    /// All registered symbols
    pub fn symbols(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.key().clone()).collect()
    }

    /// All engines
    pub fn engines(&self) -> Vec<Arc<SymbolEngine>> {
        self.engines.iter().map(|e| Arc::clone(e.value())).collect()
    }

    /// Submit an order to its symbol's engine
    pub async fn submit(&self, request: OrderRequest) -> Result<SubmitReport, SubmitError> {
        let engine = self
            .get(request.symbol.as_str())
            .ok_or(SubmitError::Rejected(RejectReason::UnknownSymbol))?;
        engine.submit(request).await
    }

    /// Cancel an order on a symbol's engine
    pub async fn cancel(&self, symbol: &str, order_id: &OrderId) -> Result<Order, CancelError> {
        let engine = self.get(symbol).ok_or(CancelError::UnknownSymbol {
            symbol: symbol.to_string(),
        })?;
        engine.cancel(order_id).await
    }

    /// Per-symbol metrics snapshots, sorted by symbol
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        let mut snapshots: Vec<(String, MetricsSnapshot)> = self
            .engines
            .iter()
            .map(|e| (e.key().clone(), e.value().metrics().snapshot()))
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }
}
