//! Ingress dispatch
//!
//! Parses raw JSON off the transport, routes typed requests to the
//! symbol engines, and builds egress responses. Parsing and response
//! serialization happen out here, never under a symbol lock.

use std::str::FromStr;
use std::sync::Arc;

use market_data::records::MarketDataRecord;
use market_data::{BroadcastAggregator, SubscriberHandle, SubscriptionSpec};
use matching_engine::metrics::MetricsSnapshot;
use matching_engine::{Bbo, DepthView, EngineRouter};
use persistence::worker::WorkerHealth;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use types::config::EngineConfig;
use types::errors::{RejectReason, SubmitError};
use types::ids::Symbol;
use types::numeric::{Price, Quantity};
use types::order::{OrderRequest, OrderType};

use crate::models::{
    CancelMessage, CancelResponse, EgressMessage, ErrorMessage, IngressMessage, OrderMessage,
    OrderResponse, SubscribeMessage, SubscribeResponse,
};

/// Aggregated metrics for the query surface
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub engines: BTreeMap<String, MetricsSnapshot>,
    pub persistence: PersistenceHealthView,
}

/// Persistence pipeline health
#[derive(Debug, Clone, Serialize)]
pub struct PersistenceHealthView {
    pub events_written: u64,
    pub batches_committed: u64,
    pub write_failures: u64,
    pub health_degraded: bool,
}

/// Routes parsed ingress messages to engines and streams
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<EngineRouter>,
    aggregator: Arc<BroadcastAggregator>,
    config: Arc<EngineConfig>,
    health: Arc<WorkerHealth>,
}

impl Dispatcher {
    pub fn new(
        router: Arc<EngineRouter>,
        aggregator: Arc<BroadcastAggregator>,
        config: Arc<EngineConfig>,
        health: Arc<WorkerHealth>,
    ) -> Self {
        Self {
            router,
            aggregator,
            config,
            health,
        }
    }

    /// Handle one raw request message (order or cancel)
    ///
    /// Subscriptions go through [`Dispatcher::subscribe`], which hands
    /// the transport the stream receiver.
    pub async fn handle_raw(&self, raw: &str) -> EgressMessage {
        match serde_json::from_str::<IngressMessage>(raw) {
            Ok(IngressMessage::Order(message)) => self.handle_order(message).await,
            Ok(IngressMessage::Cancel(message)) => self.handle_cancel(message).await,
            Ok(IngressMessage::Subscribe(_)) => EgressMessage::Error(ErrorMessage {
                message: "subscribe must be sent on a streaming connection".to_string(),
            }),
            Err(e) => EgressMessage::Error(ErrorMessage {
                message: format!("malformed message: {}", e),
            }),
        }
    }

    /// Order submission: wire parse → validate → match → respond
    pub async fn handle_order(&self, message: OrderMessage) -> EgressMessage {
        let client_order_id = message.client_order_id.clone();

        // Quantity parses first so rejections can echo it back
        let quantity = match parse_quantity(&message.quantity) {
            Ok(quantity) => quantity,
            Err(reason) => {
                return EgressMessage::OrderResponse(OrderResponse::rejected(
                    reason,
                    client_order_id,
                    Quantity::zero(),
                ))
            }
        };

        let request = match build_request(message, quantity) {
            Ok(request) => request,
            Err(reason) => {
                return EgressMessage::OrderResponse(OrderResponse::rejected(
                    reason,
                    client_order_id,
                    quantity,
                ))
            }
        };

        match self.router.submit(request).await {
            Ok(report) => {
                EgressMessage::OrderResponse(OrderResponse::accepted(&report.order, &report.trades))
            }
            Err(SubmitError::Rejected(reason)) => EgressMessage::OrderResponse(
                OrderResponse::rejected(reason, client_order_id, quantity),
            ),
            Err(SubmitError::Halted { symbol }) => EgressMessage::Error(ErrorMessage {
                message: format!("ingress halted for symbol {}", symbol),
            }),
        }
    }

    /// Cancellation: idempotent, reports failure reason on the wire
    pub async fn handle_cancel(&self, message: CancelMessage) -> EgressMessage {
        match self.router.cancel(&message.symbol, &message.order_id).await {
            Ok(order) => EgressMessage::CancelResponse(CancelResponse {
                success: true,
                order_id: Some(order.order_id),
                reason: None,
            }),
            Err(e) => EgressMessage::CancelResponse(CancelResponse {
                success: false,
                order_id: Some(message.order_id),
                reason: Some(e.to_string()),
            }),
        }
    }

    /// Subscription: register with the aggregator, priming the current
    /// BBO/depth snapshot for each known symbol
    pub async fn subscribe(
        &self,
        message: SubscribeMessage,
    ) -> (EgressMessage, Option<SubscriberHandle>) {
        let known: Vec<String> = message
            .symbols
            .iter()
            .filter(|symbol| self.router.get(symbol).is_some())
            .cloned()
            .collect();

        if known.is_empty() {
            return (
                EgressMessage::Error(ErrorMessage {
                    message: "no known symbols in subscription".to_string(),
                }),
                None,
            );
        }

        let mut snapshots: Vec<MarketDataRecord> = Vec::with_capacity(known.len());
        for symbol in &known {
            if let Some(engine) = self.router.get(symbol) {
                snapshots.push(engine.market_data_record().await);
            }
        }

        let spec = SubscriptionSpec {
            symbols: known.clone(),
            trades: message.trades,
            market_data: message.market_data,
        };
        let handle = self.aggregator.subscribe(spec, snapshots);

        (
            EgressMessage::SubscribeResponse(SubscribeResponse {
                success: true,
                symbols: known,
                trades: message.trades,
                market_data: message.market_data,
            }),
            Some(handle),
        )
    }

    /// Read-only query: best bid/offer for a symbol
    pub async fn get_bbo(&self, symbol: &str) -> Option<Bbo> {
        let engine = self.router.get(symbol)?;
        Some(engine.bbo().await)
    }

    /// Read-only query: aggregated depth (default levels when None)
    pub async fn get_orderbook(&self, symbol: &str, depth: Option<usize>) -> Option<DepthView> {
        let engine = self.router.get(symbol)?;
        Some(engine.depth(depth).await)
    }

    /// Read-only query: per-engine metrics plus persistence health
    pub fn get_metrics(&self) -> MetricsReport {
        MetricsReport {
            engines: self.router.metrics().into_iter().collect(),
            persistence: PersistenceHealthView {
                events_written: self.health.events_written(),
                batches_committed: self.health.batches_committed(),
                write_failures: self.health.write_failures(),
                health_degraded: self.health.is_degraded(),
            },
        }
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }
}

fn parse_quantity(raw: &str) -> Result<Quantity, RejectReason> {
    let decimal = Decimal::from_str(raw).map_err(|_| RejectReason::InvalidQuantity)?;
    Quantity::try_new(decimal).ok_or(RejectReason::InvalidQuantity)
}

fn build_request(message: OrderMessage, quantity: Quantity) -> Result<OrderRequest, RejectReason> {
    let symbol = Symbol::try_new(message.symbol).ok_or(RejectReason::UnknownSymbol)?;
    let order_type =
        OrderType::parse(&message.order_type).ok_or(RejectReason::UnsupportedOrderType)?;

    let price = match message.price {
        Some(raw) => {
            let decimal = Decimal::from_str(&raw).map_err(|_| RejectReason::InvalidPrice)?;
            Some(Price::try_new(decimal).ok_or(RejectReason::InvalidPrice)?)
        }
        None => None,
    };

    Ok(OrderRequest {
        symbol,
        side: message.side,
        order_type,
        price,
        quantity,
        user_id: message.user_id,
        client_order_id: message.client_order_id,
    })
}
