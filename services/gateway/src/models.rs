//! Canonical JSON wire schema
//!
//! Ingress messages are tagged by `type`; numeric fields travel as
//! strings end to end. `order_type` stays a raw string on ingress so an
//! unrecognized value produces a REJECTED response instead of a parse
//! error.

use serde::{Deserialize, Serialize};
use types::errors::RejectReason;
use types::ids::{OrderId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side};
use types::trade::Trade;

fn default_true() -> bool {
    true
}

/// Inbound client message
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IngressMessage {
    Order(OrderMessage),
    Cancel(CancelMessage),
    Subscribe(SubscribeMessage),
}

/// Order submission
#[derive(Debug, Clone, Deserialize)]
pub struct OrderMessage {
    pub symbol: String,
    pub side: Side,
    pub order_type: String,
    #[serde(default)]
    pub price: Option<String>,
    pub quantity: String,
    #[serde(default)]
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Order cancellation
#[derive(Debug, Clone, Deserialize)]
pub struct CancelMessage {
    pub symbol: String,
    pub order_id: OrderId,
}

/// Stream subscription
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeMessage {
    pub symbols: Vec<String>,
    #[serde(default = "default_true")]
    pub trades: bool,
    #[serde(default = "default_true")]
    pub market_data: bool,
}

/// Outbound response
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EgressMessage {
    OrderResponse(OrderResponse),
    CancelResponse(CancelResponse),
    SubscribeResponse(SubscribeResponse),
    Error(ErrorMessage),
}

/// One fill within an order response
#[derive(Debug, Clone, Serialize)]
pub struct FillView {
    pub trade_id: TradeId,
    pub price: Price,
    pub quantity: Quantity,
    /// Taker-side fee for this fill, as an exact decimal string
    pub fee: String,
}

impl From<&Trade> for FillView {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.trade_id,
            price: trade.price,
            quantity: trade.quantity,
            fee: trade.taker_fee.to_string(),
        }
    }
}

/// Response to an order submission
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    pub status: OrderStatus,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    pub trades: Vec<FillView>,
}

impl OrderResponse {
    /// Successful submission from the engine's report
    pub fn accepted(order: &Order, trades: &[Trade]) -> Self {
        Self {
            success: true,
            order_id: Some(order.order_id),
            client_order_id: order.client_order_id.clone(),
            status: order.status,
            filled_quantity: order.filled_quantity,
            remaining_quantity: order.remaining_quantity(),
            reason: None,
            trades: trades.iter().map(FillView::from).collect(),
        }
    }

    /// Rejection carrying the original request's echo fields
    pub fn rejected(reason: RejectReason, client_order_id: Option<String>, quantity: Quantity) -> Self {
        Self {
            success: false,
            order_id: None,
            client_order_id,
            status: OrderStatus::Rejected,
            filled_quantity: Quantity::zero(),
            remaining_quantity: quantity,
            reason: Some(reason),
            trades: Vec::new(),
        }
    }
}

/// Response to a cancellation
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response to a subscription request
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub symbols: Vec<String>,
    pub trades: bool,
    pub market_data: bool,
}

/// Generic error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}
