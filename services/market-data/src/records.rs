//! Egress record types
//!
//! Wire shapes for the public streams. All numeric fields serialize as
//! strings so clients never see binary floating-point artifacts.

use serde::{Deserialize, Serialize};
use types::ids::{OrderId, Symbol, TradeId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::trade::Trade;

/// One aggregated price level as a [price, quantity] pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelView(pub Price, pub Quantity);

/// One side of the BBO
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BboSide {
    pub price: Price,
    pub quantity: Quantity,
}

/// Best bid/offer with spread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BboView {
    pub best_bid: Option<BboSide>,
    pub best_ask: Option<BboSide>,
    pub spread: Option<Price>,
}

/// Aggregated depth, best-first per side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLevels {
    pub bids: Vec<LevelView>,
    pub asks: Vec<LevelView>,
}

/// Public trade stream record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: Symbol,
    pub trade_id: TradeId,
    pub price: Price,
    pub quantity: Quantity,
    pub aggressor_side: Side,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub timestamp: i64,
}

impl From<&Trade> for TradeRecord {
    fn from(trade: &Trade) -> Self {
        Self {
            symbol: trade.symbol.clone(),
            trade_id: trade.trade_id,
            price: trade.price,
            quantity: trade.quantity,
            aggressor_side: trade.aggressor_side,
            maker_order_id: trade.maker_order_id,
            taker_order_id: trade.taker_order_id,
            timestamp: trade.executed_at,
        }
    }
}

/// Market-data stream record: consistent BBO + depth at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataRecord {
    pub symbol: Symbol,
    pub timestamp: i64,
    pub bbo: BboView,
    pub depth: DepthLevels,
}

/// Tagged union of everything a subscriber can receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundRecord {
    Trade(TradeRecord),
    MarketData(MarketDataRecord),
}

impl OutboundRecord {
    pub fn symbol(&self) -> &Symbol {
        match self {
            OutboundRecord::Trade(record) => &record.symbol,
            OutboundRecord::MarketData(record) => &record.symbol,
        }
    }
}
