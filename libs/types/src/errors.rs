//! Error taxonomy for the matching engine
//!
//! Rejections carry a machine-readable reason that is echoed back on the
//! wire; operational errors are separate enums per concern.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an order failed validation or admission
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("unknown symbol")]
    UnknownSymbol,

    #[error("symbol does not match engine")]
    SymbolMismatch,

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("quantity exceeds configured maximum")]
    QuantityAboveLimit,

    #[error("price required for limit orders")]
    MissingPrice,

    #[error("price must be positive")]
    InvalidPrice,

    #[error("price exceeds configured maximum")]
    PriceAboveLimit,

    #[error("duplicate order id")]
    DuplicateOrderId,

    #[error("unsupported order type")]
    UnsupportedOrderType,
}

/// Order submission failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("order rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("ingress halted for symbol {symbol}")]
    Halted { symbol: String },
}

/// Cancellation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    #[error("unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("order not found: {order_id}")]
    UnknownOrder { order_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(
            RejectReason::MissingPrice.to_string(),
            "price required for limit orders"
        );
    }

    #[test]
    fn test_reject_reason_wire_format() {
        let json = serde_json::to_string(&RejectReason::QuantityAboveLimit).unwrap();
        assert_eq!(json, "\"quantity_above_limit\"");
    }

    #[test]
    fn test_submit_error_from_reason() {
        let err: SubmitError = RejectReason::InvalidPrice.into();
        assert!(matches!(err, SubmitError::Rejected(RejectReason::InvalidPrice)));
    }
}
