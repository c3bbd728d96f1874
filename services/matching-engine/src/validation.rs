//! Order validation
//!
//! Runs before the symbol lock is taken; a rejected order touches no
//! engine state and is never journaled.

use rust_decimal::Decimal;
use types::config::EngineConfig;
use types::errors::RejectReason;
use types::ids::Symbol;
use types::order::{OrderRequest, OrderType};

/// Validate an admission request against the engine's symbol and bounds
///
/// A market order carrying a price is accepted with the price cleared,
/// not rejected.
pub fn validate(
    request: &mut OrderRequest,
    engine_symbol: &Symbol,
    config: &EngineConfig,
) -> Result<(), RejectReason> {
    if request.symbol != *engine_symbol {
        return Err(RejectReason::SymbolMismatch);
    }

    let quantity = request.quantity.as_decimal();
    if quantity <= Decimal::ZERO {
        return Err(RejectReason::InvalidQuantity);
    }
    if quantity > config.max_order_quantity {
        return Err(RejectReason::QuantityAboveLimit);
    }

    if request.order_type == OrderType::Market {
        request.price = None;
    }
    if request.order_type == OrderType::Limit && request.price.is_none() {
        return Err(RejectReason::MissingPrice);
    }

    if let Some(price) = request.price {
        if price.as_decimal() > config.max_order_price {
            return Err(RejectReason::PriceAboveLimit);
        }
    }

    Ok(())
}
