//! Price validation functions

use rust_decimal::prelude::*;
use crate::{
    errors::{BotError, BotResult},
    types::PriceQuote,
};

pub fn validate_price(quote: &PriceQuote) -> BotResult<()> {
    let reject = |reason: &str| {
        Err(BotError::PriceValidation {
            source_name: quote.source.clone(),
            price: quote.price,
            reason: format!("{} at {}", reason, quote.venue_key()),
        })
    };

    if quote.price <= Decimal::ZERO {
        return reject("price is zero or negative");
    }
    if quote.liquidity_usd <= Decimal::ZERO {
        return reject("no reported liquidity");
    }
    Ok(())
}
