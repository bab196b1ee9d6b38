use std::path::Path;

use rust_decimal::Decimal;
use serde::Serialize;

use estimo_core::config::LoadOptions;
use estimo_core::pricing::totals::{DeterministicPricingEngine, PricingEngine};

use crate::commands::{load_config, read_quote, CommandResult};

#[derive(Debug, Serialize)]
struct TotalsView {
    currency: String,
    item_count: usize,
    subtotal: Decimal,
    discount: Decimal,
    discount_percent: Decimal,
    total: Decimal,
}

pub fn run(path: &Path, options: LoadOptions) -> CommandResult {
    let config = match load_config("totals", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let quote = match read_quote("totals", path) {
        Ok(quote) => quote,
        Err(result) => return result,
    };

    let totals = DeterministicPricingEngine.price(&quote);
    let view = TotalsView {
        currency: config.quoting.currency,
        item_count: quote.items().len(),
        subtotal: totals.subtotal,
        discount: totals.discount,
        discount_percent: quote.discount_percent(),
        total: totals.total,
    };

    tracing::debug!(event_name = "cli.totals.computed", total = %view.total, "totals computed");
    let message = format!("total {} {}", view.currency, view.total);
    CommandResult::success_with_data("totals", message, view)
}
