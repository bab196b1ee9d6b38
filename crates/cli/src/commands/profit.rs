use std::path::Path;

use serde::Serialize;

use estimo_core::config::LoadOptions;
use estimo_core::pricing::InternalEvaluation;

use crate::commands::{load_config, read_quote, CommandResult};

#[derive(Debug, Serialize)]
struct ProfitView {
    currency: String,
    #[serde(flatten)]
    evaluation: InternalEvaluation,
}

/// Owner-only view: totals plus cost, profit and margin.
pub fn run(path: &Path, options: LoadOptions) -> CommandResult {
    let config = match load_config("profit", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let quote = match read_quote("profit", path) {
        Ok(quote) => quote,
        Err(result) => return result,
    };

    let evaluation = quote.internal_evaluation();
    let message = format!(
        "net profit {} {} ({}% margin)",
        config.quoting.currency, evaluation.profit.net_profit, evaluation.profit.margin_percent
    );
    CommandResult::success_with_data(
        "profit",
        message,
        ProfitView { currency: config.quoting.currency, evaluation },
    )
}
