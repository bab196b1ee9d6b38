use rust_decimal::Decimal;
use serde::Serialize;

use estimo_core::config::LoadOptions;
use estimo_core::domain::quote::QuoteStatus;
use estimo_core::errors::ApplicationError;
use estimo_db::{QuotePage, QuoteQuery, QuoteRepository, SqlQuoteRepository};

use crate::commands::{build_runtime, load_config, open_store, CommandResult};

#[derive(Debug, Serialize)]
struct QuoteSummary {
    id: String,
    number: String,
    date: String,
    client: String,
    status: &'static str,
    total: Decimal,
}

#[derive(Debug, Serialize)]
struct ListView {
    total: u64,
    page: u32,
    total_pages: u32,
    quotes: Vec<QuoteSummary>,
}

impl From<QuotePage> for ListView {
    fn from(page: QuotePage) -> Self {
        let quotes = page
            .items
            .iter()
            .map(|quote| QuoteSummary {
                id: quote.id.as_ref().map(|id| id.0.clone()).unwrap_or_default(),
                number: quote.number.as_ref().map(|number| number.0.clone()).unwrap_or_default(),
                date: quote.date.to_string(),
                client: quote.client.name.clone(),
                status: quote.status().as_str(),
                total: quote.totals().total,
            })
            .collect();
        Self { total: page.total, page: page.page, total_pages: page.total_pages, quotes }
    }
}

pub fn run(
    search: Option<String>,
    status: Option<String>,
    page: u32,
    limit: u32,
    options: LoadOptions,
) -> CommandResult {
    let config = match load_config("list", options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let status = match status.as_deref().map(|value| (value, QuoteStatus::parse(value))) {
        None => None,
        Some((_, Some(status))) => Some(status),
        Some((value, None)) => {
            return CommandResult::failure(
                "list",
                "invalid_input",
                format!(
                    "unknown status `{value}` (expected pending|approved|rejected|negotiating)"
                ),
                2,
            );
        }
    };

    let runtime = match build_runtime("list") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let query = QuoteQuery { search, status, page, limit };
    let result = runtime.block_on(async {
        let pool = open_store(&config).await?;
        let page = SqlQuoteRepository::new(pool.clone())
            .list(query)
            .await
            .map_err(|error| ("persistence", ApplicationError::from(error).to_string(), 7u8))?;
        pool.close().await;
        Ok::<QuotePage, (&'static str, String, u8)>(page)
    });

    match result {
        Ok(page) => {
            let view = ListView::from(page);
            let message =
                format!("{} quote(s), page {} of {}", view.total, view.page, view.total_pages);
            CommandResult::success_with_data("list", message, view)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("list", error_class, message, exit_code)
        }
    }
}
