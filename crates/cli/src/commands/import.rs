use std::path::Path;

use chrono::Duration;
use serde::Serialize;

use estimo_core::config::{LoadOptions, QuotingConfig};
use estimo_core::domain::quote::Quote;
use estimo_core::errors::ApplicationError;
use estimo_db::{QuoteRepository, SqlQuoteRepository};

use crate::commands::{build_runtime, load_config, open_store, read_quote, CommandResult};

#[derive(Debug, Serialize)]
struct ImportView {
    id: String,
    number: String,
    version: u32,
    status: &'static str,
}

fn apply_defaults(quote: &mut Quote, quoting: &QuotingConfig) {
    if quote.notes.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        quote.notes = Some(quoting.default_notes.clone());
    }
    if quote.due_date.is_none() {
        quote.due_date = Some(quote.date + Duration::days(i64::from(quoting.validity_days)));
    }
}

pub fn run(path: &Path, options: LoadOptions) -> CommandResult {
    let config = match load_config("import", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let mut quote = match read_quote("import", path) {
        Ok(quote) => quote,
        Err(result) => return result,
    };
    apply_defaults(&mut quote, &config.quoting);

    let runtime = match build_runtime("import") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_store(&config).await?;
        let repository =
            SqlQuoteRepository::new(pool.clone()).with_number_prefix(&config.quoting.number_prefix);
        let saved = repository
            .save(quote)
            .await
            .map_err(|error| ("persistence", ApplicationError::from(error).to_string(), 7u8))?;
        pool.close().await;
        Ok::<Quote, (&'static str, String, u8)>(saved)
    });

    match result {
        Ok(saved) => {
            let status = saved.status().as_str();
            let view = ImportView {
                id: saved.id.map(|id| id.0).unwrap_or_default(),
                number: saved.number.map(|number| number.0).unwrap_or_default(),
                version: saved.version,
                status,
            };
            tracing::info!(
                event_name = "cli.import.saved",
                quote_id = %view.id,
                quote_number = %view.number,
                "quote imported"
            );
            CommandResult::success_with_data(
                "import",
                format!("saved quote {} as {}", view.id, view.number),
                view,
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("import", error_class, message, exit_code)
        }
    }
}
