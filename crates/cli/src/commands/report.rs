use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use estimo_core::config::LoadOptions;
use estimo_core::domain::quote::{ItemKind, Quote};
use estimo_core::errors::ApplicationError;
use estimo_core::reporting::{
    growth_percent, quotes_in_period, top_items, ItemRevenue, ReportMetrics, StatusBreakdown,
};
use estimo_db::{QuoteQuery, QuoteRepository, SqlQuoteRepository};

use crate::commands::{build_runtime, load_config, open_store, CommandResult};

const PAGE_SIZE: u32 = 200;
const TOP_ITEMS: usize = 5;

#[derive(Debug, Serialize)]
struct ReportView {
    currency: String,
    /// `None` when the period is open on that side.
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    metrics: ReportMetrics,
    statuses: StatusBreakdown,
    /// Revenue change against the period of equal length right before `from`.
    revenue_growth_percent: Option<Decimal>,
    top_services: Vec<ItemRevenue>,
    top_products: Vec<ItemRevenue>,
}

async fn load_all(repository: &SqlQuoteRepository) -> Result<Vec<Quote>, ApplicationError> {
    let mut quotes = Vec::new();
    let mut page = 1;
    loop {
        let batch = repository.list(QuoteQuery::default().page(page, PAGE_SIZE)).await?;
        let last_page = batch.page >= batch.total_pages;
        quotes.extend(batch.items);
        if last_page {
            return Ok(quotes);
        }
        page += 1;
    }
}

fn build_report(
    quotes: &[Quote],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    currency: String,
) -> ReportView {
    let start = from.unwrap_or(NaiveDate::MIN);
    let end = to.unwrap_or(NaiveDate::MAX);
    let in_period = quotes_in_period(quotes, start, end);
    let metrics = ReportMetrics::from_quotes(in_period.iter().copied());

    let revenue_growth_percent = match (from, to) {
        (Some(from), Some(to)) if from <= to => {
            let previous_end = from.checked_sub_signed(Duration::days(1));
            let previous_start = previous_end.and_then(|end| end.checked_sub_signed(to - from));
            previous_start.zip(previous_end).map(|(previous_start, previous_end)| {
                let previous = quotes_in_period(quotes, previous_start, previous_end);
                let previous_metrics = ReportMetrics::from_quotes(previous.iter().copied());
                growth_percent(metrics.revenue, previous_metrics.revenue)
            })
        }
        _ => None,
    };

    ReportView {
        currency,
        from,
        to,
        statuses: StatusBreakdown::from_quotes(in_period.iter().copied()),
        top_services: top_items(in_period.iter().copied(), ItemKind::Service, TOP_ITEMS),
        top_products: top_items(in_period.iter().copied(), ItemKind::Product, TOP_ITEMS),
        metrics,
        revenue_growth_percent,
    }
}

pub fn run(from: Option<NaiveDate>, to: Option<NaiveDate>, options: LoadOptions) -> CommandResult {
    let config = match load_config("report", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return CommandResult::failure(
                "report",
                "invalid_input",
                format!("--from {from} is after --to {to}"),
                2,
            );
        }
    }

    let runtime = match build_runtime("report") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_store(&config).await?;
        let repository = SqlQuoteRepository::new(pool.clone());
        let quotes = load_all(&repository)
            .await
            .map_err(|error| ("persistence", error.to_string(), 7u8))?;
        pool.close().await;
        Ok::<Vec<Quote>, (&'static str, String, u8)>(quotes)
    });

    match result {
        Ok(quotes) => {
            let view = build_report(&quotes, from, to, config.quoting.currency);
            let message = format!(
                "revenue {} {} across {} approved quote(s)",
                view.currency, view.metrics.revenue, view.metrics.approved_count
            );
            CommandResult::success_with_data("report", message, view)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("report", error_class, message, exit_code)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use estimo_core::domain::quote::{LineItem, Quote};
    use estimo_core::flows::{FlowEngine, QuoteEvent};

    use super::build_report;

    fn approved(day: u32, price: i64) -> Quote {
        let mut quote = Quote::new(NaiveDate::from_ymd_opt(2026, 3, day).expect("date"));
        quote
            .add_item(LineItem::new("a", "Consulting", Decimal::ONE, Decimal::from(price)))
            .expect("add item");
        FlowEngine::new().apply(&mut quote, QuoteEvent::OwnerApproved).expect("approve");
        quote
    }

    #[test]
    fn growth_compares_with_previous_window() {
        let quotes = vec![approved(2, 100), approved(12, 150)];
        let from = NaiveDate::from_ymd_opt(2026, 3, 11);
        let to = NaiveDate::from_ymd_opt(2026, 3, 20);

        let view = build_report(&quotes, from, to, "BRL".to_string());

        assert_eq!(view.metrics.revenue, Decimal::from(150));
        assert_eq!(view.revenue_growth_percent, Some(Decimal::from(50)));
        assert_eq!(view.top_services.len(), 1);
    }

    #[test]
    fn open_period_has_no_growth() {
        let quotes = vec![approved(2, 100)];
        let view = build_report(&quotes, None, None, "BRL".to_string());
        assert_eq!(view.metrics.approved_count, 1);
        assert_eq!(view.revenue_growth_percent, None);

        let json = serde_json::to_value(&view).expect("serialize");
        assert_eq!(json["from"], serde_json::Value::Null);
        assert_eq!(json["to"], serde_json::Value::Null);
    }
}
