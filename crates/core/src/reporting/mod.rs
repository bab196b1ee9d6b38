//! Period reports over already-priced quotes.
//!
//! Everything here is a plain fold over `Quote::totals()`; nothing reads
//! storage directly, so callers decide which quotes are in scope.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{ItemKind, Quote, QuoteStatus};
use crate::pricing::discount::{round_money, CENT};

pub const UNNAMED_ITEM: &str = "Unnamed item";

/// Quotes dated within `[start, end]`, both ends inclusive.
pub fn quotes_in_period(quotes: &[Quote], start: NaiveDate, end: NaiveDate) -> Vec<&Quote> {
    quotes.iter().filter(|quote| quote.date >= start && quote.date <= end).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub revenue: Decimal,
    pub pipeline: Decimal,
    pub average_ticket: Decimal,
    pub conversion_percent: Decimal,
    pub approved_count: usize,
}

impl ReportMetrics {
    pub fn from_quotes<'a>(quotes: impl IntoIterator<Item = &'a Quote>) -> Self {
        let mut revenue = Decimal::ZERO;
        let mut pipeline = Decimal::ZERO;
        let mut approved = 0usize;
        let mut rejected = 0usize;

        for quote in quotes {
            match quote.status() {
                QuoteStatus::Approved => {
                    revenue += quote.totals().total;
                    approved += 1;
                }
                QuoteStatus::Pending => pipeline += quote.totals().total,
                QuoteStatus::Rejected => rejected += 1,
                QuoteStatus::Negotiating => {}
            }
        }

        let average_ticket = if approved == 0 {
            Decimal::ZERO
        } else {
            round_money(revenue / Decimal::from(approved))
        };
        let decided = approved + rejected;
        let conversion_percent = if decided == 0 {
            Decimal::ZERO
        } else {
            round_money(
                Decimal::from(approved) / Decimal::from(decided) * Decimal::ONE_HUNDRED,
            )
        };

        Self { revenue, pipeline, average_ticket, conversion_percent, approved_count: approved }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub negotiating: usize,
}

impl StatusBreakdown {
    pub fn from_quotes<'a>(quotes: impl IntoIterator<Item = &'a Quote>) -> Self {
        quotes.into_iter().fold(Self::default(), |mut breakdown, quote| {
            match quote.status() {
                QuoteStatus::Pending => breakdown.pending += 1,
                QuoteStatus::Approved => breakdown.approved += 1,
                QuoteStatus::Rejected => breakdown.rejected += 1,
                QuoteStatus::Negotiating => breakdown.negotiating += 1,
            }
            breakdown
        })
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.rejected + self.negotiating
    }
}

/// Period-over-period change. Growth from nothing, or from less than a cent,
/// counts as 100%.
pub fn growth_percent(current: Decimal, previous: Decimal) -> Decimal {
    if previous.abs() < CENT {
        return if current > Decimal::ZERO { Decimal::ONE_HUNDRED } else { Decimal::ZERO };
    }
    round_money((current - previous) / previous * Decimal::ONE_HUNDRED)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRevenue {
    pub description: String,
    pub revenue: Decimal,
}

/// Best-selling items of one kind across approved quotes, ranked by revenue.
/// Items without a kind are counted as services.
pub fn top_items<'a>(
    quotes: impl IntoIterator<Item = &'a Quote>,
    kind: ItemKind,
    limit: usize,
) -> Vec<ItemRevenue> {
    let mut revenue_by_name: HashMap<String, Decimal> = HashMap::new();

    for quote in quotes.into_iter().filter(|quote| quote.status() == QuoteStatus::Approved) {
        for item in quote.items() {
            if item.kind.unwrap_or(ItemKind::Service) != kind {
                continue;
            }
            let name = match item.description.trim() {
                "" => UNNAMED_ITEM.to_string(),
                trimmed => trimmed.to_string(),
            };
            *revenue_by_name.entry(name).or_insert(Decimal::ZERO) += item.line_total();
        }
    }

    let mut ranked: Vec<ItemRevenue> = revenue_by_name
        .into_iter()
        .map(|(description, revenue)| ItemRevenue { description, revenue })
        .collect();
    ranked.sort_by(|left, right| {
        right.revenue.cmp(&left.revenue).then_with(|| left.description.cmp(&right.description))
    });
    ranked.truncate(limit);
    ranked
}
