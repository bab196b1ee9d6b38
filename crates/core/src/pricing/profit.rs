use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::LineItem;
use crate::pricing::discount::CENT;
use crate::pricing::totals::QuoteTotals;

/// Owner-only profitability figures. Never part of client-facing output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitBreakdown {
    pub total_cost: Decimal,
    /// Profit before the discount is applied.
    pub gross_profit: Decimal,
    /// Profit on the discounted total.
    pub net_profit: Decimal,
    /// Zero when the total is below a cent.
    pub margin_percent: Decimal,
}

pub fn total_cost(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::line_cost).sum()
}

pub fn compute_profit(items: &[LineItem], totals: &QuoteTotals) -> ProfitBreakdown {
    let total_cost = total_cost(items);
    let net_profit = totals.total - total_cost;
    let margin_percent = if totals.total >= CENT {
        net_profit / totals.total * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    ProfitBreakdown {
        total_cost,
        gross_profit: totals.subtotal - total_cost,
        net_profit,
        margin_percent,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::compute_profit;
    use crate::domain::quote::LineItem;
use crate::pricing::discount::CENT;
    use crate::pricing::totals::compute_totals;

    fn items() -> Vec<LineItem> {
        vec![
            LineItem::new("1", "Air conditioner install", Decimal::from(2), Decimal::from(100))
                .with_cost(Decimal::from(40)),
            LineItem::new("2", "Copper pipe", Decimal::new(35, 1), Decimal::from(20))
                .with_cost(Decimal::from(12)),
            LineItem::new("3", "Labour", Decimal::ONE, Decimal::from(30)),
        ]
    }

    #[test]
    fn costs_and_profits_follow_totals() {
        let items = items();
        let totals = compute_totals(&items, Decimal::from(50));
        let profit = compute_profit(&items, &totals);

        assert_eq!(totals.subtotal, Decimal::from(300));
        assert_eq!(profit.total_cost, Decimal::from(122));
        assert_eq!(profit.gross_profit, Decimal::from(178));
        assert_eq!(profit.net_profit, Decimal::from(128));
        assert_eq!(profit.margin_percent, Decimal::new(512, 1));
    }

    #[test]
    fn profit_identities_hold() {
        let items = items();
        for discount in [Decimal::ZERO, Decimal::from(10), Decimal::from(400)] {
            let totals = compute_totals(&items, discount);
            let profit = compute_profit(&items, &totals);
            assert_eq!(profit.net_profit, totals.total - profit.total_cost);
            assert_eq!(profit.gross_profit, totals.subtotal - profit.total_cost);
        }
    }

    #[test]
    fn zero_cost_items_keep_full_total_as_profit() {
        let items =
            vec![LineItem::new("1", "Consulting hour", Decimal::from(3), Decimal::from(200))];
        let totals = compute_totals(&items, Decimal::from(60));
        let profit = compute_profit(&items, &totals);

        assert_eq!(profit.total_cost, Decimal::ZERO);
        assert_eq!(profit.net_profit, totals.total);
        assert_eq!(profit.margin_percent, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn margin_is_zero_when_total_is_zero() {
        let items = items();
        let totals = compute_totals(&items, Decimal::from(1_000));
        let profit = compute_profit(&items, &totals);

        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(profit.margin_percent, Decimal::ZERO);
        assert_eq!(profit.net_profit, Decimal::from(-122));
    }
}
