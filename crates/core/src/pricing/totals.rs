use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{LineItem, Quote};

/// Client-facing figures. Unrounded; renderers format to two decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, quote: &Quote) -> QuoteTotals;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(&self, quote: &Quote) -> QuoteTotals {
        quote.totals()
    }
}

pub fn subtotal(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::line_total).sum()
}

/// Caps the discount at the subtotal first, then floors it at zero, so a
/// negative subtotal always yields a zero discount.
pub fn clamp_discount(value: Decimal, subtotal: Decimal) -> Decimal {
    let capped = if value > subtotal { subtotal } else { value };
    if capped < Decimal::ZERO {
        Decimal::ZERO
    } else {
        capped
    }
}

pub fn compute_totals(items: &[LineItem], discount_value: Decimal) -> QuoteTotals {
    let subtotal = subtotal(items);
    let discount = clamp_discount(discount_value, subtotal);

    QuoteTotals { subtotal, discount, total: subtotal - discount }
}
