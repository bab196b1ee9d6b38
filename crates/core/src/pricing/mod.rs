pub mod discount;
pub mod profit;
pub mod totals;

use serde::{Deserialize, Serialize};

use crate::domain::quote::Quote;

use self::{
    profit::{compute_profit, ProfitBreakdown},
    totals::{DeterministicPricingEngine, PricingEngine, QuoteTotals},
};

/// Totals plus profitability for the business owner's own views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalEvaluation {
    pub totals: QuoteTotals,
    pub profit: ProfitBreakdown,
}

pub fn evaluate_internal<P>(engine: &P, quote: &Quote) -> InternalEvaluation
where
    P: PricingEngine,
{
    let totals = engine.price(quote);
    let profit = compute_profit(quote.items(), &totals);

    InternalEvaluation { totals, profit }
}

impl Quote {
    pub fn internal_evaluation(&self) -> InternalEvaluation {
        evaluate_internal(&DeterministicPricingEngine, self)
    }
}
