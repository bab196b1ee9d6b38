use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::pricing::totals::clamp_discount;

/// Drift between a stored absolute discount and the one implied by the stored
/// percentage that is tolerated before the value is re-derived.
pub const RESYNC_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

const MONEY_DECIMAL_PLACES: u32 = 2;

/// Smallest amount a ratio is taken against.
pub(crate) const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// The discount as last edited. Only one representation is stored; the other
/// is always derived from the current subtotal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "amount", rename_all = "snake_case")]
pub enum Discount {
    Value(Decimal),
    Percent(Decimal),
}

impl Default for Discount {
    fn default() -> Self {
        Self::Value(Decimal::ZERO)
    }
}

impl Discount {
    /// Builds a discount from a record that carries both representations.
    ///
    /// Without a percentage the value is taken as is. With one, the stored
    /// value is kept while it is within [`RESYNC_TOLERANCE`] of what the
    /// percentage implies; past that the percentage wins, since it is the
    /// field that follows item edits on the editing surface.
    pub fn from_dual(value: Decimal, percent: Decimal, subtotal: Decimal) -> Self {
        let percent = percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        if percent.is_zero() {
            return Self::Value(clamp_discount(value, subtotal));
        }
        if subtotal <= Decimal::ZERO || resync_value(value, percent, subtotal).is_some() {
            Self::Percent(percent)
        } else {
            Self::Value(clamp_discount(value, subtotal))
        }
    }

    pub fn value_for(&self, subtotal: Decimal) -> Decimal {
        match self {
            Self::Value(value) => clamp_discount(*value, subtotal),
            Self::Percent(percent) => {
                clamp_discount(value_from_percent(*percent, subtotal), subtotal)
            }
        }
    }

    pub fn percent_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match self {
            Self::Value(value) => percent_from_value(clamp_discount(*value, subtotal), subtotal),
            Self::Percent(percent) => *percent,
        }
    }
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

pub fn percent_from_value(value: Decimal, subtotal: Decimal) -> Decimal {
    if subtotal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(value / subtotal * Decimal::ONE_HUNDRED)
}

pub fn value_from_percent(percent: Decimal, subtotal: Decimal) -> Decimal {
    if subtotal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(subtotal * percent / Decimal::ONE_HUNDRED)
}

/// Re-derives the absolute discount of a dual-field record after its
/// subtotal changed. Returns `None` when no percentage is set, the subtotal is
/// empty, or the stored value is already within [`RESYNC_TOLERANCE`].
pub fn resync_value(
    stored_value: Decimal,
    stored_percent: Decimal,
    subtotal: Decimal,
) -> Option<Decimal> {
    if stored_percent <= Decimal::ZERO || subtotal <= Decimal::ZERO {
        return None;
    }

    let expected = subtotal * stored_percent / Decimal::ONE_HUNDRED;
    let drifted = stored_value
        .checked_sub(expected)
        .map_or(true, |drift| drift.abs() > RESYNC_TOLERANCE);
    if drifted {
        Some(round_money(expected))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{
        percent_from_value, resync_value, round_money, value_from_percent, Discount,
        RESYNC_TOLERANCE,
    };
    use crate::domain::quote::{LineItem, LineItemId, Quote};

    #[test]
    fn tolerance_is_five_cents() {
        assert_eq!(RESYNC_TOLERANCE, Decimal::new(5, 2));
    }

    #[test]
    fn conversions_round_to_two_places() {
        assert_eq!(percent_from_value(Decimal::from(25), Decimal::from(250)), Decimal::from(10));
        assert_eq!(
            percent_from_value(Decimal::from(10), Decimal::from(30)),
            Decimal::new(3333, 2)
        );
        assert_eq!(
            value_from_percent(Decimal::new(125, 1), Decimal::new(9999, 2)),
            Decimal::new(1250, 2)
        );
        assert_eq!(round_money(Decimal::new(1005, 3)), Decimal::new(101, 2));
    }

    #[test]
    fn zero_subtotal_forces_zero_in_both_directions() {
        assert_eq!(percent_from_value(Decimal::from(40), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(value_from_percent(Decimal::from(15), Decimal::ZERO), Decimal::ZERO);

        let percent = Discount::Percent(Decimal::from(15));
        assert_eq!(percent.value_for(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(percent.percent_for(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn percent_value_round_trip_stays_within_tolerance() {
        let subtotals = [Decimal::new(1, 2), Decimal::new(8_000, 2), Decimal::new(79_999, 2)];
        for subtotal in subtotals {
            for step in 0..=20 {
                let value = round_money(subtotal * Decimal::from(step) / Decimal::from(20));
                let percent = percent_from_value(value, subtotal);
                let back = value_from_percent(percent, subtotal);
                assert!(
                    (back - value).abs() <= RESYNC_TOLERANCE,
                    "round trip drifted: subtotal={subtotal} value={value} back={back}"
                );
            }
        }
    }

    #[test]
    fn resync_only_fires_beyond_tolerance() {
        let subtotal = Decimal::from(150);
        let percent = Decimal::from(10);

        assert_eq!(resync_value(Decimal::from(25), percent, subtotal), Some(Decimal::from(15)));
        assert_eq!(resync_value(Decimal::new(1504, 2), percent, subtotal), None);
        assert_eq!(resync_value(Decimal::from(25), Decimal::ZERO, subtotal), None);
        assert_eq!(resync_value(Decimal::from(25), percent, Decimal::ZERO), None);
    }

    #[test]
    fn from_dual_follows_percentage_only_past_tolerance() {
        let subtotal = Decimal::from(80);
        assert_eq!(
            Discount::from_dual(Decimal::new(803, 2), Decimal::from(10), subtotal),
            Discount::Value(Decimal::new(803, 2))
        );
        assert_eq!(
            Discount::from_dual(Decimal::from(12), Decimal::from(10), subtotal),
            Discount::Percent(Decimal::from(10))
        );
        assert_eq!(
            Discount::from_dual(Decimal::from(200), Decimal::ZERO, subtotal),
            Discount::Value(Decimal::from(80))
        );
        assert_eq!(
            Discount::from_dual(Decimal::from(5), Decimal::from(150), Decimal::ZERO),
            Discount::Percent(Decimal::ONE_HUNDRED)
        );
    }

    #[test]
    fn value_discount_derives_percent() {
        let discount = Discount::Value(Decimal::from(25));
        assert_eq!(discount.percent_for(Decimal::from(250)), Decimal::from(10));
        assert_eq!(discount.value_for(Decimal::from(20)), Decimal::from(20));
    }

    #[test]
    fn percent_discount_follows_item_changes() {
        let mut quote = Quote::new(NaiveDate::from_ymd_opt(2026, 2, 10).expect("date"));
        quote
            .add_item(LineItem::new("a", "Installation", Decimal::from(2), Decimal::from(50)))
            .expect("add a");
        quote
            .add_item(LineItem::new("b", "Maintenance", Decimal::ONE, Decimal::from(150)))
            .expect("add b");
        assert_eq!(quote.subtotal(), Decimal::new(25_000, 2));

        quote.set_discount_percent(Decimal::from(10));
        assert_eq!(quote.discount_value(), Decimal::new(2_500, 2));
        assert_eq!(quote.totals().total, Decimal::new(22_500, 2));

        quote.remove_item(&LineItemId("a".to_string())).expect("remove a");
        assert_eq!(quote.subtotal(), Decimal::new(15_000, 2));
        assert_eq!(quote.discount_value(), Decimal::new(1_500, 2));
        assert_eq!(quote.totals().total, Decimal::new(13_500, 2));
    }

    #[test]
    fn value_edit_drives_percent() {
        let mut quote = Quote::new(NaiveDate::from_ymd_opt(2026, 2, 10).expect("date"));
        quote
            .add_item(LineItem::new("a", "Audit", Decimal::ONE, Decimal::from(200)))
            .expect("add a");

        quote.set_discount_value(Decimal::from(30));
        assert_eq!(quote.discount_percent(), Decimal::from(15));
        assert_eq!(quote.discount(), &Discount::Value(Decimal::from(30)));
    }
}
