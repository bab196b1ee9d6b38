use std::collections::HashSet;
use std::iter;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::company::CompanyProfile;
use crate::domain::customer::ClientDetails;
use crate::errors::DomainError;
use crate::flows::states::{StatusEffect, TransitionOutcome};
use crate::pricing::discount::Discount;
use crate::pricing::totals::{clamp_discount, compute_totals, subtotal, QuoteTotals};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuoteNumber(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub String);

/// Opaque signature artifact captured in person (typically an image data URL).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub String);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Negotiating,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Negotiating => "negotiating",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "negotiating" => Some(Self::Negotiating),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Service,
    Product,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Product => "product",
        }
    }
}

/// Unit of sale. The usual units are named; anything else typed on the
/// editing surface is kept verbatim in `Other`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UnitOfMeasure {
    Unit,
    Kilogram,
    Meter,
    SquareMeter,
    CubicMeter,
    Liter,
    Box,
    Pair,
    Hour,
    Day,
    Week,
    Month,
    Other(String),
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unit => "un",
            Self::Kilogram => "kg",
            Self::Meter => "m",
            Self::SquareMeter => "m²",
            Self::CubicMeter => "m³",
            Self::Liter => "l",
            Self::Box => "cx",
            Self::Pair => "par",
            Self::Hour => "hr",
            Self::Day => "dia",
            Self::Week => "sem",
            Self::Month => "mes",
            Self::Other(unit) => unit,
        }
    }

    /// Recognises the named units only.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "un" => Some(Self::Unit),
            "kg" => Some(Self::Kilogram),
            "m" => Some(Self::Meter),
            "m²" | "m2" => Some(Self::SquareMeter),
            "m³" | "m3" => Some(Self::CubicMeter),
            "l" => Some(Self::Liter),
            "cx" => Some(Self::Box),
            "par" => Some(Self::Pair),
            "hr" => Some(Self::Hour),
            "dia" => Some(Self::Day),
            "sem" => Some(Self::Week),
            "mes" => Some(Self::Month),
            _ => None,
        }
    }
}

impl From<String> for UnitOfMeasure {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or(Self::Other(value))
    }
}

impl From<UnitOfMeasure> for String {
    fn from(unit: UnitOfMeasure) -> Self {
        match unit {
            UnitOfMeasure::Other(unit) => unit,
            named => named.as_str().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    #[serde(default)]
    pub kind: Option<ItemKind>,
    pub description: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: Option<UnitOfMeasure>,
    pub unit_price: Decimal,
    #[serde(default)]
    pub cost: Option<Decimal>,
}

impl LineItem {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: LineItemId(id.into()),
            kind: None,
            description: description.into(),
            quantity,
            unit: None,
            unit_price,
            cost: None,
        }
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_unit(mut self, unit: UnitOfMeasure) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    pub fn line_cost(&self) -> Decimal {
        self.quantity * self.cost.unwrap_or(Decimal::ZERO)
    }
}

/// Field-level edit of a line item. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineItemPatch {
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub unit: Option<UnitOfMeasure>,
    pub kind: Option<ItemKind>,
}

impl LineItemPatch {
    fn apply(self, item: &mut LineItem) {
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(unit_price) = self.unit_price {
            item.unit_price = unit_price;
        }
        if let Some(cost) = self.cost {
            item.cost = Some(cost);
        }
        if let Some(unit) = self.unit {
            item.unit = Some(unit);
        }
        if let Some(kind) = self.kind {
            item.kind = Some(kind);
        }
    }
}

/// Largest magnitude accepted for a quantity, a price, a cost, a line
/// amount, or the sum of those over a quote.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// Rejects items whose amounts would leave the range pricing can work in.
pub(crate) fn check_amounts<'a>(
    items: impl IntoIterator<Item = &'a LineItem>,
) -> Result<(), DomainError> {
    let limit = Decimal::from(MAX_AMOUNT);
    let mut subtotal = Decimal::ZERO;
    let mut cost = Decimal::ZERO;

    for item in items {
        let out_of_range = || DomainError::AmountOutOfRange(item.id.0.clone());
        let unit_cost = item.cost.unwrap_or(Decimal::ZERO);
        let line_total = item.quantity.checked_mul(item.unit_price).ok_or_else(out_of_range)?;
        let line_cost = item.quantity.checked_mul(unit_cost).ok_or_else(out_of_range)?;
        subtotal = subtotal.checked_add(line_total).ok_or_else(out_of_range)?;
        cost = cost.checked_add(line_cost).ok_or_else(out_of_range)?;

        let amounts = [item.quantity, item.unit_price, unit_cost, line_total, line_cost];
        if amounts.iter().chain([&subtotal, &cost]).any(|amount| amount.abs() > limit) {
            return Err(out_of_range());
        }
    }
    Ok(())
}

pub(crate) fn check_unique_ids(items: &[LineItem]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(&item.id) {
            return Err(DomainError::DuplicateLineItem(item.id.0.clone()));
        }
    }
    Ok(())
}

pub const DEFAULT_NOTES: &str =
    "Quote valid for 15 days. Payment: 50% on approval and 50% on delivery.";

/// Quote aggregate.
///
/// Items, discount and the status-related fields are only reachable through
/// methods so the discount stays within `[0, subtotal]` after every edit and
/// status changes always go through [`crate::flows::FlowEngine`].
/// Deserialization runs the same checks as the editing methods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredQuote")]
pub struct Quote {
    pub id: Option<QuoteId>,
    pub number: Option<QuoteNumber>,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    /// Issuer snapshot taken when the quote was written.
    pub company: Option<CompanyProfile>,
    pub client: ClientDetails,
    pub notes: Option<String>,
    pub(crate) items: Vec<LineItem>,
    pub(crate) discount: Discount,
    pub(crate) status: QuoteStatus,
    pub(crate) client_feedback: Option<String>,
    pub(crate) client_display_name: Option<String>,
    pub(crate) signature: Option<Signature>,
    pub version: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct StoredQuote {
    #[serde(default)]
    id: Option<QuoteId>,
    #[serde(default)]
    number: Option<QuoteNumber>,
    date: NaiveDate,
    #[serde(default)]
    due_date: Option<NaiveDate>,
    #[serde(default)]
    company: Option<CompanyProfile>,
    #[serde(default)]
    client: ClientDetails,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    discount: Discount,
    #[serde(default)]
    status: QuoteStatus,
    #[serde(default)]
    client_feedback: Option<String>,
    #[serde(default)]
    client_display_name: Option<String>,
    #[serde(default)]
    signature: Option<Signature>,
    #[serde(default)]
    version: u32,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<StoredQuote> for Quote {
    type Error = DomainError;

    fn try_from(stored: StoredQuote) -> Result<Self, Self::Error> {
        check_unique_ids(&stored.items)?;
        check_amounts(&stored.items)?;

        let mut quote = Self {
            id: stored.id,
            number: stored.number,
            date: stored.date,
            due_date: stored.due_date,
            company: stored.company,
            client: stored.client,
            notes: stored.notes,
            items: stored.items,
            discount: Discount::default(),
            status: stored.status,
            client_feedback: stored.client_feedback,
            client_display_name: stored.client_display_name,
            signature: stored.signature,
            version: stored.version,
            updated_at: stored.updated_at,
        };
        quote.discount = match stored.discount {
            Discount::Value(value) => Discount::Value(clamp_discount(value, quote.subtotal())),
            Discount::Percent(percent) => {
                Discount::Percent(percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
            }
        };
        Ok(quote)
    }
}

impl Quote {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: None,
            number: None,
            date,
            due_date: None,
            company: None,
            client: ClientDetails::default(),
            notes: Some(DEFAULT_NOTES.to_string()),
            items: Vec::new(),
            discount: Discount::default(),
            status: QuoteStatus::Pending,
            client_feedback: None,
            client_display_name: None,
            signature: None,
            version: 0,
            updated_at: None,
        }
    }

    pub fn with_company(mut self, company: CompanyProfile) -> Self {
        self.company = Some(company);
        self
    }

    pub fn with_client(mut self, client: ClientDetails) -> Self {
        self.client = client;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn discount(&self) -> &Discount {
        &self.discount
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn client_feedback(&self) -> Option<&str> {
        self.client_feedback.as_deref()
    }

    pub fn client_display_name(&self) -> Option<&str> {
        self.client_display_name.as_deref()
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Approved and rejected quotes are read-only for editing surfaces.
    /// Nothing here enforces it; callers check before mutating.
    pub fn is_locked(&self) -> bool {
        matches!(self.status, QuoteStatus::Approved | QuoteStatus::Rejected)
    }

    pub fn subtotal(&self) -> Decimal {
        subtotal(&self.items)
    }

    pub fn totals(&self) -> QuoteTotals {
        let subtotal = self.subtotal();
        compute_totals(&self.items, self.discount.value_for(subtotal))
    }

    pub fn discount_value(&self) -> Decimal {
        self.discount.value_for(self.subtotal())
    }

    pub fn discount_percent(&self) -> Decimal {
        self.discount.percent_for(self.subtotal())
    }

    pub fn add_item(&mut self, item: LineItem) -> Result<(), DomainError> {
        if self.items.iter().any(|existing| existing.id == item.id) {
            return Err(DomainError::DuplicateLineItem(item.id.0));
        }
        check_amounts(self.items.iter().chain(iter::once(&item)))?;
        self.items.push(item);
        self.normalize_discount();
        Ok(())
    }

    pub fn remove_item(&mut self, id: &LineItemId) -> Result<LineItem, DomainError> {
        let index = self.position_of(id)?;
        let removed = self.items.remove(index);
        self.normalize_discount();
        Ok(removed)
    }

    pub fn update_item(
        &mut self,
        id: &LineItemId,
        patch: LineItemPatch,
    ) -> Result<(), DomainError> {
        let index = self.position_of(id)?;
        let mut patched = self.items[index].clone();
        patch.apply(&mut patched);
        check_amounts(
            self.items
                .iter()
                .enumerate()
                .map(|(position, item)| if position == index { &patched } else { item }),
        )?;
        self.items[index] = patched;
        self.normalize_discount();
        Ok(())
    }

    /// Swaps the item at `index` with its predecessor. Returns `false` when
    /// the item is already first or the index is out of range.
    pub fn move_item_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.items.len() {
            return false;
        }
        self.items.swap(index, index - 1);
        true
    }

    pub fn move_item_down(&mut self, index: usize) -> bool {
        if index >= self.items.len().saturating_sub(1) {
            return false;
        }
        self.items.swap(index, index + 1);
        true
    }

    /// Absolute discount edit: stored clamped to `[0, subtotal]`, percent follows.
    pub fn set_discount_value(&mut self, value: Decimal) {
        self.discount = Discount::Value(clamp_discount(value, self.subtotal()));
    }

    /// Percentage edit: stored clamped to `[0, 100]`, value follows the subtotal.
    pub fn set_discount_percent(&mut self, percent: Decimal) {
        self.discount = Discount::Percent(percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED));
    }

    /// Starts a new pending draft from this quote, keeping client, items,
    /// discount and notes.
    pub fn duplicate(&self, today: NaiveDate) -> Self {
        Self {
            id: None,
            number: None,
            date: today,
            due_date: None,
            company: self.company.clone(),
            client: self.client.clone(),
            notes: self.notes.clone().or_else(|| Some(DEFAULT_NOTES.to_string())),
            items: self.items.clone(),
            discount: self.discount.clone(),
            status: QuoteStatus::Pending,
            client_feedback: None,
            client_display_name: None,
            signature: None,
            version: 0,
            updated_at: None,
        }
    }

    pub(crate) fn apply_transition(&mut self, outcome: &TransitionOutcome) {
        for effect in &outcome.effects {
            match effect {
                StatusEffect::RecordSignature(signature) => {
                    self.signature = Some(signature.clone())
                }
                StatusEffect::RecordFeedback(feedback) => {
                    self.client_feedback = Some(feedback.clone())
                }
                StatusEffect::RecordClientName(name) => {
                    self.client_display_name = Some(name.clone())
                }
                StatusEffect::ClearFeedback => self.client_feedback = None,
                StatusEffect::ClearSignature => self.signature = None,
            }
        }
        self.status = outcome.to;
    }

    fn position_of(&self, id: &LineItemId) -> Result<usize, DomainError> {
        self.items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| DomainError::UnknownLineItem(id.0.clone()))
    }

    fn normalize_discount(&mut self) {
        if let Discount::Value(value) = self.discount {
            self.discount = Discount::Value(clamp_discount(value, self.subtotal()));
        }
    }
}
