//! Interchange shape used by the editing surface and the public quote view.
//!
//! The record stores the discount twice (`discount` and `discountPercent`).
//! Converting into a [`Quote`] keeps the stored value while it agrees with the
//! percentage and follows the percentage once they drifted apart.
//!
//! Keys the record does not model are carried in `extra`, so
//! [`QuoteRecord::refreshed`] can write a record back without losing them.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::company::CompanyProfile;
use crate::domain::customer::ClientDetails;
use crate::domain::quote::{
    check_amounts, check_unique_ids, ItemKind, LineItem, LineItemId, Quote, QuoteId,
    QuoteNumber, QuoteStatus, Signature, UnitOfMeasure,
};
use crate::errors::DomainError;
use crate::pricing::discount::Discount;
use crate::pricing::totals::subtotal;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<ItemKind>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub number: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<CompanyProfile>,
    #[serde(default)]
    pub client: ClientDetails,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub client_feedback: Option<String>,
    #[serde(default)]
    pub client_display_name: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_updated: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<&LineItem> for ItemRecord {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.0.clone(),
            kind: item.kind,
            description: item.description.clone(),
            quantity: item.quantity,
            unit: item.unit.as_ref().map(|unit| unit.as_str().to_string()),
            unit_price: item.unit_price,
            cost: item.cost,
            extra: Map::new(),
        }
    }
}

impl ItemRecord {
    fn into_line_item(self) -> LineItem {
        LineItem {
            id: LineItemId(self.id),
            kind: self.kind,
            description: self.description,
            quantity: self.quantity,
            unit: self.unit.and_then(non_empty).map(UnitOfMeasure::from),
            unit_price: self.unit_price,
            cost: self.cost,
        }
    }
}

impl QuoteRecord {
    pub fn into_quote(self) -> Result<Quote, DomainError> {
        let mut quote = Quote::new(self.date);
        quote.id = non_empty(self.id).map(QuoteId);
        quote.number = non_empty(self.number).map(QuoteNumber);
        quote.due_date = self.due_date;
        quote.company = self.company;
        quote.client = self.client;
        quote.notes = self.notes;
        quote.updated_at = self.last_updated.and_then(DateTime::from_timestamp_millis);

        let items: Vec<LineItem> =
            self.items.into_iter().map(ItemRecord::into_line_item).collect();
        check_unique_ids(&items)?;
        check_amounts(&items)?;
        quote.items = items;

        quote.discount = Discount::from_dual(
            self.discount.unwrap_or(Decimal::ZERO),
            self.discount_percent.unwrap_or(Decimal::ZERO),
            subtotal(&quote.items),
        );

        quote.status = self.status;
        quote.signature = self.signature.and_then(non_empty).map(Signature);
        quote.client_display_name = self.client_display_name.and_then(non_empty);
        quote.client_feedback = match self.status {
            QuoteStatus::Rejected | QuoteStatus::Negotiating => {
                self.client_feedback.and_then(non_empty)
            }
            QuoteStatus::Pending | QuoteStatus::Approved => None,
        };

        Ok(quote)
    }

    pub fn from_quote(quote: &Quote) -> Self {
        Self {
            id: quote.id.as_ref().map(|id| id.0.clone()).unwrap_or_default(),
            number: quote.number.as_ref().map(|number| number.0.clone()).unwrap_or_default(),
            date: quote.date,
            due_date: quote.due_date,
            company: quote.company.clone(),
            client: quote.client.clone(),
            items: quote.items().iter().map(ItemRecord::from).collect(),
            notes: quote.notes.clone(),
            discount: Some(quote.discount_value()),
            discount_percent: Some(quote.discount_percent()),
            status: quote.status(),
            signature: quote.signature().map(|signature| signature.0.clone()),
            client_feedback: quote.client_feedback().map(str::to_string),
            client_display_name: quote.client_display_name().map(str::to_string),
            last_updated: quote.updated_at.map(|at| at.timestamp_millis()),
            extra: Map::new(),
        }
    }

    /// Renders `quote` over this record, keeping the keys only the record
    /// knows about, at the top level and on items whose id still exists.
    pub fn refreshed(self, quote: &Quote) -> Self {
        let mut rendered = Self::from_quote(quote);
        let mut item_extras: HashMap<String, Map<String, Value>> =
            self.items.into_iter().map(|item| (item.id, item.extra)).collect();
        for item in &mut rendered.items {
            if let Some(extra) = item_extras.remove(&item.id) {
                item.extra = extra;
            }
        }
        rendered.extra = self.extra;
        rendered
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
