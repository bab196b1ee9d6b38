use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{ItemKind, LineItem, LineItemId, UnitOfMeasure};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntryId(pub String);

/// Saved service or product that can be copied into a quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: CatalogEntryId,
    pub kind: ItemKind,
    pub description: String,
    pub default_price: Decimal,
    #[serde(default)]
    pub unit: Option<UnitOfMeasure>,
}

impl CatalogEntry {
    pub fn service(
        id: impl Into<String>,
        description: impl Into<String>,
        default_price: Decimal,
    ) -> Self {
        Self {
            id: CatalogEntryId(id.into()),
            kind: ItemKind::Service,
            description: description.into(),
            default_price,
            unit: None,
        }
    }

    pub fn product(
        id: impl Into<String>,
        description: impl Into<String>,
        default_price: Decimal,
        unit: UnitOfMeasure,
    ) -> Self {
        Self {
            id: CatalogEntryId(id.into()),
            kind: ItemKind::Product,
            description: description.into(),
            default_price,
            unit: Some(unit),
        }
    }

    /// Copies the entry into a fresh line item. The copy is independent: later
    /// catalog edits never reach quotes that already hold it.
    pub fn to_line_item(&self, id: impl Into<String>, quantity: Decimal) -> LineItem {
        LineItem {
            id: LineItemId(id.into()),
            kind: Some(self.kind),
            description: self.description.clone(),
            quantity,
            unit: self.unit.clone(),
            unit_price: self.default_price,
            cost: None,
        }
    }
}
