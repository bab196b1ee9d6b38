pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod pricing;
pub mod reporting;

pub use audit::{AuditContext, AuditOutcome, AuditSink, InMemoryAuditSink, StatusAuditEvent};
pub use domain::catalog::{CatalogEntry, CatalogEntryId};
pub use domain::company::{CompanyKind, CompanyProfile};
pub use domain::customer::{ClientDetails, PersonType};
pub use domain::quote::{
    ItemKind, LineItem, LineItemId, LineItemPatch, Quote, QuoteId, QuoteNumber, QuoteStatus,
    Signature, UnitOfMeasure,
};
pub use domain::record::{ItemRecord, QuoteRecord};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    ClientAction, FlowEngine, FlowPolicy, FlowTransitionError, QuoteEvent, TransitionOutcome,
};
pub use pricing::discount::Discount;
pub use pricing::profit::ProfitBreakdown;
pub use pricing::totals::{DeterministicPricingEngine, PricingEngine, QuoteTotals};
pub use pricing::InternalEvaluation;
pub use reporting::{ReportMetrics, StatusBreakdown};
