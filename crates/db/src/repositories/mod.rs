use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use estimo_core::domain::company::CompanyProfile;
use estimo_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use estimo_core::errors::ApplicationError;

use crate::numbering::{next_quote_id, next_quote_number};

pub mod memory;
pub mod quote;

pub use memory::InMemoryQuoteRepository;
pub use quote::SqlQuoteRepository;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("quote `{0}` was not found")]
    NotFound(String),
    #[error("quote `{id}` was modified concurrently (version {expected}, stored {stored})")]
    VersionConflict { id: String, expected: u32, stored: u32 },
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// Listing filter. `page` is 1-based; a zero page or limit is treated as the
/// first page / default size.
///
/// `search` matches id, number, issuer name, client name, client document and
/// date. Case is folded for ASCII letters only, which is what SQLite's `LOWER`
/// does, so `JOÃO` finds `joÃo` but not `joão` in every implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteQuery {
    pub search: Option<String>,
    pub status: Option<QuoteStatus>,
    pub page: u32,
    pub limit: u32,
}

impl Default for QuoteQuery {
    fn default() -> Self {
        Self { search: None, status: None, page: 1, limit: DEFAULT_PAGE_SIZE }
    }
}

impl QuoteQuery {
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_status(mut self, status: QuoteStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub(crate) fn effective_page(&self) -> u32 {
        self.page.max(1)
    }

    pub(crate) fn effective_limit(&self) -> u32 {
        if self.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.limit
        }
    }

    pub(crate) fn offset(&self) -> u64 {
        u64::from(self.effective_page() - 1) * u64::from(self.effective_limit())
    }

    pub(crate) fn normalized_search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_ascii_lowercase)
    }

    pub(crate) fn matches(&self, quote: &Quote) -> bool {
        if let Some(status) = self.status {
            if quote.status() != status {
                return false;
            }
        }
        let Some(term) = self.normalized_search() else {
            return true;
        };

        let date = quote.date.to_string();
        let haystacks = [
            quote.id.as_ref().map(|id| id.0.as_str()),
            quote.number.as_ref().map(|number| number.0.as_str()),
            quote.company.as_ref().map(CompanyProfile::display_name),
            Some(quote.client.name.as_str()),
            quote.client.document.as_deref(),
            Some(date.as_str()),
        ];
        let found = haystacks
            .into_iter()
            .flatten()
            .any(|value| value.to_ascii_lowercase().contains(&term));
        found
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotePage {
    pub items: Vec<Quote>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

impl QuotePage {
    pub(crate) fn new(items: Vec<Quote>, total: u64, query: &QuoteQuery) -> Self {
        let limit = u64::from(query.effective_limit());
        let total_pages = u32::try_from(total.div_ceil(limit)).unwrap_or(u32::MAX);
        Self { items, total, page: query.effective_page(), total_pages }
    }
}

/// Storage for quotes. `save` assigns the id, number and version on first
/// write and rejects stale versions afterwards.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError>;
    async fn save(&self, quote: Quote) -> Result<Quote, RepositoryError>;
    async fn list(&self, query: QuoteQuery) -> Result<QuotePage, RepositoryError>;
    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError>;
}

/// Applies the first-save and update rules shared by every implementation:
/// assigns id and number when missing, checks and bumps the version, and
/// stamps `updated_at`.
pub(crate) fn stamp_for_save<'a>(
    mut quote: Quote,
    stored_version: Option<u32>,
    number_prefix: &str,
    existing_ids: impl IntoIterator<Item = &'a str>,
    existing_numbers: impl IntoIterator<Item = &'a str>,
) -> Result<Quote, RepositoryError> {
    match (&quote.id, stored_version) {
        (Some(id), Some(stored)) => {
            if quote.version != stored {
                return Err(RepositoryError::VersionConflict {
                    id: id.0.clone(),
                    expected: quote.version,
                    stored,
                });
            }
            quote.version = stored + 1;
        }
        (None, _) => {
            quote.id = Some(next_quote_id(existing_ids));
            quote.version = 1;
        }
        (Some(_), None) => quote.version = 1,
    }

    if quote.number.is_none() {
        quote.number = Some(next_quote_number(number_prefix, existing_numbers));
    }
    quote.updated_at = Some(Utc::now());
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use estimo_core::domain::company::{CompanyKind, CompanyProfile};
    use estimo_core::domain::customer::{ClientDetails, PersonType};
    use estimo_core::domain::quote::{Quote, QuoteId, QuoteNumber, QuoteStatus};
    use estimo_core::errors::ApplicationError;

    use super::{stamp_for_save, QuotePage, QuoteQuery, RepositoryError};

    fn quote() -> Quote {
        let mut client = ClientDetails::new("Maria Oliveira Arquiteta", PersonType::Individual);
        client.document = Some("111.222.333-44".to_string());
        let mut quote = Quote::new(NaiveDate::from_ymd_opt(2026, 4, 2).expect("valid date"))
            .with_client(client);
        quote.id = Some(QuoteId("O7".to_string()));
        quote.number = Some(QuoteNumber("ORC1006".to_string()));
        quote
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let quote = quote();
        for term in ["o7", "orc1006", "maria", "333-44", "2026-04"] {
            assert!(QuoteQuery::default().search(term).matches(&quote), "term `{term}`");
        }
        assert!(!QuoteQuery::default().search("joão").matches(&quote));
        assert!(QuoteQuery::default().search("   ").matches(&quote));
    }

    #[test]
    fn search_covers_issuer_and_folds_ascii_case_only() {
        let mut quote = quote();
        quote.client.name = "JOÃO Reformas".to_string();
        quote.company = Some(CompanyProfile::new("ACME Instalações LTDA", CompanyKind::Company));

        assert!(QuoteQuery::default().search("acme").matches(&quote));
        assert!(QuoteQuery::default().search("joÃo").matches(&quote));
        assert!(!QuoteQuery::default().search("joão").matches(&quote));
    }

    #[test]
    fn status_filter_applies_before_search() {
        let quote = quote();
        assert!(QuoteQuery::default().with_status(QuoteStatus::Pending).matches(&quote));
        assert!(!QuoteQuery::default().with_status(QuoteStatus::Approved).matches(&quote));
    }

    #[test]
    fn page_math_rounds_up_and_clamps_zero() {
        let query = QuoteQuery::default().page(0, 0);
        assert_eq!(query.offset(), 0);

        let page = QuotePage::new(Vec::new(), 41, &query);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);

        let third = QuoteQuery::default().page(3, 10);
        assert_eq!(third.offset(), 20);
        assert_eq!(QuotePage::new(Vec::new(), 0, &third).total_pages, 0);
    }

    #[test]
    fn repository_errors_map_to_application_errors() {
        let missing: ApplicationError = RepositoryError::NotFound("O1".to_string()).into();
        assert_eq!(missing, ApplicationError::NotFound("O1".to_string()));

        let conflict: ApplicationError =
            RepositoryError::VersionConflict { id: "O1".to_string(), expected: 1, stored: 2 }
                .into();
        assert!(matches!(conflict, ApplicationError::Persistence(ref message)
            if message.contains("modified concurrently")));
    }

    #[test]
    fn first_save_assigns_identity_and_version() {
        let mut fresh = quote();
        fresh.id = None;
        fresh.number = None;

        let stamped = stamp_for_save(fresh, None, "ORC", ["O1", "O4"], ["ORC12"])
            .expect("new quote stamps");

        assert_eq!(stamped.id, Some(QuoteId("O5".to_string())));
        assert_eq!(stamped.number, Some(QuoteNumber("ORC13".to_string())));
        assert_eq!(stamped.version, 1);
        assert!(stamped.updated_at.is_some());
    }

    #[test]
    fn imported_id_is_kept() {
        let stamped = stamp_for_save(quote(), None, "ORC", ["O1"], ["ORC1"]).expect("stamps");
        assert_eq!(stamped.id, Some(QuoteId("O7".to_string())));
        assert_eq!(stamped.number, Some(QuoteNumber("ORC1006".to_string())));
        assert_eq!(stamped.version, 1);
    }

    #[test]
    fn stale_version_is_rejected() {
        let mut stale = quote();
        stale.version = 2;

        let error = stamp_for_save(stale, Some(3), "ORC", ["O7"], ["ORC1006"])
            .expect_err("stale write must fail");
        assert!(matches!(
            error,
            RepositoryError::VersionConflict { ref id, expected: 2, stored: 3 } if id == "O7"
        ));
    }

    #[test]
    fn matching_version_is_bumped() {
        let mut current = quote();
        current.version = 3;

        let stamped = stamp_for_save(current, Some(3), "ORC", ["O7"], ["ORC1006"])
            .expect("current write stamps");
        assert_eq!(stamped.version, 4);
    }
}
