use std::collections::HashMap;

use tokio::sync::RwLock;

use estimo_core::domain::quote::{Quote, QuoteId};

use super::{stamp_for_save, QuotePage, QuoteQuery, QuoteRepository, RepositoryError};
use crate::numbering::DEFAULT_NUMBER_PREFIX;

pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
    number_prefix: String,
}

impl Default for InMemoryQuoteRepository {
    fn default() -> Self {
        Self { quotes: RwLock::new(HashMap::new()), number_prefix: DEFAULT_NUMBER_PREFIX.into() }
    }
}

impl InMemoryQuoteRepository {
    pub fn with_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.number_prefix = prefix.into();
        self
    }
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).cloned())
    }

    async fn save(&self, quote: Quote) -> Result<Quote, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let stored_version =
            quote.id.as_ref().and_then(|id| quotes.get(&id.0)).map(|stored| stored.version);

        let stamped = stamp_for_save(
            quote,
            stored_version,
            &self.number_prefix,
            quotes.keys().map(String::as_str),
            quotes.values().filter_map(|stored| stored.number.as_ref()).map(|n| n.0.as_str()),
        )?;
        let key = stamped
            .id
            .as_ref()
            .map(|id| id.0.clone())
            .ok_or_else(|| RepositoryError::Decode("quote id missing after stamping".into()))?;

        quotes.insert(key, stamped.clone());
        Ok(stamped)
    }

    async fn list(&self, query: QuoteQuery) -> Result<QuotePage, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut matching: Vec<&Quote> =
            quotes.values().filter(|quote| query.matches(quote)).collect();
        matching.sort_by(|left, right| {
            right.updated_at.cmp(&left.updated_at).then_with(|| right.id.cmp(&left.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = query.effective_limit() as usize;
        let items = matching.into_iter().skip(offset).take(limit).cloned().collect();

        Ok(QuotePage::new(items, total, &query))
    }

    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.remove(&id.0).map(|_| ()).ok_or_else(|| RepositoryError::NotFound(id.0.clone()))
    }
}
