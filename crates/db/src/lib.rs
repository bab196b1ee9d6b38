pub mod connection;
pub mod migrations;
pub mod numbering;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    InMemoryQuoteRepository, QuotePage, QuoteQuery, QuoteRepository, RepositoryError,
    SqlQuoteRepository,
};
