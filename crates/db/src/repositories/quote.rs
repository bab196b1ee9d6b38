use sqlx::{QueryBuilder, Row, Sqlite};

use estimo_core::domain::company::CompanyProfile;
use estimo_core::domain::quote::{Quote, QuoteId};

use super::{stamp_for_save, QuotePage, QuoteQuery, QuoteRepository, RepositoryError};
use crate::numbering::DEFAULT_NUMBER_PREFIX;
use crate::DbPool;

const SEARCH_COLUMNS: &[&str] =
    &["id", "number", "company_name", "client_name", "client_document", "quote_date"];

/// SQLite-backed store. The full quote is kept as a JSON payload; the other
/// columns are projections used for filtering, ordering and numbering.
pub struct SqlQuoteRepository {
    pool: DbPool,
    number_prefix: String,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, number_prefix: DEFAULT_NUMBER_PREFIX.to_string() }
    }

    pub fn with_number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.number_prefix = prefix.into();
        self
    }
}

fn decode_payload(row: &sqlx::sqlite::SqliteRow) -> Result<Quote, RepositoryError> {
    let payload: String =
        row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    serde_json::from_str(&payload).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &QuoteQuery) {
    builder.push(" WHERE 1=1");

    if let Some(status) = query.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }

    if let Some(term) = query.normalized_search() {
        let pattern = like_pattern(&term);
        builder.push(" AND (");
        let mut separated = builder.separated(" OR ");
        for column in SEARCH_COLUMNS {
            separated.push(format!("LOWER({column}) LIKE "));
            separated.push_bind_unseparated(pattern.clone());
            separated.push_unseparated(" ESCAPE '\\'");
        }
        builder.push(")");
    }
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query("SELECT payload FROM quote WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(decode_payload(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, quote: Quote) -> Result<Quote, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let stored_version: Option<i64> = match &quote.id {
            Some(id) => {
                sqlx::query_scalar("SELECT version FROM quote WHERE id = ?")
                    .bind(&id.0)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            None => None,
        };
        let stored_version = stored_version
            .map(u32::try_from)
            .transpose()
            .map_err(|e| RepositoryError::Decode(format!("stored version out of range: {e}")))?;

        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM quote").fetch_all(&mut *tx).await?;
        let numbers: Vec<String> =
            sqlx::query_scalar("SELECT number FROM quote").fetch_all(&mut *tx).await?;

        let stamped = stamp_for_save(
            quote,
            stored_version,
            &self.number_prefix,
            ids.iter().map(String::as_str),
            numbers.iter().map(String::as_str),
        )?;

        let id = stamped.id.as_ref().map(|id| id.0.clone()).unwrap_or_default();
        let number = stamped.number.as_ref().map(|number| number.0.clone()).unwrap_or_default();
        let payload =
            serde_json::to_string(&stamped).map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let updated_at_ms = stamped.updated_at.map(|at| at.timestamp_millis()).unwrap_or_default();
        let total = stamped.totals().total.to_string();
        let company_name = stamped.company.as_ref().map(CompanyProfile::display_name);

        match stored_version {
            Some(expected) => {
                let result = sqlx::query(
                    "UPDATE quote
                     SET number = ?, status = ?, company_name = ?, client_name = ?,
                         client_document = ?, quote_date = ?, total = ?, version = ?,
                         payload = ?, updated_at_ms = ?
                     WHERE id = ? AND version = ?",
                )
                .bind(&number)
                .bind(stamped.status().as_str())
                .bind(company_name)
                .bind(&stamped.client.name)
                .bind(&stamped.client.document)
                .bind(stamped.date.to_string())
                .bind(&total)
                .bind(i64::from(stamped.version))
                .bind(&payload)
                .bind(updated_at_ms)
                .bind(&id)
                .bind(i64::from(expected))
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() != 1 {
                    return Err(RepositoryError::VersionConflict {
                        id,
                        expected,
                        stored: expected + 1,
                    });
                }
            }
            None => {
                sqlx::query(
                    "INSERT INTO quote (id, number, status, company_name, client_name,
                                        client_document, quote_date, total, version, payload,
                                        updated_at_ms)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&id)
                .bind(&number)
                .bind(stamped.status().as_str())
                .bind(company_name)
                .bind(&stamped.client.name)
                .bind(&stamped.client.document)
                .bind(stamped.date.to_string())
                .bind(&total)
                .bind(i64::from(stamped.version))
                .bind(&payload)
                .bind(updated_at_ms)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::debug!(
            event_name = "db.quote.saved",
            quote_id = %id,
            quote_number = %number,
            version = stamped.version,
            "quote saved"
        );
        Ok(stamped)
    }

    async fn list(&self, query: QuoteQuery) -> Result<QuotePage, RepositoryError> {
        let mut count_builder = QueryBuilder::new("SELECT COUNT(*) AS count FROM quote");
        push_filters(&mut count_builder, &query);
        let total: i64 = count_builder
            .build()
            .fetch_one(&self.pool)
            .await?
            .try_get("count")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let mut page_builder = QueryBuilder::new("SELECT payload FROM quote");
        push_filters(&mut page_builder, &query);
        page_builder.push(" ORDER BY updated_at_ms DESC, id DESC LIMIT ");
        page_builder.push_bind(i64::from(query.effective_limit()));
        page_builder.push(" OFFSET ");
        page_builder.push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows = page_builder.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(decode_payload).collect::<Result<Vec<_>, _>>()?;

        Ok(QuotePage::new(items, u64::try_from(total).unwrap_or_default(), &query))
    }

    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM quote WHERE id = ?").bind(&id.0).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.0.clone()));
        }
        tracing::debug!(event_name = "db.quote.deleted", quote_id = %id.0, "quote deleted");
        Ok(())
    }
}
