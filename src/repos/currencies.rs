use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    database::{foreign_key_violation, unique_violation, PostgresConnection},
    ledger::domain::currency::{Currency, CurrencyId},
    models,
};

#[derive(Debug, Error)]
pub enum CurrencyPersistenceError {
    #[error("a currency named {0:?} already exists")]
    DuplicateName(String),

    #[error("currency {0} is used by at least one account")]
    InUse(CurrencyId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DynCurrencyRepo = Arc<dyn CurrencyRepo + Send + Sync>;

#[async_trait]
pub trait CurrencyRepo {
    async fn insert_currency(&self, name: &str) -> Result<Currency, CurrencyPersistenceError>;

    async fn get_currency(&self, currency_id: CurrencyId) -> anyhow::Result<Option<Currency>>;

    async fn list_currencies(&self) -> anyhow::Result<Vec<Currency>>;

    /// Rename a currency. Returns `None` if it does not exist.
    async fn rename_currency(
        &self,
        currency_id: CurrencyId,
        name: &str,
    ) -> Result<Option<Currency>, CurrencyPersistenceError>;

    /// Delete a currency. Returns `false` if it does not exist.
    async fn delete_currency(
        &self,
        currency_id: CurrencyId,
    ) -> Result<bool, CurrencyPersistenceError>;
}

fn map_write_error(
    error: sqlx::Error,
    currency_id: CurrencyId,
    name: &str,
) -> CurrencyPersistenceError {
    if unique_violation(&error).is_some() {
        CurrencyPersistenceError::DuplicateName(name.to_owned())
    } else if foreign_key_violation(&error).is_some() {
        CurrencyPersistenceError::InUse(currency_id)
    } else {
        CurrencyPersistenceError::Other(error.into())
    }
}

#[async_trait]
impl CurrencyRepo for PostgresConnection {
    async fn insert_currency(&self, name: &str) -> Result<Currency, CurrencyPersistenceError> {
        let model = sqlx::query_as::<_, models::ledger::Currency>(
            r#"
            INSERT INTO currency (name)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(name)
        .fetch_one(&**self)
        .await
        .map_err(|error| map_write_error(error, 0, name))?;

        Ok(model.into())
    }

    async fn get_currency(&self, currency_id: CurrencyId) -> anyhow::Result<Option<Currency>> {
        let model = sqlx::query_as::<_, models::ledger::Currency>(
            "SELECT * FROM currency WHERE id = $1",
        )
        .bind(currency_id)
        .fetch_optional(&**self)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn list_currencies(&self) -> anyhow::Result<Vec<Currency>> {
        let models = sqlx::query_as::<_, models::ledger::Currency>(
            "SELECT * FROM currency ORDER BY name",
        )
        .fetch_all(&**self)
        .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn rename_currency(
        &self,
        currency_id: CurrencyId,
        name: &str,
    ) -> Result<Option<Currency>, CurrencyPersistenceError> {
        let model = sqlx::query_as::<_, models::ledger::Currency>(
            r#"
            UPDATE currency
            SET name = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(currency_id)
        .fetch_optional(&**self)
        .await
        .map_err(|error| map_write_error(error, currency_id, name))?;

        Ok(model.map(Into::into))
    }

    async fn delete_currency(
        &self,
        currency_id: CurrencyId,
    ) -> Result<bool, CurrencyPersistenceError> {
        let result = sqlx::query("DELETE FROM currency WHERE id = $1")
            .bind(currency_id)
            .execute(&**self)
            .await
            .map_err(|error| map_write_error(error, currency_id, ""))?;

        Ok(result.rows_affected() > 0)
    }
}
