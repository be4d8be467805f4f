use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use crate::{
    database::PostgresConnection,
    identities::domain::users::UserId,
    ledger::domain::{
        accounts::AccountId,
        transactions::{NewTransaction, Transaction, TransactionCursor, TransactionId},
    },
    models,
};

use super::accounts::{lock_account, save_balance, LedgerPersistenceError};

pub const TRANSACTION_PAGE_SIZE: u8 = 50;

/// Query parameters for listing transactions.
#[derive(Clone, Debug)]
pub struct TransactionQuery {
    /// The owner of the accounts the transactions belong to.
    pub user_id: UserId,
    /// An optional cursor into the transaction list indicating that only
    /// results occurring after the specified position in the list should be
    /// returned.
    pub after: Option<TransactionCursor>,
    /// Only list transactions recorded against this account.
    pub account_id: Option<AccountId>,
    /// Whether soft-deleted transactions are part of the listing.
    pub include_deleted: bool,
}

pub struct TransactionCollection {
    pub next: Option<TransactionCursor>,
    pub items: Vec<Transaction>,
}

impl TransactionCollection {
    /// Build a page from a newest-first list holding up to one more element
    /// than the page size.
    pub(super) fn from_overfetched(mut items: Vec<Transaction>) -> Self {
        // The extra element only signals that another page exists.
        let has_next_page = items.len() > usize::from(TRANSACTION_PAGE_SIZE);
        if has_next_page {
            items.truncate(usize::from(TRANSACTION_PAGE_SIZE));
        }

        let next = if has_next_page {
            items.last().map(Transaction::cursor)
        } else {
            None
        };

        Self { next, items }
    }
}

/// The outcome of recording a transaction.
#[derive(Clone, Debug)]
pub struct RecordedTransaction {
    pub transaction: Transaction,
    /// Set if a transaction with the same operation ID already existed on the
    /// account. The balance is left untouched in that case.
    pub replayed: bool,
}

pub type DynTransactionRepo = Arc<dyn TransactionRepo + Send + Sync>;

#[async_trait]
pub trait TransactionRepo {
    /// Apply a new transaction to its account's balance and persist it.
    ///
    /// The balance check, the new balance and the new transaction are
    /// committed as one unit while the account is locked. If the account
    /// already holds a transaction with the same operation ID, that
    /// transaction is returned instead.
    async fn perform_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<RecordedTransaction, LedgerPersistenceError>;

    /// Fetch a transaction, including soft-deleted ones, from one of the
    /// user's active accounts.
    async fn get_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> anyhow::Result<Option<Transaction>>;

    /// List the transactions matching the provided query.
    ///
    /// # Arguments
    ///
    /// * `query` - The query parameters used to filter the list.
    ///
    /// # Returns
    ///
    /// An [`anyhow::Result`] containing the transaction collection.
    async fn list_transactions(
        &self,
        query: TransactionQuery,
    ) -> anyhow::Result<TransactionCollection>;

    /// Soft-delete an active transaction and remove its amount from the
    /// account's balance.
    async fn delete_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerPersistenceError>;

    /// Undo the soft-deletion of a transaction and apply its amount to the
    /// account's balance again.
    async fn restore_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerPersistenceError>;
}

/// Which state a transaction must be in for a lifecycle change to apply.
#[derive(Clone, Copy)]
enum Lifecycle {
    Delete,
    Restore,
}

impl PostgresConnection {
    async fn change_lifecycle(
        &self,
        transaction_id: TransactionId,
        lifecycle: Lifecycle,
    ) -> Result<Transaction, LedgerPersistenceError> {
        let account_id: Option<AccountId> =
            sqlx::query_scalar(r#"SELECT account_id FROM "transaction" WHERE id = $1"#)
                .bind(transaction_id)
                .fetch_optional(&**self)
                .await?;
        let account_id =
            account_id.ok_or(LedgerPersistenceError::TransactionNotFound(transaction_id))?;

        let mut tx = self.begin().await?;

        // The account lock guards the transaction row as well.
        let mut account = lock_account(&mut tx, account_id).await?;

        let transaction: Transaction = sqlx::query_as::<_, models::ledger::Transaction>(
            r#"SELECT * FROM "transaction" WHERE id = $1"#,
        )
        .bind(transaction_id)
        .fetch_optional(&mut tx)
        .await?
        .map(Into::into)
        .ok_or(LedgerPersistenceError::TransactionNotFound(transaction_id))?;

        let statement = match lifecycle {
            Lifecycle::Delete if !transaction.is_deleted() => {
                account.revert_transaction(transaction.amount)?;

                r#"
                UPDATE "transaction"
                SET deleted_at = NOW(), updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#
            }
            Lifecycle::Restore if transaction.is_deleted() => {
                account.perform_transaction(transaction.amount)?;

                r#"
                UPDATE "transaction"
                SET deleted_at = NULL, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#
            }
            _ => return Err(LedgerPersistenceError::TransactionNotFound(transaction_id)),
        };

        save_balance(&mut tx, &account).await?;

        let updated = sqlx::query_as::<_, models::ledger::Transaction>(statement)
            .bind(transaction_id)
            .fetch_one(&mut tx)
            .await?;

        tx.commit().await?;

        Ok(updated.into())
    }
}

#[async_trait]
impl TransactionRepo for PostgresConnection {
    async fn perform_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<RecordedTransaction, LedgerPersistenceError> {
        let mut tx = self.begin().await?;

        let mut account = lock_account(&mut tx, transaction.account_id()).await?;

        let existing = sqlx::query_as::<_, models::ledger::Transaction>(
            r#"
            SELECT *
            FROM "transaction"
            WHERE account_id = $1 AND operation_id = $2
            "#,
        )
        .bind(account.id)
        .bind(transaction.operation_id())
        .fetch_optional(&mut tx)
        .await?;

        if let Some(existing) = existing {
            debug!(
                account_id = account.id,
                operation_id = %transaction.operation_id(),
                "Transaction was already recorded."
            );

            tx.rollback().await?;

            return Ok(RecordedTransaction {
                transaction: existing.into(),
                replayed: true,
            });
        }

        account.perform_transaction(transaction.amount())?;
        save_balance(&mut tx, &account).await?;

        let created = sqlx::query_as::<_, models::ledger::Transaction>(
            r#"
            INSERT INTO "transaction" (account_id, amount, memo, operation_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(account.id)
        .bind(transaction.amount())
        .bind(transaction.memo())
        .bind(transaction.operation_id())
        .fetch_one(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(RecordedTransaction {
            transaction: created.into(),
            replayed: false,
        })
    }

    async fn get_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> anyhow::Result<Option<Transaction>> {
        let model = sqlx::query_as::<_, models::ledger::Transaction>(
            r#"
            SELECT t.*
            FROM "transaction" t
                JOIN account a ON a.id = t.account_id
            WHERE t.id = $1 AND a.user_id = $2 AND a.deleted_at IS NULL
            "#,
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&**self)
        .await?;

        Ok(model.map(Into::into))
    }

    async fn list_transactions(
        &self,
        query: TransactionQuery,
    ) -> anyhow::Result<TransactionCollection> {
        let mut query_builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            r#"
            SELECT t.*
            FROM "transaction" t
                JOIN account a ON a.id = t.account_id
            WHERE a.deleted_at IS NULL AND a.user_id = "#,
        );
        query_builder.push_bind(query.user_id);

        if let Some(account_id) = query.account_id {
            query_builder
                .push(" AND t.account_id = ")
                .push_bind(account_id);
        }

        if !query.include_deleted {
            query_builder.push(" AND t.deleted_at IS NULL");
        }

        if let Some(cursor) = query.after {
            query_builder
                .push(" AND (t.created_at, t.id) < (")
                .push_bind(cursor.before_created_at)
                .push(", ")
                .push_bind(cursor.before_id)
                .push(")");
        }

        query_builder
            .push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
            // Select one more than the page size so we can determine if there
            // is a next page.
            .push_bind(i16::from(TRANSACTION_PAGE_SIZE) + 1);

        let transactions = query_builder
            .build_query_as::<models::ledger::Transaction>()
            .fetch_all(&**self)
            .await?
            .into_iter()
            .map(Transaction::from)
            .collect();

        Ok(TransactionCollection::from_overfetched(transactions))
    }

    async fn delete_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerPersistenceError> {
        self.change_lifecycle(transaction_id, Lifecycle::Delete)
            .await
    }

    async fn restore_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerPersistenceError> {
        self.change_lifecycle(transaction_id, Lifecycle::Restore)
            .await
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    fn transactions(count: i64) -> Vec<Transaction> {
        let now = Utc::now();

        (0..count)
            .map(|offset| Transaction {
                id: count - offset,
                account_id: 1,
                amount: 100,
                memo: None,
                operation_id: Uuid::new_v4(),
                created_at: now - Duration::seconds(offset),
                updated_at: now,
                deleted_at: None,
            })
            .collect()
    }

    #[test]
    fn full_page_has_no_next_cursor() {
        let page = TransactionCollection::from_overfetched(transactions(50));

        assert_eq!(50, page.items.len());
        assert_eq!(None, page.next);
    }

    #[test]
    fn overfetched_page_points_at_last_item() {
        let page = TransactionCollection::from_overfetched(transactions(51));

        assert_eq!(50, page.items.len());
        assert_eq!(Some(page.items[49].cursor()), page.next);
    }
}
