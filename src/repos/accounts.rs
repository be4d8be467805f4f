use std::{convert::TryFrom, sync::Arc};

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use thiserror::Error;

use crate::{
    database::PostgresConnection,
    identities::domain::users::UserId,
    ledger::domain::{
        accounts::{
            Account, AccountChanges, AccountId, AccountKindName, BalanceError, NewAccount,
            Removal,
        },
        transactions::TransactionId,
    },
    models::{self, ledger::AccountKindColumns},
};

/// Failures of operations that mutate an account's balance.
#[derive(Debug, Error)]
pub enum LedgerPersistenceError {
    #[error("no active account with ID {0}")]
    AccountNotFound(AccountId),

    #[error("no matching transaction with ID {0}")]
    TransactionNotFound(TransactionId),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for LedgerPersistenceError {
    fn from(error: sqlx::Error) -> Self {
        Self::Other(error.into())
    }
}

pub type DynAccountRepo = Arc<dyn AccountRepo + Send + Sync>;

#[async_trait]
pub trait AccountRepo {
    async fn insert_account(&self, account: &NewAccount) -> anyhow::Result<Account>;

    /// Fetch an active account owned by a specific user.
    async fn get_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> anyhow::Result<Option<Account>>;

    /// List the user's active accounts, oldest first.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owner of the accounts.
    /// * `kind` - If provided, only accounts of this kind are listed.
    async fn list_accounts(
        &self,
        user_id: UserId,
        kind: Option<AccountKindName>,
    ) -> anyhow::Result<Vec<Account>>;

    /// Apply a set of changes to an account while holding its lock.
    async fn update_account(
        &self,
        account_id: AccountId,
        changes: AccountChanges,
    ) -> Result<Account, LedgerPersistenceError>;

    async fn remove_account(&self, account: &Account) -> anyhow::Result<()>;
}

/// Lock an active account for the rest of the database transaction.
///
/// Every statement that touches an account's balance goes through this lock,
/// so it must be the first row locked in the transaction.
pub(super) async fn lock_account(
    tx: &mut Transaction<'_, Postgres>,
    account_id: AccountId,
) -> Result<Account, LedgerPersistenceError> {
    let model = sqlx::query_as::<_, models::ledger::Account>(
        r#"
        SELECT *
        FROM account
        WHERE id = $1 AND deleted_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(account_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(LedgerPersistenceError::AccountNotFound(account_id))?;

    Ok(Account::try_from(model).map_err(anyhow::Error::from)?)
}

/// Persist the cached balance of a locked account.
pub(super) async fn save_balance(
    tx: &mut Transaction<'_, Postgres>,
    account: &Account,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE account
        SET balance = $1, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(account.balance)
    .bind(account.id)
    .execute(&mut *tx)
    .await?;

    Ok(())
}

#[async_trait]
impl AccountRepo for PostgresConnection {
    async fn insert_account(&self, account: &NewAccount) -> anyhow::Result<Account> {
        let columns = AccountKindColumns::from(account.kind());

        let model = sqlx::query_as::<_, models::ledger::Account>(
            r#"
            INSERT INTO account (
                user_id, currency_id, kind, name, bank, initial_balance, balance,
                allows_negative, billing_day, payment_day
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(account.user_id())
        .bind(account.currency_id())
        .bind(columns.kind)
        .bind(account.name())
        .bind(account.bank())
        .bind(account.initial_balance())
        .bind(columns.allows_negative)
        .bind(columns.billing_day)
        .bind(columns.payment_day)
        .fetch_one(&**self)
        .await?;

        Ok(Account::try_from(model)?)
    }

    async fn get_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> anyhow::Result<Option<Account>> {
        let model = sqlx::query_as::<_, models::ledger::Account>(
            r#"
            SELECT *
            FROM account
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(&**self)
        .await?;

        Ok(model.map(Account::try_from).transpose()?)
    }

    async fn list_accounts(
        &self,
        user_id: UserId,
        kind: Option<AccountKindName>,
    ) -> anyhow::Result<Vec<Account>> {
        sqlx::query_as::<_, models::ledger::Account>(
            r#"
            SELECT *
            FROM account
            WHERE user_id = $1
                AND deleted_at IS NULL
                AND ($2::TEXT IS NULL OR kind = $2)
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .bind(kind.map(|kind| kind.as_str()))
        .fetch_all(&**self)
        .await?
        .into_iter()
        .map(|model| Account::try_from(model).map_err(anyhow::Error::from))
        .collect()
    }

    async fn update_account(
        &self,
        account_id: AccountId,
        changes: AccountChanges,
    ) -> Result<Account, LedgerPersistenceError> {
        let mut tx = self.begin().await?;

        let mut account = lock_account(&mut tx, account_id).await?;
        account.apply_changes(changes)?;

        let columns = AccountKindColumns::from(account.kind);
        let model = sqlx::query_as::<_, models::ledger::Account>(
            r#"
            UPDATE account
            SET currency_id = $1,
                name = $2,
                bank = $3,
                initial_balance = $4,
                balance = $5,
                billing_day = $6,
                payment_day = $7,
                updated_at = NOW()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(account.currency_id)
        .bind(&account.name)
        .bind(&account.bank)
        .bind(account.initial_balance)
        .bind(account.balance)
        .bind(columns.billing_day)
        .bind(columns.payment_day)
        .bind(account.id)
        .fetch_one(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(Account::try_from(model).map_err(anyhow::Error::from)?)
    }

    async fn remove_account(&self, account: &Account) -> anyhow::Result<()> {
        let statement = match account.removal() {
            Removal::Soft => {
                r#"
                UPDATE account
                SET deleted_at = NOW(), updated_at = NOW()
                WHERE id = $1
                "#
            }
            Removal::Hard => "DELETE FROM account WHERE id = $1",
        };

        sqlx::query(statement)
            .bind(account.id)
            .execute(&**self)
            .await?;

        Ok(())
    }
}
