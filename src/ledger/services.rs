use std::{borrow::Cow, collections::HashMap};

use thiserror::Error;
use tracing::{debug, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    identities::domain::users::UserId,
    repos::{
        transactions::{RecordedTransaction, TransactionCollection, TransactionQuery},
        CurrencyPersistenceError, DynAccountRepo, DynCategoryRepo, DynCurrencyRepo,
        DynTransactionRepo, LedgerPersistenceError,
    },
};

use super::domain::{
    accounts::{
        Account, AccountChanges, AccountId, AccountKindName, BalanceError, NewAccount,
        NewCreditAccountData, NewDebitAccountData,
    },
    categories::{
        Category, CategoryId, CategoryKind, NewCategoryData, NewSubCategoryData, SubCategory,
        SubCategoryId,
    },
    currency::{Currency, CurrencyData, CurrencyId},
    transactions::{NewTransaction, NewTransactionData, Transaction, TransactionId},
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid data: {0}")]
    Invalid(#[from] ValidationErrors),

    /// A debit account without overdraft cannot cover a withdrawal.
    #[error(transparent)]
    InsufficientFunds(BalanceError),

    /// The resource is still referenced by other resources.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<LedgerPersistenceError> for LedgerError {
    fn from(error: LedgerPersistenceError) -> Self {
        match error {
            LedgerPersistenceError::AccountNotFound(_) => Self::NotFound("account"),
            LedgerPersistenceError::TransactionNotFound(_) => Self::NotFound("transaction"),
            LedgerPersistenceError::Balance(error @ BalanceError::InsufficientFunds { .. }) => {
                Self::InsufficientFunds(error)
            }
            LedgerPersistenceError::Balance(BalanceError::Overflow(_)) => Self::Invalid(
                field_error("amount", "overflow", "The account balance would overflow."),
            ),
            LedgerPersistenceError::Other(error) => Self::Other(error),
        }
    }
}

impl From<CurrencyPersistenceError> for LedgerError {
    fn from(error: CurrencyPersistenceError) -> Self {
        match error {
            CurrencyPersistenceError::DuplicateName(_) => Self::Invalid(field_error(
                "name",
                "unique",
                "A currency with this name already exists.",
            )),
            error @ CurrencyPersistenceError::InUse(_) => Self::Conflict(error.to_string()),
            CurrencyPersistenceError::Other(error) => Self::Other(error),
        }
    }
}

/// Build a set of validation errors holding a single error for one field.
pub fn field_error(
    field: &'static str,
    code: &'static str,
    message: &'static str,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        field,
        ValidationError {
            code: Cow::from(code),
            message: Some(Cow::from(message)),
            params: HashMap::new(),
        },
    );

    errors
}

#[derive(Clone)]
pub struct LedgerService {
    account_repo: DynAccountRepo,
    category_repo: DynCategoryRepo,
    currency_repo: DynCurrencyRepo,
    transaction_repo: DynTransactionRepo,
}

impl LedgerService {
    pub fn new(
        account_repo: DynAccountRepo,
        category_repo: DynCategoryRepo,
        currency_repo: DynCurrencyRepo,
        transaction_repo: DynTransactionRepo,
    ) -> Self {
        Self {
            account_repo,
            category_repo,
            currency_repo,
            transaction_repo,
        }
    }

    async fn require_currency(&self, currency_id: CurrencyId) -> Result<(), LedgerError> {
        match self.currency_repo.get_currency(currency_id).await? {
            Some(_) => Ok(()),
            None => Err(field_error(
                "currency_id",
                "exists",
                "No currency exists with this ID.",
            )
            .into()),
        }
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account, LedgerError> {
        self.require_currency(account.currency_id()).await?;

        let account = self.account_repo.insert_account(&account).await?;

        info!(
            account_id = account.id,
            user_id = account.user_id,
            kind = account.kind.name().as_str(),
            "Created account."
        );

        Ok(account)
    }

    pub async fn create_debit_account(
        &self,
        user_id: UserId,
        data: NewDebitAccountData,
    ) -> Result<Account, LedgerError> {
        self.create_account(NewAccount::debit(user_id, data)?).await
    }

    pub async fn create_credit_account(
        &self,
        user_id: UserId,
        data: NewCreditAccountData,
    ) -> Result<Account, LedgerError> {
        self.create_account(NewAccount::credit(user_id, data)?).await
    }

    /// Fetch one of the user's active accounts.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user performing the request.
    /// * `account_id` - The ID of the account.
    /// * `kind` - If provided, accounts of a different kind are treated as
    ///   missing.
    pub async fn get_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
        kind: Option<AccountKindName>,
    ) -> Result<Account, LedgerError> {
        self.account_repo
            .get_account(user_id, account_id)
            .await?
            .filter(|account| kind.map_or(true, |kind| account.kind.name() == kind))
            .ok_or(LedgerError::NotFound("account"))
    }

    pub async fn list_accounts(
        &self,
        user_id: UserId,
        kind: Option<AccountKindName>,
    ) -> Result<Vec<Account>, LedgerError> {
        Ok(self.account_repo.list_accounts(user_id, kind).await?)
    }

    pub async fn update_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
        kind: AccountKindName,
        changes: AccountChanges,
    ) -> Result<Account, LedgerError> {
        changes.validate()?;

        self.get_account(user_id, account_id, Some(kind)).await?;
        if let Some(currency_id) = changes.currency_id {
            self.require_currency(currency_id).await?;
        }

        let account = self
            .account_repo
            .update_account(account_id, changes)
            .await
            .map_err(|error| match error {
                LedgerPersistenceError::Balance(BalanceError::Overflow(_)) => {
                    LedgerError::Invalid(field_error(
                        "initial_balance",
                        "overflow",
                        "The account balance would overflow.",
                    ))
                }
                other => other.into(),
            })?;

        info!(account_id, balance = account.balance, "Updated account.");

        Ok(account)
    }

    /// Delete one of the user's accounts. Debit accounts keep their history,
    /// credit accounts are removed along with their transactions.
    pub async fn delete_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
        kind: AccountKindName,
    ) -> Result<(), LedgerError> {
        let account = self.get_account(user_id, account_id, Some(kind)).await?;

        self.account_repo.remove_account(&account).await?;

        info!(account_id, removal = ?account.removal(), "Deleted account.");

        Ok(())
    }

    /// Record a new transaction against one of the user's accounts.
    ///
    /// # Returns
    ///
    /// The recorded transaction. If the operation ID was already used on the
    /// account, the existing transaction is returned and marked as replayed.
    pub async fn perform_transaction(
        &self,
        user_id: UserId,
        data: NewTransactionData,
    ) -> Result<RecordedTransaction, LedgerError> {
        let transaction = NewTransaction::from_data(data)?;

        self.get_account(user_id, transaction.account_id(), None)
            .await?;

        let recorded = self
            .transaction_repo
            .perform_transaction(&transaction)
            .await?;

        if recorded.replayed {
            debug!(
                transaction_id = recorded.transaction.id,
                operation_id = %transaction.operation_id(),
                "Returning replayed transaction."
            );
        } else {
            info!(
                transaction_id = recorded.transaction.id,
                account_id = transaction.account_id(),
                amount = transaction.amount(),
                "Performed transaction."
            );
        }

        Ok(recorded)
    }

    pub async fn get_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.transaction_repo
            .get_transaction(user_id, transaction_id)
            .await?
            .ok_or(LedgerError::NotFound("transaction"))
    }

    pub async fn list_transactions(
        &self,
        query: TransactionQuery,
    ) -> Result<TransactionCollection, LedgerError> {
        if let Some(account_id) = query.account_id {
            self.get_account(query.user_id, account_id, None).await?;
        }

        Ok(self.transaction_repo.list_transactions(query).await?)
    }

    /// Soft-delete a transaction, removing its amount from the balance.
    pub async fn delete_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.get_transaction(user_id, transaction_id).await?;

        let transaction = self
            .transaction_repo
            .delete_transaction(transaction_id)
            .await?;

        info!(transaction_id, account_id = transaction.account_id, "Deleted transaction.");

        Ok(transaction)
    }

    /// Restore a soft-deleted transaction, applying its amount to the balance
    /// again under the overdraft rule.
    pub async fn restore_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.get_transaction(user_id, transaction_id).await?;

        let transaction = self
            .transaction_repo
            .restore_transaction(transaction_id)
            .await?;

        info!(transaction_id, account_id = transaction.account_id, "Restored transaction.");

        Ok(transaction)
    }

    pub async fn list_currencies(&self) -> Result<Vec<Currency>, LedgerError> {
        Ok(self.currency_repo.list_currencies().await?)
    }

    pub async fn get_currency(&self, currency_id: CurrencyId) -> Result<Currency, LedgerError> {
        self.currency_repo
            .get_currency(currency_id)
            .await?
            .ok_or(LedgerError::NotFound("currency"))
    }

    pub async fn create_currency(&self, data: CurrencyData) -> Result<Currency, LedgerError> {
        data.validate()?;

        let currency = self.currency_repo.insert_currency(data.name.trim()).await?;

        info!(currency_id = currency.id, name = %currency.name, "Created currency.");

        Ok(currency)
    }

    pub async fn rename_currency(
        &self,
        currency_id: CurrencyId,
        data: CurrencyData,
    ) -> Result<Currency, LedgerError> {
        data.validate()?;

        self.currency_repo
            .rename_currency(currency_id, data.name.trim())
            .await?
            .ok_or(LedgerError::NotFound("currency"))
    }

    pub async fn delete_currency(&self, currency_id: CurrencyId) -> Result<(), LedgerError> {
        if self.currency_repo.delete_currency(currency_id).await? {
            info!(currency_id, "Deleted currency.");

            Ok(())
        } else {
            Err(LedgerError::NotFound("currency"))
        }
    }

    pub async fn list_categories(
        &self,
        user_id: UserId,
        kind: Option<CategoryKind>,
    ) -> Result<Vec<Category>, LedgerError> {
        Ok(self.category_repo.list_categories(user_id, kind).await?)
    }

    pub async fn create_category(
        &self,
        user_id: UserId,
        data: NewCategoryData,
    ) -> Result<Category, LedgerError> {
        data.validate()?;

        Ok(self.category_repo.insert_category(user_id, &data).await?)
    }

    pub async fn delete_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> Result<(), LedgerError> {
        if self
            .category_repo
            .delete_category(user_id, category_id)
            .await?
        {
            Ok(())
        } else {
            Err(LedgerError::NotFound("category"))
        }
    }

    pub async fn create_sub_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
        data: NewSubCategoryData,
    ) -> Result<SubCategory, LedgerError> {
        data.validate()?;

        let category = self
            .category_repo
            .get_category(user_id, category_id)
            .await?
            .ok_or(LedgerError::NotFound("category"))?;

        Ok(self
            .category_repo
            .insert_sub_category(category.id, &data.name)
            .await?)
    }

    pub async fn delete_sub_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
        sub_category_id: SubCategoryId,
    ) -> Result<(), LedgerError> {
        if self
            .category_repo
            .delete_sub_category(user_id, category_id, sub_category_id)
            .await?
        {
            Ok(())
        } else {
            Err(LedgerError::NotFound("sub-category"))
        }
    }
}
