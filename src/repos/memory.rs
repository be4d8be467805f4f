use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;

use crate::{
    identities::domain::users::{NewUser, User, UserChanges, UserId},
    ledger::domain::{
        accounts::{Account, AccountChanges, AccountId, AccountKindName, NewAccount, Removal},
        categories::{
            Category, CategoryId, CategoryKind, NewCategoryData, SubCategory, SubCategoryId,
        },
        currency::{Currency, CurrencyId},
        transactions::{NewTransaction, Transaction, TransactionId},
    },
    passwords,
    places::domain::{NewPlace, Place, PlaceId},
};

use super::{
    accounts::{AccountRepo, LedgerPersistenceError},
    categories::CategoryRepo,
    currencies::{CurrencyPersistenceError, CurrencyRepo},
    places::PlaceRepo,
    transactions::{
        RecordedTransaction, TransactionCollection, TransactionQuery, TransactionRepo,
        TRANSACTION_PAGE_SIZE,
    },
    users::{UserPersistenceError, UserRepo},
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: Vec<User>,
    currencies: Vec<Currency>,
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    categories: Vec<Category>,
    places: Vec<Place>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn active_account_mut(&mut self, account_id: AccountId) -> Option<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|account| account.id == account_id && !account.is_deleted())
    }

    fn owns_active_account(&self, user_id: UserId, account_id: AccountId) -> bool {
        self.accounts.iter().any(|account| {
            account.id == account_id && account.user_id == user_id && !account.is_deleted()
        })
    }
}

/// Repositories backed by process memory.
///
/// Every operation runs under a single lock, which also serializes balance
/// mutations. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("memory store lock is poisoned"))
    }
}

#[async_trait]
impl AccountRepo for MemoryStore {
    async fn insert_account(&self, account: &NewAccount) -> anyhow::Result<Account> {
        let mut tables = self.lock()?;
        let now = Utc::now();

        let account = Account {
            id: tables.next_id(),
            user_id: account.user_id(),
            currency_id: account.currency_id(),
            kind: account.kind(),
            name: account.name().to_owned(),
            bank: account.bank().to_owned(),
            initial_balance: account.initial_balance(),
            balance: account.initial_balance(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.accounts.push(account.clone());

        Ok(account)
    }

    async fn get_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> anyhow::Result<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .iter()
            .find(|account| {
                account.id == account_id && account.user_id == user_id && !account.is_deleted()
            })
            .cloned())
    }

    async fn list_accounts(
        &self,
        user_id: UserId,
        kind: Option<AccountKindName>,
    ) -> anyhow::Result<Vec<Account>> {
        Ok(self
            .lock()?
            .accounts
            .iter()
            .filter(|account| account.user_id == user_id && !account.is_deleted())
            .filter(|account| kind.map_or(true, |kind| account.kind.name() == kind))
            .cloned()
            .collect())
    }

    async fn update_account(
        &self,
        account_id: AccountId,
        changes: AccountChanges,
    ) -> Result<Account, LedgerPersistenceError> {
        let mut tables = self.lock()?;
        let account = tables
            .active_account_mut(account_id)
            .ok_or(LedgerPersistenceError::AccountNotFound(account_id))?;

        account.apply_changes(changes)?;
        account.updated_at = Utc::now();

        Ok(account.clone())
    }

    async fn remove_account(&self, account: &Account) -> anyhow::Result<()> {
        let mut tables = self.lock()?;

        match account.removal() {
            Removal::Soft => {
                let now = Utc::now();
                if let Some(stored) = tables.active_account_mut(account.id) {
                    stored.deleted_at = Some(now);
                    stored.updated_at = now;
                }
            }
            Removal::Hard => {
                tables.accounts.retain(|stored| stored.id != account.id);
                tables
                    .transactions
                    .retain(|transaction| transaction.account_id != account.id);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TransactionRepo for MemoryStore {
    async fn perform_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<RecordedTransaction, LedgerPersistenceError> {
        let mut tables = self.lock()?;
        let account_id = transaction.account_id();

        let mut account = tables
            .active_account_mut(account_id)
            .ok_or(LedgerPersistenceError::AccountNotFound(account_id))?
            .clone();

        let existing = tables.transactions.iter().find(|existing| {
            existing.account_id == account_id
                && existing.operation_id == transaction.operation_id()
        });
        if let Some(existing) = existing {
            return Ok(RecordedTransaction {
                transaction: existing.clone(),
                replayed: true,
            });
        }

        account.perform_transaction(transaction.amount())?;

        let now = Utc::now();
        account.updated_at = now;
        let created = Transaction {
            id: tables.next_id(),
            account_id,
            amount: transaction.amount(),
            memo: transaction.memo().map(str::to_owned),
            operation_id: transaction.operation_id(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        tables.transactions.push(created.clone());
        if let Some(stored) = tables.active_account_mut(account_id) {
            *stored = account;
        }

        Ok(RecordedTransaction {
            transaction: created,
            replayed: false,
        })
    }

    async fn get_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> anyhow::Result<Option<Transaction>> {
        let tables = self.lock()?;

        Ok(tables
            .transactions
            .iter()
            .find(|transaction| {
                transaction.id == transaction_id
                    && tables.owns_active_account(user_id, transaction.account_id)
            })
            .cloned())
    }

    async fn list_transactions(
        &self,
        query: TransactionQuery,
    ) -> anyhow::Result<TransactionCollection> {
        let tables = self.lock()?;

        let mut transactions = tables
            .transactions
            .iter()
            .filter(|transaction| tables.owns_active_account(query.user_id, transaction.account_id))
            .filter(|transaction| {
                query
                    .account_id
                    .map_or(true, |account_id| transaction.account_id == account_id)
            })
            .filter(|transaction| query.include_deleted || !transaction.is_deleted())
            .filter(|transaction| query.after.map_or(true, |cursor| cursor.precedes(transaction)))
            .cloned()
            .collect::<Vec<_>>();

        transactions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        transactions.truncate(usize::from(TRANSACTION_PAGE_SIZE) + 1);

        Ok(TransactionCollection::from_overfetched(transactions))
    }

    async fn delete_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerPersistenceError> {
        let mut tables = self.lock()?;
        let transaction = tables
            .transactions
            .iter()
            .find(|transaction| transaction.id == transaction_id && !transaction.is_deleted())
            .cloned()
            .ok_or(LedgerPersistenceError::TransactionNotFound(transaction_id))?;

        let account = tables
            .active_account_mut(transaction.account_id)
            .ok_or(LedgerPersistenceError::AccountNotFound(transaction.account_id))?;
        account.revert_transaction(transaction.amount)?;

        update_transaction(&mut tables, transaction_id, |transaction| {
            transaction.deleted_at = Some(Utc::now());
        })
    }

    async fn restore_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerPersistenceError> {
        let mut tables = self.lock()?;
        let transaction = tables
            .transactions
            .iter()
            .find(|transaction| transaction.id == transaction_id && transaction.is_deleted())
            .cloned()
            .ok_or(LedgerPersistenceError::TransactionNotFound(transaction_id))?;

        let account = tables
            .active_account_mut(transaction.account_id)
            .ok_or(LedgerPersistenceError::AccountNotFound(transaction.account_id))?;
        account.perform_transaction(transaction.amount)?;

        update_transaction(&mut tables, transaction_id, |transaction| {
            transaction.deleted_at = None;
        })
    }
}

fn update_transaction<F>(
    tables: &mut Tables,
    transaction_id: TransactionId,
    change: F,
) -> Result<Transaction, LedgerPersistenceError>
where
    F: FnOnce(&mut Transaction),
{
    let transaction = tables
        .transactions
        .iter_mut()
        .find(|transaction| transaction.id == transaction_id)
        .ok_or(LedgerPersistenceError::TransactionNotFound(transaction_id))?;

    change(transaction);
    transaction.updated_at = Utc::now();

    Ok(transaction.clone())
}

#[async_trait]
impl CurrencyRepo for MemoryStore {
    async fn insert_currency(&self, name: &str) -> Result<Currency, CurrencyPersistenceError> {
        let mut tables = self.lock()?;
        if tables.currencies.iter().any(|currency| currency.name == name) {
            return Err(CurrencyPersistenceError::DuplicateName(name.to_owned()));
        }

        let now = Utc::now();
        let currency = Currency {
            id: tables.next_id(),
            name: name.to_owned(),
            created_at: now,
            updated_at: now,
        };
        tables.currencies.push(currency.clone());

        Ok(currency)
    }

    async fn get_currency(&self, currency_id: CurrencyId) -> anyhow::Result<Option<Currency>> {
        Ok(self
            .lock()?
            .currencies
            .iter()
            .find(|currency| currency.id == currency_id)
            .cloned())
    }

    async fn list_currencies(&self) -> anyhow::Result<Vec<Currency>> {
        let mut currencies = self.lock()?.currencies.clone();
        currencies.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(currencies)
    }

    async fn rename_currency(
        &self,
        currency_id: CurrencyId,
        name: &str,
    ) -> Result<Option<Currency>, CurrencyPersistenceError> {
        let mut tables = self.lock()?;
        if tables
            .currencies
            .iter()
            .any(|currency| currency.name == name && currency.id != currency_id)
        {
            return Err(CurrencyPersistenceError::DuplicateName(name.to_owned()));
        }

        Ok(tables
            .currencies
            .iter_mut()
            .find(|currency| currency.id == currency_id)
            .map(|currency| {
                currency.name = name.to_owned();
                currency.updated_at = Utc::now();

                currency.clone()
            }))
    }

    async fn delete_currency(
        &self,
        currency_id: CurrencyId,
    ) -> Result<bool, CurrencyPersistenceError> {
        let mut tables = self.lock()?;
        if tables
            .accounts
            .iter()
            .any(|account| account.currency_id == currency_id)
        {
            return Err(CurrencyPersistenceError::InUse(currency_id));
        }

        let count = tables.currencies.len();
        tables.currencies.retain(|currency| currency.id != currency_id);

        Ok(tables.currencies.len() < count)
    }
}

#[async_trait]
impl CategoryRepo for MemoryStore {
    async fn insert_category(
        &self,
        user_id: UserId,
        category: &NewCategoryData,
    ) -> anyhow::Result<Category> {
        let mut tables = self.lock()?;
        let now = Utc::now();

        let category = Category {
            id: tables.next_id(),
            user_id,
            name: category.name.to_owned(),
            kind: category.kind,
            color: category.color.to_owned(),
            sub_categories: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());

        Ok(category)
    }

    async fn get_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> anyhow::Result<Option<Category>> {
        Ok(self
            .lock()?
            .categories
            .iter()
            .find(|category| category.id == category_id && category.user_id == user_id)
            .cloned())
    }

    async fn list_categories(
        &self,
        user_id: UserId,
        kind: Option<CategoryKind>,
    ) -> anyhow::Result<Vec<Category>> {
        let mut categories = self
            .lock()?
            .categories
            .iter()
            .filter(|category| category.user_id == user_id)
            .filter(|category| kind.map_or(true, |kind| category.kind == kind))
            .cloned()
            .collect::<Vec<_>>();
        categories.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));

        Ok(categories)
    }

    async fn delete_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
    ) -> anyhow::Result<bool> {
        let mut tables = self.lock()?;
        let count = tables.categories.len();
        tables
            .categories
            .retain(|category| !(category.id == category_id && category.user_id == user_id));

        Ok(tables.categories.len() < count)
    }

    async fn insert_sub_category(
        &self,
        category_id: CategoryId,
        name: &str,
    ) -> anyhow::Result<SubCategory> {
        let mut tables = self.lock()?;
        let id = tables.next_id();
        let now = Utc::now();

        let category = tables
            .categories
            .iter_mut()
            .find(|category| category.id == category_id)
            .ok_or_else(|| anyhow!("no category with ID {}", category_id))?;

        let sub_category = SubCategory {
            id,
            category_id,
            name: name.to_owned(),
            created_at: now,
            updated_at: now,
        };
        category.sub_categories.push(sub_category.clone());
        category
            .sub_categories
            .sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));

        Ok(sub_category)
    }

    async fn delete_sub_category(
        &self,
        user_id: UserId,
        category_id: CategoryId,
        sub_category_id: SubCategoryId,
    ) -> anyhow::Result<bool> {
        let mut tables = self.lock()?;

        Ok(tables
            .categories
            .iter_mut()
            .find(|category| category.id == category_id && category.user_id == user_id)
            .map(|category| {
                let count = category.sub_categories.len();
                category
                    .sub_categories
                    .retain(|sub_category| sub_category.id != sub_category_id);

                category.sub_categories.len() < count
            })
            .unwrap_or(false))
    }
}

#[async_trait]
impl PlaceRepo for MemoryStore {
    async fn insert_place(&self, place: &NewPlace) -> anyhow::Result<Place> {
        let mut tables = self.lock()?;
        let now = Utc::now();

        let place = Place {
            id: tables.next_id(),
            name: place.name.to_owned(),
            photo_uri: place.photo_uri.to_owned(),
            latitude: place.latitude,
            longitude: place.longitude,
            created_at: now,
            updated_at: now,
        };
        tables.places.push(place.clone());

        Ok(place)
    }

    async fn get_place(&self, place_id: PlaceId) -> anyhow::Result<Option<Place>> {
        Ok(self
            .lock()?
            .places
            .iter()
            .find(|place| place.id == place_id)
            .cloned())
    }

    async fn list_places(&self) -> anyhow::Result<Vec<Place>> {
        let mut places = self.lock()?.places.clone();
        places.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));

        Ok(places)
    }

    async fn save_place(&self, place: &Place) -> anyhow::Result<Place> {
        let mut tables = self.lock()?;
        let stored = tables
            .places
            .iter_mut()
            .find(|stored| stored.id == place.id)
            .ok_or_else(|| anyhow!("no place with ID {}", place.id))?;

        *stored = Place {
            updated_at: Utc::now(),
            ..place.clone()
        };

        Ok(stored.clone())
    }

    async fn delete_place(&self, place_id: PlaceId) -> anyhow::Result<bool> {
        let mut tables = self.lock()?;
        let count = tables.places.len();
        tables.places.retain(|place| place.id != place_id);

        Ok(tables.places.len() < count)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert_user(
        &self,
        user: &NewUser,
        password_hash: &passwords::Hash,
    ) -> Result<User, UserPersistenceError> {
        let mut tables = self.lock()?;
        check_unique(&tables, None, Some(user.username()), Some(user.email().address()))?;

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            first_name: user.first_name().to_owned(),
            last_name: user.last_name().to_owned(),
            username: user.username().to_owned(),
            email: user.email().address().to_owned(),
            role: user.role(),
            password_hash: password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> anyhow::Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|user| user.id == user_id)
            .cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.lock()?.users.clone())
    }

    async fn update_user(
        &self,
        user_id: UserId,
        changes: &UserChanges,
        password_hash: Option<&passwords::Hash>,
    ) -> Result<Option<User>, UserPersistenceError> {
        let mut tables = self.lock()?;
        check_unique(
            &tables,
            Some(user_id),
            changes.username.as_deref(),
            changes.email.as_ref().map(|email| email.address()),
        )?;

        Ok(tables
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .map(|user| {
                if let Some(first_name) = &changes.first_name {
                    user.first_name = first_name.to_owned();
                }
                if let Some(last_name) = &changes.last_name {
                    user.last_name = last_name.to_owned();
                }
                if let Some(username) = &changes.username {
                    user.username = username.to_owned();
                }
                if let Some(email) = &changes.email {
                    user.email = email.address().to_owned();
                }
                if let Some(hash) = password_hash {
                    user.password_hash = hash.clone();
                }
                if let Some(role) = changes.role {
                    user.role = role;
                }
                user.updated_at = Utc::now();

                user.clone()
            }))
    }

    async fn delete_user(&self, user_id: UserId) -> anyhow::Result<bool> {
        let mut tables = self.lock()?;
        let count = tables.users.len();
        tables.users.retain(|user| user.id != user_id);

        let owned_accounts = tables
            .accounts
            .iter()
            .filter(|account| account.user_id == user_id)
            .map(|account| account.id)
            .collect::<Vec<_>>();
        tables
            .transactions
            .retain(|transaction| !owned_accounts.contains(&transaction.account_id));
        tables.accounts.retain(|account| account.user_id != user_id);
        tables.categories.retain(|category| category.user_id != user_id);

        Ok(tables.users.len() < count)
    }
}

fn check_unique(
    tables: &Tables,
    user_id: Option<UserId>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<(), UserPersistenceError> {
    let others = || tables.users.iter().filter(|user| Some(user.id) != user_id);

    if let Some(username) = username {
        if others().any(|user| user.username == username) {
            return Err(UserPersistenceError::DuplicateUsername(username.to_owned()));
        }
    }
    if let Some(email) = email {
        if others().any(|user| user.email == email) {
            return Err(UserPersistenceError::DuplicateEmail(email.to_owned()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use crate::ledger::domain::{
        accounts::{AccountKind, BalanceError, NewDebitAccountData},
        transactions::NewTransactionData,
    };

    use super::*;

    async fn strict_account(store: &MemoryStore, initial_balance: i64) -> Account {
        let account = NewAccount::debit(
            1,
            NewDebitAccountData {
                name: "Checking".to_owned(),
                bank: "Bank".to_owned(),
                initial_balance,
                allows_negative: false,
                currency_id: 1,
            },
        )
        .unwrap();

        store.insert_account(&account).await.unwrap()
    }

    fn new_transaction(account_id: AccountId, amount: i64) -> NewTransaction {
        NewTransaction::from_data(NewTransactionData {
            account_id,
            amount,
            memo: None,
            operation_id: None,
        })
        .unwrap()
    }

    async fn balance(store: &MemoryStore, account_id: AccountId) -> i64 {
        store
            .get_account(1, account_id)
            .await
            .unwrap()
            .expect("account exists")
            .balance
    }

    #[tokio::test]
    async fn failed_transaction_changes_nothing() {
        let store = MemoryStore::new();
        let account = strict_account(&store, 100).await;

        let error = store
            .perform_transaction(&new_transaction(account.id, -101))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            LedgerPersistenceError::Balance(BalanceError::InsufficientFunds { .. })
        ));
        assert_eq!(100, balance(&store, account.id).await);

        let listed = store
            .list_transactions(TransactionQuery {
                user_id: 1,
                after: None,
                account_id: None,
                include_deleted: true,
            })
            .await
            .unwrap();
        assert!(listed.items.is_empty());
    }

    #[tokio::test]
    async fn replayed_operation_is_not_applied_twice() {
        let store = MemoryStore::new();
        let account = strict_account(&store, 0).await;
        let transaction = NewTransaction::from_data(NewTransactionData {
            account_id: account.id,
            amount: 500,
            memo: Some("Paycheck".to_owned()),
            operation_id: Some(Uuid::new_v4()),
        })
        .unwrap();

        let first = store.perform_transaction(&transaction).await.unwrap();
        let second = store.perform_transaction(&transaction).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.transaction, second.transaction);
        assert_eq!(500, balance(&store, account.id).await);
    }

    #[tokio::test]
    async fn delete_and_restore_round_trip() {
        let store = MemoryStore::new();
        let account = strict_account(&store, 0).await;
        let deposit = store
            .perform_transaction(&new_transaction(account.id, 300))
            .await
            .unwrap()
            .transaction;

        let deleted = store.delete_transaction(deposit.id).await.unwrap();
        assert!(deleted.is_deleted());
        assert_eq!(0, balance(&store, account.id).await);

        assert!(matches!(
            store.delete_transaction(deposit.id).await,
            Err(LedgerPersistenceError::TransactionNotFound(_))
        ));

        let restored = store.restore_transaction(deposit.id).await.unwrap();
        assert!(!restored.is_deleted());
        assert_eq!(300, balance(&store, account.id).await);
    }

    #[tokio::test]
    async fn restore_is_subject_to_overdraft_rule() {
        let store = MemoryStore::new();
        let account = strict_account(&store, 100).await;
        let withdrawal = store
            .perform_transaction(&new_transaction(account.id, -80))
            .await
            .unwrap()
            .transaction;
        store.delete_transaction(withdrawal.id).await.unwrap();
        store
            .perform_transaction(&new_transaction(account.id, -90))
            .await
            .unwrap();

        let error = store.restore_transaction(withdrawal.id).await.unwrap_err();

        assert!(matches!(error, LedgerPersistenceError::Balance(_)));
        assert_eq!(10, balance(&store, account.id).await);
    }

    #[tokio::test]
    async fn soft_deleted_account_rejects_transactions() {
        let store = MemoryStore::new();
        let account = strict_account(&store, 0).await;
        store.remove_account(&account).await.unwrap();

        let error = store
            .perform_transaction(&new_transaction(account.id, 10))
            .await
            .unwrap_err();

        assert!(matches!(error, LedgerPersistenceError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn credit_account_removal_drops_history() {
        let store = MemoryStore::new();
        let card = store
            .insert_account(
                &NewAccount::credit(
                    1,
                    crate::ledger::domain::accounts::NewCreditAccountData {
                        name: "Card".to_owned(),
                        bank: "Bank".to_owned(),
                        initial_balance: 0,
                        currency_id: 1,
                        billing_day: 1,
                        payment_day: 15,
                    },
                )
                .unwrap(),
            )
            .await
            .unwrap();
        assert!(matches!(card.kind, AccountKind::Credit { .. }));

        let charge = store
            .perform_transaction(&new_transaction(card.id, -2500))
            .await
            .unwrap()
            .transaction;
        store.remove_account(&card).await.unwrap();

        assert!(store.get_transaction(1, charge.id).await.unwrap().is_none());
        assert!(store.lock().unwrap().transactions.is_empty());
    }

    #[tokio::test]
    async fn listing_pages_newest_first() {
        let store = MemoryStore::new();
        let account = strict_account(&store, 0).await;
        for _ in 0..55 {
            store
                .perform_transaction(&new_transaction(account.id, 1))
                .await
                .unwrap();
        }

        let query = TransactionQuery {
            user_id: 1,
            after: None,
            account_id: Some(account.id),
            include_deleted: false,
        };
        let first = store.list_transactions(query.clone()).await.unwrap();
        let second = store
            .list_transactions(TransactionQuery {
                after: first.next,
                ..query
            })
            .await
            .unwrap();

        assert_eq!(50, first.items.len());
        assert_eq!(5, second.items.len());
        assert_eq!(None, second.next);
        assert!(first.items[49].id > second.items[0].id);
        assert!(first.items.windows(2).all(|pair| pair[0].id > pair[1].id));
    }

    #[tokio::test]
    async fn other_users_cannot_see_transactions() {
        let store = MemoryStore::new();
        let account = strict_account(&store, 0).await;
        let deposit = store
            .perform_transaction(&new_transaction(account.id, 10))
            .await
            .unwrap()
            .transaction;

        assert!(store.get_transaction(2, deposit.id).await.unwrap().is_none());
        assert!(store.get_account(2, account.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn currency_in_use_cannot_be_deleted() {
        let store = MemoryStore::new();
        let currency = store.insert_currency("EUR").await.unwrap();
        store
            .insert_account(
                &NewAccount::debit(
                    1,
                    NewDebitAccountData {
                        name: "Checking".to_owned(),
                        bank: "Bank".to_owned(),
                        initial_balance: 0,
                        allows_negative: false,
                        currency_id: currency.id,
                    },
                )
                .unwrap(),
            )
            .await
            .unwrap();

        assert!(matches!(
            store.insert_currency("EUR").await,
            Err(CurrencyPersistenceError::DuplicateName(_))
        ));
        assert!(matches!(
            store.delete_currency(currency.id).await,
            Err(CurrencyPersistenceError::InUse(_))
        ));
    }
}
