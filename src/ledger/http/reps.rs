use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    identities::domain::users::UserId,
    ledger::domain::{
        accounts::{self, AccountId, AccountKind, AccountKindName},
        categories::{self, CategoryId, CategoryKind, SubCategoryId},
        currency::{self, CurrencyId},
        transactions::{self, TransactionId},
    },
};

mod cursor;

pub use cursor::EncodedTransactionCursor;

#[derive(Serialize)]
pub struct ResourceCollection<T: Serialize, C: Serialize> {
    pub next: Option<C>,
    pub items: Vec<T>,
}

#[derive(Serialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub currency_id: CurrencyId,
    pub kind: AccountKindName,
    pub name: String,
    pub bank: String,
    pub initial_balance: i64,
    pub balance: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allows_negative: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_day: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_day: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&accounts::Account> for Account {
    fn from(account: &accounts::Account) -> Self {
        let (allows_negative, billing_day, payment_day) = match account.kind {
            AccountKind::Debit { allows_negative } => (Some(allows_negative), None, None),
            AccountKind::Credit {
                billing_day,
                payment_day,
            } => (None, Some(billing_day), Some(payment_day)),
        };

        Self {
            id: account.id,
            user_id: account.user_id,
            currency_id: account.currency_id,
            kind: account.kind.name(),
            name: account.name.to_owned(),
            bank: account.bank.to_owned(),
            initial_balance: account.initial_balance,
            balance: account.balance,
            allows_negative,
            billing_day,
            payment_day,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub amount: i64,
    pub memo: Option<String>,
    pub operation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<&transactions::Transaction> for Transaction {
    fn from(transaction: &transactions::Transaction) -> Self {
        Self {
            id: transaction.id,
            account_id: transaction.account_id,
            amount: transaction.amount,
            memo: transaction.memo.to_owned(),
            operation_id: transaction.operation_id,
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
            deleted_at: transaction.deleted_at,
        }
    }
}

#[derive(Serialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&currency::Currency> for Currency {
    fn from(currency: &currency::Currency) -> Self {
        Self {
            id: currency.id,
            name: currency.name.to_owned(),
            created_at: currency.created_at,
            updated_at: currency.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub category_id: CategoryId,
    pub name: String,
}

impl From<&categories::SubCategory> for SubCategory {
    fn from(sub_category: &categories::SubCategory) -> Self {
        Self {
            id: sub_category.id,
            category_id: sub_category.category_id,
            name: sub_category.name.to_owned(),
        }
    }
}

#[derive(Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub kind: CategoryKind,
    pub color: Option<String>,
    pub sub_categories: Vec<SubCategory>,
}

impl From<&categories::Category> for Category {
    fn from(category: &categories::Category) -> Self {
        Self {
            id: category.id,
            name: category.name.to_owned(),
            kind: category.kind,
            color: category.color.to_owned(),
            sub_categories: category.sub_categories.iter().map(Into::into).collect(),
        }
    }
}
