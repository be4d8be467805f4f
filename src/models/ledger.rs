use std::convert::{TryFrom, TryInto};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::domain::{self, accounts::AccountKind};

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub currency_id: i64,
    pub kind: String,
    pub name: String,
    pub bank: String,
    pub initial_balance: i64,
    pub balance: i64,
    pub allows_negative: Option<bool>,
    pub billing_day: Option<i16>,
    pub payment_day: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum AccountModelError {
    #[error("account {0} has the unknown kind {1:?}")]
    UnknownKind(i64, String),
    #[error("account {0} is missing the attributes of its kind")]
    MissingAttributes(i64),
    #[error("account {0} has a day outside of a month")]
    InvalidDay(i64),
}

/// The nullable per-kind columns of an account row.
pub struct AccountKindColumns {
    pub kind: &'static str,
    pub allows_negative: Option<bool>,
    pub billing_day: Option<i16>,
    pub payment_day: Option<i16>,
}

impl From<AccountKind> for AccountKindColumns {
    fn from(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Debit { allows_negative } => Self {
                kind: kind.name().as_str(),
                allows_negative: Some(allows_negative),
                billing_day: None,
                payment_day: None,
            },
            AccountKind::Credit {
                billing_day,
                payment_day,
            } => Self {
                kind: kind.name().as_str(),
                allows_negative: None,
                billing_day: Some(billing_day.into()),
                payment_day: Some(payment_day.into()),
            },
        }
    }
}

impl TryFrom<Account> for domain::accounts::Account {
    type Error = AccountModelError;

    fn try_from(model: Account) -> Result<Self, Self::Error> {
        let day = |value: i16| -> Result<u8, AccountModelError> {
            value
                .try_into()
                .ok()
                .filter(|day| (1..=31).contains(day))
                .ok_or(AccountModelError::InvalidDay(model.id))
        };

        let kind = match (
            model.kind.as_str(),
            model.allows_negative,
            model.billing_day,
            model.payment_day,
        ) {
            ("debit", Some(allows_negative), _, _) => AccountKind::Debit { allows_negative },
            ("credit", _, Some(billing_day), Some(payment_day)) => AccountKind::Credit {
                billing_day: day(billing_day)?,
                payment_day: day(payment_day)?,
            },
            ("debit", _, _, _) | ("credit", _, _, _) => {
                return Err(AccountModelError::MissingAttributes(model.id))
            }
            (other, _, _, _) => {
                return Err(AccountModelError::UnknownKind(
                    model.id,
                    other.to_owned(),
                ))
            }
        };

        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            currency_id: model.currency_id,
            kind,
            name: model.name,
            bank: model.bank,
            initial_balance: model.initial_balance,
            balance: model.balance,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        })
    }
}

/// A transaction that has been persisted in a repository.
#[derive(Debug, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub amount: i64,
    pub memo: Option<String>,
    pub operation_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Transaction> for domain::transactions::Transaction {
    fn from(model: Transaction) -> Self {
        Self {
            id: model.id,
            account_id: model.account_id,
            amount: model.amount,
            memo: model.memo,
            operation_id: model.operation_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct Currency {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Currency> for domain::currency::Currency {
    fn from(model: Currency) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct SubCategory {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubCategory> for domain::categories::SubCategory {
    fn from(model: SubCategory) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl Category {
    /// Convert the row into a domain category, attaching the sub-categories
    /// that belong to it.
    pub fn try_into_domain<I>(
        self,
        sub_categories: I,
    ) -> anyhow::Result<domain::categories::Category>
    where
        I: IntoIterator<Item = SubCategory>,
    {
        let kind = domain::categories::CategoryKind::parse(&self.kind).ok_or_else(|| {
            anyhow::anyhow!("category {} has the unknown kind {:?}", self.id, self.kind)
        })?;

        Ok(domain::categories::Category {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            kind,
            color: self.color,
            sub_categories: sub_categories
                .into_iter()
                .filter(|sub_category| sub_category.category_id == self.id)
                .map(Into::into)
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
