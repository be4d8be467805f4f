use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use super::currency::CurrencyId;
use crate::identities::domain::users::UserId;

pub type AccountId = i64;

/// The two flavours of account a user can hold.
///
/// Debit accounts hold the user's own money and may be configured to reject
/// overdrafts. Credit accounts represent debt, so their balance is expected to
/// go negative.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccountKind {
    Debit { allows_negative: bool },
    Credit { billing_day: u8, payment_day: u8 },
}

/// The name of an [`AccountKind`] without its attributes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKindName {
    Debit,
    Credit,
}

impl AccountKindName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl AccountKind {
    pub fn name(&self) -> AccountKindName {
        match self {
            Self::Debit { .. } => AccountKindName::Debit,
            Self::Credit { .. } => AccountKindName::Credit,
        }
    }

    /// Whether the balance of an account of this kind may drop below zero.
    pub fn allows_negative(&self) -> bool {
        match self {
            Self::Debit { allows_negative } => *allows_negative,
            Self::Credit { .. } => true,
        }
    }
}

/// How an account is removed when its owner deletes it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Removal {
    /// The account is marked as deleted but its transaction history is kept.
    Soft,
    /// The account and all of its transactions are removed.
    Hard,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum BalanceError {
    /// The account does not allow a negative balance and the change would
    /// produce one.
    #[error("account {account_id} has a balance of {balance} and cannot cover {amount}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: i64,
        amount: i64,
    },

    #[error("the balance of account {0} would overflow")]
    Overflow(AccountId),
}

/// An account that has been persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub currency_id: CurrencyId,
    pub kind: AccountKind,
    pub name: String,
    pub bank: String,
    pub initial_balance: i64,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn removal(&self) -> Removal {
        match self.kind {
            AccountKind::Debit { .. } => Removal::Soft,
            AccountKind::Credit { .. } => Removal::Hard,
        }
    }

    /// Apply a transaction amount to the account's balance.
    ///
    /// If the account does not allow a negative balance and the resulting
    /// balance would be negative, an error is returned and the account is left
    /// untouched.
    ///
    /// # Arguments
    ///
    /// * `amount` - The signed amount in minor units.
    ///
    /// # Returns
    ///
    /// The account's new balance.
    pub fn perform_transaction(&mut self, amount: i64) -> Result<i64, BalanceError> {
        let new_balance = self
            .balance
            .checked_add(amount)
            .ok_or(BalanceError::Overflow(self.id))?;

        if new_balance < 0 && !self.kind.allows_negative() {
            return Err(BalanceError::InsufficientFunds {
                account_id: self.id,
                balance: self.balance,
                amount,
            });
        }

        self.balance = new_balance;

        Ok(new_balance)
    }

    /// Remove the effect of a previously performed transaction from the
    /// balance.
    ///
    /// Reverting is a correction of history, so it is not subject to the
    /// overdraft rule.
    pub fn revert_transaction(&mut self, amount: i64) -> Result<i64, BalanceError> {
        self.balance = amount
            .checked_neg()
            .and_then(|negated| self.balance.checked_add(negated))
            .ok_or(BalanceError::Overflow(self.id))?;

        Ok(self.balance)
    }

    /// Apply a set of changes to the account.
    ///
    /// Changing the initial balance shifts the running balance by the same
    /// delta, and is subject to the overdraft rule. The account is only
    /// modified if every change can be applied.
    pub fn apply_changes(&mut self, changes: AccountChanges) -> Result<(), BalanceError> {
        let mut updated = self.clone();

        if let Some(initial_balance) = changes.initial_balance {
            let delta = initial_balance
                .checked_sub(updated.initial_balance)
                .ok_or(BalanceError::Overflow(self.id))?;

            updated.perform_transaction(delta)?;
            updated.initial_balance = initial_balance;
        }

        if let Some(name) = changes.name {
            updated.name = name;
        }
        if let Some(bank) = changes.bank {
            updated.bank = bank;
        }
        if let Some(currency_id) = changes.currency_id {
            updated.currency_id = currency_id;
        }

        if let AccountKind::Credit {
            billing_day,
            payment_day,
        } = updated.kind
        {
            updated.kind = AccountKind::Credit {
                billing_day: changes.billing_day.unwrap_or(billing_day),
                payment_day: changes.payment_day.unwrap_or(payment_day),
            };
        }

        *self = updated;

        Ok(())
    }
}

/// A new account that has not been persisted yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAccount {
    user_id: UserId,
    currency_id: CurrencyId,
    kind: AccountKind,
    name: String,
    bank: String,
    initial_balance: i64,
}

impl NewAccount {
    pub fn debit(user_id: UserId, data: NewDebitAccountData) -> Result<Self, ValidationErrors> {
        data.validate()?;

        Ok(Self {
            user_id,
            currency_id: data.currency_id,
            kind: AccountKind::Debit {
                allows_negative: data.allows_negative,
            },
            name: data.name,
            bank: data.bank,
            initial_balance: data.initial_balance,
        })
    }

    pub fn credit(user_id: UserId, data: NewCreditAccountData) -> Result<Self, ValidationErrors> {
        data.validate()?;

        Ok(Self {
            user_id,
            currency_id: data.currency_id,
            kind: AccountKind::Credit {
                billing_day: data.billing_day,
                payment_day: data.payment_day,
            },
            name: data.name,
            bank: data.bank,
            initial_balance: data.initial_balance,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn currency_id(&self) -> CurrencyId {
        self.currency_id
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bank(&self) -> &str {
        &self.bank
    }

    /// The starting balance, which is also the running balance of a brand new
    /// account.
    pub fn initial_balance(&self) -> i64 {
        self.initial_balance
    }
}

/// Data for a new debit account provided by a user.
#[derive(Debug, Deserialize, Validate)]
pub struct NewDebitAccountData {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(length(min = 1))]
    pub bank: String,

    /// The balance of the account before any transactions, in minor units.
    #[serde(default)]
    pub initial_balance: i64,

    #[serde(default)]
    pub allows_negative: bool,

    pub currency_id: CurrencyId,
}

/// Data for a new credit account provided by a user.
#[derive(Debug, Deserialize, Validate)]
pub struct NewCreditAccountData {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(length(min = 1))]
    pub bank: String,

    #[serde(default)]
    pub initial_balance: i64,

    pub currency_id: CurrencyId,

    /// Day of the month the statement closes.
    #[validate(range(min = 1, max = 31))]
    pub billing_day: u8,

    /// Day of the month the statement is due.
    #[validate(range(min = 1, max = 31))]
    pub payment_day: u8,
}

/// A partial update of an account. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AccountChanges {
    #[validate(length(min = 1))]
    pub name: Option<String>,

    #[validate(length(min = 1))]
    pub bank: Option<String>,

    pub initial_balance: Option<i64>,

    pub currency_id: Option<CurrencyId>,

    /// Ignored for debit accounts.
    #[validate(range(min = 1, max = 31))]
    pub billing_day: Option<u8>,

    /// Ignored for debit accounts.
    #[validate(range(min = 1, max = 31))]
    pub payment_day: Option<u8>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn account(kind: AccountKind, balance: i64) -> Account {
        Account {
            id: 1,
            user_id: 1,
            currency_id: 1,
            kind,
            name: "Checking".to_owned(),
            bank: "First Bank".to_owned(),
            initial_balance: balance,
            balance,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn strict_debit(balance: i64) -> Account {
        account(
            AccountKind::Debit {
                allows_negative: false,
            },
            balance,
        )
    }

    #[test]
    fn perform_transaction_rejects_overdraft() {
        let mut account = strict_debit(100);

        let error = account
            .perform_transaction(-150)
            .expect_err("overdraft should be rejected");

        assert_eq!(
            BalanceError::InsufficientFunds {
                account_id: 1,
                balance: 100,
                amount: -150,
            },
            error
        );
        assert_eq!(100, account.balance);
    }

    #[test]
    fn perform_transaction_allows_exact_balance() {
        let mut account = strict_debit(100);

        assert_eq!(Ok(0), account.perform_transaction(-100));
    }

    #[test]
    fn perform_transaction_allows_overdraft_when_configured() {
        let mut account = account(
            AccountKind::Debit {
                allows_negative: true,
            },
            100,
        );

        assert_eq!(Ok(-50), account.perform_transaction(-150));
        assert_eq!(-50, account.balance);
    }

    #[test]
    fn credit_accounts_always_allow_negative() {
        let mut account = account(
            AccountKind::Credit {
                billing_day: 1,
                payment_day: 10,
            },
            0,
        );

        assert_eq!(Ok(-2500), account.perform_transaction(-2500));
    }

    #[test]
    fn perform_transaction_detects_overflow() {
        let mut account = strict_debit(i64::MAX);

        assert_eq!(
            Err(BalanceError::Overflow(1)),
            account.perform_transaction(1)
        );
        assert_eq!(i64::MAX, account.balance);
    }

    #[test]
    fn revert_transaction_ignores_overdraft_rule() {
        let mut account = strict_debit(30);

        assert_eq!(Ok(-20), account.revert_transaction(50));
    }

    #[test]
    fn apply_changes_shifts_balance_by_initial_delta() {
        let mut account = strict_debit(100);
        account.perform_transaction(-40).unwrap();

        account
            .apply_changes(AccountChanges {
                initial_balance: Some(150),
                name: Some("Savings".to_owned()),
                ..Default::default()
            })
            .expect("changes should apply");

        assert_eq!(150, account.initial_balance);
        assert_eq!(110, account.balance);
        assert_eq!("Savings", account.name);
    }

    #[test]
    fn apply_changes_is_atomic() {
        let mut account = strict_debit(100);
        account.perform_transaction(-90).unwrap();

        account
            .apply_changes(AccountChanges {
                initial_balance: Some(0),
                name: Some("Renamed".to_owned()),
                ..Default::default()
            })
            .expect_err("balance would go negative");

        assert_eq!("Checking", account.name);
        assert_eq!(10, account.balance);
        assert_eq!(100, account.initial_balance);
    }

    #[test]
    fn apply_changes_updates_credit_days() {
        let mut account = account(
            AccountKind::Credit {
                billing_day: 1,
                payment_day: 10,
            },
            0,
        );

        account
            .apply_changes(AccountChanges {
                payment_day: Some(15),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(
            AccountKind::Credit {
                billing_day: 1,
                payment_day: 15,
            },
            account.kind
        );
    }

    #[test]
    fn removal_depends_on_kind() {
        assert_eq!(Removal::Soft, strict_debit(0).removal());
        assert_eq!(
            Removal::Hard,
            account(
                AccountKind::Credit {
                    billing_day: 2,
                    payment_day: 3,
                },
                0
            )
            .removal()
        );
    }

    #[test]
    fn new_credit_account_validates_days() {
        let errors = NewAccount::credit(
            1,
            NewCreditAccountData {
                name: "Card".to_owned(),
                bank: "".to_owned(),
                initial_balance: 0,
                currency_id: 1,
                billing_day: 0,
                payment_day: 32,
            },
        )
        .expect_err("data is invalid");
        let field_errors = errors.field_errors();

        assert_eq!(3, field_errors.len());
        assert_eq!("length", field_errors["bank"][0].code);
        assert_eq!("range", field_errors["billing_day"][0].code);
        assert_eq!("range", field_errors["payment_day"][0].code);
    }

    #[test]
    fn new_debit_account_starts_at_initial_balance() {
        let account = NewAccount::debit(
            7,
            NewDebitAccountData {
                name: "Wallet".to_owned(),
                bank: "Cash".to_owned(),
                initial_balance: 2500,
                allows_negative: false,
                currency_id: 3,
            },
        )
        .expect("data is valid");

        assert_eq!(7, account.user_id());
        assert_eq!(2500, account.initial_balance());
        assert_eq!(
            AccountKind::Debit {
                allows_negative: false
            },
            account.kind()
        );
    }
}
