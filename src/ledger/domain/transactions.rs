use std::{borrow::Cow, collections::HashMap};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, trace};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use super::accounts::AccountId;

pub type TransactionId = i64;

/// Data for a new transaction provided by a user.
#[derive(Debug, Deserialize, Validate)]
pub struct NewTransactionData {
    /// The account the transaction is recorded against.
    pub account_id: AccountId,

    /// The signed amount in the account currency's minor units. Positive
    /// amounts are deposits, negative amounts are withdrawals.
    #[validate(custom = "validate_non_zero")]
    pub amount: i64,

    /// Free-form notes about the transaction.
    pub memo: Option<String>,

    /// A token identifying the submission. Retried submissions carrying the
    /// same token are recognized as duplicates.
    pub operation_id: Option<Uuid>,
}

fn validate_non_zero(amount: i64) -> Result<(), ValidationError> {
    if amount == 0 {
        Err(ValidationError {
            code: Cow::from("non_zero"),
            message: Some(Cow::from("Amount must not be zero.")),
            params: HashMap::new(),
        })
    } else {
        Ok(())
    }
}

/// A new transaction that has not been persisted yet.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransaction {
    account_id: AccountId,
    amount: i64,
    memo: Option<String>,
    operation_id: Uuid,
}

impl NewTransaction {
    /// Construct a new transaction from a set of input data.
    ///
    /// An empty memo is treated as no memo, and a missing operation ID is
    /// replaced with a freshly generated one.
    ///
    /// # Arguments
    /// * `data` - The input data describing the transaction.
    ///
    /// # Returns
    /// The new transaction if the data is valid, or a set of
    /// [`ValidationErrors`] otherwise.
    pub fn from_data(data: NewTransactionData) -> Result<Self, ValidationErrors> {
        if let Err(validation_error) = data.validate() {
            debug!(?validation_error, "New transaction failed validation.");

            return Err(validation_error);
        }

        trace!("New transaction passed validation.");

        Ok(Self {
            account_id: data.account_id,
            amount: data.amount,
            memo: data.memo.filter(|memo| !memo.is_empty()),
            operation_id: data.operation_id.unwrap_or_else(Uuid::new_v4),
        })
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }
}

/// A transaction that has been persisted.
#[derive(Clone, Debug, PartialEq)]
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

impl Transaction {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn cursor(&self) -> TransactionCursor {
        TransactionCursor {
            before_created_at: self.created_at,
            before_id: self.id,
        }
    }
}

/// A position in the newest-first list of transactions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransactionCursor {
    pub before_created_at: DateTime<Utc>,
    pub before_id: TransactionId,
}

impl TransactionCursor {
    /// Whether a transaction comes after the cursor in newest-first order.
    pub fn precedes(&self, transaction: &Transaction) -> bool {
        (transaction.created_at, transaction.id) < (self.before_created_at, self.before_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn data(amount: i64, memo: Option<&str>) -> NewTransactionData {
        NewTransactionData {
            account_id: 4,
            amount,
            memo: memo.map(str::to_owned),
            operation_id: None,
        }
    }

    #[test]
    fn zero_amount_is_rejected() {
        let errors = NewTransaction::from_data(data(0, None)).expect_err("zero amount");
        let field_errors = errors.field_errors();

        assert_eq!(1, field_errors.len());
        assert_eq!("non_zero", field_errors["amount"][0].code);
    }

    #[test]
    fn empty_memo_is_absent() {
        let transaction = NewTransaction::from_data(data(50, Some(""))).expect("valid data");

        assert_eq!(None, transaction.memo());
    }

    #[test]
    fn missing_memo_stays_absent() {
        let transaction = NewTransaction::from_data(data(50, None)).expect("valid data");

        assert_eq!(None, transaction.memo());
        assert_eq!(50, transaction.amount());
    }

    #[test]
    fn memo_is_kept() {
        let transaction =
            NewTransaction::from_data(data(-1299, Some("Groceries"))).expect("valid data");

        assert_eq!(Some("Groceries"), transaction.memo());
    }

    #[test]
    fn operation_id_is_generated_when_missing() {
        let first = NewTransaction::from_data(data(10, None)).unwrap();
        let second = NewTransaction::from_data(data(10, None)).unwrap();

        assert_ne!(first.operation_id(), second.operation_id());
    }

    #[test]
    fn provided_operation_id_is_kept() {
        let operation_id = Uuid::new_v4();
        let transaction = NewTransaction::from_data(NewTransactionData {
            operation_id: Some(operation_id),
            ..data(10, None)
        })
        .unwrap();

        assert_eq!(operation_id, transaction.operation_id());
    }

    #[test]
    fn cursor_orders_by_creation_then_id() {
        let now = Utc::now();
        let transaction = |id, created_at| Transaction {
            id,
            account_id: 1,
            amount: 1,
            memo: None,
            operation_id: Uuid::new_v4(),
            created_at,
            updated_at: created_at,
            deleted_at: None,
        };

        let cursor = transaction(5, now).cursor();

        assert!(cursor.precedes(&transaction(4, now)));
        assert!(!cursor.precedes(&transaction(6, now)));
        assert!(cursor.precedes(&transaction(9, now - chrono::Duration::seconds(1))));
        assert!(!cursor.precedes(&transaction(5, now)));
    }
}
