use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

pub type CurrencyId = i64;

/// A currency accounts can be denominated in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Currency {
    pub id: CurrencyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating or renaming a currency.
#[derive(Debug, Deserialize, Validate)]
pub struct CurrencyData {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}
