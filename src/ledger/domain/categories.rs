use std::{borrow::Cow, collections::HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::identities::domain::users::UserId;

pub type CategoryId = i64;
pub type SubCategoryId = i64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// A user-defined grouping of incomes or expenses.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserId,
    pub name: String,
    pub kind: CategoryKind,
    pub color: Option<String>,
    pub sub_categories: Vec<SubCategory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub category_id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCategoryData {
    #[validate(length(min = 1))]
    pub name: String,

    pub kind: CategoryKind,

    /// A hex color in the form `#RRGGBB` used when presenting the category.
    #[validate(custom = "validate_color")]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewSubCategoryData {
    #[validate(length(min = 1))]
    pub name: String,
}

fn validate_color(color: &str) -> Result<(), ValidationError> {
    let is_hex_color = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if is_hex_color {
        Ok(())
    } else {
        Err(ValidationError {
            code: Cow::from("color"),
            message: Some(Cow::from("Colors must have the form #RRGGBB.")),
            params: HashMap::new(),
        })
    }
}
