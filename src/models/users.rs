use std::convert::TryFrom;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};

use crate::{identities::domain::users, passwords};

#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<User> for users::User {
    type Error = anyhow::Error;

    fn try_from(model: User) -> Result<Self, Self::Error> {
        let role = users::Role::parse(&model.role)
            .ok_or_else(|| anyhow!("user {} has the unknown role {:?}", model.id, model.role))?;
        let password_hash = passwords::Hash::from_hash_str(&model.password_hash)
            .with_context(|| format!("user {} has a malformed password hash", model.id))?;

        Ok(Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            username: model.username,
            email: model.email,
            role,
            password_hash,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
