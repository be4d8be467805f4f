use std::{convert::TryFrom, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    database::{unique_violation, PostgresConnection},
    identities::domain::users::{NewUser, User, UserChanges, UserId},
    models, passwords,
};

#[derive(Debug, Error)]
pub enum UserPersistenceError {
    #[error("duplicate username: {0:?}")]
    DuplicateUsername(String),

    #[error("duplicate email address: {0:?}")]
    DuplicateEmail(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DynUserRepo = Arc<dyn UserRepo + Send + Sync>;

#[async_trait]
pub trait UserRepo {
    async fn insert_user(
        &self,
        user: &NewUser,
        password_hash: &passwords::Hash,
    ) -> Result<User, UserPersistenceError>;

    async fn get_user(&self, user_id: UserId) -> anyhow::Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    async fn list_users(&self) -> anyhow::Result<Vec<User>>;

    /// Apply a set of changes to a user. Returns `None` if the user does not
    /// exist.
    async fn update_user(
        &self,
        user_id: UserId,
        changes: &UserChanges,
        password_hash: Option<&passwords::Hash>,
    ) -> Result<Option<User>, UserPersistenceError>;

    /// Delete a user along with everything they own. Returns `false` if the
    /// user does not exist.
    async fn delete_user(&self, user_id: UserId) -> anyhow::Result<bool>;
}

fn map_write_error(error: sqlx::Error, username: &str, email: &str) -> UserPersistenceError {
    match unique_violation(&error) {
        Some("user_username_key") => UserPersistenceError::DuplicateUsername(username.to_owned()),
        Some("user_email_key") => UserPersistenceError::DuplicateEmail(email.to_owned()),
        _ => UserPersistenceError::Other(error.into()),
    }
}

#[async_trait]
impl UserRepo for PostgresConnection {
    async fn insert_user(
        &self,
        user: &NewUser,
        password_hash: &passwords::Hash,
    ) -> Result<User, UserPersistenceError> {
        let model = sqlx::query_as::<_, models::users::User>(
            r#"
            INSERT INTO "user" (first_name, last_name, username, email, password, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.first_name())
        .bind(user.last_name())
        .bind(user.username())
        .bind(user.email().address())
        .bind(password_hash.value())
        .bind(user.role().as_str())
        .fetch_one(&**self)
        .await
        .map_err(|error| map_write_error(error, user.username(), user.email().address()))?;

        Ok(User::try_from(model)?)
    }

    async fn get_user(&self, user_id: UserId) -> anyhow::Result<Option<User>> {
        let model =
            sqlx::query_as::<_, models::users::User>(r#"SELECT * FROM "user" WHERE id = $1"#)
                .bind(user_id)
                .fetch_optional(&**self)
                .await?;

        model.map(User::try_from).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let model =
            sqlx::query_as::<_, models::users::User>(r#"SELECT * FROM "user" WHERE username = $1"#)
                .bind(username)
                .fetch_optional(&**self)
                .await?;

        model.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        sqlx::query_as::<_, models::users::User>(r#"SELECT * FROM "user" ORDER BY id"#)
            .fetch_all(&**self)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update_user(
        &self,
        user_id: UserId,
        changes: &UserChanges,
        password_hash: Option<&passwords::Hash>,
    ) -> Result<Option<User>, UserPersistenceError> {
        let username = changes.username.as_deref();
        let email = changes.email.as_ref().map(|email| email.address());

        let model = sqlx::query_as::<_, models::users::User>(
            r#"
            UPDATE "user"
            SET first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                username = COALESCE($3, username),
                email = COALESCE($4, email),
                password = COALESCE($5, password),
                role = COALESCE($6, role),
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(username)
        .bind(email)
        .bind(password_hash.map(|hash| hash.value()))
        .bind(changes.role.map(|role| role.as_str()))
        .bind(user_id)
        .fetch_optional(&**self)
        .await
        .map_err(|error| {
            map_write_error(error, username.unwrap_or_default(), email.unwrap_or_default())
        })?;

        Ok(model.map(User::try_from).transpose()?)
    }

    async fn delete_user(&self, user_id: UserId) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
            .bind(user_id)
            .execute(&**self)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
