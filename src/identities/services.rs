use semval::{context::Context as ValidationContext, ValidatedFrom};
use thiserror::Error;
use tracing::{debug, info};

use crate::repos::{DynUserRepo, UserPersistenceError};

use super::domain::users::{
    NewUser, NewUserData, Role, User, UserChanges, UserChangesData, UserId, UserInvalidity,
};

#[derive(Debug, Error)]
pub enum UserError {
    /// The provided user data is invalid.
    #[error("invalid user data: {0:?}")]
    InvalidUser(ValidationContext<UserInvalidity>),

    #[error("the username is already taken")]
    DuplicateUsername,

    #[error("the email address is already in use")]
    DuplicateEmail,

    /// The username or password did not match a user.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<UserPersistenceError> for UserError {
    fn from(error: UserPersistenceError) -> Self {
        match error {
            UserPersistenceError::DuplicateUsername(_) => Self::DuplicateUsername,
            UserPersistenceError::DuplicateEmail(_) => Self::DuplicateEmail,
            UserPersistenceError::Other(error) => Self::Other(error),
        }
    }
}

/// A service object providing functionality relating to users.
#[derive(Clone)]
pub struct UserService {
    user_repo: DynUserRepo,
}

impl UserService {
    pub fn new(user_repo: DynUserRepo) -> Self {
        Self { user_repo }
    }

    async fn persist_new_user(&self, new_user: NewUser) -> Result<User, UserError> {
        let password_hash = new_user.password_hash()?;
        let user = self.user_repo.insert_user(&new_user, &password_hash).await?;

        info!(user_id = user.id, role = user.role.as_str(), "Created user.");

        Ok(user)
    }

    /// Create a new user with the regular user role.
    ///
    /// # Arguments
    ///
    /// * `new_user_data` - The new user's information.
    pub async fn create_user(&self, new_user_data: NewUserData) -> Result<User, UserError> {
        let new_user = NewUser::validated_from(new_user_data)
            .map_err(|(_, context)| UserError::InvalidUser(context))?;

        self.persist_new_user(new_user).await
    }

    /// Create a new administrator.
    pub async fn create_admin(&self, new_user_data: NewUserData) -> Result<User, UserError> {
        let new_user = NewUser::validated_from(new_user_data)
            .map_err(|(_, context)| UserError::InvalidUser(context))?
            .with_role(Role::Admin);

        self.persist_new_user(new_user).await
    }

    /// Find the user identified by a username and password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, UserError> {
        let user = match self.user_repo.get_user_by_username(username.trim()).await? {
            Some(user) => user,
            None => {
                debug!("No user with the provided username.");

                return Err(UserError::InvalidCredentials);
            }
        };

        if user.password_hash.matches_raw_password(password)? {
            debug!(user_id = user.id, "Validated user credentials.");

            Ok(user)
        } else {
            debug!(user_id = user.id, "Password did not match.");

            Err(UserError::InvalidCredentials)
        }
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User, UserError> {
        self.user_repo
            .get_user(user_id)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, UserError> {
        Ok(self.user_repo.list_users().await?)
    }

    async fn apply_changes(
        &self,
        user_id: UserId,
        changes: UserChanges,
    ) -> Result<User, UserError> {
        let password_hash = changes.password_hash()?;

        let user = self
            .user_repo
            .update_user(user_id, &changes, password_hash.as_ref())
            .await?
            .ok_or(UserError::NotFound)?;

        info!(user_id, "Updated user.");

        Ok(user)
    }

    /// Update the requesting user's own profile.
    ///
    /// The current password must be provided to make any change, and users
    /// cannot change their own role.
    pub async fn update_own_user(
        &self,
        user_id: UserId,
        current_password: &str,
        changes_data: UserChangesData,
    ) -> Result<User, UserError> {
        let user = self.get_user(user_id).await?;
        if !user.password_hash.matches_raw_password(current_password)? {
            return Err(UserError::InvalidCredentials);
        }

        let changes = UserChanges::validated_from(UserChangesData {
            role: None,
            ..changes_data
        })
        .map_err(|(_, context)| UserError::InvalidUser(context))?;

        self.apply_changes(user_id, changes).await
    }

    /// Update any user, including their role.
    pub async fn update_user(
        &self,
        user_id: UserId,
        changes_data: UserChangesData,
    ) -> Result<User, UserError> {
        let changes = UserChanges::validated_from(changes_data)
            .map_err(|(_, context)| UserError::InvalidUser(context))?;

        self.apply_changes(user_id, changes).await
    }

    /// Delete a user along with their accounts and categories.
    pub async fn delete_user(&self, user_id: UserId) -> Result<(), UserError> {
        if self.user_repo.delete_user(user_id).await? {
            info!(user_id, "Deleted user.");

            Ok(())
        } else {
            Err(UserError::NotFound)
        }
    }
}
