use anyhow::Result;
use chrono::{DateTime, Utc};
use semval::prelude::*;
use serde::{Deserialize, Serialize};

use crate::passwords::{self, Password, PasswordInvalidity};

use super::email::{Email, EmailInvalidity};

pub type UserId = i64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// A user that has been persisted.
#[derive(Clone, Debug)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub password_hash: passwords::Hash,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The user's display name.
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Required text fields of a user.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserField {
    FirstName,
    LastName,
    Username,
}

#[derive(Debug, Eq, PartialEq)]
pub enum UserInvalidity {
    Email(EmailInvalidity),
    Password(PasswordInvalidity),
    Missing(UserField),
}

#[derive(Debug)]
pub struct NewUser {
    first_name: String,
    last_name: String,
    username: String,
    email: Email,
    password: Password,
    role: Role,
}

impl NewUser {
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn password_hash(&self) -> Result<passwords::Hash> {
        passwords::Hash::new(&self.password)
    }

    /// Promote the user before it is persisted. Used when seeding the first
    /// administrator.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

impl Validate for NewUser {
    type Invalidity = UserInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                self.first_name.trim().is_empty(),
                UserInvalidity::Missing(UserField::FirstName),
            )
            .invalidate_if(
                self.last_name.trim().is_empty(),
                UserInvalidity::Missing(UserField::LastName),
            )
            .invalidate_if(
                self.username.trim().is_empty(),
                UserInvalidity::Missing(UserField::Username),
            )
            .validate_with(&self.email, UserInvalidity::Email)
            .validate_with(&self.password, UserInvalidity::Password)
            .into()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewUserData {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl ValidatedFrom<NewUserData> for NewUser {
    fn validated_from(from: NewUserData) -> ValidatedResult<Self> {
        let into = NewUser {
            first_name: from.first_name,
            last_name: from.last_name,
            username: from.username.trim().to_owned(),
            email: Email::unvalidated(from.email),
            password: Password::unvalidated(from.password),
            role: Role::User,
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

/// A partial update of a user. Absent fields are left unchanged.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<Email>,
    pub password: Option<Password>,
    pub role: Option<Role>,
}

impl UserChanges {
    /// Hash the new password, if one was provided.
    pub fn password_hash(&self) -> Result<Option<passwords::Hash>> {
        self.password.as_ref().map(passwords::Hash::new).transpose()
    }
}

impl Validate for UserChanges {
    type Invalidity = UserInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let is_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(|value| value.trim().is_empty())
                .unwrap_or(false)
        };

        let mut context = ValidationContext::new()
            .invalidate_if(
                is_blank(&self.first_name),
                UserInvalidity::Missing(UserField::FirstName),
            )
            .invalidate_if(
                is_blank(&self.last_name),
                UserInvalidity::Missing(UserField::LastName),
            )
            .invalidate_if(
                is_blank(&self.username),
                UserInvalidity::Missing(UserField::Username),
            );

        if let Some(email) = &self.email {
            context = context.validate_with(email, UserInvalidity::Email);
        }
        if let Some(password) = &self.password {
            context = context.validate_with(password, UserInvalidity::Password);
        }

        context.into()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserChangesData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl ValidatedFrom<UserChangesData> for UserChanges {
    fn validated_from(from: UserChangesData) -> ValidatedResult<Self> {
        let into = UserChanges {
            first_name: from.first_name,
            last_name: from.last_name,
            username: from.username.map(|username| username.trim().to_owned()),
            email: from.email.map(Email::unvalidated),
            password: from.password.map(Password::unvalidated),
            role: from.role,
        };

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
