use chrono::{DateTime, Utc};
use semval::context::Context as ValidationContext;
use serde::{Deserialize, Serialize};

use crate::{
    identities::domain::{
        email::EmailInvalidity,
        users::{self, Role, UserChangesData, UserField, UserInvalidity},
    },
    passwords::PasswordInvalidity,
};

#[derive(Serialize)]
pub struct User {
    pub id: users::UserId,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&users::User> for User {
    fn from(user: &users::User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            name: user.name(),
            username: user.username.to_owned(),
            email: user.email.to_owned(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A change to the requesting user's own profile.
#[derive(Deserialize)]
pub struct OwnUserChanges {
    pub current_password: String,
    #[serde(flatten)]
    pub changes: UserChangesData,
}

#[derive(Default, Serialize)]
pub struct UserValidationError {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub first_name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub last_name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub username: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub password: Vec<String>,
}

impl From<ValidationContext<UserInvalidity>> for UserValidationError {
    fn from(validation: ValidationContext<UserInvalidity>) -> Self {
        let mut response = Self::default();

        for invalidity in validation.into_iter() {
            match invalidity {
                UserInvalidity::Missing(field) => {
                    let (messages, message) = match field {
                        UserField::FirstName => {
                            (&mut response.first_name, "First name is required.")
                        }
                        UserField::LastName => (&mut response.last_name, "Last name is required."),
                        UserField::Username => (&mut response.username, "Username is required."),
                    };

                    messages.push(message.to_owned());
                }
                UserInvalidity::Email(email_invalidity) => match email_invalidity {
                    EmailInvalidity::MissingDomain => {
                        response.email.push("Email is missing a domain.".to_owned())
                    }
                    EmailInvalidity::MissingSeparator => response
                        .email
                        .push("Email is missing an '@' symbol.".to_owned()),
                    EmailInvalidity::ContainsWhitespace => response
                        .email
                        .push("Email may not contain whitespace.".to_owned()),
                },
                UserInvalidity::Password(password_invalidity) => match password_invalidity {
                    PasswordInvalidity::MaxLength(max) => response.password.push(format!(
                        "Passwords may not contain more than {} characters.",
                        max
                    )),
                    PasswordInvalidity::MinLength(min) => response.password.push(format!(
                        "Passwords must contain at least {} characters.",
                        min
                    )),
                    PasswordInvalidity::Blank => response
                        .password
                        .push("Passwords may not consist of whitespace only.".to_owned()),
                },
            }
        }

        response
    }
}

#[cfg(test)]
mod test {
    use semval::ValidatedFrom;

    use crate::identities::domain::users::{NewUser, NewUserData};

    use super::*;

    #[test]
    fn invalidities_are_grouped_by_field() {
        let (_, context) = NewUser::validated_from(NewUserData {
            first_name: "".to_owned(),
            last_name: "Hopper".to_owned(),
            username: "grace".to_owned(),
            email: "grace.example.com".to_owned(),
            password: "short".to_owned(),
        })
        .expect_err("user is invalid");

        let rep = serde_json::to_value(UserValidationError::from(context)).unwrap();

        assert_eq!("First name is required.", rep["first_name"][0]);
        assert_eq!("Email is missing an '@' symbol.", rep["email"][0]);
        assert_eq!(
            "Passwords must contain at least 8 characters.",
            rep["password"][0]
        );
        assert!(rep.get("last_name").is_none());
    }
}
