use std::fmt::Debug;

use semval::prelude::*;

const MAX_PASSWORD_LENGTH: usize = 512;
const MIN_PASSWORD_LENGTH: usize = 8;

/// A user's raw password.
pub struct Password(String);

impl Password {
    /// Wrap a password without checking the password policy, so it can be
    /// validated together with the object that contains it.
    pub fn unvalidated(password: String) -> Self {
        Self(password)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PasswordInvalidity {
    /// Longer than the contained maximum number of characters.
    MaxLength(usize),
    /// Shorter than the contained minimum number of characters.
    MinLength(usize),
    /// Made up entirely of whitespace.
    Blank,
}

impl Validate for Password {
    type Invalidity = PasswordInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let length = self.0.chars().count();

        ValidationContext::new()
            .invalidate_if(
                length < MIN_PASSWORD_LENGTH,
                PasswordInvalidity::MinLength(MIN_PASSWORD_LENGTH),
            )
            .invalidate_if(
                length > MAX_PASSWORD_LENGTH,
                PasswordInvalidity::MaxLength(MAX_PASSWORD_LENGTH),
            )
            .invalidate_if(
                !self.0.is_empty() && self.0.trim().is_empty(),
                PasswordInvalidity::Blank,
            )
            .into()
    }
}

impl ValidatedFrom<&str> for Password {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Password(from.to_owned());

        match into.validate() {
            Ok(_) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"*".repeat(8)).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn invalidities(raw_password: &str) -> Vec<PasswordInvalidity> {
        match Password::validated_from(raw_password) {
            Ok(_) => vec![],
            Err((_, context)) => context.into_iter().collect(),
        }
    }

    #[test]
    fn debug_hides_value() {
        let password = Password::unvalidated("some-very-unique-string".to_owned());

        assert!(!format!("{:?}", password).contains("unique"));
    }

    #[test]
    fn policy() {
        assert!(invalidities("password").is_empty());
        assert_eq!(vec![PasswordInvalidity::MinLength(8)], invalidities("short"));
        assert_eq!(
            vec![PasswordInvalidity::MaxLength(512)],
            invalidities(&"a".repeat(513))
        );
        assert_eq!(vec![PasswordInvalidity::Blank], invalidities(&" ".repeat(10)));
    }

    #[test]
    fn length_counts_characters() {
        // Eight characters, but more than eight bytes.
        assert!(invalidities("ééééééé").contains(&PasswordInvalidity::MinLength(8)));
        assert!(invalidities("éééééééé").is_empty());
    }
}
