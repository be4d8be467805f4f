use semval::prelude::*;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Email(String);

impl Email {
    /// Create an unvalidated email.
    ///
    /// The address is trimmed and lowercased so that uniqueness checks do not
    /// depend on how the user typed it.
    ///
    /// # Arguments
    ///
    /// * `address` - The email's address.
    pub fn unvalidated(address: String) -> Self {
        Self(address.trim().to_lowercase())
    }

    pub fn address(&self) -> &str {
        &self.0
    }

    fn has_domain(&self) -> bool {
        if let Some(index) = self.0.find('@') {
            index < self.0.len() - 1
        } else {
            false
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EmailInvalidity {
    /// The address does not have a domain portion.
    MissingDomain,

    /// The address is missing the `@` symbol separating the local and domain
    /// parts.
    MissingSeparator,

    /// The address contains whitespace between its characters.
    ContainsWhitespace,
}

impl Validate for Email {
    type Invalidity = EmailInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(!self.0.contains('@'), EmailInvalidity::MissingSeparator)
            .invalidate_if(!self.has_domain(), EmailInvalidity::MissingDomain)
            .invalidate_if(
                self.0.chars().any(char::is_whitespace),
                EmailInvalidity::ContainsWhitespace,
            )
            .into()
    }
}

impl ValidatedFrom<&str> for Email {
    fn validated_from(from: &str) -> ValidatedResult<Self> {
        let into = Self::unvalidated(from.to_owned());

        match into.validate() {
            Ok(()) => Ok(into),
            Err(context) => Err((into, context)),
        }
    }
}
