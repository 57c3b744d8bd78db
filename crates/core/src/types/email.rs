//! Email address type used by customer records and registration.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty once surrounding whitespace is removed.
    #[error("email is required")]
    Empty,
    /// The input is longer than [`Email::MAX_LENGTH`].
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace.
    #[error("email cannot contain spaces")]
    Whitespace,
    /// The input does not contain exactly one @ separating two non-empty parts.
    #[error("email must look like name@domain")]
    Malformed,
}

/// An email address as entered in a console form.
///
/// Parsing trims surrounding whitespace and requires a single `@` with a
/// non-empty local part and domain. Values read back from the services are
/// deserialized without re-validation.
///
/// ```
/// use insurance_console_core::Email;
///
/// assert_eq!(Email::parse("  alice@assur.fr ").unwrap().as_str(), "alice@assur.fr");
/// assert!(Email::parse("alice").is_err());
/// assert!(Email::parse("a@b@c").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from form input.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first rule the input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(s.to_owned()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_form_input() {
        assert!(Email::parse("jean.dupont@assur.fr").is_ok());
        assert!(Email::parse("j+claims@sub.assur.fr").is_ok());
        assert_eq!(
            Email::parse("\tjean@assur.fr\n").unwrap().as_str(),
            "jean@assur.fr"
        );
    }

    #[test]
    fn test_parse_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("jean dupont@assur.fr"), Err(EmailError::Whitespace));
        assert_eq!(Email::parse("jean"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("@assur.fr"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("jean@"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("jean@a@b"), Err(EmailError::Malformed));

        let long = format!("{}@assur.fr", "x".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { max: 254 })));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = Email::parse("jean@assur.fr").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"jean@assur.fr\"");
    }
}
