//! Class name type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A validated backend class name.
///
/// Class names start with a letter, or with an underscore for the system
/// classes (`_User`, `_Installation`, `_Role`, `_Session`), and otherwise
/// contain only ASCII letters, digits and underscores.
///
/// # Example
///
/// ```
/// use parsekit::ClassName;
///
/// let class = ClassName::new("GameScore").unwrap();
/// assert!(!class.is_system());
/// assert!(ClassName::new("_User").unwrap().is_system());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassName(String);

impl ClassName {
    /// Create a new class name from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid class name.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns true for the built-in classes whose names start with `_`.
    pub fn is_system(&self) -> bool {
        self.0.starts_with('_')
    }

    /// Returns the class name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let invalid = |reason: &str| {
            Error::from(InvalidInputError::ClassName {
                value: s.to_string(),
                reason: reason.to_string(),
            })
        };

        let Some(first) = s.chars().next() else {
            return Err(invalid("cannot be empty"));
        };

        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(invalid("must start with a letter or underscore"));
        }

        if s == "_" {
            return Err(invalid("must contain a letter"));
        }

        if let Some(c) = s.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
            return Err(invalid(&format!("contains invalid character '{}'", c)));
        }

        Ok(())
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClassName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ClassName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ClassName> for String {
    fn from(class: ClassName) -> Self {
        class.0
    }
}

impl AsRef<str> for ClassName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_class_names() {
        assert!(ClassName::new("GameScore").is_ok());
        assert!(ClassName::new("game_score_2").is_ok());
        assert!(ClassName::new("_Installation").is_ok());
    }

    #[test]
    fn invalid_empty() {
        assert!(ClassName::new("").is_err());
    }

    #[test]
    fn invalid_starts_with_number() {
        assert!(ClassName::new("1Score").is_err());
    }

    #[test]
    fn invalid_characters() {
        assert!(ClassName::new("Game.Score").is_err());
        assert!(ClassName::new("Game Score").is_err());
        assert!(ClassName::new("classes/GameScore").is_err());
    }

    #[test]
    fn deserialize_validates() {
        let result: Result<ClassName, _> = serde_json::from_str("\"bad name\"");
        assert!(result.is_err());
        let ok: ClassName = serde_json::from_str("\"Player\"").unwrap();
        assert_eq!(ok.as_str(), "Player");
    }
}
