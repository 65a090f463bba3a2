//! Document highlight colour.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Colour`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColourError {
    /// The input string is empty.
    #[error("colour cannot be empty")]
    Empty,
    /// The input does not start with `#`.
    #[error("colour must start with '#'")]
    MissingHash,
    /// The input is not 3 or 6 hex digits long.
    #[error("colour must have 3 or 6 hex digits (got {len})")]
    InvalidLength {
        /// Number of digits found after the `#`.
        len: usize,
    },
    /// The input contains a non-hex character.
    #[error("colour contains non-hex character '{0}'")]
    InvalidDigit(char),
}

/// A hex colour used to tag documents in lists, e.g. `#cdcdcd`.
///
/// Stored lower-cased so equal colours compare equal.
///
/// ```
/// use stockroom_core::Colour;
///
/// assert!(Colour::parse("#CDCDCD").is_ok());
/// assert!(Colour::parse("#abc").is_ok());
/// assert!(Colour::parse("cdcdcd").is_err());
/// assert!(Colour::parse("#abcd").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Colour(String);

impl Colour {
    /// Parse a colour from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a `#` followed by 3 or 6 hex digits.
    pub fn parse(s: &str) -> Result<Self, ColourError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ColourError::Empty);
        }
        let digits = s.strip_prefix('#').ok_or(ColourError::MissingHash)?;
        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ColourError::InvalidDigit(bad));
        }
        let len = digits.chars().count();
        if len != 3 && len != 6 {
            return Err(ColourError::InvalidLength { len });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Returns the colour as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self("#cdcdcd".to_string())
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Colour {
    type Error = ColourError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Colour> for String {
    fn from(colour: Colour) -> Self {
        colour.0
    }
}

impl std::str::FromStr for Colour {
    type Err = ColourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
