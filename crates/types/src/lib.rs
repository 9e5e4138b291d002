//! Validated primitive types shared across the repopulation crates.

use std::borrow::Borrow;

/// Errors that can occur when creating validated identifier types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input was empty or contained only whitespace
    #[error("linkId cannot be empty")]
    Empty,
}

/// Identifier of an item within one questionnaire definition.
///
/// A `LinkId` is unique among siblings, not globally: the instances of a repeating group all
/// share the group's `LinkId`. The value is kept exactly as supplied (no trimming) so that it
/// round-trips unchanged, but it must contain at least one non-whitespace character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(String);

impl LinkId {
    /// Creates a new `LinkId` from the given input.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(LinkId)` if the input contains a non-whitespace character,
    /// or `Err(TextError::Empty)` otherwise.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let raw = input.as_ref();
        if raw.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(raw.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LinkId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `LinkId` be queried with a plain `&str`.
impl Borrow<str> for LinkId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for LinkId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkId::new(s)
    }
}

impl serde::Serialize for LinkId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for LinkId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LinkId::new(&s).map_err(serde::de::Error::custom)
    }
}
