//! Goal identifiers.

use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/// Short unique name of a goal (e.g. `pushups`).
///
/// Names are used as file stems by the stores, so they may not be empty and
/// may not contain whitespace or path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GoalName(String);

impl GoalName {
    /// Validate and wrap a goal name.
    pub fn new(name: impl Into<String>) -> Result<Self, TrackError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TrackError::InvalidSpec("goal name is empty".to_string()));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(TrackError::InvalidSpec(format!(
                "goal name {name:?} contains {bad:?}"
            )));
        }
        if name.starts_with('.') {
            return Err(TrackError::InvalidSpec(format!(
                "goal name {name:?} may not start with '.'"
            )));
        }
        Ok(Self(name))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for GoalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GoalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for GoalName {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GoalName {
    type Error = TrackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GoalName> for String {
    fn from(name: GoalName) -> Self {
        name.0
    }
}
