//! Stage identifier module.
//!
//! Provides the `StageId` type, a cheaply clonable name for a statistic
//! stage. Uses `Arc<str>` so ids can be copied into errors and survey
//! records without reallocating.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Shared string identifier for a stage.
///
/// A stage is identified by its descriptor caption (for example
/// `"DTG by plant"`). The same id is used to select stages from
/// settings and to suppress printing.
///
/// # Examples
///
/// ```rust
/// use adqstat::StageId;
///
/// let dtg = StageId::from_str("DTG by plant");
/// let same: StageId = "DTG by plant".into();
/// assert_eq!(dtg, same);
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StageId(Arc<str>);

impl Serialize for StageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StageId::from(s))
    }
}

impl StageId {
    /// Create a new `StageId` from a string slice.
    pub fn from_str(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the string representation of this `StageId`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StageId {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for StageId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_id_creation() {
        let id1 = StageId::from_str("DTG by plant");
        let id2 = StageId::from_str("DTG by plant");
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str(), "DTG by plant");
    }

    #[test]
    fn test_stage_id_serde_as_plain_string() {
        let id = StageId::from_str("NODU by plant");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"NODU by plant\"");
        let back: StageId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
