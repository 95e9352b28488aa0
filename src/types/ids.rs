use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Strong typing for IDs with phantom types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// How a particular kind of identifier is normalized and validated.
pub trait IdKind {
    /// Human-readable name used in validation messages.
    const LABEL: &'static str;

    fn normalize(input: &str) -> Result<String, ValidationError>;
}

/// Marker types for different ID kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetMarker;

/// Identifies one run of a dataset extraction.
pub type ExecutionId = Id<ExecutionMarker>;
/// Identifies a dataset definition owned by the source configuration.
pub type DatasetId = Id<DatasetMarker>;

impl IdKind for ExecutionMarker {
    const LABEL: &'static str = "execution";

    fn normalize(input: &str) -> Result<String, ValidationError> {
        Uuid::parse_str(input.trim())
            .map(|uuid| uuid.as_hyphenated().to_string())
            .map_err(|e| ValidationError::InvalidId(format!("{} id '{}': {}", Self::LABEL, input, e)))
    }
}

impl IdKind for DatasetMarker {
    const LABEL: &'static str = "dataset";

    fn normalize(input: &str) -> Result<String, ValidationError> {
        static DATASET_ID: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:-]{0,127}$")
                .expect("dataset id pattern is a valid regex")
        });

        let trimmed = input.trim();
        if DATASET_ID.is_match(trimmed) {
            Ok(trimmed.to_string())
        } else {
            Err(ValidationError::InvalidId(format!(
                "{} id '{}' must be 1-128 characters of letters, digits, '_', '.', ':' or '-'",
                Self::LABEL,
                input
            )))
        }
    }
}

impl<T: IdKind> Id<T> {
    /// Parses and normalizes an identifier of this kind.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Ok(Self::from_normalized(T::normalize(input)?))
    }
}

impl<T> Id<T> {
    /// Create an ID from an already normalized string (internal use)
    pub(crate) fn from_normalized(value: String) -> Self {
        Self {
            value,
            _phantom: PhantomData,
        }
    }

    /// Get the ID as a string reference
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl ExecutionId {
    /// Create a new random v4 UUID ID
    pub fn new_v4() -> Self {
        Self::from_normalized(Uuid::new_v4().as_hyphenated().to_string())
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T: IdKind> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_id_parsing() {
        let id = ExecutionId::parse("550E8400-E29B-41D4-A716-446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400-e29b-41d4-a716-446655440000");

        let id = ExecutionId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_new_execution_ids_are_unique_and_parseable() {
        let a = ExecutionId::new_v4();
        let b = ExecutionId::new_v4();
        assert_ne!(a, b);
        assert_eq!(ExecutionId::parse(a.as_str()).unwrap(), a);
    }

    #[test]
    fn test_dataset_ids() {
        assert_eq!(DatasetId::parse(" orders-2024 ").unwrap().as_str(), "orders-2024");
        assert!(DatasetId::parse("").is_err());
        assert!(DatasetId::parse("has space").is_err());
        assert!(DatasetId::parse("../escape").is_err());
    }

    #[test]
    fn test_invalid_execution_ids() {
        assert!(ExecutionId::parse("too-short").is_err());
        assert!(ExecutionId::parse("").is_err());
    }

    #[test]
    fn test_serde_validates_on_the_way_in() {
        let id: DatasetId = serde_json::from_str("\"products\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"products\"");
        assert!(serde_json::from_str::<ExecutionId>("\"nope\"").is_err());
    }
}
