//! Identifier and kind types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier of a journal operation.
///
/// Doubles as the correlation id of the process that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub Uuid);

impl OperationId {
    /// Create a new random operation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an operation ID from a UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CoreError::InvalidArgument(format!("operation id '{s}': {e}")))
    }
}

/// Kind of archival entity that can be sealed and audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    /// An archive unit (descriptive record).
    Unit,
    /// A group of binary objects attached to units.
    ObjectGroup,
}

impl EntityKind {
    /// Canonical upper-case name, as written in sealed ledgers.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "UNIT",
            Self::ObjectGroup => "OBJECT_GROUP",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNIT" => Ok(Self::Unit),
            "OBJECT_GROUP" | "OBJECTGROUP" => Ok(Self::ObjectGroup),
            _ => Err(CoreError::UnknownName {
                kind: "entity kind",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_id_display_parses_back() {
        let id = OperationId::new();
        let parsed: OperationId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_operation_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<OperationId>().is_err());
    }

    #[test]
    fn test_entity_kind_names() {
        assert_eq!(EntityKind::Unit.to_string(), "UNIT");
        assert_eq!(
            "OBJECT_GROUP".parse::<EntityKind>().unwrap(),
            EntityKind::ObjectGroup
        );
        assert!(matches!(
            "unit".parse::<EntityKind>(),
            Err(CoreError::UnknownName { .. })
        ));
    }

    #[test]
    fn test_entity_kind_serde() {
        let json = serde_json::to_string(&EntityKind::ObjectGroup).unwrap();
        assert_eq!(json, "\"OBJECT_GROUP\"");
    }
}
