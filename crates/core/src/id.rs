//! Unique identifiers for opsctl entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for an audit entry.
///
/// ULIDs sort by creation time, so ordering entries by id is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuditId(Ulid);

impl AuditId {
    /// Generate a new AuditId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for AuditId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Identifier for an actor (could be an operator, a service, or the system).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create a new agent ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_ids_parse_back() {
        let id = AuditId::new();
        let parsed: AuditId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn audit_ids_are_monotonic_enough_to_sort() {
        let a = AuditId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = AuditId::new();
        assert!(a < b);
    }
}
