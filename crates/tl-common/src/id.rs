//! Identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch ID for tracking one multi-file load.
///
/// Format: `load-<date>-<time>-<random>`
/// Example: `load-20260115-143022-abc123`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    /// Generate a new batch ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4()
            .to_string()
            .chars()
            .take(6)
            .collect();
        BatchId(format!("load-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_id_format() {
        let id = BatchId::new();
        assert!(id.0.starts_with("load-"));
        assert_eq!(id.0.len(), "load-20260115-143022-abc123".len());
        assert_eq!(id.to_string(), id.0);
    }

    #[test]
    fn test_batch_ids_are_distinct() {
        assert_ne!(BatchId::new(), BatchId::new());
    }

    #[test]
    fn test_batch_id_serializes_as_plain_string() {
        let id = BatchId::new();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.0.clone()));
    }
}
