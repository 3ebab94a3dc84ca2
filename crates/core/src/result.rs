//! Read results.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Outcome of reading a selection from the cache.
///
/// `data` is None only when the starting record does not exist at all;
/// that case is "nothing to show", not partial. Otherwise `data` holds the
/// best-effort object and `partial` reports whether any counted field could
/// not be resolved.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReadResult {
    /// The reconstructed object.
    pub data: Option<JsonValue>,
    /// Whether any visible requested field was unresolvable.
    pub partial: bool,
}

impl ReadResult {
    /// A result with no data.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if there is no data.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Looks up a nested value by a `/`-separated JSON pointer.
    pub fn pointer(&self, pointer: &str) -> Option<&JsonValue> {
        self.data.as_ref().and_then(|d| d.pointer(pointer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_result() {
        let result = ReadResult::empty();
        assert!(result.is_empty());
        assert!(!result.partial);
    }

    #[test]
    fn test_pointer() {
        let result = ReadResult {
            data: Some(json!({ "viewer": { "friends": [ { "id": "2" } ] } })),
            partial: false,
        };
        assert_eq!(result.pointer("/viewer/friends/0/id"), Some(&json!("2")));
        assert_eq!(result.pointer("/viewer/parent"), None);
    }
}
