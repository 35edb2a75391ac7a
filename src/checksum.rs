//! Document fingerprints
//!
//! A session fingerprints the canonical form of its document, so two
//! documents that differ only in key order share a fingerprint.

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum of document content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Checksum of a JSON value as serialized, key order included
    pub fn from_json(value: &serde_json::Value) -> Self {
        let serialized = serde_json::to_vec(value).unwrap_or_default();
        Self::from_bytes(&serialized)
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogRegistry;
    use crate::sort::CanonicalSorter;
    use serde_json::json;

    fn fingerprint(document: &serde_json::Value) -> Checksum {
        let catalog = CatalogRegistry::new();
        Checksum::from_json(&CanonicalSorter::new(&catalog).sort(document))
    }

    #[test]
    fn test_key_order_does_not_change_fingerprint() {
        let a = json!({ "name": "t", "actions": [ { "print": { "message": "Hi", "color": "red" } } ] });
        let b = json!({ "actions": [ { "print": { "color": "red", "message": "Hi" } } ], "name": "t" });
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(Checksum::from_json(&a), Checksum::from_json(&b));
    }

    #[test]
    fn test_array_order_changes_fingerprint() {
        let a = json!({ "actions": [ { "print": {} }, { "sleep": {} } ] });
        let b = json!({ "actions": [ { "sleep": {} }, { "print": {} } ] });
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_checksum_format() {
        let checksum = Checksum::from_bytes(b"flow");
        assert_eq!(checksum.as_str().len(), 64);
        assert_eq!(checksum.to_string(), checksum.as_str());
    }
}
