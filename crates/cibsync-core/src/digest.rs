//! Versioned document digests.
//!
//! A digest is a Blake3 hash over the canonical encoding of a document,
//! domain-separated by the feature set of the node computing it. Peers
//! compare digests to detect divergence without shipping the document.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::canonical_document_bytes;
use crate::document::Document;

/// Domain separator for document digests.
const DIGEST_DOMAIN: &[u8] = b"cibsync-digest-v1:";

/// Root attributes that change on every write without changing content.
const VOLATILE_ATTRIBUTES: &[&str] = &[
    "origin",
    "cib-last-written",
    "update-origin",
    "update-client",
    "update-user",
];

/// A 32-byte document fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the digest of a whole document for the given feature set.
///
/// Volatile root attributes are stripped before hashing, so two nodes that
/// agree on content and version agree on the digest even if they recorded
/// different write metadata.
pub fn versioned_digest(doc: &Document, feature_set: &str) -> Digest {
    let mut filtered = doc.shallow_copy();
    for attr in VOLATILE_ATTRIBUTES {
        filtered.remove_attr(attr);
    }
    filtered.children = doc.children.clone();

    let mut hasher = blake3::Hasher::new();
    hasher.update(DIGEST_DOMAIN);
    hasher.update(feature_set.as_bytes());
    hasher.update(b":");
    hasher.update(&canonical_document_bytes(&filtered));
    Digest(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::attrs;
    use crate::types::VersionTriple;

    fn sample() -> Document {
        Document::cib(VersionTriple::new(0, 12, 4))
            .with_attr(attrs::VALIDATE_WITH, "pacemaker-3.9")
            .with_child(
                Document::new("configuration")
                    .with_child(Document::new("nodes").with_attr("id", "n1")),
            )
    }

    #[test]
    fn test_digest_deterministic() {
        let doc = sample();
        assert_eq!(versioned_digest(&doc, "3.19.0"), versioned_digest(&doc, "3.19.0"));
    }

    #[test]
    fn test_digest_ignores_volatile_attributes() {
        let doc = sample();
        let touched = sample()
            .with_attr("cib-last-written", "Mon Oct 12 10:00:00 2026")
            .with_attr("update-origin", "node2");
        assert_eq!(versioned_digest(&doc, "3.19.0"), versioned_digest(&touched, "3.19.0"));
    }

    #[test]
    fn test_digest_tracks_version() {
        let doc = sample();
        let mut bumped = sample();
        bumped.set_version(doc.version().next_update());
        assert_ne!(versioned_digest(&doc, "3.19.0"), versioned_digest(&bumped, "3.19.0"));
    }

    #[test]
    fn test_digest_depends_on_feature_set() {
        let doc = sample();
        assert_ne!(versioned_digest(&doc, "3.19.0"), versioned_digest(&doc, "3.18.0"));
    }

    #[test]
    fn test_digest_display_is_hex() {
        let d = Digest::from_bytes([0xab; 32]);
        assert_eq!(d.to_string().len(), 64);
        assert!(format!("{:?}", d).starts_with("Digest(abab"));
    }
}
