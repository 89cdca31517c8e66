//! The replicated configuration document.
//!
//! A document is a small element tree: a name, string attributes, and
//! ordered children. The replication core only reads a handful of root
//! attributes (the version triple and the schema it validates against);
//! everything else is carried opaquely.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::VersionTriple;

/// Element name of a whole-document root.
pub const CIB_ELEMENT: &str = "cib";

/// Root attribute names.
pub mod attrs {
    pub const ADMIN_EPOCH: &str = "admin_epoch";
    pub const EPOCH: &str = "epoch";
    pub const NUM_UPDATES: &str = "num_updates";
    pub const VALIDATE_WITH: &str = "validate-with";
    pub const FEATURE_SET: &str = "crm_feature_set";
}

/// An element of the configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Element name.
    pub name: String,
    /// Attributes, kept sorted so iteration order is deterministic.
    pub attributes: BTreeMap<String, String>,
    /// Child elements in document order.
    pub children: Vec<Document>,
}

impl Document {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Create an empty whole-document root at the given version.
    pub fn cib(version: VersionTriple) -> Self {
        let mut doc = Self::new(CIB_ELEMENT);
        doc.set_version(version);
        doc
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Document) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// First child with the given element name.
    pub fn child(&self, name: &str) -> Option<&Document> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Whether this element is a whole-document root.
    pub fn is_cib_root(&self) -> bool {
        self.name == CIB_ELEMENT
    }

    /// Read the version triple.
    ///
    /// Missing counters read as zero; counters that are present but not
    /// numeric are an error.
    pub fn try_version(&self) -> Result<VersionTriple, CoreError> {
        Ok(VersionTriple {
            admin_epoch: self.counter(attrs::ADMIN_EPOCH)?,
            epoch: self.counter(attrs::EPOCH)?,
            num_updates: self.counter(attrs::NUM_UPDATES)?,
        })
    }

    /// Read the version triple, treating malformed counters as zero.
    pub fn version(&self) -> VersionTriple {
        VersionTriple {
            admin_epoch: self.counter(attrs::ADMIN_EPOCH).unwrap_or(0),
            epoch: self.counter(attrs::EPOCH).unwrap_or(0),
            num_updates: self.counter(attrs::NUM_UPDATES).unwrap_or(0),
        }
    }

    pub fn set_version(&mut self, version: VersionTriple) {
        self.set_attr(attrs::ADMIN_EPOCH, version.admin_epoch.to_string());
        self.set_attr(attrs::EPOCH, version.epoch.to_string());
        self.set_attr(attrs::NUM_UPDATES, version.num_updates.to_string());
    }

    /// Name of the schema this document validates against, if any.
    pub fn validate_with(&self) -> Option<&str> {
        self.attr(attrs::VALIDATE_WITH)
    }

    /// Copy of this element's name and attributes, without children.
    ///
    /// Enough for a peer to compare version triples.
    pub fn shallow_copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children: Vec::new(),
        }
    }

    fn counter(&self, name: &'static str) -> Result<u64, CoreError> {
        match self.attr(name) {
            None => Ok(0),
            Some(value) => value.parse().map_err(|_| CoreError::InvalidVersion {
                name,
                value: value.to_string(),
            }),
        }
    }
}
