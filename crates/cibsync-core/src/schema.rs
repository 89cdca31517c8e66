//! Schema versions and the catalog of known schemas.
//!
//! Schemas are named `pacemaker-<major>.<minor>` and ordered by their
//! numeric version. Each schema has a main file that may include other
//! files; the catalog resolves those includes when a peer asks for every
//! schema newer than the one it already has.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const SCHEMA_PREFIX: &str = "pacemaker-";

/// Numeric schema version, ordered by `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl SchemaVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The schema name for this version, e.g. `pacemaker-3.9`.
    pub fn name(&self) -> String {
        format!("{SCHEMA_PREFIX}{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for SchemaVersion {
    type Err = CoreError;

    /// Accepts both `pacemaker-3.9` and bare `3.9`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s.strip_prefix(SCHEMA_PREFIX).unwrap_or(s);
        let (major, minor) = bare
            .split_once('.')
            .ok_or_else(|| CoreError::InvalidSchemaName(s.to_string()))?;
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| CoreError::InvalidSchemaName(s.to_string()))
        };
        Ok(Self::new(parse(major)?, parse(minor)?))
    }
}

/// One schema file and the files it includes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFile {
    pub name: String,
    pub content: String,
    /// Names of other files this one includes.
    #[serde(default)]
    pub includes: Vec<String>,
}

impl SchemaFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            includes: Vec::new(),
        }
    }

    pub fn including(mut self, file: impl Into<String>) -> Self {
        self.includes.push(file.into());
        self
    }
}

/// A known schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub version: SchemaVersion,
    /// The schema's main file.
    pub file: SchemaFile,
}

impl SchemaDefinition {
    pub fn name(&self) -> String {
        self.version.name()
    }
}

/// A schema as sent to a peer: its name and every file not already sent
/// in an earlier bundle of the same reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBundle {
    pub version: String,
    pub files: Vec<SchemaFile>,
}

/// Ordered set of known schemas plus shared include files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaCatalog {
    /// Sorted ascending by version.
    schemas: Vec<SchemaDefinition>,
    /// Include files shared between schemas, by name.
    includes: BTreeMap<String, SchemaFile>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema, keeping the catalog ordered. Replaces an existing
    /// schema with the same version.
    pub fn add_schema(&mut self, schema: SchemaDefinition) {
        match self
            .schemas
            .binary_search_by(|s| s.version.cmp(&schema.version))
        {
            Ok(idx) => self.schemas[idx] = schema,
            Err(idx) => self.schemas.insert(idx, schema),
        }
    }

    pub fn with_schema(mut self, schema: SchemaDefinition) -> Self {
        self.add_schema(schema);
        self
    }

    /// Register a file that schemas may include.
    pub fn add_include(&mut self, file: SchemaFile) {
        self.includes.insert(file.name.clone(), file);
    }

    pub fn with_include(mut self, file: SchemaFile) -> Self {
        self.add_include(file);
        self
    }

    pub fn latest(&self) -> Option<&SchemaDefinition> {
        self.schemas.last()
    }

    pub fn get(&self, version: SchemaVersion) -> Option<&SchemaDefinition> {
        self.schemas.iter().find(|s| s.version == version)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Every known schema strictly newer than `after`, ascending.
    pub fn later_than(&self, after: SchemaVersion) -> impl Iterator<Item = &SchemaDefinition> {
        self.schemas.iter().filter(move |s| s.version > after)
    }

    /// Bundle every schema newer than `after` for transmission.
    ///
    /// A file (main or included) appears in at most one bundle: the first
    /// one that needs it.
    pub fn bundles_after(&self, after: SchemaVersion) -> Vec<SchemaBundle> {
        let mut already_included = HashSet::new();
        self.later_than(after)
            .map(|schema| {
                let mut files = Vec::new();
                self.collect_files(&schema.file, &mut already_included, &mut files);
                SchemaBundle {
                    version: schema.name(),
                    files,
                }
            })
            .collect()
    }

    fn collect_files(
        &self,
        file: &SchemaFile,
        already_included: &mut HashSet<String>,
        out: &mut Vec<SchemaFile>,
    ) {
        if !already_included.insert(file.name.clone()) {
            return;
        }
        out.push(file.clone());
        for name in &file.includes {
            if let Some(included) = self.includes.get(name) {
                self.collect_files(included, already_included, out);
            }
        }
    }
}
