//! Test units, their identifiers and the execution set.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Fully qualified unit name in binary form (`pkg.Outer$Inner`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build from an internal class-file name (`pkg/Outer$Inner`).
    pub fn from_internal_name(name: &str) -> Self {
        Self(name.replace('/', "."))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name as written in source, nested units separated by `.`.
    pub fn canonical_name(&self) -> String {
        self.0.replace('$', ".")
    }

    /// Last segment of the name, without the namespace.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit(['.', '$']).next().unwrap_or(&self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A loaded, introspectable test construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub is_abstract: bool,
    /// Direct parent, present only when the parent is itself a catalog unit.
    pub parent: Option<UnitId>,
    /// Directly implemented interfaces that are catalog units.
    #[serde(default)]
    pub interfaces: Vec<UnitId>,
    /// Compiled artifact the unit was read from.
    pub artifact: PathBuf,
}

impl Unit {
    pub fn is_concrete(&self) -> bool {
        !self.is_abstract
    }

    /// Direct supertype edges: the parent first, then interfaces.
    pub fn supertypes(&self) -> impl Iterator<Item = &UnitId> {
        self.parent.iter().chain(self.interfaces.iter())
    }
}

/// Where test sources live and how their paths map to unit ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSourceLayout {
    /// Repository-relative root, always ending in `/`.
    root: String,
    /// Source extension without the dot.
    extension: String,
}

impl Default for TestSourceLayout {
    fn default() -> Self {
        Self::new("src/test/java/", "java")
    }
}

impl TestSourceLayout {
    pub fn new(root: &str, extension: &str) -> Self {
        let mut root = root.trim().replace('\\', "/");
        while root.starts_with("./") {
            root.drain(..2);
        }
        if !root.is_empty() && !root.ends_with('/') {
            root.push('/');
        }
        Self {
            root,
            extension: extension.trim().trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether the changed path is a test source under the configured root.
    pub fn is_test_source(&self, path: &str) -> bool {
        self.relative_stem(path).is_some()
    }

    /// Derive the unit id for a test source path; `None` for any other path.
    pub fn unit_id_for(&self, path: &str) -> Option<UnitId> {
        self.relative_stem(path)
            .map(|stem| UnitId::new(stem.replace('/', ".")))
    }

    fn relative_stem<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.root.as_str())?;
        let stem = rest.strip_suffix(self.extension.as_str())?.strip_suffix('.')?;
        if stem.is_empty() || stem.ends_with('/') {
            return None;
        }
        Some(stem)
    }
}

/// Insertion-ordered, duplicate-free set of units selected to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSet {
    units: Vec<Unit>,
    seen: HashSet<UnitId>,
}

impl ExecutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit unless already present. Returns whether it was added.
    pub fn insert(&mut self, unit: Unit) -> bool {
        if self.seen.contains(&unit.id) {
            return false;
        }
        self.seen.insert(unit.id.clone());
        self.units.push(unit);
        true
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.id.clone()).collect()
    }

    /// Canonical names in insertion order, as passed to the test runner.
    pub fn canonical_names(&self) -> Vec<String> {
        self.units.iter().map(|u| u.id.canonical_name()).collect()
    }

    pub fn into_units(self) -> Vec<Unit> {
        self.units
    }
}
