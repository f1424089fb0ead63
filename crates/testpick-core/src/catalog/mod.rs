//! Unit catalog: an index of every compiled unit under the output roots.
//!
//! The catalog is rebuilt from the compiled artifacts on every invocation.
//! Each entry carries explicit edges taken from the artifact's declared
//! supertype and implemented interfaces, so specialization queries walk
//! those edges instead of consulting any runtime type system.

pub mod classfile;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::error::{Result, SelectorError};
use crate::domain::{Unit, UnitId};

pub use classfile::{encode_class, encode_header, parse_header, ClassFileError, ClassHeader};

const ARTIFACT_EXTENSION: &str = "class";

/// A unit as read from its artifact, before parent pointers are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredUnit {
    pub id: UnitId,
    pub is_abstract: bool,
    /// Supertype named by the artifact, whether or not it is in the catalog.
    pub declared_parent: Option<UnitId>,
    /// Interfaces named by the artifact.
    pub declared_interfaces: Vec<UnitId>,
    pub artifact: PathBuf,
}

impl DeclaredUnit {
    pub fn new(id: &str, is_abstract: bool, declared_parent: Option<&str>) -> Self {
        Self {
            id: UnitId::new(id),
            is_abstract,
            declared_parent: declared_parent.map(UnitId::new),
            declared_interfaces: Vec::new(),
            artifact: PathBuf::new(),
        }
    }

    pub fn implementing(mut self, interfaces: &[&str]) -> Self {
        self.declared_interfaces = interfaces.iter().map(|i| UnitId::new(*i)).collect();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: Vec<Unit>,
    index: HashMap<UnitId, Vec<usize>>,
}

impl UnitCatalog {
    /// Walk every root and read each compiled artifact. Missing roots are skipped.
    pub fn load<P: AsRef<Path>>(roots: &[P]) -> Result<Self> {
        let mut declared = Vec::new();
        for root in roots {
            let root = root.as_ref();
            if !root.is_dir() {
                debug!(root = %root.display(), "Skipping missing output root");
                continue;
            }
            let before = declared.len();
            scan_root(root, &mut declared)?;
            debug!(
                root = %root.display(),
                units = declared.len() - before,
                "Scanned output root"
            );
        }

        let catalog = Self::from_declared(declared);
        info!(units = catalog.len(), "Unit catalog loaded");
        Ok(catalog)
    }

    /// Build a catalog from already-decoded units, resolving supertype edges.
    pub fn from_declared(declared: Vec<DeclaredUnit>) -> Self {
        let known: HashSet<UnitId> = declared.iter().map(|d| d.id.clone()).collect();

        let mut units = Vec::with_capacity(declared.len());
        let mut index: HashMap<UnitId, Vec<usize>> = HashMap::new();
        for d in declared {
            let parent = d.declared_parent.filter(|p| known.contains(p));
            let interfaces = d
                .declared_interfaces
                .into_iter()
                .filter(|i| known.contains(i))
                .collect();
            index.entry(d.id.clone()).or_default().push(units.len());
            units.push(Unit {
                id: d.id,
                is_abstract: d.is_abstract,
                parent,
                interfaces,
                artifact: d.artifact,
            });
        }
        Self { units, index }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Resolve a unit by name.
    ///
    /// An absent name means the compiled output does not reflect the sources
    /// (stale build). More than one entry breaks the one-artifact-per-name
    /// invariant and is reported as such.
    pub fn load_by_name(&self, id: &UnitId) -> Result<&Unit> {
        match self.index.get(id).map(Vec::as_slice) {
            None | Some([]) => Err(SelectorError::UnitNotFound(id.clone())),
            Some([single]) => Ok(&self.units[*single]),
            Some(many) => Err(SelectorError::InvariantViolation(format!(
                "{id} is defined by {} artifacts: {}",
                many.len(),
                many.iter()
                    .map(|i| self.units[*i].artifact.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Every unit that inherits from `id`, through superclasses or
    /// interfaces, in catalog order.
    ///
    /// Scans the whole catalog and walks each candidate's supertype edges
    /// upward until it reaches `id` or runs out of catalog units.
    pub fn specializations_of(&self, id: &UnitId) -> Result<Vec<&Unit>> {
        let mut found = Vec::new();
        for unit in &self.units {
            if &unit.id == id {
                continue;
            }
            debug!(candidate = %unit.id, ancestor = %id, "Checking specialization");
            let mut walk = Walk::default();
            if self.reaches(unit, id, &mut walk)? {
                found.push(unit);
            }
        }
        Ok(found)
    }

    /// Depth-first search over supertype edges. A unit met again while still
    /// on the current path means the hierarchy is cyclic.
    fn reaches<'a>(
        &'a self,
        unit: &'a Unit,
        ancestor: &UnitId,
        walk: &mut Walk<'a>,
    ) -> Result<bool> {
        walk.on_path.insert(&unit.id);
        for edge in unit.supertypes() {
            if edge == ancestor {
                return Ok(true);
            }
            if walk.on_path.contains(edge) {
                return Err(SelectorError::InvariantViolation(format!(
                    "cyclic supertype chain through {} and {}",
                    unit.id, edge
                )));
            }
            if walk.finished.contains(edge) {
                continue;
            }
            let next = self
                .index
                .get(edge)
                .and_then(|entries| entries.first())
                .map(|i| &self.units[*i]);
            if let Some(next) = next {
                if self.reaches(next, ancestor, walk)? {
                    return Ok(true);
                }
            }
        }
        walk.on_path.remove(&unit.id);
        walk.finished.insert(&unit.id);
        Ok(false)
    }
}

#[derive(Default)]
struct Walk<'a> {
    on_path: HashSet<&'a UnitId>,
    finished: HashSet<&'a UnitId>,
}

fn scan_root(root: &Path, declared: &mut Vec<DeclaredUnit>) -> Result<()> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            SelectorError::Catalog(format!("cannot walk {}: {e}", root.display()))
        })?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION)
        {
            continue;
        }
        if is_descriptor(path) {
            continue;
        }

        let bytes = std::fs::read(path)?;
        let header = parse_header(&bytes)
            .map_err(|e| SelectorError::Catalog(format!("{}: {e}", path.display())))?;

        if header.is_module() || header.is_synthetic() || is_anonymous(&header.this_class) {
            continue;
        }

        declared.push(DeclaredUnit {
            id: UnitId::from_internal_name(&header.this_class),
            is_abstract: header.is_abstract(),
            declared_parent: header
                .super_class
                .as_deref()
                .map(UnitId::from_internal_name),
            declared_interfaces: header
                .interfaces
                .iter()
                .map(|i| UnitId::from_internal_name(i))
                .collect(),
            artifact: path.to_path_buf(),
        });
    }
    Ok(())
}

fn is_descriptor(path: &Path) -> bool {
    matches!(
        path.file_stem().and_then(|s| s.to_str()),
        Some("module-info" | "package-info")
    )
}

/// Anonymous (`Outer$1`) and local (`Outer$1Helper`) classes cannot be run on their own.
fn is_anonymous(internal_name: &str) -> bool {
    internal_name
        .rsplit('/')
        .next()
        .unwrap_or(internal_name)
        .split('$')
        .skip(1)
        .any(|segment| segment.starts_with(|c: char| c.is_ascii_digit()))
}
