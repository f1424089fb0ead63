//! Change resolution: from changed paths to the set of units to execute.
//!
//! A changed test source selects its own unit when that unit is concrete,
//! and every unit that inherits from it, through superclasses or
//! interfaces. The changed unit itself is gated on being concrete; its
//! specializations are taken as the catalog reports them.

use tracing::{debug, info};

use crate::catalog::UnitCatalog;
use crate::domain::error::Result;
use crate::domain::{ExecutionSet, TestSourceLayout};

/// Stateless resolver; every call returns a fresh [`ExecutionSet`].
#[derive(Debug, Clone, Default)]
pub struct ChangeResolver {
    layout: TestSourceLayout,
}

impl ChangeResolver {
    pub fn new(layout: TestSourceLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &TestSourceLayout {
        &self.layout
    }

    /// Resolve the execution set for `changed_paths`.
    ///
    /// Fails with `UnitNotFound` when a changed test source has no compiled
    /// unit, and with `InvariantViolation` when one name maps to several.
    pub fn resolve<S: AsRef<str>>(
        &self,
        changed_paths: &[S],
        catalog: &UnitCatalog,
    ) -> Result<ExecutionSet> {
        let mut selected = ExecutionSet::new();

        for path in changed_paths {
            let path = path.as_ref();
            let Some(unit_id) = self.layout.unit_id_for(path) else {
                debug!(path = %path, "Not a test source, skipping");
                continue;
            };

            let unit = catalog.load_by_name(&unit_id)?;
            debug!(unit = %unit.id, is_abstract = unit.is_abstract, "Loaded changed unit");

            if unit.is_concrete() && selected.insert(unit.clone()) {
                debug!(unit = %unit.id, "Marking unit to be tested");
            }

            for child in catalog.specializations_of(&unit_id)? {
                if selected.insert(child.clone()) {
                    debug!(
                        unit = %child.id,
                        ancestor = %unit_id,
                        "Marking unit to be tested as a specialization"
                    );
                }
            }
        }

        info!(
            changed = changed_paths.len(),
            selected = selected.len(),
            "Resolved execution set"
        );
        Ok(selected)
    }
}
