use crate::composition::Composition;
use crate::registry::ComponentId;

/// Query eligibility: every inclusion present, no exclusion present.
///
/// Filters compare and hash structurally, so the order in which components were
/// named does not matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Filter {
    inclusions: Composition,
    exclusions: Composition,
}

impl Filter {
    pub fn new(inclusions: Composition, exclusions: Composition) -> Self {
        Self {
            inclusions,
            exclusions,
        }
    }

    pub fn include(&mut self, id: ComponentId) {
        self.inclusions.set(id);
    }

    pub fn exclude(&mut self, id: ComponentId) {
        self.exclusions.set(id);
    }

    pub fn inclusions(&self) -> &Composition {
        &self.inclusions
    }

    pub fn exclusions(&self) -> &Composition {
        &self.exclusions
    }

    /// Whether an entity with this composition belongs in the query.
    pub fn test(&self, composition: &Composition) -> bool {
        composition.contains(&self.inclusions) && composition.excludes(&self.exclusions)
    }
}
