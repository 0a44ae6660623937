use std::fmt;

use crate::bitset::Bitset;
use crate::registry::ComponentId;

const COMPOSITION_WORDS: usize = 2;

/// Maximum number of distinct component types a single world can register.
pub const MAX_COMPONENTS: usize = Bitset::<COMPOSITION_WORDS>::CAPACITY;

/// The set of component types an entity currently owns, one bit per [`ComponentId`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Composition {
    bits: Bitset<COMPOSITION_WORDS>,
}

impl Composition {
    pub const EMPTY: Composition = Composition {
        bits: Bitset::new(),
    };

    /// Returns `true` if the component was not already part of the composition.
    pub fn set(&mut self, id: ComponentId) -> bool {
        self.bits.set(id.index())
    }

    /// Returns `true` if the component was part of the composition.
    pub fn remove(&mut self, id: ComponentId) -> bool {
        self.bits.remove(id.index())
    }

    pub fn has(&self, id: ComponentId) -> bool {
        self.bits.has(id.index())
    }

    /// Every component in `other` is also in `self`.
    pub fn contains(&self, other: &Composition) -> bool {
        self.bits.contains(&other.bits)
    }

    /// No component in `other` is in `self`.
    pub fn excludes(&self, other: &Composition) -> bool {
        self.bits.excludes(&other.bits)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bits.count()
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.bits.iter().map(ComponentId::from_index)
    }
}

impl FromIterator<ComponentId> for Composition {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().map(ComponentId::index).collect(),
        }
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Composition{:?}", self.bits)
    }
}
