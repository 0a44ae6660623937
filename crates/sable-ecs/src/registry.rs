use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::component::Component;
use crate::composition::MAX_COMPONENTS;
use crate::error::{EcsError, Result};

/// Bit position assigned to a component type within one world.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u8);

impl ComponentId {
    pub(crate) fn from_index(index: usize) -> Self {
        debug_assert!(index < MAX_COMPONENTS);
        Self(index as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Assigns component types sequential ids on first use.
///
/// Scoped to a single world; two worlds may give the same type different ids.
#[derive(Default)]
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentId>,
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `T`, registering it if this is the first time it is seen.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId> {
        if let Some(&id) = self.ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        if self.names.len() >= MAX_COMPONENTS {
            return Err(EcsError::ComponentLimitExceeded {
                component: type_name::<T>(),
                limit: MAX_COMPONENTS,
            });
        }
        let id = ComponentId::from_index(self.names.len());
        self.ids.insert(TypeId::of::<T>(), id);
        self.names.push(type_name::<T>());
        debug!("Registered component {} as {:?}", type_name::<T>(), id);
        Ok(id)
    }

    /// Id for `T` without registering it.
    pub fn id<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Type name registered under `id`.
    pub fn name(&self, id: ComponentId) -> Option<&'static str> {
        self.names.get(id.index()).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
