use crate::entity::Entity;
use crate::error::Result;
use crate::registry::ComponentRegistry;
use crate::world::World;

/// Marker trait for types that can be stored as ECS components.
pub trait Component: 'static + Send + Sync {}

/// Blanket implementation: any `'static + Send + Sync` type is a valid component.
impl<T: 'static + Send + Sync> Component for T {}

/// A group of components attached together by [`World::insert`].
pub trait Bundle {
    /// Register every component type of the bundle.
    fn register(registry: &mut ComponentRegistry) -> Result<()>;

    /// Store every component of the bundle on `entity`.
    fn insert_into(self, world: &mut World, entity: Entity) -> Result<()>;
}

macro_rules! impl_bundle_tuple {
    ($($name:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<$($name: Component),*> Bundle for ($($name,)*) {
            fn register(registry: &mut ComponentRegistry) -> Result<()> {
                $(registry.register::<$name>()?;)*
                Ok(())
            }

            fn insert_into(self, world: &mut World, entity: Entity) -> Result<()> {
                let ($($name,)*) = self;
                $(world.storage::<$name>()?.set(entity, $name)?;)*
                Ok(())
            }
        }
    };
}

impl_bundle_tuple!();
impl_bundle_tuple!(A);
impl_bundle_tuple!(A, B);
impl_bundle_tuple!(A, B, C);
impl_bundle_tuple!(A, B, C, D);
impl_bundle_tuple!(A, B, C, D, E);
impl_bundle_tuple!(A, B, C, D, E, F);
impl_bundle_tuple!(A, B, C, D, E, F, G);
impl_bundle_tuple!(A, B, C, D, E, F, G, H);
