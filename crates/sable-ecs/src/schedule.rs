use crate::error::{Result, ScheduleError};
use crate::world::World;

/// A system that operates on the world each frame.
pub trait System: Send + Sync {
    fn run(&mut self, world: &mut World) -> Result<()>;
}

/// Blanket implementation so closures can be used as systems.
impl<F: FnMut(&mut World) -> Result<()> + Send + Sync> System for F {
    fn run(&mut self, world: &mut World) -> Result<()> {
        (self)(world)
    }
}

/// An ordered list of systems, followed by the world tick.
pub struct SystemSchedule {
    systems: Vec<(Option<String>, Box<dyn System>)>,
}

impl SystemSchedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
        }
    }

    /// Add a system to the end of the schedule.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push((None, Box::new(system)));
    }

    /// Add a system under a unique name.
    pub fn add_named<S: System + 'static>(
        &mut self,
        name: impl Into<String>,
        system: S,
    ) -> std::result::Result<(), ScheduleError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(ScheduleError::DuplicateSystem(name));
        }
        self.systems.push((Some(name), Box::new(system)));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.systems
            .iter()
            .any(|(existing, _)| existing.as_deref() == Some(name))
    }

    /// Run every system in order, then [`World::update`] once.
    ///
    /// A failing system stops the frame before the tick; its changes stay in
    /// the ledger and are picked up by the next successful update.
    pub fn run_frame(&mut self, world: &mut World) -> Result<()> {
        for (_, system) in &mut self.systems {
            system.run(world)?;
        }
        world.update();
        Ok(())
    }

    /// Number of systems in the schedule.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl Default for SystemSchedule {
    fn default() -> Self {
        Self::new()
    }
}
