//! Demo population: movers drift around an arena, freeze when they leave it, and
//! expire after a fixed lifetime so their slots are recycled by the spawner.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sable_core::Vec2;
use sable_ecs::{QueryId, Result, System, SystemSchedule, World};
use tracing::debug;

use crate::settings::SimulationSettings;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec2);

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}

/// Tag for movers that left the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frozen;

/// The cached queries the systems iterate.
#[derive(Debug, Clone, Copy)]
pub struct Queries {
    pub movers: QueryId,
    pub frozen: QueryId,
    pub mortal: QueryId,
}

impl Queries {
    pub fn build(world: &mut World) -> Result<Self> {
        Ok(Self {
            movers: world
                .query()
                .contains::<Position>()
                .contains::<Velocity>()
                .excludes::<Frozen>()
                .build()?,
            frozen: world.query().contains::<Frozen>().build()?,
            mortal: world.query().contains::<Lifetime>().build()?,
        })
    }
}

/// Tops the population back up to its target size.
struct Spawner {
    mortal: QueryId,
    population: usize,
    lifetime: f32,
    half_extent: f32,
    rng: StdRng,
}

impl System for Spawner {
    fn run(&mut self, world: &mut World) -> Result<()> {
        let missing = self
            .population
            .saturating_sub(world.query_entities(self.mortal)?.len());
        for _ in 0..missing {
            let h = self.half_extent;
            let position = Vec2::new(self.rng.gen_range(-h..h), self.rng.gen_range(-h..h));
            let velocity = Vec2::new(self.rng.gen_range(-10.0..10.0), self.rng.gen_range(-10.0..10.0));
            // Stagger lifetimes so slots are not all recycled in the same frame.
            let remaining = self.rng.gen_range(0.5..=1.0) * self.lifetime;
            world.insert((Position(position), Velocity(velocity), Lifetime { remaining }))?;
        }
        if missing > 0 {
            debug!("Spawned {} entities", missing);
        }
        Ok(())
    }
}

/// Integrates velocity into position for every unfrozen mover.
struct Movement {
    movers: QueryId,
    dt: f32,
}

impl System for Movement {
    fn run(&mut self, world: &mut World) -> Result<()> {
        let steps: Vec<_> = world
            .query_entities(self.movers)?
            .iter()
            .filter_map(|&entity| {
                world
                    .get::<Velocity>(entity)
                    .map(|velocity| (entity, velocity.0 * self.dt))
            })
            .collect();

        let mut positions = world.storage::<Position>()?;
        for (entity, step) in steps {
            positions.update(entity, |position| position.0 += step);
        }
        Ok(())
    }
}

/// Freezes movers that left the arena.
struct Bounds {
    movers: QueryId,
    half_extent: f32,
}

impl System for Bounds {
    fn run(&mut self, world: &mut World) -> Result<()> {
        let escaped: Vec<_> = world
            .query_entities(self.movers)?
            .iter()
            .copied()
            .filter(|&entity| {
                world
                    .get::<Position>(entity)
                    .is_some_and(|p| p.0.abs().max_element() > self.half_extent)
            })
            .collect();

        let mut frozen = world.storage::<Frozen>()?;
        for entity in escaped {
            frozen.set(entity, Frozen)?;
        }
        Ok(())
    }
}

/// Counts lifetimes down and destroys expired entities.
struct Aging {
    mortal: QueryId,
    dt: f32,
}

impl System for Aging {
    fn run(&mut self, world: &mut World) -> Result<()> {
        let mortal = world.query_entities(self.mortal)?.to_vec();
        let mut expired = Vec::new();
        {
            let mut lifetimes = world.storage::<Lifetime>()?;
            for entity in mortal {
                lifetimes.update(entity, |lifetime| lifetime.remaining -= self.dt);
                if lifetimes.get(entity)?.remaining <= 0.0 {
                    expired.push(entity);
                }
            }
        }
        for entity in expired {
            world.destroy(entity);
        }
        Ok(())
    }
}

/// Assemble the frame: spawn, move, freeze escapees, expire.
pub fn schedule(queries: Queries, settings: &SimulationSettings, dt: f32) -> SystemSchedule {
    let half_extent = settings.half_extent();
    let mut schedule = SystemSchedule::new();
    schedule.add_system(Spawner {
        mortal: queries.mortal,
        population: settings.population,
        lifetime: settings.lifetime,
        half_extent,
        rng: StdRng::seed_from_u64(settings.seed),
    });
    schedule.add_system(Movement {
        movers: queries.movers,
        dt,
    });
    schedule.add_system(Bounds {
        movers: queries.movers,
        half_extent,
    });
    schedule.add_system(Aging {
        mortal: queries.mortal,
        dt,
    });
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(population: usize) -> SimulationSettings {
        SimulationSettings {
            population,
            ..Default::default()
        }
    }

    #[test]
    fn spawner_fills_population() {
        let mut world = World::new();
        let queries = Queries::build(&mut world).unwrap();
        let mut schedule = schedule(queries, &settings(16), 1.0 / 60.0);
        schedule.run_frame(&mut world).unwrap();
        assert_eq!(world.query_entities(queries.mortal).unwrap().len(), 16);
        assert_eq!(world.entity_count(), 16);
    }

    #[test]
    fn movement_integrates_velocity() {
        let mut world = World::new();
        let queries = Queries::build(&mut world).unwrap();
        let e = world
            .insert((Position(Vec2::ZERO), Velocity(Vec2::new(2.0, -4.0))))
            .unwrap();
        world.update();

        let mut movement = Movement {
            movers: queries.movers,
            dt: 0.5,
        };
        movement.run(&mut world).unwrap();
        assert_eq!(world.get::<Position>(e), Some(&Position(Vec2::new(1.0, -2.0))));
    }

    #[test]
    fn escapees_stop_moving() {
        let mut world = World::new();
        let queries = Queries::build(&mut world).unwrap();
        let e = world
            .insert((Position(Vec2::new(60.0, 0.0)), Velocity(Vec2::X)))
            .unwrap();
        world.update();
        assert_eq!(world.query_entities(queries.movers).unwrap(), &[e]);

        let mut bounds = Bounds {
            movers: queries.movers,
            half_extent: 50.0,
        };
        bounds.run(&mut world).unwrap();
        world.update();
        assert!(world.query_entities(queries.movers).unwrap().is_empty());
        assert_eq!(world.query_entities(queries.frozen).unwrap(), &[e]);
    }

    #[test]
    fn expired_entities_are_recycled() {
        let mut world = World::new();
        let queries = Queries::build(&mut world).unwrap();
        let e = world.insert((Lifetime { remaining: 0.1 },)).unwrap();
        world.update();

        let mut aging = Aging {
            mortal: queries.mortal,
            dt: 0.2,
        };
        aging.run(&mut world).unwrap();
        world.update();
        assert!(!world.alive(e));
        assert!(world.query_entities(queries.mortal).unwrap().is_empty());

        let reused = world.spawn().unwrap();
        assert_eq!(reused.index(), e.index());
    }

    #[test]
    fn zero_arena_does_not_panic() {
        let mut world = World::new();
        let queries = Queries::build(&mut world).unwrap();
        let settings = SimulationSettings {
            population: 8,
            arena_half_extent: 0.0,
            ..Default::default()
        };
        let mut schedule = schedule(queries, &settings, 1.0 / 60.0);
        schedule.run_frame(&mut world).unwrap();
        assert_eq!(world.entity_count(), 8);
    }

    #[test]
    fn population_is_stable_over_many_frames() {
        let mut world = World::new();
        let queries = Queries::build(&mut world).unwrap();
        let mut schedule = schedule(queries, &settings(32), 0.1);
        for _ in 0..200 {
            schedule.run_frame(&mut world).unwrap();
            assert!(world.entity_count() <= 32);
        }
        // Slots are recycled instead of growing without bound.
        assert!(world.entities().all(|e| e.index() < 64));
    }
}
