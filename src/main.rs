//! Sable - headless ECS simulation
//!
//! Runs the demo population through a fixed number of frames, one world tick per
//! fixed step. Pass a settings file path as the first argument to override the
//! default location, or `--init [path]` to write the default settings there.

mod settings;
mod simulation;

use std::path::PathBuf;

use anyhow::{Context, Result};
use sable_core::FrameClock;
use sable_ecs::World;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use settings::Settings;
use simulation::Queries;

fn init_logging(level: Level) -> Result<()> {
    let builder = FmtSubscriber::builder().with_target(false);
    let installed = if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(level).finish())
    };
    installed.context("Failed to set subscriber")
}

fn main() -> Result<()> {
    let mut args = std::env::args_os().skip(1).peekable();
    let write_defaults = args.peek().is_some_and(|arg| arg == "--init");
    if write_defaults {
        args.next();
    }
    let path = args.next().map(PathBuf::from);

    if write_defaults {
        init_logging(Level::INFO)?;
        let path = path
            .or_else(Settings::default_path)
            .context("Could not determine config directory")?;
        return Settings::default().save(&path);
    }

    let settings = Settings::load(path.as_deref());
    init_logging(settings.logging.level())?;

    info!("Starting Sable simulation...");
    info!(
        "Population {}, {} frames at {:.4}s per step",
        settings.simulation.population, settings.simulation.frames, settings.time.fixed_timestep
    );

    let mut world = World::with_config(settings.world.clone());
    let queries = Queries::build(&mut world).context("Failed to build queries")?;
    let mut schedule =
        simulation::schedule(queries, &settings.simulation, settings.time.fixed_timestep);
    let mut clock = FrameClock::new(settings.time.clone());

    // Headless: every frame advances the clock by exactly one fixed step.
    for _ in 0..settings.simulation.frames {
        clock.advance(settings.time.fixed_timestep);
        for _ in 0..clock.fixed_steps() {
            schedule
                .run_frame(&mut world)
                .with_context(|| format!("Frame {} failed", clock.frame_count))?;
        }

        if clock.frame_count % 60 == 0 {
            info!(
                "Frame {}: {} alive, {} moving, {} frozen",
                clock.frame_count,
                world.entity_count(),
                world.query_entities(queries.movers)?.len(),
                world.query_entities(queries.frozen)?.len()
            );
        }
    }

    info!(
        "Finished after {} ticks ({:.1}s simulated) with {} live entities",
        world.ticks(),
        clock.total_time,
        world.entity_count()
    );
    Ok(())
}
