//! Sable Core - Shared primitives for the Sable ECS
//!
//! This crate provides the foundational pieces used by the ECS and its consumers:
//! - An append-only event log with independent read cursors
//! - A frame clock with fixed-timestep accumulation
//! - Mathematical primitives (re-exported from glam)

pub mod events;
pub mod time;

pub use events::{Cursor, EventLog};
pub use glam::{Vec2, Vec3};
pub use time::{FrameClock, TimeConfig};
