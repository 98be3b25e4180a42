//! Collision detection for recurring weekly schedules.
//!
//! A user cannot be scheduled twice at overlapping times on the same day,
//! regardless of lab. Intervals are half-open, so back-to-back shifts are allowed.

mod batch;
mod resolver;

pub use batch::{check_collision_batch, BatchCheck, DayConflict};
pub use resolver::{check_collision, CollisionReport, CollisionResult};
