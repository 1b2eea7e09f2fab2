/*
 * 3D Flocking Simulation - Module Definitions
 *
 * This file defines the module structure for the flocking library.
 * A Flock owns a fixed set of Units and drives them once per tick; each
 * Unit steers by cohesion, alignment, avoidance, bounds containment and
 * ray-cast obstacle avoidance.
 */

// Re-export key components for easier access
pub use config::{FlockConfig, RunSettings};
pub use debug::FlockStats;
pub use error::{ConfigError, FlockError};
pub use flock::Flock;
pub use params::{FlockParameters, SpawnSettings, UnitData};
pub use raycast::{LayerMask, NoObstacles, Obstacle, ObstacleField, RayCaster, RayHit, Shape};
pub use unit::{FlockView, Neighbours, Steering, Unit};

// Define modules
pub mod config;
pub mod debug;
pub mod error;
pub mod flock;
pub mod math;
pub mod params;
pub mod raycast;
pub mod unit;

// Constants
// Fraction of bounds_distance past which units steer back to the center
pub const BOUNDS_RETURN_FRACTION: f32 = 0.9;
