/*
 * Debug Information Module
 *
 * This module defines the FlockStats struct, a per-tick summary of the
 * flock used for logging from the runner.
 *
 * Includes:
 * - Tick counter and tick wall time
 * - Mean, min and max unit speed
 * - Number of units holding an obstacle escape direction
 * - Number of units being pulled back toward the center
 * - Flock centroid
 */

use std::fmt;
use std::time::Duration;

use glam::Vec3;

use crate::flock::Flock;
use crate::BOUNDS_RETURN_FRACTION;

#[derive(Debug, Clone, PartialEq)]
pub struct FlockStats {
    pub tick: u64,
    pub unit_count: usize,
    pub mean_speed: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    pub avoiding_obstacles: usize,
    pub returning_to_bounds: usize,
    pub centroid: Vec3,
    pub tick_time: Duration,
}

impl FlockStats {
    pub fn collect(flock: &Flock, tick_time: Duration) -> Self {
        let units = flock.units();
        let center = flock.center();
        let return_radius = flock.parameters().bounds_distance * BOUNDS_RETURN_FRACTION;

        let mut stats = Self {
            tick: flock.ticks(),
            unit_count: units.len(),
            mean_speed: 0.0,
            min_speed: 0.0,
            max_speed: 0.0,
            avoiding_obstacles: 0,
            returning_to_bounds: 0,
            centroid: center,
            tick_time,
        };
        if units.is_empty() {
            return stats;
        }

        let mut speed_sum = 0.0;
        let mut position_sum = Vec3::ZERO;
        stats.min_speed = f32::MAX;
        stats.max_speed = f32::MIN;

        for unit in units {
            speed_sum += unit.speed;
            position_sum += unit.position;
            stats.min_speed = stats.min_speed.min(unit.speed);
            stats.max_speed = stats.max_speed.max(unit.speed);

            if unit.last_obstacle_direction().is_some() {
                stats.avoiding_obstacles += 1;
            }
            if unit.position.distance(center) >= return_radius {
                stats.returning_to_bounds += 1;
            }
        }

        let count = units.len() as f32;
        stats.mean_speed = speed_sum / count;
        stats.centroid = position_sum / count;
        stats
    }
}

impl fmt::Display for FlockStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {} | {} units | speed {:.2} [{:.2}, {:.2}] | avoiding {} | returning {} | centroid ({:.1}, {:.1}, {:.1}) | {:.3} ms",
            self.tick,
            self.unit_count,
            self.mean_speed,
            self.min_speed,
            self.max_speed,
            self.avoiding_obstacles,
            self.returning_to_bounds,
            self.centroid.x,
            self.centroid.y,
            self.centroid.z,
            self.tick_time.as_secs_f64() * 1000.0,
        )
    }
}
