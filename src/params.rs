/*
 * Flock Parameters Module
 *
 * This module defines the tunable values shared by every unit in a flock:
 * the FlockParameters owned by the flock (speeds, radii, weights, center)
 * and the per-flock-type UnitData (field of view, smoothing, obstacle
 * probing). Both are read-only once a simulation starts.
 */

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::raycast::LayerMask;

// Parameters shared by every unit of a flock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParameters {
    pub min_speed: f32,
    pub max_speed: f32,

    pub cohesion_distance: f32,
    pub avoidance_distance: f32,
    pub alignment_distance: f32,
    pub bounds_distance: f32,
    pub obstacle_distance: f32,

    pub cohesion_weight: f32,
    pub avoidance_weight: f32,
    pub alignment_weight: f32,
    pub bounds_weight: f32,
    pub obstacle_weight: f32,

    // Flock origin, used for bounds containment and as the spawn anchor
    pub center: Vec3,
}

impl Default for FlockParameters {
    fn default() -> Self {
        Self {
            min_speed: 2.0,
            max_speed: 5.0,
            cohesion_distance: 5.0,
            avoidance_distance: 1.5,
            alignment_distance: 4.0,
            bounds_distance: 40.0,
            obstacle_distance: 4.0,
            cohesion_weight: 1.0,
            avoidance_weight: 2.0,
            alignment_weight: 1.5,
            bounds_weight: 5.0,
            obstacle_weight: 50.0,
            center: Vec3::ZERO,
        }
    }
}

impl FlockParameters {
    #[inline]
    pub fn clamp_speed(&self, speed: f32) -> f32 {
        speed.clamp(self.min_speed, self.max_speed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_speed.is_finite() && self.min_speed > 0.0) {
            return Err(ConfigError::invalid("min_speed", "must be a positive number"));
        }
        if !(self.max_speed.is_finite() && self.max_speed >= self.min_speed) {
            return Err(ConfigError::invalid(
                "max_speed",
                format!("must be >= min_speed ({})", self.min_speed),
            ));
        }

        let non_negative = [
            ("cohesion_distance", self.cohesion_distance),
            ("avoidance_distance", self.avoidance_distance),
            ("alignment_distance", self.alignment_distance),
            ("bounds_distance", self.bounds_distance),
            ("obstacle_distance", self.obstacle_distance),
            ("cohesion_weight", self.cohesion_weight),
            ("avoidance_weight", self.avoidance_weight),
            ("alignment_weight", self.alignment_weight),
            ("bounds_weight", self.bounds_weight),
            ("obstacle_weight", self.obstacle_weight),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::invalid(field, format!("must be >= 0, got {value}")));
            }
        }

        if !self.center.is_finite() {
            return Err(ConfigError::invalid("center", "must be finite"));
        }
        Ok(())
    }
}

// Per-flock-type unit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitData {
    // Half-angle of the view cone, in degrees
    pub field_of_view: f32,
    // Time constant of the heading smoothing
    pub smoothing: f32,
    pub obstacle_layers: LayerMask,
    // Local-space escape directions, tried in order
    pub obstacle_probes: Vec<Vec3>,
}

impl Default for UnitData {
    fn default() -> Self {
        Self {
            field_of_view: 120.0,
            smoothing: 0.5,
            obstacle_layers: LayerMask::ALL,
            obstacle_probes: default_probes(),
        }
    }
}

impl UnitData {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.field_of_view.is_finite() && self.field_of_view >= 0.0) {
            return Err(ConfigError::invalid("field_of_view", "must be >= 0 degrees"));
        }
        if !(self.smoothing.is_finite() && self.smoothing > 0.0) {
            return Err(ConfigError::invalid("smoothing", "must be > 0"));
        }
        if let Some(i) = self
            .obstacle_probes
            .iter()
            .position(|d| !d.is_finite() || d.length_squared() < 1e-10)
        {
            return Err(ConfigError::invalid(
                "obstacle_probes",
                format!("direction {i} has zero length"),
            ));
        }
        Ok(())
    }
}

// Diagonals first, then the side axes, then straight back
fn default_probes() -> Vec<Vec3> {
    [
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(-1.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
        Vec3::new(0.0, -1.0, 1.0),
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::NEG_Z,
    ]
    .into_iter()
    .map(Vec3::normalize)
    .collect()
}

// How the initial population is laid out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    // Box corners relative to the flock center
    pub min: Vec3,
    pub max: Vec3,
    pub speed_min: f32,
    pub speed_max: f32,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            min: Vec3::splat(-10.0),
            max: Vec3::splat(10.0),
            speed_min: 2.0,
            speed_max: 5.0,
        }
    }
}

impl SpawnSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(ConfigError::invalid("spawn", "box corners must be finite"));
        }
        if self.min.cmpgt(self.max).any() {
            return Err(ConfigError::invalid(
                "spawn",
                format!("min {} exceeds max {} on some axis", self.min, self.max),
            ));
        }
        if !(self.speed_min.is_finite() && self.speed_max.is_finite())
            || self.speed_min < 0.0
            || self.speed_min > self.speed_max
        {
            return Err(ConfigError::invalid(
                "spawn.speed",
                "need 0 <= speed_min <= speed_max",
            ));
        }
        Ok(())
    }
}
