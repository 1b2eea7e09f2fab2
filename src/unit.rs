/*
 * Unit Module
 *
 * This module defines the Unit struct and its per-tick steering pipeline.
 * Every tick a unit:
 * 1. Finds neighbours within the cohesion, avoidance and alignment radii
 * 2. Adopts the mean speed of its cohesion neighbours
 * 3. Computes cohesion, alignment, avoidance, bounds and obstacle vectors
 * 4. Blends them by weight, smooths the heading and moves forward
 */

use glam::{Quat, Vec3};

use crate::math::{angle_degrees, look_rotation, normalize_or_zero, smooth_damp, NORMALIZE_EPSILON};
use crate::params::{FlockParameters, UnitData};
use crate::raycast::RayCaster;
use crate::BOUNDS_RETURN_FRACTION;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub position: Vec3,
    pub rotation: Quat,
    pub speed: f32,
    // Damping state of the heading smoothing
    smoothing_velocity: Vec3,
    // Escape direction found while the path ahead was blocked
    last_obstacle_direction: Option<Vec3>,
}

/// Read-only view of the flock a unit steers within.
///
/// `units` is whatever the flock array holds at the time of the call, so a
/// sequential pass sees earlier units already moved this tick.
#[derive(Clone, Copy)]
pub struct FlockView<'a> {
    pub units: &'a [Unit],
    pub params: &'a FlockParameters,
    pub data: &'a UnitData,
}

// Neighbour index sets, kept between ticks so scans don't allocate
#[derive(Debug, Clone, Default)]
pub struct Neighbours {
    pub cohesion: Vec<usize>,
    pub avoidance: Vec<usize>,
    pub alignment: Vec<usize>,
}

impl Neighbours {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cohesion: Vec::with_capacity(capacity),
            avoidance: Vec::with_capacity(capacity),
            alignment: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.cohesion.clear();
        self.avoidance.clear();
        self.alignment.clear();
    }
}

// Unweighted steering vectors of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    pub cohesion: Vec3,
    pub alignment: Vec3,
    pub avoidance: Vec3,
    pub bounds: Vec3,
    pub obstacle: Vec3,
}

impl Steering {
    pub fn weighted_sum(&self, params: &FlockParameters) -> Vec3 {
        self.cohesion * params.cohesion_weight
            + self.avoidance * params.avoidance_weight
            + self.alignment * params.alignment_weight
            + self.bounds * params.bounds_weight
            + self.obstacle * params.obstacle_weight
    }
}

impl Unit {
    /// A zero or non-finite `rotation` falls back to the identity heading (+Z).
    pub fn new(position: Vec3, rotation: Quat, speed: f32) -> Self {
        let length = rotation.length();
        let rotation = if length.is_finite() && length > NORMALIZE_EPSILON {
            rotation / length
        } else {
            Quat::IDENTITY
        };

        Self {
            position,
            rotation,
            speed,
            smoothing_velocity: Vec3::ZERO,
            last_obstacle_direction: None,
        }
    }

    /// Unit facing `forward` (+Y up). A zero vector leaves the identity heading (+Z).
    pub fn facing(position: Vec3, forward: Vec3, speed: f32) -> Self {
        Self::new(position, look_rotation(forward).unwrap_or(Quat::IDENTITY), speed)
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn last_obstacle_direction(&self) -> Option<Vec3> {
        self.last_obstacle_direction
    }

    // Run one full steering step. `index` is this unit's slot in `view.units`.
    pub fn move_unit<R: RayCaster + ?Sized>(
        &mut self,
        index: usize,
        view: &FlockView,
        neighbours: &mut Neighbours,
        obstacles: &R,
        delta_time: f32,
    ) -> Steering {
        self.find_neighbours(index, view, neighbours);
        self.update_speed(view, &neighbours.cohesion);

        let forward = self.forward();
        let steering = Steering {
            cohesion: self.cohesion_vector(forward, view, &neighbours.cohesion),
            alignment: self.alignment_vector(forward, view, &neighbours.alignment),
            avoidance: self.avoidance_vector(forward, view, &neighbours.avoidance),
            bounds: self.bounds_vector(view.params),
            obstacle: self.obstacle_vector(forward, view, obstacles),
        };

        let target = steering.weighted_sum(view.params);
        let smoothed = smooth_damp(
            forward,
            target,
            &mut self.smoothing_velocity,
            view.data.smoothing,
            delta_time,
        );

        // A zero heading keeps the old rotation and stalls the unit for this tick
        let direction = normalize_or_zero(smoothed);
        if let Some(rotation) = look_rotation(direction) {
            self.rotation = rotation;
        }
        self.position += direction * self.speed * delta_time;

        steering
    }

    fn find_neighbours(&self, index: usize, view: &FlockView, neighbours: &mut Neighbours) {
        neighbours.clear();

        let params = view.params;
        let cohesion_sq = params.cohesion_distance * params.cohesion_distance;
        let avoidance_sq = params.avoidance_distance * params.avoidance_distance;
        let alignment_sq = params.alignment_distance * params.alignment_distance;

        for (i, other) in view.units.iter().enumerate() {
            if i == index {
                continue;
            }
            let d_squared = other.position.distance_squared(self.position);
            if d_squared <= cohesion_sq {
                neighbours.cohesion.push(i);
            }
            if d_squared <= avoidance_sq {
                neighbours.avoidance.push(i);
            }
            if d_squared <= alignment_sq {
                neighbours.alignment.push(i);
            }
        }
    }

    fn update_speed(&mut self, view: &FlockView, cohesion: &[usize]) {
        if cohesion.is_empty() {
            return;
        }
        let total: f32 = cohesion.iter().map(|&i| view.units[i].speed).sum();
        self.speed = view.params.clamp_speed(total / cohesion.len() as f32);
    }

    #[inline]
    fn sees_point(&self, forward: Vec3, point: Vec3, field_of_view: f32) -> bool {
        angle_degrees(forward, point - self.position) <= field_of_view
    }

    #[inline]
    fn sees_direction(forward: Vec3, direction: Vec3, field_of_view: f32) -> bool {
        angle_degrees(forward, direction) <= field_of_view
    }

    fn cohesion_vector(&self, forward: Vec3, view: &FlockView, cohesion: &[usize]) -> Vec3 {
        let fov = view.data.field_of_view;
        let mut sum = Vec3::ZERO;
        let mut in_view = 0usize;

        for &i in cohesion {
            let position = view.units[i].position;
            if self.sees_point(forward, position, fov) {
                sum += position;
                in_view += 1;
            }
        }

        if in_view == 0 {
            return Vec3::ZERO;
        }
        normalize_or_zero(sum / in_view as f32 - self.position)
    }

    fn alignment_vector(&self, forward: Vec3, view: &FlockView, alignment: &[usize]) -> Vec3 {
        if alignment.is_empty() {
            return forward;
        }

        let fov = view.data.field_of_view;
        let mut sum = forward;
        let mut in_view = 0usize;

        for &i in alignment {
            let other_forward = view.units[i].forward();
            if Self::sees_direction(forward, other_forward, fov) {
                sum += other_forward;
                in_view += 1;
            }
        }

        // Every neighbour filtered out: zero, same as avoidance
        if in_view == 0 {
            return Vec3::ZERO;
        }
        normalize_or_zero(sum / in_view as f32)
    }

    fn avoidance_vector(&self, forward: Vec3, view: &FlockView, avoidance: &[usize]) -> Vec3 {
        if avoidance.is_empty() {
            return forward;
        }

        let fov = view.data.field_of_view;
        let mut sum = forward;
        let mut in_view = 0usize;

        // Activation depends on the other unit's heading, not its position
        for &i in avoidance {
            let other = &view.units[i];
            if Self::sees_direction(forward, other.forward(), fov) {
                sum += self.position - other.position;
                in_view += 1;
            }
        }

        if in_view == 0 {
            return Vec3::ZERO;
        }
        normalize_or_zero(sum / in_view as f32)
    }

    fn bounds_vector(&self, params: &FlockParameters) -> Vec3 {
        let offset = params.center - self.position;
        if offset.length() >= params.bounds_distance * BOUNDS_RETURN_FRACTION {
            normalize_or_zero(offset)
        } else {
            Vec3::ZERO
        }
    }

    fn obstacle_vector<R: RayCaster + ?Sized>(
        &mut self,
        forward: Vec3,
        view: &FlockView,
        obstacles: &R,
    ) -> Vec3 {
        let blocked = obstacles
            .cast(
                self.position,
                forward,
                view.params.obstacle_distance,
                view.data.obstacle_layers,
            )
            .is_some();

        if !blocked {
            self.last_obstacle_direction = None;
            return Vec3::ZERO;
        }
        self.find_escape_direction(forward, view, obstacles)
    }

    fn find_escape_direction<R: RayCaster + ?Sized>(
        &mut self,
        forward: Vec3,
        view: &FlockView,
        obstacles: &R,
    ) -> Vec3 {
        let distance = view.params.obstacle_distance;
        let mask = view.data.obstacle_layers;

        // Keep the previous escape route while still blocked ahead
        if let Some(cached) = self.last_obstacle_direction {
            if obstacles.cast(self.position, forward, distance, mask).is_some() {
                return cached;
            }
        }

        // Fully boxed in: fall back to the probe whose hit is farthest away
        let mut farthest: Option<(f32, Vec3)> = None;

        for probe in &view.data.obstacle_probes {
            let direction = normalize_or_zero(self.rotation * normalize_or_zero(*probe));
            match obstacles.cast(self.position, direction, distance, mask) {
                None => {
                    self.last_obstacle_direction = Some(direction);
                    return direction;
                }
                Some(hit) => {
                    let d_squared = hit.point.distance_squared(self.position);
                    if farthest.map_or(true, |(best, _)| d_squared > best) {
                        farthest = Some((d_squared, direction));
                    }
                }
            }
        }

        farthest.map_or(Vec3::ZERO, |(_, direction)| direction)
    }
}
