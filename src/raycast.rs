/*
 * Ray Cast Module
 *
 * Units only see obstacles through the RayCaster trait: origin, direction,
 * max distance and a layer filter in, nearest hit (or nothing) out. Any
 * collision backend can sit behind it. Two implementations ship here: an
 * empty world and a small field of spheres and axis-aligned boxes.
 */

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::math::normalize_or_zero;

// Bit set of collision layers (layer n is bit n)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub fn from_layer(layer: u8) -> Self {
        debug_assert!(layer < 32);
        LayerMask(1 << (layer & 31))
    }

    #[inline]
    pub fn contains(self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: Self) -> Self {
        LayerMask(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub distance: f32,
}

/// Ray query service used for obstacle detection.
///
/// `direction` need not be normalized. A zero direction never hits.
pub trait RayCaster {
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask)
        -> Option<RayHit>;
}

impl<T: RayCaster + ?Sized> RayCaster for &T {
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        (**self).cast(origin, direction, max_distance, mask)
    }
}

// A world with nothing to hit
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObstacles;

impl RayCaster for NoObstacles {
    fn cast(&self, _: Vec3, _: Vec3, _: f32, _: LayerMask) -> Option<RayHit> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    Box { min: Vec3, max: Vec3 },
}

impl Shape {
    // Entry distance along a normalized ray. Rays starting inside never hit.
    fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        match *self {
            Shape::Sphere { center, radius } => {
                let offset = origin - center;
                let c = offset.length_squared() - radius * radius;
                if c < 0.0 {
                    return None;
                }
                let b = offset.dot(dir);
                let discriminant = b * b - c;
                if discriminant < 0.0 {
                    return None;
                }
                let t = -b - discriminant.sqrt();
                (t >= 0.0).then_some(t)
            }
            Shape::Box { min, max } => {
                if origin.cmpge(min).all() && origin.cmple(max).all() {
                    return None;
                }
                let mut t_enter = 0.0f32;
                let mut t_exit = f32::INFINITY;
                for axis in 0..3 {
                    let (o, d) = (origin[axis], dir[axis]);
                    if d == 0.0 {
                        // Parallel to this slab: it never constrains the ray
                        if o < min[axis] || o > max[axis] {
                            return None;
                        }
                        continue;
                    }
                    let inv = d.recip();
                    let t1 = (min[axis] - o) * inv;
                    let t2 = (max[axis] - o) * inv;
                    t_enter = t_enter.max(t1.min(t2));
                    t_exit = t_exit.min(t1.max(t2));
                }
                (t_enter <= t_exit).then_some(t_enter)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(default)]
    pub layer: u8,
}

impl Obstacle {
    pub fn sphere(center: Vec3, radius: f32, layer: u8) -> Self {
        Self {
            shape: Shape::Sphere { center, radius },
            layer,
        }
    }

    pub fn cuboid(min: Vec3, max: Vec3, layer: u8) -> Self {
        Self {
            shape: Shape::Box {
                min: min.min(max),
                max: min.max(max),
            },
            layer,
        }
    }
}

// Brute-force list of static obstacles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleField {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn push(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl RayCaster for ObstacleField {
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        let dir = normalize_or_zero(direction);
        if dir == Vec3::ZERO {
            return None;
        }

        self.obstacles
            .iter()
            .filter(|o| mask.contains(o.layer))
            .filter_map(|o| o.shape.intersect(origin, dir))
            .filter(|&t| t <= max_distance)
            .min_by(|a, b| a.total_cmp(b))
            .map(|distance| RayHit {
                point: origin + dir * distance,
                distance,
            })
    }
}
