/*
 * Flock Module
 *
 * This module owns the fixed set of units and the shared parameters, and
 * drives the per-tick update.
 *
 * Two update modes are available:
 * - tick: one sequential pass in array order. Units later in the array see
 *   earlier units already moved this tick. This is the reference behaviour.
 * - tick_parallel: every unit steers against a snapshot taken at tick start,
 *   computed in parallel with rayon. Independent of thread scheduling.
 */

use glam::{EulerRot, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::FlockConfig;
use crate::error::{ConfigError, FlockError};
use crate::params::{FlockParameters, SpawnSettings, UnitData};
use crate::raycast::RayCaster;
use crate::unit::{FlockView, Neighbours, Unit};

// Per-axis spawn rotation range, in degrees
const SPAWN_ANGLE_RANGE: f32 = 90.0;

pub struct Flock {
    parameters: FlockParameters,
    unit_data: UnitData,
    units: Vec<Unit>,
    // Scratch buffers reused every tick
    neighbours: Neighbours,
    snapshot: Vec<Unit>,
    ticks: u64,
}

impl Flock {
    /// Empty flock. Parameters are validated here; a flock never runs on a
    /// bad configuration.
    pub fn new(parameters: FlockParameters, unit_data: UnitData) -> Result<Self, FlockError> {
        parameters.validate()?;
        unit_data.validate()?;

        Ok(Self {
            parameters,
            unit_data,
            units: Vec::new(),
            neighbours: Neighbours::default(),
            snapshot: Vec::new(),
            ticks: 0,
        })
    }

    /// Validated flock spawned from a full configuration with its seed.
    pub fn from_config(config: &FlockConfig) -> Result<Self, FlockError> {
        config.validate()?;

        let mut flock = Self::new(config.parameters.clone(), config.unit_data.clone())?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        flock.initialize(config.unit_count, &config.spawn, &mut rng)?;
        Ok(flock)
    }

    /// Flock over an existing population, for custom spawners. Every unit
    /// needs a finite position and speed.
    pub fn with_units(
        parameters: FlockParameters,
        unit_data: UnitData,
        units: Vec<Unit>,
    ) -> Result<Self, FlockError> {
        if let Some(i) = units
            .iter()
            .position(|u| !(u.position.is_finite() && u.speed.is_finite()))
        {
            return Err(ConfigError::invalid(
                "units",
                format!("unit {i} has a non-finite position or speed"),
            )
            .into());
        }

        let mut flock = Self::new(parameters, unit_data)?;
        flock.neighbours = Neighbours::with_capacity(units.len());
        flock.units = units;
        Ok(flock)
    }

    // Replace the population with `unit_count` freshly spawned units
    pub fn initialize<R: Rng>(
        &mut self,
        unit_count: usize,
        spawn: &SpawnSettings,
        rng: &mut R,
    ) -> Result<(), FlockError> {
        spawn.validate()?;

        let origin = self.parameters.center;
        let (speed_min, speed_max) = ordered(spawn.speed_min, spawn.speed_max);

        self.units.clear();
        self.units.reserve_exact(unit_count);

        for _ in 0..unit_count {
            let offset = Vec3::new(
                random_between(rng, spawn.min.x, spawn.max.x),
                random_between(rng, spawn.min.y, spawn.max.y),
                random_between(rng, spawn.min.z, spawn.max.z),
            );

            // Independent angle per axis, applied z, then x, then y
            let pitch = random_angle(rng);
            let yaw = random_angle(rng);
            let roll = random_angle(rng);
            let rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll);

            let speed = rng.gen_range(speed_min..=speed_max);
            self.units.push(Unit::new(origin + offset, rotation, speed));
        }

        self.neighbours = Neighbours::with_capacity(unit_count);
        self.snapshot = Vec::with_capacity(unit_count);
        self.ticks = 0;

        debug!(
            units = unit_count,
            center = %origin,
            "Spawned flock"
        );
        Ok(())
    }

    // Move every unit once, in array order
    pub fn tick<R: RayCaster + ?Sized>(&mut self, obstacles: &R, delta_time: f32) {
        for i in 0..self.units.len() {
            let mut unit = self.units[i];
            let view = FlockView {
                units: &self.units,
                params: &self.parameters,
                data: &self.unit_data,
            };
            unit.move_unit(i, &view, &mut self.neighbours, obstacles, delta_time);
            self.units[i] = unit;
        }

        self.ticks += 1;
        trace!(tick = self.ticks, units = self.units.len(), "Sequential tick");
    }

    // Move every unit once against a start-of-tick snapshot
    pub fn tick_parallel<R: RayCaster + Sync + ?Sized>(&mut self, obstacles: &R, delta_time: f32) {
        self.snapshot.clear();
        self.snapshot.extend_from_slice(&self.units);

        let view = FlockView {
            units: &self.snapshot,
            params: &self.parameters,
            data: &self.unit_data,
        };
        let capacity = self.units.len();

        self.units.par_iter_mut().enumerate().for_each_init(
            || Neighbours::with_capacity(capacity),
            |neighbours, (i, unit)| {
                unit.move_unit(i, &view, neighbours, obstacles, delta_time);
            },
        );

        self.ticks += 1;
        trace!(tick = self.ticks, units = self.units.len(), "Snapshot tick");
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn parameters(&self) -> &FlockParameters {
        &self.parameters
    }

    pub fn unit_data(&self) -> &UnitData {
        &self.unit_data
    }

    pub fn center(&self) -> Vec3 {
        self.parameters.center
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

#[inline]
fn random_between<R: Rng>(rng: &mut R, a: f32, b: f32) -> f32 {
    let (low, high) = ordered(a, b);
    rng.gen_range(low..=high)
}

#[inline]
fn random_angle<R: Rng>(rng: &mut R) -> f32 {
    rng.gen_range(-SPAWN_ANGLE_RANGE..=SPAWN_ANGLE_RANGE).to_radians()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raycast::{NoObstacles, Obstacle, ObstacleField};

    fn spawn() -> SpawnSettings {
        SpawnSettings {
            min: Vec3::new(-5.0, -2.0, -1.0),
            max: Vec3::new(5.0, 2.0, 1.0),
            speed_min: 2.0,
            speed_max: 3.0,
        }
    }

    fn seeded_flock(count: usize, seed: u64) -> Flock {
        let params = FlockParameters {
            center: Vec3::new(100.0, 0.0, -50.0),
            ..Default::default()
        };
        let mut flock = Flock::new(params, UnitData::default()).unwrap();
        flock.initialize(count, &spawn(), &mut StdRng::seed_from_u64(seed)).unwrap();
        flock
    }

    #[test]
    fn test_new_rejects_invalid_parameters() {
        let params = FlockParameters {
            min_speed: -1.0,
            ..Default::default()
        };
        assert!(Flock::new(params, UnitData::default()).is_err());

        let data = UnitData {
            smoothing: 0.0,
            ..Default::default()
        };
        assert!(Flock::new(FlockParameters::default(), data).is_err());
    }

    #[test]
    fn test_initialize_spawns_inside_volume_relative_to_center() {
        let flock = seeded_flock(200, 7);
        let center = flock.center();
        assert_eq!(flock.len(), 200);

        for unit in flock.units() {
            let local = unit.position - center;
            assert!(local.cmpge(spawn().min).all() && local.cmple(spawn().max).all(), "{local:?}");
            assert!((2.0..=3.0).contains(&unit.speed));
            assert!((unit.forward().length() - 1.0).abs() < 1e-5);
            assert!(unit.last_obstacle_direction().is_none());
        }
    }

    #[test]
    fn test_initialize_is_seed_deterministic() {
        let a = seeded_flock(50, 42);
        let b = seeded_flock(50, 42);
        let c = seeded_flock(50, 43);
        assert_eq!(a.units(), b.units());
        assert_ne!(a.units(), c.units());
    }

    #[test]
    fn test_initialize_replaces_population() {
        let mut flock = seeded_flock(10, 1);
        flock.tick(&NoObstacles, 0.1);
        flock.initialize(4, &spawn(), &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(flock.len(), 4);
        assert_eq!(flock.ticks(), 0);
    }

    #[test]
    fn test_initialize_rejects_invalid_spawn() {
        let mut flock = seeded_flock(3, 1);
        let mut bad = spawn();
        bad.min.x = f32::NAN;

        let result = flock.initialize(5, &bad, &mut StdRng::seed_from_u64(2));
        assert!(matches!(
            result,
            Err(FlockError::Config(ConfigError::Invalid { field: "spawn", .. }))
        ));
        // Population untouched
        assert_eq!(flock.len(), 3);
    }

    #[test]
    fn test_degenerate_rotation_faces_forward() {
        let units = vec![
            Unit::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 0.0), 2.0),
            Unit::new(Vec3::new(20.0, 0.0, 0.0), Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0), 2.0),
        ];
        assert_eq!(units[0].forward(), Vec3::Z);
        assert_eq!(units[1].forward(), Vec3::Z);

        let mut flock = Flock::with_units(FlockParameters::default(), UnitData::default(), units).unwrap();
        for _ in 0..10 {
            flock.tick(&NoObstacles, 0.1);
        }
        for unit in flock.units() {
            assert!(unit.forward().is_finite());
            assert!((unit.forward().length() - 1.0).abs() < 1e-4);
            assert!(unit.position.z > 1.0, "{:?}", unit.position);
        }
    }

    #[test]
    fn test_with_units_rejects_non_finite_units() {
        let bad_position = vec![
            Unit::facing(Vec3::ZERO, Vec3::Z, 2.0),
            Unit::facing(Vec3::new(f32::INFINITY, 0.0, 0.0), Vec3::Z, 2.0),
        ];
        assert!(matches!(
            Flock::with_units(FlockParameters::default(), UnitData::default(), bad_position),
            Err(FlockError::Config(ConfigError::Invalid { field: "units", .. }))
        ));

        let bad_speed = vec![Unit::facing(Vec3::ZERO, Vec3::Z, f32::NAN)];
        assert!(Flock::with_units(FlockParameters::default(), UnitData::default(), bad_speed).is_err());
    }

    #[test]
    fn test_tick_is_sequential_in_array_order() {
        // Unit 1 adopts unit 0's speed as already updated earlier in the same pass
        let params = FlockParameters {
            min_speed: 1.0,
            max_speed: 10.0,
            cohesion_distance: 5.0,
            ..Default::default()
        };
        let units = vec![
            Unit::facing(Vec3::ZERO, Vec3::Z, 2.0),
            Unit::facing(Vec3::X, Vec3::Z, 6.0),
            Unit::facing(Vec3::NEG_X, Vec3::Z, 4.0),
        ];
        let mut flock = Flock::with_units(params, UnitData::default(), units).unwrap();
        flock.tick(&NoObstacles, 0.0);

        // 0: mean(6, 4) = 5; 1: mean(5, 4) = 4.5; 2: mean(5, 4.5) = 4.75
        let speeds: Vec<f32> = flock.units().iter().map(|u| u.speed).collect();
        assert_eq!(speeds, vec![5.0, 4.5, 4.75]);
        assert_eq!(flock.ticks(), 1);
    }

    #[test]
    fn test_tick_parallel_uses_snapshot() {
        let params = FlockParameters {
            min_speed: 1.0,
            max_speed: 10.0,
            cohesion_distance: 5.0,
            ..Default::default()
        };
        let units = vec![
            Unit::facing(Vec3::ZERO, Vec3::Z, 2.0),
            Unit::facing(Vec3::X, Vec3::Z, 6.0),
            Unit::facing(Vec3::NEG_X, Vec3::Z, 4.0),
        ];
        let mut flock = Flock::with_units(params, UnitData::default(), units).unwrap();
        flock.tick_parallel(&NoObstacles, 0.0);

        let speeds: Vec<f32> = flock.units().iter().map(|u| u.speed).collect();
        assert_eq!(speeds, vec![5.0, 3.0, 4.0]);
    }

    #[test]
    fn test_tick_parallel_is_deterministic() {
        let field = ObstacleField::new().with(Obstacle::sphere(Vec3::new(100.0, 0.0, -40.0), 3.0, 0));
        let mut a = seeded_flock(64, 9);
        let mut b = seeded_flock(64, 9);
        for _ in 0..30 {
            a.tick_parallel(&field, 1.0 / 60.0);
            b.tick_parallel(&field, 1.0 / 60.0);
        }
        assert_eq!(a.units(), b.units());
    }

    #[test]
    fn test_empty_flock_ticks() {
        let mut flock = Flock::new(FlockParameters::default(), UnitData::default()).unwrap();
        assert!(flock.is_empty());
        flock.tick(&NoObstacles, 0.1);
        flock.tick_parallel(&NoObstacles, 0.1);
        assert_eq!(flock.ticks(), 2);
    }
}
