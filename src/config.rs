/*
 * Configuration Module
 *
 * This module defines FlockConfig, everything a run needs: unit count and
 * seed, spawn volume, flock parameters, unit data, run settings and the
 * obstacle field. Configuration comes from a JSON file (explicit path or
 * FLOCK_CONFIG), falls back to defaults, then takes FLOCK_* environment
 * overrides and is validated before any flock is built.
 */

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::params::{FlockParameters, SpawnSettings, UnitData};
use crate::raycast::{Obstacle, ObstacleField};

/// Environment variable naming a JSON config file
pub const CONFIG_PATH_VAR: &str = "FLOCK_CONFIG";

/// How a run is stepped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Fixed elapsed time per tick, in seconds
    pub delta_time: f32,
    /// Number of ticks to simulate
    pub ticks: u64,
    /// Use the snapshot-parallel tick instead of the sequential pass
    pub parallel: bool,
    /// Log flock stats every this many ticks (0 disables)
    pub report_every: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            delta_time: 1.0 / 60.0,
            ticks: 600,
            parallel: false,
            report_every: 60,
        }
    }
}

/// Everything needed to spawn and run a flock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub unit_count: usize,
    /// Seed for spawn positions, orientations and speeds
    pub seed: u64,
    pub spawn: SpawnSettings,
    pub parameters: FlockParameters,
    pub unit_data: UnitData,
    pub run: RunSettings,
    pub obstacles: ObstacleField,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            unit_count: 100,
            seed: 0,
            spawn: SpawnSettings::default(),
            parameters: FlockParameters::default(),
            unit_data: UnitData::default(),
            run: RunSettings::default(),
            obstacles: ObstacleField::new()
                .with(Obstacle::sphere(Vec3::new(0.0, 0.0, 20.0), 4.0, 0))
                .with(Obstacle::cuboid(
                    Vec3::new(-25.0, -5.0, -5.0),
                    Vec3::new(-18.0, 5.0, 5.0),
                    0,
                )),
        }
    }
}

impl FlockConfig {
    /// Parse a JSON document. Missing sections fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file. A missing or malformed file is an error.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load config for a run: the explicit path, else `FLOCK_CONFIG`, else
    /// defaults; then environment overrides; then validation.
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Same as [`FlockConfig::load`] with a custom variable lookup.
    pub fn load_with<F>(path: Option<PathBuf>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.or_else(|| lookup(CONFIG_PATH_VAR).map(PathBuf::from));
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading flock config from {}", path.display());
                Self::from_path(path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(lookup, "FLOCK_UNITS", &mut self.unit_count);
        override_from(lookup, "FLOCK_SEED", &mut self.seed);
        override_from(lookup, "FLOCK_TICKS", &mut self.run.ticks);
        override_from(lookup, "FLOCK_DELTA_TIME", &mut self.run.delta_time);
        override_from(lookup, "FLOCK_PARALLEL", &mut self.run.parallel);
        override_from(lookup, "FLOCK_REPORT_EVERY", &mut self.run.report_every);
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unit_count == 0 {
            return Err(ConfigError::invalid("unit_count", "must be at least 1"));
        }
        if !(self.run.delta_time.is_finite() && self.run.delta_time > 0.0) {
            return Err(ConfigError::invalid("run.delta_time", "must be > 0"));
        }
        self.parameters.validate()?;
        self.unit_data.validate()?;
        self.spawn.validate()?;
        Ok(())
    }
}

fn override_from<F, T>(lookup: &F, name: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(e) => tracing::warn!("Invalid {}='{}' ({}), keeping {}", name, raw, e, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = FlockConfig::default();
        assert_eq!(config.unit_count, 100);
        assert_eq!(config.run.ticks, 600);
        assert!(!config.run.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = FlockConfig::from_json(
            r#"{
                "unit_count": 12,
                "parameters": { "cohesion_weight": 3.5, "center": [1.0, 2.0, 3.0] },
                "unit_data": { "obstacle_layers": 4, "obstacle_probes": [[1.0, 0.0, 0.0]] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.unit_count, 12);
        assert_eq!(config.parameters.cohesion_weight, 3.5);
        assert_eq!(config.parameters.center, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(config.parameters.max_speed, FlockParameters::default().max_speed);
        assert!(config.unit_data.obstacle_layers.contains(2));
        assert_eq!(config.unit_data.obstacle_probes, vec![Vec3::X]);
        assert_eq!(config.run, RunSettings::default());
    }

    #[test]
    fn test_obstacles_from_json() {
        let config = FlockConfig::from_json(
            r#"{ "obstacles": { "obstacles": [
                { "shape": "sphere", "center": [0.0, 0.0, 5.0], "radius": 1.0, "layer": 3 },
                { "shape": "box", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 1.0] }
            ] } }"#,
        )
        .unwrap();

        assert_eq!(config.obstacles.len(), 2);
        assert_eq!(config.obstacles.obstacles[0].layer, 3);
        assert_eq!(config.obstacles.obstacles[1].layer, 0);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            FlockConfig::from_json("{ unit_count: "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = FlockConfig::load_with(
            Some(PathBuf::from("/nonexistent/flock.json")),
            env(&[]),
        );
        assert!(matches!(result, Err(ConfigError::Io { .. })));

        let result = FlockConfig::load_with(None, env(&[(CONFIG_PATH_VAR, "/nonexistent/flock.json")]));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let config = FlockConfig::load_with(
            None,
            env(&[
                ("FLOCK_UNITS", "25"),
                ("FLOCK_SEED", "99"),
                ("FLOCK_PARALLEL", "true"),
                ("FLOCK_DELTA_TIME", "0.05"),
            ]),
        )
        .unwrap();

        assert_eq!(config.unit_count, 25);
        assert_eq!(config.seed, 99);
        assert!(config.run.parallel);
        assert_eq!(config.run.delta_time, 0.05);
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        let config = FlockConfig::load_with(None, env(&[("FLOCK_UNITS", "lots")])).unwrap();
        assert_eq!(config.unit_count, FlockConfig::default().unit_count);
    }

    #[test]
    fn test_validation_runs_after_overrides() {
        let result = FlockConfig::load_with(None, env(&[("FLOCK_UNITS", "0")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "unit_count", .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("flock-config-{}.json", std::process::id()));
        let mut config = FlockConfig::default();
        config.unit_count = 7;
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = FlockConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
