//! Construction inputs: maps, part catalogs, fleet rosters and runtime knobs
//!
//! These are plain serde structs. The kernel consumes them already parsed;
//! `from_json_str` and `load_json` are conveniences for the demo runner.

use std::collections::BTreeMap;
use std::path::Path;

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;
use crate::sim::PartKind;

/// Convert a position list into a vector
pub fn vec_from_slice(pos: &[f64]) -> Result<DVec3, SimError> {
    match pos {
        [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => Ok(DVec3::new(*x, *y, *z)),
        _ => Err(SimError::InvalidPosition(pos.to_vec())),
    }
}

/// Parse any configuration type from a JSON string
pub fn from_json_str<T: DeserializeOwned>(data: &str) -> Result<T, SimError> {
    Ok(serde_json::from_str(data)?)
}

/// Read and parse any configuration type from a JSON file
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, SimError> {
    let data = std::fs::read_to_string(path)?;
    from_json_str(&data)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConf {
    pub mass: f64,
    pub radius: f64,
    /// Energy produced per tick at full power
    pub energy: f64,
    #[serde(default)]
    pub health: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrusterConf {
    pub mass: f64,
    pub radius: f64,
    /// Maximum force
    pub force: f64,
    /// Energy drawn at maximum force
    pub energy: f64,
    #[serde(default)]
    pub health: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponConf {
    /// Mass of the empty weapon
    pub mass: f64,
    pub radius: f64,
    /// Energy drawn per shot
    pub energy: f64,
    /// Muzzle speed relative to the ship
    pub ammo_velocity: f64,
    /// Mass of one round
    pub ammo_mass: f64,
    pub ammo_radius: f64,
    /// Rounds loaded at the start of the match
    pub ammo_capacity: u64,
    /// Seconds between shots
    pub cooldown: f64,
    #[serde(default)]
    pub health: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConf {
    pub mass: f64,
    pub radius: f64,
    /// Energy drawn per scan
    pub energy: f64,
    /// Emitted power; detection falls off with the square of distance
    pub power: f64,
    #[serde(default)]
    pub health: Option<f64>,
}

/// Named parts available to pilots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartsConf {
    #[serde(default)]
    pub engines: BTreeMap<String, EngineConf>,
    #[serde(default)]
    pub thrusters: BTreeMap<String, ThrusterConf>,
    #[serde(default)]
    pub weapons: BTreeMap<String, WeaponConf>,
    #[serde(default)]
    pub sensors: BTreeMap<String, SensorConf>,
}

impl PartsConf {
    /// Built-in catalog used by the demo runner and tests
    pub fn standard() -> Self {
        let mut parts = Self::default();
        parts.engines.insert(
            "fusion".into(),
            EngineConf {
                mass: 200.0,
                radius: 2.0,
                energy: 100.0,
                health: None,
            },
        );
        parts.thrusters.insert(
            "ion".into(),
            ThrusterConf {
                mass: 100.0,
                radius: 1.0,
                force: 20_000.0,
                energy: 20.0,
                health: None,
            },
        );
        parts.weapons.insert(
            "railgun".into(),
            WeaponConf {
                mass: 300.0,
                radius: 1.5,
                energy: 30.0,
                ammo_velocity: 400.0,
                ammo_mass: 1.0,
                ammo_radius: 0.2,
                ammo_capacity: 200,
                cooldown: 0.5,
                health: None,
            },
        );
        parts.sensors.insert(
            "radar".into(),
            SensorConf {
                mass: 50.0,
                radius: 1.0,
                energy: 5.0,
                power: 1e6,
                health: None,
            },
        );
        parts
    }
}

/// One part in a ship's loadout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipPartConf {
    #[serde(rename = "type")]
    pub kind: PartKind,
    /// Catalog name
    pub name: String,
    /// Offset from the ship centre
    pub position: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipConf {
    /// Registered pilot name
    pub pilot: String,
    /// Offset from the fleet's starting point
    pub position: Vec<f64>,
    #[serde(default)]
    pub parts: Vec<ShipPartConf>,
}

impl ShipConf {
    /// The standard loadout from `PartsConf::standard()`
    pub fn standard(pilot: &str, position: [f64; 3]) -> Self {
        let part = |kind, name: &str, position: [f64; 3]| ShipPartConf {
            kind,
            name: name.into(),
            position: position.to_vec(),
        };
        Self {
            pilot: pilot.into(),
            position: position.to_vec(),
            parts: vec![
                part(PartKind::Engine, "fusion", [0.0, 0.0, 0.0]),
                part(PartKind::Thruster, "ion", [0.0, -4.0, 0.0]),
                part(PartKind::Weapon, "railgun", [4.0, 0.0, 0.0]),
                part(PartKind::Sensor, "radar", [0.0, 4.0, 0.0]),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConf {
    /// Unique within a match; scores are keyed by it
    pub name: String,
    /// Ships in id order
    #[serde(default)]
    pub ships: Vec<ShipConf>,
}

/// A scoring zone on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPointConf {
    pub mass: f64,
    /// Physical radius of the point itself
    pub radius: f64,
    /// Absolute position
    pub position: Vec<f64>,
    /// Score per second for each ship within influence
    pub points: f64,
    /// Scoring radius around the centre
    pub influence: f64,
}

/// An inert obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsteroidConf {
    /// May be very large; must be positive
    pub mass: f64,
    pub radius: f64,
    /// Absolute position
    pub position: Vec<f64>,
    /// Drawer hint, `asteroid` when absent
    #[serde(default)]
    pub texture: Option<String>,
}

/// Match rules carried by the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConf {
    /// Fleet score that ends the match; no limit when absent
    #[serde(default)]
    pub score: Option<f64>,
    /// Total ship mass a fleet may bring
    pub max_fleet_mass: f64,
}

/// Arena layout and rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConf {
    /// Arena radius; objects beyond it are removed
    pub radius: f64,
    /// Win condition and fleet limits
    pub rules: RulesConf,
    /// One per fleet, in roster order
    #[serde(default)]
    pub starting_points: Vec<Vec<f64>>,
    #[serde(default)]
    pub control_points: Vec<ControlPointConf>,
    #[serde(default)]
    pub asteroids: Vec<AsteroidConf>,
}

/// Runtime knobs not carried by the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConf {
    /// Seconds per tick
    pub tick_seconds: f64,
    /// Stop after this many ticks; at least 1 when set
    pub max_ticks: Option<u64>,
    /// Emit a frame every `frame_rate` ticks
    pub frame_rate: u64,
    /// Run the decide phase on the rayon pool
    pub parallel: bool,
    /// Frames buffered for a slow drawer
    pub frame_buffer: usize,
}

impl Default for SimConf {
    fn default() -> Self {
        Self {
            tick_seconds: TICK_SECONDS,
            max_ticks: None,
            frame_rate: DEFAULT_FRAME_RATE,
            parallel: true,
            frame_buffer: DEFAULT_FRAME_BUFFER,
        }
    }
}

/// Shape of a generated map
#[derive(Debug, Clone, PartialEq)]
pub struct MapGenConf {
    pub radius: f64,
    /// Number of starting points
    pub fleets: usize,
    pub asteroids: usize,
    /// Becomes `RulesConf::score`
    pub win_score: Option<f64>,
    pub max_fleet_mass: f64,
}

impl Default for MapGenConf {
    fn default() -> Self {
        Self {
            radius: 2000.0,
            fleets: 2,
            asteroids: 6,
            win_score: Some(100.0),
            max_fleet_mass: 1e5,
        }
    }
}

/// Deterministically generate a map from a seed
///
/// A single control point sits at the centre. Starting points are spread on
/// a ring at half the arena radius; asteroids are scattered between the
/// control point's influence and the starting ring.
pub fn generate_map(seed: u64, shape: &MapGenConf) -> MapConf {
    let mut rng = Pcg32::seed_from_u64(seed);
    let influence = shape.radius * 0.07;
    let ring = shape.radius * 0.5;

    let starting_points = (0..shape.fleets)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / shape.fleets.max(1) as f64;
            vec![ring * theta.cos(), ring * theta.sin(), 0.0]
        })
        .collect();

    let asteroids = (0..shape.asteroids)
        .map(|_| {
            let dir = loop {
                let candidate = DVec3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                );
                if let Some(dir) = candidate.try_normalize() {
                    break dir;
                }
            };
            let distance = rng.random_range(influence * 2.0..ring * 0.8);
            let pos = dir * distance;
            AsteroidConf {
                mass: 1e6,
                radius: rng.random_range(10.0..60.0),
                position: pos.to_array().to_vec(),
                texture: None,
            }
        })
        .collect();

    MapConf {
        radius: shape.radius,
        rules: RulesConf {
            score: shape.win_score,
            max_fleet_mass: shape.max_fleet_mass,
        },
        starting_points,
        control_points: vec![ControlPointConf {
            mass: 1e6,
            radius: 10.0,
            position: vec![0.0, 0.0, 0.0],
            points: 1.0,
            influence,
        }],
        asteroids,
    }
}
