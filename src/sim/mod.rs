//! Deterministic simulation kernel
//!
//! All match logic lives here. Given the same configuration and pilots, a
//! match always plays out identically:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by object id)
//! - Pilots see an immutable snapshot, never live state

pub mod body;
pub mod collision;
pub mod parts;
pub mod scan;
pub mod sectors;
pub mod ship;
pub mod state;
pub mod tick;

pub use body::{Body, ObjectId};
pub use collision::{collide, resolve, sweep, Impact};
pub use parts::{Engine, Mount, Part, PartKind, ProjectileSpawn, Sensor, Thruster, Weapon};
pub use scan::{ControlPointContact, ScanResult, ShipContact, WorldSnapshot};
pub use sectors::{sector_size, SectorKey, Sectors};
pub use ship::{validate_parts, Hull, PartSet, Ship, ShipControl};
pub use state::{Asteroid, ControlPoint, Projectile, Simulation, SimulationBuilder};
pub use tick::{EndReason, Outcome};
