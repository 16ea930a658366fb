//! Void Arena - deterministic 3D fleet combat in a spherical arena
//!
//! Core modules:
//! - `sim`: Simulation kernel (bodies, parts, ships, collisions, tick loop)
//! - `pilot`: Pilot contract, registry and built-in pilots
//! - `draw`: Drawer contract and frame hand-off
//! - `conf`: Map, part catalog and fleet roster inputs
//! - `error`: Transient action failures and fatal simulation errors

pub mod conf;
pub mod draw;
pub mod error;
pub mod pilot;
pub mod sim;

pub use conf::{FleetConf, MapConf, PartsConf, SimConf};
pub use draw::{ChannelDrawer, Drawable, Drawer, Frame, FrameReceiver};
pub use error::{ActionError, SimError};
pub use pilot::{Pilot, PilotRegistry};
pub use sim::{EndReason, Outcome, Simulation, SimulationBuilder};

use glam::DVec3;

/// Simulation constants
pub mod consts {
    /// Default fixed timestep in seconds (100 Hz)
    pub const TICK_SECONDS: f64 = 1e-2;
    /// Smallest broad-phase sector edge length
    pub const MIN_SECTOR_SIZE: f64 = 100.0;
    /// Health lost per unit of impulse absorbed by an inelastic collision
    pub const IMPULSE_TO_DAMAGE: f64 = 0.25;
    /// Restitution between ships, control points and asteroids
    pub const OBJECT_COR: f64 = 0.7;
    /// Restitution between a projectile and anything it hits
    pub const PROJECTILE_COR: f64 = 0.1;
    /// Sensor intensity a contact must exceed to be detected
    pub const DETECTION_THRESHOLD: f64 = 1e-9;
    /// Gap between a ship's hull and a freshly fired projectile
    pub const PROJECTILE_CLEARANCE: f64 = 1.0;
    /// Emit a frame every this many ticks
    pub const DEFAULT_FRAME_RATE: u64 = 10;
    /// Frames buffered between the simulation and a slow drawer
    pub const DEFAULT_FRAME_BUFFER: usize = 4;
    /// Relative sweep length under which two bodies count as mutually at rest
    pub const REST_EPSILON: f64 = 1e-12;
}

/// Unit vector for `v`, or `None` when `v` is zero-length or not finite
#[inline]
pub fn direction_of(v: DVec3) -> Option<DVec3> {
    if !v.is_finite() {
        return None;
    }
    v.try_normalize()
}

/// Surface area of a sphere of radius `r`
#[inline]
pub fn sphere_area(r: f64) -> f64 {
    4.0 * std::f64::consts::PI * r * r
}
