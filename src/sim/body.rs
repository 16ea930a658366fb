//! Physical state shared by every object in the arena

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Unique object identifier, assigned in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A sphere with mass, motion and health
///
/// Position and velocity change only during integration and collision;
/// health changes only during collision resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    id: ObjectId,
    pub(crate) position: DVec3,
    pub(crate) velocity: DVec3,
    pub(crate) radius: f64,
    pub(crate) mass: f64,
    /// Negative or zero means destroyed
    pub(crate) health: f64,
}

impl Body {
    pub fn new(id: ObjectId, position: DVec3, radius: f64, mass: f64, health: f64) -> Self {
        Self {
            id,
            position,
            velocity: DVec3::ZERO,
            radius,
            mass,
            health,
        }
    }

    pub fn with_velocity(mut self, velocity: DVec3) -> Self {
        self.velocity = velocity;
        self
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> DVec3 {
        self.velocity
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn health(&self) -> f64 {
        self.health
    }

    /// Zero for infinitely heavy bodies
    #[inline]
    pub fn inverse_mass(&self) -> f64 {
        if self.mass.is_infinite() {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    /// Advance position by one timestep
    pub fn integrate(&mut self, dt: f64) {
        self.position += self.velocity * dt;
    }

    /// Radius of the sphere swept out over one timestep
    pub fn extent(&self, dt: f64) -> f64 {
        self.radius + self.velocity.length() * dt
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    pub fn is_outside(&self, arena_radius: f64) -> bool {
        self.position.length() > arena_radius
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.length_squared()
    }

    /// Fails if position or velocity has gone non-finite
    pub fn check_finite(&self, tick: u64) -> Result<(), SimError> {
        let field = if !self.position.is_finite() {
            "position"
        } else if !self.velocity.is_finite() {
            "velocity"
        } else {
            return Ok(());
        };
        Err(SimError::NonFinite {
            id: self.id,
            field,
            tick,
        })
    }
}
