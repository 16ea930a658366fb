//! Error types
//!
//! Two families: `ActionError` is a per-part, per-tick failure that a pilot
//! observes and the match ignores; `SimError` stops a match from starting or
//! halts one that has corrupted its physics state.

use glam::DVec3;
use thiserror::Error;

use crate::sim::{ObjectId, PartKind};

/// A part action that did not happen this tick
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("out of energy")]
    OutOfEnergy,
    #[error("out of ammunition")]
    OutOfAmmo,
    #[error("{0} already used this tick")]
    AlreadyUsed(PartKind),
    #[error("weapon cooling down, {remaining} ticks remaining")]
    CoolingDown { remaining: u64 },
    #[error("invalid direction {0}")]
    InvalidDirection(DVec3),
    #[error("power must be between 0 and 1, got {0}")]
    InvalidPower(f64),
    #[error("no {kind} at index {index}")]
    NoSuchPart { kind: PartKind, index: usize },
}

/// Setup failures and invariant violations
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid position list, must have exactly 3 finite items: {0:?}")]
    InvalidPosition(Vec<f64>),
    #[error("unknown pilot '{0}'")]
    UnknownPilot(String),
    #[error("{kind} '{name}' is not available in the part catalog")]
    PartNotAvailable { kind: PartKind, name: String },
    #[error("ship in fleet '{fleet}' has overlapping parts at {first} and {second}")]
    OverlappingParts {
        fleet: String,
        first: DVec3,
        second: DVec3,
    },
    #[error("invalid ship in fleet '{fleet}': {reason}")]
    InvalidShip { fleet: String, reason: String },
    #[error("mass for fleet '{fleet}' is too large {mass} > {max}")]
    FleetTooHeavy { fleet: String, mass: f64, max: f64 },
    #[error("too many fleets for the map, only {0} fleets allowed")]
    TooManyFleets(usize),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("non-finite {field} on object {id} at tick {tick}")]
    NonFinite {
        id: ObjectId,
        field: &'static str,
        tick: u64,
    },
    #[error("simulation halted after an invariant violation")]
    Halted,
}
