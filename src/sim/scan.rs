//! Read-only view of the arena handed to pilots
//!
//! The snapshot is taken once per tick before the decide phase, so every
//! ship sees the same consistent world no matter which order ships run in.

use std::collections::BTreeMap;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::body::ObjectId;
use super::ship::Hull;
use crate::consts::DETECTION_THRESHOLD;

/// Another ship as seen by a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipContact {
    pub fleet: String,
    pub position: DVec3,
    pub velocity: DVec3,
    pub radius: f64,
    pub health: f64,
}

/// A control point as seen by a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPointContact {
    pub position: DVec3,
    pub velocity: DVec3,
    pub radius: f64,
    pub health: f64,
    pub points: f64,
    pub influence: f64,
}

/// Copies of every scannable object, keyed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldSnapshot {
    pub(crate) ships: BTreeMap<ObjectId, ShipContact>,
    pub(crate) control_points: BTreeMap<ObjectId, ControlPointContact>,
}

impl WorldSnapshot {
    /// Everything `intensity` says is bright enough, excluding the observer
    pub(crate) fn scan(&self, observer: &Hull, intensity: impl Fn(f64) -> f64) -> ScanResult {
        let origin = observer.position();
        let detected = |position: DVec3| intensity(position.distance(origin)) > DETECTION_THRESHOLD;

        let ships = self
            .ships
            .iter()
            .filter(|(id, contact)| **id != observer.id() && detected(contact.position))
            .map(|(id, contact)| (*id, contact.clone()))
            .collect();
        let control_points = self
            .control_points
            .iter()
            .filter(|(_, contact)| detected(contact.position))
            .map(|(id, contact)| (*id, contact.clone()))
            .collect();

        ScanResult {
            id: observer.id(),
            position: origin,
            velocity: observer.velocity(),
            radius: observer.radius(),
            health: observer.health(),
            energy: observer.current_energy(),
            ships,
            control_points,
        }
    }
}

/// A sensor reading: the scanning ship's own state plus detected contacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub id: ObjectId,
    pub position: DVec3,
    pub velocity: DVec3,
    pub radius: f64,
    pub health: f64,
    /// Energy left after the scan
    pub energy: f64,
    pub ships: BTreeMap<ObjectId, ShipContact>,
    pub control_points: BTreeMap<ObjectId, ControlPointContact>,
}

impl ScanResult {
    /// Closest ship not in `fleet`
    pub fn nearest_enemy(&self, fleet: &str) -> Option<(ObjectId, &ShipContact)> {
        self.ships
            .iter()
            .filter(|(_, s)| s.fleet != fleet)
            .min_by(|(_, a), (_, b)| {
                let da = a.position.distance_squared(self.position);
                let db = b.position.distance_squared(self.position);
                da.total_cmp(&db)
            })
            .map(|(id, s)| (*id, s))
    }

    pub fn nearest_control_point(&self) -> Option<(ObjectId, &ControlPointContact)> {
        self.control_points
            .iter()
            .min_by(|(_, a), (_, b)| {
                let da = a.position.distance_squared(self.position);
                let db = b.position.distance_squared(self.position);
                da.total_cmp(&db)
            })
            .map(|(id, c)| (*id, c))
    }
}
