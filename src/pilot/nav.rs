//! Waypoint navigation shared by pilots
//!
//! A [`Nav`] holds a FIFO queue of waypoints and, each tick, asks every
//! thruster for an equal share of the acceleration that brings the ship's
//! velocity toward `max_speed` along the line to the current waypoint.

use std::collections::VecDeque;

use glam::DVec3;

use crate::error::ActionError;
use crate::sim::ShipControl;

/// A point to fly to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: DVec3,
    /// Cruise speed on the way there (m/s)
    pub max_speed: f64,
    /// Counts as reached when the ship is closer than this
    pub tolerance: f64,
}

/// What the navigator decided this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Steer {
    /// No waypoint left
    Idle,
    /// The current waypoint was reached and dropped
    Arrived(Waypoint),
    /// Acceleration requested of the ship (m/s²)
    Thrust(DVec3),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Nav {
    queue: VecDeque<Waypoint>,
    current: Option<Waypoint>,
    /// Velocity error to acceleration (1/s)
    gain: f64,
}

impl Default for Nav {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Nav {
    pub fn new(gain: f64) -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            gain,
        }
    }

    /// Replace the waypoint being flown to, keeping the queue
    pub fn set_waypoint(&mut self, waypoint: Waypoint) {
        self.current = Some(waypoint);
    }

    /// Queue a waypoint after every other one
    pub fn add_waypoint(&mut self, waypoint: Waypoint) {
        self.queue.push_back(waypoint);
    }

    pub fn current(&self) -> Option<&Waypoint> {
        self.current.as_ref()
    }

    /// Waypoints still queued behind the current one
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.queue.clear();
    }

    /// Decide without touching the ship
    pub fn steer(&mut self, position: DVec3, velocity: DVec3) -> Steer {
        if self.current.is_none() {
            self.current = self.queue.pop_front();
        }
        let Some(waypoint) = self.current else {
            return Steer::Idle;
        };

        let offset = waypoint.position - position;
        if offset.length() < waypoint.tolerance {
            log::trace!("reached waypoint {}", waypoint.position);
            self.current = None;
            return Steer::Arrived(waypoint);
        }
        let desired = offset.normalize_or_zero() * waypoint.max_speed;
        Steer::Thrust((desired - velocity) * self.gain)
    }

    /// Steer and fire the ship's thrusters
    ///
    /// Every thruster is tried even if an earlier one fails; the first
    /// failure is returned.
    pub fn tick(
        &mut self,
        ship: &mut ShipControl<'_>,
        position: DVec3,
        velocity: DVec3,
    ) -> Result<Steer, ActionError> {
        let steer = self.steer(position, velocity);
        if let Steer::Thrust(acceleration) = steer {
            let count = ship.parts().thrusters().len();
            if count > 0 {
                let share = acceleration / count as f64;
                let mut result = Ok(());
                for i in 0..count {
                    result = result.and(ship.thrust(i, share));
                }
                result?;
            }
        }
        Ok(steer)
    }
}
