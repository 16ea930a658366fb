//! Pilots that ship with the crate

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::nav::{Nav, Steer, Waypoint};
use super::Pilot;
use crate::error::ActionError;
use crate::sim::{ScanResult, ShipControl};

/// Cruise speed between wanderer waypoints (m/s)
const WANDER_SPEED: f64 = 15.0;
/// Length range of one wanderer leg (m)
const WANDER_LEG: (f64, f64) = (100.0, 400.0);
/// How hard a hunter corrects velocity errors (1/s)
const HUNTER_GAIN: f64 = 2.0;

fn report(ship: &ShipControl<'_>, action: &str, result: Result<(), ActionError>) {
    if let Err(e) = result {
        log::debug!("ship {} {} failed at tick {}: {}", ship.id(), action, ship.tick(), e);
    }
}

/// Keeps its engines running and nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl Pilot for Idle {
    fn tick(&mut self, _tick: u64, ship: &mut ShipControl<'_>) {
        let result = ship.power_all(1.0);
        report(ship, "power", result);
    }
}

/// Flies to random nearby waypoints, returning to the nearest control point
/// when it strays too far
#[derive(Debug, Clone)]
pub struct Wanderer {
    rng: Pcg32,
    nav: Nav,
}

impl Wanderer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            nav: Nav::default(),
        }
    }

    fn random_heading(&mut self) -> DVec3 {
        loop {
            let candidate = DVec3::new(
                self.rng.random_range(-1.0..1.0),
                self.rng.random_range(-1.0..1.0),
                self.rng.random_range(-1.0..1.0),
            );
            if let Some(dir) = candidate.try_normalize() {
                return dir;
            }
        }
    }

    /// Next leg from `position`, given what the last scan saw
    fn next_waypoint(&mut self, scan: &ScanResult) -> Waypoint {
        if let Some((_, cp)) = scan.nearest_control_point() {
            if cp.position.distance(scan.position) > cp.influence * 3.0 {
                return Waypoint {
                    position: cp.position,
                    max_speed: WANDER_SPEED,
                    tolerance: cp.influence,
                };
            }
        }
        let leg = self.rng.random_range(WANDER_LEG.0..WANDER_LEG.1);
        Waypoint {
            position: scan.position + self.random_heading() * leg,
            max_speed: WANDER_SPEED,
            tolerance: scan.radius.max(1.0),
        }
    }
}

impl Pilot for Wanderer {
    fn tick(&mut self, _tick: u64, ship: &mut ShipControl<'_>) {
        let result = ship.power_all(1.0);
        report(ship, "power", result);

        if ship.parts().sensors().is_empty() {
            return;
        }
        let scan = match ship.scan(0) {
            Ok(scan) => scan,
            Err(e) => return report(ship, "scan", Err(e)),
        };
        if self.nav.is_idle() {
            let waypoint = self.next_waypoint(&scan);
            self.nav.add_waypoint(waypoint);
        }
        if let Err(e) = self.nav.tick(ship, scan.position, scan.velocity) {
            report(ship, "thrust", Err(e));
        }
    }
}

/// Holds the nearest control point and shoots at the nearest enemy
#[derive(Debug, Clone)]
pub struct Hunter {
    /// Approach speed toward a control point (m/s)
    pub cruise_speed: f64,
    nav: Nav,
}

impl Default for Hunter {
    fn default() -> Self {
        Self {
            cruise_speed: 40.0,
            nav: Nav::new(HUNTER_GAIN),
        }
    }
}

impl Hunter {
    /// Cancel drift relative to `target` once on station
    fn hold(&self, ship: &mut ShipControl<'_>, scan: &ScanResult, target: DVec3) {
        if ship.parts().thrusters().is_empty() {
            return;
        }
        let result = ship.thrust(0, (target - scan.velocity) * HUNTER_GAIN);
        report(ship, "thrust", result);
    }
}

impl Pilot for Hunter {
    fn tick(&mut self, tick: u64, ship: &mut ShipControl<'_>) {
        let result = ship.power_all(1.0);
        report(ship, "power", result);

        if ship.parts().sensors().is_empty() {
            return;
        }
        let scan = match ship.scan(0) {
            Ok(scan) => scan,
            Err(e) => return report(ship, "scan", Err(e)),
        };

        let station = scan.nearest_control_point().map(|(_, cp)| cp);
        if let Some(cp) = station {
            self.nav.set_waypoint(Waypoint {
                position: cp.position,
                max_speed: self.cruise_speed,
                tolerance: cp.influence * 0.5,
            });
        }
        match self.nav.tick(ship, scan.position, scan.velocity) {
            Ok(Steer::Thrust(_)) => {}
            Ok(Steer::Arrived(_) | Steer::Idle) => {
                let target = station.map_or(DVec3::ZERO, |cp| cp.velocity);
                self.hold(ship, &scan, target);
            }
            Err(e) => report(ship, "thrust", Err(e)),
        }

        let Some(weapon) = ship.parts().weapons().first() else {
            return;
        };
        if weapon.ammo() == 0 || weapon.cooldown_remaining(tick).is_some() {
            return;
        }
        let muzzle_speed = weapon.ammo_velocity();
        if muzzle_speed <= 0.0 {
            return;
        }

        if let Some((_, enemy)) = scan.nearest_enemy(ship.fleet()) {
            let offset = enemy.position - scan.position;
            let drift = enemy.velocity - scan.velocity;
            // First-order lead on the target's relative motion
            let aim = offset + drift * (offset.length() / muzzle_speed);
            let result = ship.fire(0, aim);
            report(ship, "fire", result);
        }
    }
}
