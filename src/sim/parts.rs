//! Ship parts: engines, thrusters, weapons and sensors
//!
//! A part never points back at its ship. Every action takes the owning
//! ship's `Hull` as an explicit argument, and each part may act at most once
//! per tick (its `used` flag is cleared at the start of every tick).

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::scan::{ScanResult, WorldSnapshot};
use super::ship::Hull;
use crate::conf::{EngineConf, SensorConf, ThrusterConf, WeaponConf};
use crate::consts::PROJECTILE_CLEARANCE;
use crate::error::ActionError;
use crate::{direction_of, sphere_area};

/// The four part families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Engine,
    Thruster,
    Weapon,
    Sensor,
}

impl PartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Engine => "engine",
            PartKind::Thruster => "thruster",
            PartKind::Weapon => "weapon",
            PartKind::Sensor => "sensor",
        }
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a part sits on its ship, and whether it has acted this tick
#[derive(Debug, Clone, PartialEq)]
pub struct Mount {
    /// Offset from the ship centre
    position: DVec3,
    radius: f64,
    mass: f64,
    health: f64,
    used: bool,
}

impl Mount {
    /// Health defaults to the part's mass
    pub fn new(position: DVec3, radius: f64, mass: f64, health: Option<f64>) -> Self {
        Self {
            position,
            radius,
            mass,
            health: health.unwrap_or(mass),
            used: false,
        }
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Distance from the ship centre to the far side of this part
    pub fn reach(&self) -> f64 {
        self.position.length() + self.radius
    }

    /// Touching spheres do not overlap
    pub fn overlaps(&self, other: &Mount) -> bool {
        self.position.distance(other.position) < self.radius + other.radius
    }

    fn claim(&mut self, kind: PartKind) -> Result<(), ActionError> {
        if self.used {
            return Err(ActionError::AlreadyUsed(kind));
        }
        self.used = true;
        Ok(())
    }

    pub(crate) fn release(&mut self) {
        self.used = false;
    }

    fn validate(&self) -> Result<(), String> {
        if !self.position.is_finite() {
            return Err(format!("part position {} is not finite", self.position));
        }
        if !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(format!("part mass must be positive, got {}", self.mass));
        }
        if !(self.radius.is_finite() && self.radius >= 0.0) {
            return Err(format!("part radius must be non-negative, got {}", self.radius));
        }
        Ok(())
    }
}

/// Produces the energy the rest of the ship spends
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    mount: Mount,
    /// Output at full power
    energy: f64,
    output: f64,
}

impl Engine {
    pub fn from_conf(position: DVec3, conf: &EngineConf) -> Self {
        Self {
            mount: Mount::new(position, conf.radius, conf.mass, conf.health),
            energy: conf.energy,
            output: 0.0,
        }
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub(crate) fn release(&mut self) {
        self.mount.release();
    }

    /// Set output to `fraction` of full power, effective from the next tick
    pub fn power_on(&mut self, fraction: f64) -> Result<(), ActionError> {
        self.mount.claim(PartKind::Engine)?;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ActionError::InvalidPower(fraction));
        }
        self.output = self.energy * fraction;
        Ok(())
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn capacity(&self) -> f64 {
        self.energy
    }
}

/// Converts energy into acceleration of the whole ship
#[derive(Debug, Clone, PartialEq)]
pub struct Thruster {
    mount: Mount,
    force: f64,
    /// Energy drawn at full force
    energy: f64,
}

impl Thruster {
    pub fn from_conf(position: DVec3, conf: &ThrusterConf) -> Self {
        Self {
            mount: Mount::new(position, conf.radius, conf.mass, conf.health),
            force: conf.force,
            energy: conf.energy,
        }
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub(crate) fn release(&mut self) {
        self.mount.release();
    }

    pub fn force(&self) -> f64 {
        self.force
    }

    /// Fire the thruster
    ///
    /// The length of `direction` is the requested acceleration. The force
    /// needed for it is capped at the thruster's rating and energy is drawn
    /// in proportion to the force delivered. A zero-length request is a
    /// no-op that still uses the thruster for the tick.
    pub fn thrust(&mut self, hull: &mut Hull, direction: DVec3) -> Result<(), ActionError> {
        self.mount.claim(PartKind::Thruster)?;
        if !direction.is_finite() {
            return Err(ActionError::InvalidDirection(direction));
        }
        let Some(unit) = direction.try_normalize() else {
            return Ok(());
        };

        let force = (hull.mass() * direction.length()).min(self.force);
        let energy = self.energy * force / self.force;
        hull.consume_energy(energy)?;
        hull.accelerate(unit * force / hull.mass());
        Ok(())
    }
}

/// A projectile a weapon has fired, waiting for the orchestrator to place it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    pub position: DVec3,
    pub velocity: DVec3,
    pub mass: f64,
    pub radius: f64,
}

/// Fires projectiles, paying energy and ammunition mass per shot
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    mount: Mount,
    energy: f64,
    ammo_velocity: f64,
    ammo_mass: f64,
    ammo_radius: f64,
    ammo: u64,
    /// Configured seconds between shots
    cooldown: f64,
    cooldown_ticks: u64,
    last_shot: Option<u64>,
}

impl Weapon {
    /// `dt` converts the configured cooldown seconds into ticks
    pub fn from_conf(position: DVec3, conf: &WeaponConf, dt: f64) -> Self {
        Self {
            mount: Mount::new(position, conf.radius, conf.mass, conf.health),
            energy: conf.energy,
            ammo_velocity: conf.ammo_velocity,
            ammo_mass: conf.ammo_mass,
            ammo_radius: conf.ammo_radius,
            ammo: conf.ammo_capacity,
            cooldown: conf.cooldown,
            cooldown_ticks: (conf.cooldown / dt).round().max(0.0) as u64,
            last_shot: None,
        }
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub(crate) fn release(&mut self) {
        self.mount.release();
    }

    /// Empty weapon plus remaining ammunition
    pub fn mass(&self) -> f64 {
        self.mount.mass + self.ammo as f64 * self.ammo_mass
    }

    pub fn ammo(&self) -> u64 {
        self.ammo
    }

    pub fn ammo_velocity(&self) -> f64 {
        self.ammo_velocity
    }

    pub fn cooldown_ticks(&self) -> u64 {
        self.cooldown_ticks
    }

    /// Ticks until the weapon can fire again, if it is cooling down
    pub fn cooldown_remaining(&self, tick: u64) -> Option<u64> {
        let ready = self.last_shot?.saturating_add(self.cooldown_ticks);
        (tick < ready).then(|| ready - tick)
    }

    /// Fire along `direction`
    ///
    /// Nothing but the energy ledger changes unless every check passes. On
    /// success the ship loses one round of mass, recoils, and the returned
    /// spawn sits just outside its hull moving at hull velocity plus muzzle
    /// velocity.
    pub fn fire(
        &mut self,
        hull: &mut Hull,
        tick: u64,
        direction: DVec3,
    ) -> Result<ProjectileSpawn, ActionError> {
        self.mount.claim(PartKind::Weapon)?;
        let Some(unit) = direction_of(direction) else {
            return Err(ActionError::InvalidDirection(direction));
        };
        if self.ammo == 0 {
            return Err(ActionError::OutOfAmmo);
        }
        if let Some(remaining) = self.cooldown_remaining(tick) {
            return Err(ActionError::CoolingDown { remaining });
        }
        hull.consume_energy(self.energy)?;

        self.ammo -= 1;
        self.last_shot = Some(tick);
        hull.shed_mass(self.ammo_mass);
        hull.apply_thrust(-unit, self.ammo_mass * self.ammo_velocity);

        Ok(ProjectileSpawn {
            position: hull.position()
                + unit * (hull.radius() + self.ammo_radius + PROJECTILE_CLEARANCE),
            velocity: hull.velocity() + unit * self.ammo_velocity,
            mass: self.ammo_mass,
            radius: self.ammo_radius,
        })
    }
}

/// Reports nearby ships and control points
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    mount: Mount,
    energy: f64,
    power: f64,
}

impl Sensor {
    pub fn from_conf(position: DVec3, conf: &SensorConf) -> Self {
        Self {
            mount: Mount::new(position, conf.radius, conf.mass, conf.health),
            energy: conf.energy,
            power: conf.power,
        }
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub(crate) fn release(&mut self) {
        self.mount.release();
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    /// Received intensity from a contact at `distance`
    pub fn intensity(&self, distance: f64) -> f64 {
        self.power / sphere_area(distance)
    }

    pub fn scan(&mut self, hull: &mut Hull, world: &WorldSnapshot) -> Result<ScanResult, ActionError> {
        self.mount.claim(PartKind::Sensor)?;
        hull.consume_energy(self.energy)?;
        Ok(world.scan(hull, |distance| self.intensity(distance)))
    }
}

/// Any part, as produced by a pilot's loadout
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Engine(Engine),
    Thruster(Thruster),
    Weapon(Weapon),
    Sensor(Sensor),
}

impl Part {
    pub fn kind(&self) -> PartKind {
        match self {
            Part::Engine(_) => PartKind::Engine,
            Part::Thruster(_) => PartKind::Thruster,
            Part::Weapon(_) => PartKind::Weapon,
            Part::Sensor(_) => PartKind::Sensor,
        }
    }

    pub fn mount(&self) -> &Mount {
        match self {
            Part::Engine(p) => &p.mount,
            Part::Thruster(p) => &p.mount,
            Part::Weapon(p) => &p.mount,
            Part::Sensor(p) => &p.mount,
        }
    }

    pub fn mass(&self) -> f64 {
        match self {
            Part::Weapon(w) => w.mass(),
            other => other.mount().mass,
        }
    }

    /// Reject parameters that would poison the physics
    pub fn validate(&self) -> Result<(), String> {
        self.mount().validate()?;
        match self {
            Part::Thruster(t) if !(t.force.is_finite() && t.force > 0.0) => {
                Err(format!("thruster force must be positive, got {}", t.force))
            }
            Part::Weapon(w) if !(w.ammo_mass.is_finite() && w.ammo_mass > 0.0) => {
                Err(format!("ammo mass must be positive, got {}", w.ammo_mass))
            }
            Part::Weapon(w) if !w.ammo_velocity.is_finite() || !w.ammo_radius.is_finite() => {
                Err("ammo velocity and radius must be finite".to_string())
            }
            Part::Weapon(w) if !(w.cooldown.is_finite() && w.cooldown >= 0.0) => {
                Err(format!("weapon cooldown must be non-negative, got {}", w.cooldown))
            }
            _ => Ok(()),
        }
    }
}

impl From<Engine> for Part {
    fn from(p: Engine) -> Self {
        Part::Engine(p)
    }
}

impl From<Thruster> for Part {
    fn from(p: Thruster) -> Self {
        Part::Thruster(p)
    }
}

impl From<Weapon> for Part {
    fn from(p: Weapon) -> Self {
        Part::Weapon(p)
    }
}

impl From<Sensor> for Part {
    fn from(p: Sensor) -> Self {
        Part::Sensor(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::{Body, ObjectId};

    const DT: f64 = 0.01;

    fn hull(mass: f64, energy: f64) -> Hull {
        let mut hull = Hull::new(
            Body::new(ObjectId(1), DVec3::ZERO, 5.0, mass, mass),
            "red",
            DT,
        );
        hull.set_energy(energy);
        hull
    }

    fn thruster() -> Thruster {
        Thruster::from_conf(
            DVec3::new(0.0, -1.0, 0.0),
            &ThrusterConf {
                mass: 10.0,
                radius: 1.0,
                force: 100.0,
                energy: 10.0,
                health: None,
            },
        )
    }

    fn weapon(cooldown: f64, ammo: u64) -> Weapon {
        Weapon::from_conf(
            DVec3::new(1.0, 0.0, 0.0),
            &WeaponConf {
                mass: 10.0,
                radius: 1.0,
                energy: 1.0,
                ammo_velocity: 100.0,
                ammo_mass: 0.5,
                ammo_radius: 0.1,
                ammo_capacity: ammo,
                cooldown,
                health: None,
            },
            DT,
        )
    }

    #[test]
    fn test_power_on_range() {
        let mut engine = Engine::from_conf(
            DVec3::ZERO,
            &EngineConf {
                mass: 1.0,
                radius: 1.0,
                energy: 80.0,
                health: None,
            },
        );
        assert_eq!(engine.power_on(1.5), Err(ActionError::InvalidPower(1.5)));
        engine.mount.release();
        engine.power_on(0.25).unwrap();
        assert_eq!(engine.output(), 20.0);
        assert_eq!(engine.capacity(), 80.0);
        assert_eq!(
            engine.power_on(1.0),
            Err(ActionError::AlreadyUsed(PartKind::Engine))
        );
    }

    #[test]
    fn test_thrust_caps_force_and_charges_proportionally() {
        let mut hull = hull(100.0, 50.0);
        let mut t = thruster();

        // Requesting 0.5 accel on 100 mass needs 50 force: half rating, half energy
        t.thrust(&mut hull, DVec3::new(0.5, 0.0, 0.0)).unwrap();
        assert!((hull.current_energy() - 45.0).abs() < 1e-12);
        assert!((hull.velocity().x - 0.5 * DT).abs() < 1e-12);

        // A huge request is capped at the rated 100 force
        t.mount.release();
        t.thrust(&mut hull, DVec3::new(0.0, 1000.0, 0.0)).unwrap();
        assert!((hull.current_energy() - 35.0).abs() < 1e-12);
        assert!((hull.velocity().y - 1.0 * DT).abs() < 1e-12);
    }

    #[test]
    fn test_thrust_twice_in_one_tick_fails() {
        let mut hull = hull(100.0, 50.0);
        let mut t = thruster();
        t.thrust(&mut hull, DVec3::X).unwrap();
        assert_eq!(
            t.thrust(&mut hull, DVec3::X),
            Err(ActionError::AlreadyUsed(PartKind::Thruster))
        );
    }

    #[test]
    fn test_thrust_without_energy_has_no_effect() {
        let mut hull = hull(100.0, 1.0);
        let mut t = thruster();
        assert_eq!(
            t.thrust(&mut hull, DVec3::new(1.0, 0.0, 0.0)),
            Err(ActionError::OutOfEnergy)
        );
        assert_eq!(hull.velocity(), DVec3::ZERO);
        assert_eq!(hull.current_energy(), 0.0);
    }

    #[test]
    fn test_fire_rejects_bad_direction() {
        let mut hull = hull(100.0, 50.0);
        let mut w = weapon(0.0, 10);
        assert!(matches!(
            w.fire(&mut hull, 0, DVec3::ZERO),
            Err(ActionError::InvalidDirection(_))
        ));
        w.mount.release();
        assert!(matches!(
            w.fire(&mut hull, 0, DVec3::new(f64::NAN, 0.0, 0.0)),
            Err(ActionError::InvalidDirection(_))
        ));
        assert_eq!(w.ammo(), 10);
    }

    #[test]
    fn test_fire_spawns_outside_hull_and_recoils() {
        let mut hull = hull(100.0, 50.0);
        let mut w = weapon(0.0, 10);
        let spawn = w.fire(&mut hull, 0, DVec3::new(2.0, 0.0, 0.0)).unwrap();

        assert_eq!(w.ammo(), 9);
        assert!((hull.mass() - 99.5).abs() < 1e-12);
        assert!((hull.current_energy() - 49.0).abs() < 1e-12);
        // Recoil: force 0.5 * 100 = 50 along -x on the lightened hull
        assert!((hull.velocity().x + 50.0 / 99.5 * DT).abs() < 1e-12);
        assert!(spawn.position.x > hull.radius() + spawn.radius);
        assert!((spawn.velocity.x - (hull.velocity().x + 100.0)).abs() < 1e-12);
        assert_eq!(spawn.mass, 0.5);
    }

    #[test]
    fn test_weapon_cooldown() {
        let mut hull = hull(100.0, 1e6);
        // 0.05 s at 0.01 s per tick = 5 ticks
        let mut w = weapon(0.05, 10);
        assert_eq!(w.cooldown_ticks(), 5);

        w.fire(&mut hull, 10, DVec3::X).unwrap();
        w.mount.release();
        assert_eq!(
            w.fire(&mut hull, 12, DVec3::X),
            Err(ActionError::CoolingDown { remaining: 3 })
        );
        w.mount.release();
        w.fire(&mut hull, 15, DVec3::X).unwrap();
        assert_eq!(w.ammo(), 8);
    }

    #[test]
    fn test_huge_cooldown_never_recharges() {
        let mut hull = hull(100.0, 1e6);
        let mut w = weapon(1e30, 10);
        assert_eq!(w.cooldown_ticks(), u64::MAX);

        w.fire(&mut hull, 1, DVec3::X).unwrap();
        w.mount.release();
        assert!(matches!(
            w.fire(&mut hull, 2, DVec3::X),
            Err(ActionError::CoolingDown { .. })
        ));
        assert_eq!(w.cooldown_remaining(u64::MAX), None);
        assert_eq!(w.ammo(), 9);
    }

    #[test]
    fn test_validate_rejects_bad_cooldown() {
        assert!(Part::from(weapon(1e30, 1)).validate().is_ok());
        assert!(Part::from(weapon(-1.0, 1)).validate().is_err());
        assert!(Part::from(weapon(f64::INFINITY, 1)).validate().is_err());
        assert!(Part::from(weapon(f64::NAN, 1)).validate().is_err());
    }

    #[test]
    fn test_weapon_out_of_ammo() {
        let mut hull = hull(100.0, 50.0);
        let mut w = weapon(0.0, 1);
        w.fire(&mut hull, 0, DVec3::X).unwrap();
        w.mount.release();
        assert_eq!(w.fire(&mut hull, 1, DVec3::X), Err(ActionError::OutOfAmmo));
    }

    #[test]
    fn test_weapon_mass_includes_ammo() {
        let w = weapon(0.0, 10);
        assert_eq!(Part::from(w).mass(), 15.0);
    }

    #[test]
    fn test_mount_overlap() {
        let a = Mount::new(DVec3::ZERO, 1.0, 1.0, None);
        let b = Mount::new(DVec3::new(2.0, 0.0, 0.0), 1.0, 1.0, None);
        let c = Mount::new(DVec3::new(1.5, 0.0, 0.0), 1.0, 1.0, None);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert_eq!(a.health(), 1.0);
    }

    #[test]
    fn test_validate_rejects_zero_force() {
        let mut t = thruster();
        t.force = 0.0;
        assert!(Part::from(t).validate().is_err());
        assert!(Part::from(thruster()).validate().is_ok());
    }
}
