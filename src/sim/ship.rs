//! Ship aggregate: hull, energy ledger, typed part collections and the
//! handle a pilot drives the ship through

use glam::DVec3;

use super::body::{Body, ObjectId};
use super::parts::{Engine, Mount, Part, PartKind, ProjectileSpawn, Sensor, Thruster, Weapon};
use super::scan::{ScanResult, WorldSnapshot};
use crate::error::{ActionError, SimError};
use crate::pilot::Pilot;

/// A ship's physical state and its per-tick energy budget
#[derive(Debug, Clone, PartialEq)]
pub struct Hull {
    body: Body,
    fleet: String,
    dt: f64,
    total_energy: f64,
    current_energy: f64,
}

impl Hull {
    pub fn new(body: Body, fleet: impl Into<String>, dt: f64) -> Self {
        Self {
            body,
            fleet: fleet.into(),
            dt,
            total_energy: 0.0,
            current_energy: 0.0,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.body.id()
    }

    pub fn fleet(&self) -> &str {
        &self.fleet
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub fn position(&self) -> DVec3 {
        self.body.position
    }

    pub fn velocity(&self) -> DVec3 {
        self.body.velocity
    }

    pub fn mass(&self) -> f64 {
        self.body.mass
    }

    pub fn radius(&self) -> f64 {
        self.body.radius
    }

    pub fn health(&self) -> f64 {
        self.body.health
    }

    pub fn total_energy(&self) -> f64 {
        self.total_energy
    }

    pub fn current_energy(&self) -> f64 {
        self.current_energy
    }

    /// Reset the ledger to a fresh budget
    pub(crate) fn set_energy(&mut self, total: f64) {
        self.total_energy = total;
        self.current_energy = total;
    }

    /// Spend energy on behalf of a part
    ///
    /// Overdrawing empties the ledger and fails; the caller must then skip
    /// its action entirely.
    pub fn consume_energy(&mut self, amount: f64) -> Result<(), ActionError> {
        self.current_energy -= amount;
        if self.current_energy < 0.0 {
            self.current_energy = 0.0;
            return Err(ActionError::OutOfEnergy);
        }
        Ok(())
    }

    /// Push the ship with `force` along the unit vector `direction` for one tick
    pub fn apply_thrust(&mut self, direction: DVec3, force: f64) {
        self.accelerate(direction * (force / self.body.mass));
    }

    pub(crate) fn accelerate(&mut self, acceleration: DVec3) {
        self.body.velocity += acceleration * self.dt;
    }

    pub(crate) fn shed_mass(&mut self, amount: f64) {
        self.body.mass -= amount;
    }
}

/// A ship's parts, classified once by kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartSet {
    engines: Vec<Engine>,
    thrusters: Vec<Thruster>,
    weapons: Vec<Weapon>,
    sensors: Vec<Sensor>,
}

impl PartSet {
    pub fn new(parts: Vec<Part>) -> Self {
        let mut set = Self::default();
        for part in parts {
            match part {
                Part::Engine(p) => set.engines.push(p),
                Part::Thruster(p) => set.thrusters.push(p),
                Part::Weapon(p) => set.weapons.push(p),
                Part::Sensor(p) => set.sensors.push(p),
            }
        }
        set
    }

    pub fn engines(&self) -> &[Engine] {
        &self.engines
    }

    pub fn thrusters(&self) -> &[Thruster] {
        &self.thrusters
    }

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn len(&self) -> usize {
        self.engines.len() + self.thrusters.len() + self.weapons.len() + self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mounts(&self) -> impl Iterator<Item = &Mount> + '_ {
        self.engines
            .iter()
            .map(Engine::mount)
            .chain(self.thrusters.iter().map(Thruster::mount))
            .chain(self.weapons.iter().map(Weapon::mount))
            .chain(self.sensors.iter().map(Sensor::mount))
    }

    /// Weapons count their remaining ammunition
    pub fn mass(&self) -> f64 {
        self.engines
            .iter()
            .map(|p| p.mount().mass())
            .chain(self.thrusters.iter().map(|p| p.mount().mass()))
            .chain(self.weapons.iter().map(Weapon::mass))
            .chain(self.sensors.iter().map(|p| p.mount().mass()))
            .sum()
    }

    pub fn health(&self) -> f64 {
        self.mounts().map(Mount::health).sum()
    }

    /// Radius of the sphere around the ship centre enclosing every part
    pub fn bounding_radius(&self) -> f64 {
        self.mounts().map(Mount::reach).fold(0.0, f64::max)
    }

    /// Sum of engine outputs
    pub fn power(&self) -> f64 {
        self.engines.iter().map(Engine::output).sum()
    }

    /// Clear every part's per-tick `used` flag
    pub fn release(&mut self) {
        self.engines.iter_mut().for_each(Engine::release);
        self.thrusters.iter_mut().for_each(Thruster::release);
        self.weapons.iter_mut().for_each(Weapon::release);
        self.sensors.iter_mut().for_each(Sensor::release);
    }
}

/// Checked once at construction: valid parameters, no overlapping parts
pub fn validate_parts(fleet: &str, parts: &[Part]) -> Result<(), SimError> {
    let invalid = |reason: String| SimError::InvalidShip {
        fleet: fleet.to_string(),
        reason,
    };
    if parts.is_empty() {
        return Err(invalid("ship has no parts".to_string()));
    }
    for part in parts {
        part.validate().map_err(invalid)?;
    }
    for (i, a) in parts.iter().enumerate() {
        for b in &parts[i + 1..] {
            if a.mount().overlaps(b.mount()) {
                return Err(SimError::OverlappingParts {
                    fleet: fleet.to_string(),
                    first: a.mount().position(),
                    second: b.mount().position(),
                });
            }
        }
    }
    Ok(())
}

/// A fleet-tagged ship driven by an external pilot
pub struct Ship {
    hull: Hull,
    parts: PartSet,
    pilot: Box<dyn Pilot>,
    /// Projectiles fired this tick, drained by the orchestrator
    spawns: Vec<ProjectileSpawn>,
}

impl std::fmt::Debug for Ship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ship")
            .field("hull", &self.hull)
            .field("parts", &self.parts)
            .field("spawns", &self.spawns)
            .finish_non_exhaustive()
    }
}

impl Ship {
    /// Build a ship, deriving mass, radius and health from its parts
    ///
    /// Fails if the parts are invalid or any two of them overlap.
    pub fn new(
        id: ObjectId,
        fleet: &str,
        position: DVec3,
        pilot: Box<dyn Pilot>,
        parts: Vec<Part>,
        dt: f64,
    ) -> Result<Self, SimError> {
        validate_parts(fleet, &parts)?;
        let parts = PartSet::new(parts);

        let body = Body::new(
            id,
            position,
            parts.bounding_radius(),
            parts.mass(),
            parts.health(),
        );
        Ok(Self {
            hull: Hull::new(body, fleet, dt),
            parts,
            pilot,
            spawns: Vec::new(),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.hull.id()
    }

    pub fn fleet(&self) -> &str {
        self.hull.fleet()
    }

    pub fn hull(&self) -> &Hull {
        &self.hull
    }

    pub fn body(&self) -> &Body {
        self.hull.body()
    }

    pub(crate) fn body_mut(&mut self) -> &mut Body {
        self.hull.body_mut()
    }

    pub fn parts(&self) -> &PartSet {
        &self.parts
    }

    /// Refill the energy ledger from current engine output
    pub fn energize(&mut self) {
        self.hull.set_energy(self.parts.power());
    }

    /// The ship's share of the decide phase
    ///
    /// Touches nothing but this ship; the world is only visible through the
    /// snapshot.
    pub fn decide(&mut self, tick: u64, world: &WorldSnapshot) {
        self.parts.release();
        self.energize();
        let mut control = ShipControl {
            hull: &mut self.hull,
            parts: &mut self.parts,
            world,
            spawns: &mut self.spawns,
            tick,
        };
        self.pilot.tick(tick, &mut control);
    }

    pub(crate) fn take_spawns(&mut self) -> Vec<ProjectileSpawn> {
        std::mem::take(&mut self.spawns)
    }
}

/// What a pilot may do with its ship during one tick
pub struct ShipControl<'a> {
    hull: &'a mut Hull,
    parts: &'a mut PartSet,
    world: &'a WorldSnapshot,
    spawns: &'a mut Vec<ProjectileSpawn>,
    tick: u64,
}

impl<'a> ShipControl<'a> {
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn id(&self) -> ObjectId {
        self.hull.id()
    }

    pub fn fleet(&self) -> &str {
        self.hull.fleet()
    }

    /// Energy left to spend this tick
    pub fn energy(&self) -> f64 {
        self.hull.current_energy()
    }

    pub fn parts(&self) -> &PartSet {
        self.parts
    }

    pub fn power_on(&mut self, engine: usize, fraction: f64) -> Result<(), ActionError> {
        self.parts
            .engines
            .get_mut(engine)
            .ok_or(ActionError::NoSuchPart {
                kind: PartKind::Engine,
                index: engine,
            })?
            .power_on(fraction)
    }

    /// Power every engine, returning the first failure
    pub fn power_all(&mut self, fraction: f64) -> Result<(), ActionError> {
        let mut result = Ok(());
        for engine in self.parts.engines.iter_mut() {
            result = result.and(engine.power_on(fraction));
        }
        result
    }

    pub fn thrust(&mut self, thruster: usize, direction: DVec3) -> Result<(), ActionError> {
        self.parts
            .thrusters
            .get_mut(thruster)
            .ok_or(ActionError::NoSuchPart {
                kind: PartKind::Thruster,
                index: thruster,
            })?
            .thrust(self.hull, direction)
    }

    pub fn fire(&mut self, weapon: usize, direction: DVec3) -> Result<(), ActionError> {
        let spawn = self
            .parts
            .weapons
            .get_mut(weapon)
            .ok_or(ActionError::NoSuchPart {
                kind: PartKind::Weapon,
                index: weapon,
            })?
            .fire(self.hull, self.tick, direction)?;
        self.spawns.push(spawn);
        Ok(())
    }

    pub fn scan(&mut self, sensor: usize) -> Result<ScanResult, ActionError> {
        self.parts
            .sensors
            .get_mut(sensor)
            .ok_or(ActionError::NoSuchPart {
                kind: PartKind::Sensor,
                index: sensor,
            })?
            .scan(self.hull, self.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{EngineConf, SensorConf, ThrusterConf, WeaponConf};
    use crate::pilot::builtin::Idle;

    const DT: f64 = 0.01;

    fn engine(position: DVec3) -> Part {
        Engine::from_conf(
            position,
            &EngineConf {
                mass: 2000.0,
                radius: 5.0,
                energy: 100.0,
                health: None,
            },
        )
        .into()
    }

    fn thruster(position: DVec3) -> Part {
        Thruster::from_conf(
            position,
            &ThrusterConf {
                mass: 1500.0,
                radius: 2.0,
                force: 100.0,
                energy: 10.0,
                health: Some(10.0),
            },
        )
        .into()
    }

    fn weapon(position: DVec3) -> Part {
        Weapon::from_conf(
            position,
            &WeaponConf {
                mass: 1000.0,
                radius: 1.0,
                energy: 1.0,
                ammo_velocity: 10.0,
                ammo_mass: 0.1,
                ammo_radius: 0.05,
                ammo_capacity: 10,
                cooldown: 0.1,
                health: None,
            },
            DT,
        )
        .into()
    }

    fn sensor(position: DVec3) -> Part {
        Sensor::from_conf(
            position,
            &SensorConf {
                mass: 100.0,
                radius: 0.5,
                energy: 1.0,
                power: 1.0,
                health: None,
            },
        )
        .into()
    }

    fn ship(parts: Vec<Part>) -> Result<Ship, SimError> {
        Ship::new(ObjectId(1), "red", DVec3::ZERO, Box::new(Idle), parts, DT)
    }

    #[test]
    fn test_ship_derives_mass_radius_health() {
        let ship = ship(vec![
            engine(DVec3::ZERO),
            thruster(DVec3::new(0.0, -10.0, 0.0)),
            weapon(DVec3::new(10.0, 0.0, 0.0)),
            sensor(DVec3::new(0.0, 0.0, 7.0)),
        ])
        .unwrap();

        assert!((ship.body().mass() - (2000.0 + 1500.0 + 1001.0 + 100.0)).abs() < 1e-9);
        assert!((ship.body().radius() - 12.0).abs() < 1e-12);
        // Thruster health is configured, the rest default to their mass
        assert!((ship.body().health() - (2000.0 + 10.0 + 1000.0 + 100.0)).abs() < 1e-9);
        assert_eq!(ship.parts().len(), 4);
        assert_eq!(ship.parts().thrusters().len(), 1);
    }

    #[test]
    fn test_overlapping_parts_rejected() {
        let result = ship(vec![engine(DVec3::ZERO), thruster(DVec3::new(0.0, 6.0, 0.0))]);
        assert!(matches!(result, Err(SimError::OverlappingParts { .. })));
    }

    #[test]
    fn test_empty_ship_rejected() {
        assert!(matches!(ship(Vec::new()), Err(SimError::InvalidShip { .. })));
    }

    #[test]
    fn test_consume_energy() {
        let mut hull = Hull::new(Body::new(ObjectId(1), DVec3::ZERO, 1.0, 1.0, 1.0), "red", DT);
        hull.set_energy(10.0);

        hull.consume_energy(4.0).unwrap();
        assert_eq!(hull.current_energy(), 6.0);
        hull.consume_energy(6.0).unwrap();
        assert_eq!(hull.current_energy(), 0.0);

        hull.set_energy(10.0);
        assert_eq!(hull.consume_energy(10.5), Err(ActionError::OutOfEnergy));
        assert_eq!(hull.current_energy(), 0.0);
        assert_eq!(hull.total_energy(), 10.0);
    }

    #[test]
    fn test_energize_sums_engine_output() {
        let mut ship = ship(vec![engine(DVec3::ZERO), engine(DVec3::new(20.0, 0.0, 0.0))]).unwrap();
        ship.energize();
        assert_eq!(ship.hull().total_energy(), 0.0);

        ship.parts.engines[0].power_on(1.0).unwrap();
        ship.parts.engines[1].power_on(0.5).unwrap();
        ship.energize();
        assert_eq!(ship.hull().total_energy(), 150.0);
        assert_eq!(ship.hull().current_energy(), 150.0);
    }

    #[test]
    fn test_control_reports_missing_part() {
        let mut ship = ship(vec![engine(DVec3::ZERO)]).unwrap();
        let world = WorldSnapshot::default();
        let mut control = ShipControl {
            hull: &mut ship.hull,
            parts: &mut ship.parts,
            world: &world,
            spawns: &mut ship.spawns,
            tick: 0,
        };
        assert_eq!(
            control.thrust(0, DVec3::X),
            Err(ActionError::NoSuchPart {
                kind: PartKind::Thruster,
                index: 0
            })
        );
    }

    #[test]
    fn test_thrusters_add_up_in_one_tick() {
        let mut ship = ship(vec![
            engine(DVec3::ZERO),
            thruster(DVec3::new(0.0, -10.0, 0.0)),
            thruster(DVec3::new(0.0, 10.0, 0.0)),
        ])
        .unwrap();
        ship.hull.set_energy(20.0);
        let world = WorldSnapshot::default();
        let mut control = ShipControl {
            hull: &mut ship.hull,
            parts: &mut ship.parts,
            world: &world,
            spawns: &mut ship.spawns,
            tick: 0,
        };

        // 0.01 m/s² on 5000 kg needs 50 of each thruster's 100 force
        let request = DVec3::new(0.01, 0.0, 0.0);
        control.thrust(0, request).unwrap();
        control.thrust(1, request).unwrap();
        assert!((control.energy() - 10.0).abs() < 1e-12);
        assert_eq!(
            control.thrust(0, request),
            Err(ActionError::AlreadyUsed(PartKind::Thruster))
        );
        assert!((control.energy() - 10.0).abs() < 1e-12);

        let velocity = ship.hull().velocity();
        assert!((velocity.x - 2.0 * 0.01 * DT).abs() < 1e-15);
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn test_fire_through_control_queues_spawn() {
        let mut ship = ship(vec![engine(DVec3::ZERO), weapon(DVec3::new(10.0, 0.0, 0.0))]).unwrap();
        let mass_before = ship.body().mass();
        ship.hull.set_energy(5.0);
        let world = WorldSnapshot::default();
        let mut control = ShipControl {
            hull: &mut ship.hull,
            parts: &mut ship.parts,
            world: &world,
            spawns: &mut ship.spawns,
            tick: 0,
        };
        control.fire(0, DVec3::Y).unwrap();
        assert_eq!(control.energy(), 4.0);

        let spawns = ship.take_spawns();
        assert_eq!(spawns.len(), 1);
        assert!((ship.body().mass() - (mass_before - 0.1)).abs() < 1e-9);
        assert!((ship.body().mass() - ship.parts().mass()).abs() < 1e-9);
        assert!(ship.take_spawns().is_empty());
    }
}
