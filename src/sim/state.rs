//! Simulation state and construction
//!
//! Every entity list is owned by [`Simulation`] and mutated only by the
//! orchestrator between phases. Lists stay in creation order, which is also
//! id order, so iteration is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::body::{Body, ObjectId};
use super::parts::Part;
use super::ship::Ship;
use crate::conf::{vec_from_slice, FleetConf, MapConf, PartsConf, SimConf};
use crate::draw::Drawer;
use crate::error::SimError;
use crate::pilot::{Pilot, PilotRegistry};

/// Ammunition in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub(crate) body: Body,
    /// Set on the first hit; the projectile is removed in the next cull
    pub(crate) spent: bool,
}

impl Projectile {
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }
}

/// Scores for every ship within its influence radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub(crate) body: Body,
    /// Score per second
    pub(crate) points: f64,
    /// Ships closer than this to the centre score
    pub(crate) influence: f64,
}

impl ControlPoint {
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn points(&self) -> f64 {
        self.points
    }

    pub fn influence(&self) -> f64 {
        self.influence
    }

    pub fn in_influence(&self, position: DVec3) -> bool {
        self.body.position.distance(position) < self.influence
    }
}

/// Inert rock; never culled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    pub(crate) body: Body,
    /// Drawer hint
    pub(crate) texture: String,
}

impl Asteroid {
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn texture(&self) -> &str {
        &self.texture
    }
}

/// A running match
pub struct Simulation {
    pub(crate) conf: SimConf,
    /// Objects beyond this distance from the origin are removed
    pub(crate) arena_radius: f64,
    /// Fleet score that ends the match
    pub(crate) score_limit: Option<f64>,
    /// Ticks completed
    pub(crate) tick: u64,
    pub(crate) ships: Vec<Ship>,
    pub(crate) projectiles: Vec<Projectile>,
    pub(crate) control_points: Vec<ControlPoint>,
    pub(crate) asteroids: Vec<Asteroid>,
    /// Every registered fleet, including those with no ships left
    pub(crate) scores: BTreeMap<String, f64>,
    /// Highest fleet score so far
    pub(crate) max_score: f64,
    pub(crate) drawer: Option<Box<dyn Drawer>>,
    /// Ids the drawer has been told about and not yet told to delete
    pub(crate) drawn: BTreeSet<ObjectId>,
    /// Drawn ids removed since the last frame
    pub(crate) deleted: Vec<ObjectId>,
    /// Set once the tick 0 frame has gone out
    pub(crate) started: bool,
    /// Set by a non-finite body; every later step fails
    pub(crate) halted: bool,
    next_id: u64,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("ships", &self.ships.len())
            .field("projectiles", &self.projectiles.len())
            .field("control_points", &self.control_points.len())
            .field("asteroids", &self.asteroids.len())
            .field("scores", &self.scores)
            .field("halted", &self.halted)
            .finish()
    }
}

impl Simulation {
    /// An arena with nothing in it
    pub fn empty(arena_radius: f64, conf: SimConf) -> Self {
        Self {
            conf,
            arena_radius,
            score_limit: None,
            tick: 0,
            ships: Vec::new(),
            projectiles: Vec::new(),
            control_points: Vec::new(),
            asteroids: Vec::new(),
            scores: BTreeMap::new(),
            max_score: 0.0,
            drawer: None,
            drawn: BTreeSet::new(),
            deleted: Vec::new(),
            started: false,
            halted: false,
            next_id: 1,
        }
    }

    pub(crate) fn next_object_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// The id the next created object will receive
    pub fn peek_next_id(&self) -> ObjectId {
        ObjectId(self.next_id)
    }

    pub fn set_score_limit(&mut self, limit: Option<f64>) {
        self.score_limit = limit;
    }

    pub fn set_drawer(&mut self, drawer: Box<dyn Drawer>) {
        self.drawer = Some(drawer);
    }

    /// Register a fleet with a zero score
    pub fn add_fleet(&mut self, name: &str) {
        self.scores.entry(name.to_string()).or_insert(0.0);
    }

    pub fn add_ship(
        &mut self,
        fleet: &str,
        position: DVec3,
        pilot: Box<dyn Pilot>,
        parts: Vec<Part>,
    ) -> Result<ObjectId, SimError> {
        let id = self.peek_next_id();
        let ship = Ship::new(id, fleet, position, pilot, parts, self.conf.tick_seconds)?;
        self.next_object_id();
        self.add_fleet(fleet);
        self.ships.push(ship);
        Ok(id)
    }

    /// Unchecked; map input goes through [`SimulationBuilder`]
    pub fn add_control_point(
        &mut self,
        position: DVec3,
        radius: f64,
        mass: f64,
        points: f64,
        influence: f64,
    ) -> ObjectId {
        let id = self.next_object_id();
        self.control_points.push(ControlPoint {
            body: Body::new(id, position, radius, mass, mass),
            points,
            influence,
        });
        id
    }

    pub fn add_asteroid(
        &mut self,
        position: DVec3,
        radius: f64,
        mass: f64,
        texture: impl Into<String>,
    ) -> ObjectId {
        let id = self.next_object_id();
        self.asteroids.push(Asteroid {
            body: Body::new(id, position, radius, mass, mass),
            texture: texture.into(),
        });
        id
    }

    pub(crate) fn add_projectile(&mut self, body: Body) -> ObjectId {
        let id = body.id();
        self.projectiles.push(Projectile { body, spent: false });
        id
    }

    pub fn conf(&self) -> &SimConf {
        &self.conf
    }

    pub fn dt(&self) -> f64 {
        self.conf.tick_seconds
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds elapsed
    pub fn sim_time(&self) -> f64 {
        self.tick as f64 * self.conf.tick_seconds
    }

    pub fn arena_radius(&self) -> f64 {
        self.arena_radius
    }

    pub fn scores(&self) -> &BTreeMap<String, f64> {
        &self.scores
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn ship(&self, id: ObjectId) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id() == id)
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    pub fn asteroids(&self) -> &[Asteroid] {
        &self.asteroids
    }

    /// Fleets with at least one ship left
    pub fn survivors(&self) -> BTreeSet<&str> {
        self.ships.iter().map(|s| s.fleet()).collect()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

/// Map bodies may be immovable (infinite mass) but never massless
fn check_body(what: &str, radius: f64, mass: f64) -> Result<(), SimError> {
    if mass.is_nan() || mass <= 0.0 {
        return Err(SimError::InvalidConfig(format!(
            "{what} mass must be positive, got {mass}"
        )));
    }
    if !(radius.is_finite() && radius >= 0.0) {
        return Err(SimError::InvalidConfig(format!(
            "{what} radius must be non-negative, got {radius}"
        )));
    }
    Ok(())
}

/// Assembles a [`Simulation`] from parsed configuration
///
/// Nothing is returned unless every fleet, ship and part is valid.
pub struct SimulationBuilder<'a> {
    map: MapConf,
    parts: PartsConf,
    fleets: Vec<FleetConf>,
    registry: &'a PilotRegistry,
    conf: SimConf,
    drawer: Option<Box<dyn Drawer>>,
}

impl<'a> SimulationBuilder<'a> {
    pub fn new(map: MapConf, registry: &'a PilotRegistry) -> Self {
        Self {
            map,
            parts: PartsConf::standard(),
            fleets: Vec::new(),
            registry,
            conf: SimConf::default(),
            drawer: None,
        }
    }

    pub fn parts(mut self, parts: PartsConf) -> Self {
        self.parts = parts;
        self
    }

    pub fn fleet(mut self, fleet: FleetConf) -> Self {
        self.fleets.push(fleet);
        self
    }

    pub fn fleets(mut self, fleets: impl IntoIterator<Item = FleetConf>) -> Self {
        self.fleets.extend(fleets);
        self
    }

    pub fn conf(mut self, conf: SimConf) -> Self {
        self.conf = conf;
        self
    }

    pub fn drawer(mut self, drawer: impl Drawer + 'static) -> Self {
        self.drawer = Some(Box::new(drawer));
        self
    }

    fn check_conf(&self) -> Result<(), SimError> {
        let dt = self.conf.tick_seconds;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "tick duration must be positive, got {dt}"
            )));
        }
        if self.conf.frame_rate == 0 {
            return Err(SimError::InvalidConfig("frame rate must be at least 1".into()));
        }
        if self.conf.max_ticks == Some(0) {
            return Err(SimError::InvalidConfig("max ticks must be at least 1".into()));
        }
        if !(self.map.radius.is_finite() && self.map.radius > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "arena radius must be positive, got {}",
                self.map.radius
            )));
        }
        for cp in &self.map.control_points {
            check_body("control point", cp.radius, cp.mass)?;
            if !(cp.influence.is_finite() && cp.influence >= 0.0) || !cp.points.is_finite() {
                return Err(SimError::InvalidConfig(format!(
                    "control point influence {} or points {} out of range",
                    cp.influence, cp.points
                )));
            }
        }
        for asteroid in &self.map.asteroids {
            check_body("asteroid", asteroid.radius, asteroid.mass)?;
        }
        let mut names = BTreeSet::new();
        for fleet in &self.fleets {
            if !names.insert(fleet.name.as_str()) {
                return Err(SimError::InvalidConfig(format!(
                    "duplicate fleet name '{}'",
                    fleet.name
                )));
            }
        }
        if self.fleets.len() > self.map.starting_points.len() {
            return Err(SimError::TooManyFleets(self.map.starting_points.len()));
        }
        Ok(())
    }

    pub fn build(self) -> Result<Simulation, SimError> {
        self.check_conf()?;

        let mut sim = Simulation::empty(self.map.radius, self.conf.clone());
        sim.score_limit = self.map.rules.score;
        let dt = sim.dt();

        for cp in &self.map.control_points {
            let position = vec_from_slice(&cp.position)?;
            sim.add_control_point(position, cp.radius, cp.mass, cp.points, cp.influence);
        }
        for asteroid in &self.map.asteroids {
            let position = vec_from_slice(&asteroid.position)?;
            let texture = asteroid.texture.as_deref().unwrap_or("asteroid");
            sim.add_asteroid(position, asteroid.radius, asteroid.mass, texture);
        }

        for (fleet, start) in self.fleets.iter().zip(&self.map.starting_points) {
            let origin = vec_from_slice(start)?;
            sim.add_fleet(&fleet.name);

            let mut fleet_mass = 0.0;
            for ship in &fleet.ships {
                let seed = sim.peek_next_id().0;
                let mut pilot = self.registry.create(&ship.pilot, seed)?;
                pilot.join_fleet(&fleet.name);
                let parts = pilot.link_parts(&ship.parts, &self.parts, dt)?;
                let position = origin + vec_from_slice(&ship.position)?;
                let id = sim.add_ship(&fleet.name, position, pilot, parts)?;
                if let Some(added) = sim.ship(id) {
                    fleet_mass += added.hull().mass();
                }
            }

            let max = self.map.rules.max_fleet_mass;
            if fleet_mass > max {
                return Err(SimError::FleetTooHeavy {
                    fleet: fleet.name.clone(),
                    mass: fleet_mass,
                    max,
                });
            }
            log::info!(
                "fleet '{}' joined with {} ships, mass {:.1}",
                fleet.name,
                fleet.ships.len(),
                fleet_mass
            );
        }

        sim.drawer = self.drawer;
        Ok(sim)
    }
}
