//! Fixed timestep simulation tick
//!
//! One tick runs Score, Decide, Integrate, Collide and Cull strictly in that
//! order, then advances the counter and checks whether the match is over.

use std::collections::BTreeSet;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::body::{Body, ObjectId};
use super::collision::{collide, pair_mut};
use super::scan::{ControlPointContact, ShipContact, WorldSnapshot};
use super::sectors::{sector_size, Sectors};
use super::state::Simulation;
use crate::consts::{OBJECT_COR, PROJECTILE_COR};
use crate::draw::{Drawable, Frame};
use crate::error::SimError;

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    MaxTicks,
    NoShips,
    ScoreLimit,
    LastFleetStanding,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndReason::MaxTicks => "max ticks reached",
            EndReason::NoShips => "no ships remain",
            EndReason::ScoreLimit => "score limit reached",
            EndReason::LastFleetStanding => "last fleet standing",
        })
    }
}

/// Result of a finished match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Every fleet tied for the top score
    pub winners: Vec<String>,
    pub score: f64,
    pub reason: EndReason,
    /// Ticks completed when the match ended
    pub tick: u64,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} ticks: {} with {:.2} points",
            self.reason,
            self.tick,
            self.winners.join(", "),
            self.score
        )
    }
}

impl Simulation {
    /// Advance the match by one tick
    ///
    /// Returns the outcome once the match is over. A non-finite position or
    /// velocity halts the simulation for good.
    pub fn step(&mut self) -> Result<Option<Outcome>, SimError> {
        if self.halted {
            return Err(SimError::Halted);
        }
        if !self.started {
            self.started = true;
            self.emit_frame();
        }

        self.score();
        self.decide();
        self.spawn_projectiles();
        self.integrate();
        self.check_finite()?;
        self.collide();
        self.check_finite()?;
        self.cull();

        self.tick += 1;
        let outcome = self.outcome();
        if outcome.is_some() || self.tick % self.conf.frame_rate.max(1) == 0 {
            self.emit_frame();
        }
        if let Some(outcome) = &outcome {
            log::info!("match over: {}", outcome);
        }
        Ok(outcome)
    }

    /// Step until the match ends
    pub fn run(&mut self) -> Result<Outcome, SimError> {
        log::info!(
            "starting match with {} ships in {} fleets",
            self.ships.len(),
            self.scores.len()
        );
        loop {
            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }
        }
    }

    fn score(&mut self) {
        let dt = self.dt();
        for cp in &self.control_points {
            for ship in &self.ships {
                if cp.in_influence(ship.hull().position()) {
                    *self.scores.entry(ship.fleet().to_string()).or_insert(0.0) += cp.points * dt;
                }
            }
        }
        self.max_score = self.scores.values().copied().fold(0.0, f64::max);
    }

    /// Copy what sensors can see before any ship moves
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut world = WorldSnapshot::default();
        for ship in &self.ships {
            let body = ship.body();
            world.ships.insert(
                body.id(),
                ShipContact {
                    fleet: ship.fleet().to_string(),
                    position: body.position(),
                    velocity: body.velocity(),
                    radius: body.radius(),
                    health: body.health(),
                },
            );
        }
        for cp in &self.control_points {
            world.control_points.insert(
                cp.body.id(),
                ControlPointContact {
                    position: cp.body.position(),
                    velocity: cp.body.velocity(),
                    radius: cp.body.radius(),
                    health: cp.body.health(),
                    points: cp.points,
                    influence: cp.influence,
                },
            );
        }
        world
    }

    fn decide(&mut self) {
        let world = self.snapshot();
        let tick = self.tick;
        if self.conf.parallel {
            self.ships
                .par_iter_mut()
                .for_each(|ship| ship.decide(tick, &world));
        } else {
            self.ships
                .iter_mut()
                .for_each(|ship| ship.decide(tick, &world));
        }
    }

    /// Place fired projectiles in ship order so ids do not depend on scheduling
    fn spawn_projectiles(&mut self) {
        let spawns: Vec<_> = self
            .ships
            .iter_mut()
            .flat_map(|ship| ship.take_spawns())
            .collect();
        for spawn in spawns {
            let id = self.next_object_id();
            let body = Body::new(id, spawn.position, spawn.radius, spawn.mass, spawn.mass)
                .with_velocity(spawn.velocity);
            self.add_projectile(body);
        }
    }

    fn integrate(&mut self) {
        let dt = self.dt();
        for ship in &mut self.ships {
            ship.body_mut().integrate(dt);
        }
        for projectile in &mut self.projectiles {
            projectile.body.integrate(dt);
        }
        for cp in &mut self.control_points {
            cp.body.integrate(dt);
        }
        for asteroid in &mut self.asteroids {
            asteroid.body.integrate(dt);
        }
    }

    fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.ships
            .iter()
            .map(|s| s.body())
            .chain(self.control_points.iter().map(|c| &c.body))
            .chain(self.asteroids.iter().map(|a| &a.body))
            .chain(self.projectiles.iter().map(|p| &p.body))
    }

    fn check_finite(&mut self) -> Result<(), SimError> {
        let tick = self.tick;
        let result = self.bodies().try_for_each(|body| body.check_finite(tick));
        if let Err(e) = &result {
            log::error!("halting simulation: {}", e);
            self.halted = true;
        }
        result
    }

    fn collide(&mut self) {
        let dt = self.dt();
        // Ships, control points and asteroids first, projectiles last
        let mut bodies: Vec<Body> = self.bodies().copied().collect();
        let solids = bodies.len() - self.projectiles.len();
        let mut spent: Vec<bool> = self.projectiles.iter().map(|p| p.spent).collect();

        let max_extent = bodies.iter().map(|b| b.extent(dt)).fold(0.0, f64::max);
        let size = sector_size(max_extent);
        let mut objects = Sectors::new(size);
        let mut shots = Sectors::new(size);
        for (index, body) in bodies.iter().enumerate() {
            let grid = if index < solids { &mut objects } else { &mut shots };
            grid.insert(index, body.position(), body.extent(dt));
        }
        log::trace!(
            "tick {}: sector size {:.1}, {} object sectors, {} projectile sectors",
            self.tick,
            size,
            objects.len(),
            shots.len()
        );

        for (a, b) in objects.pairs() {
            if let Some((first, second)) = pair_mut(&mut bodies, a, b) {
                collide(first, second, dt, OBJECT_COR);
            }
        }
        for (shot, target) in shots.pairs_with(&objects) {
            if spent[shot - solids] {
                continue;
            }
            if let Some((projectile, other)) = pair_mut(&mut bodies, shot, target) {
                spent[shot - solids] = collide(projectile, other, dt, PROJECTILE_COR).is_some();
            }
        }

        let mut updated = bodies.into_iter();
        for ship in &mut self.ships {
            if let Some(body) = updated.next() {
                *ship.body_mut() = body;
            }
        }
        for cp in &mut self.control_points {
            if let Some(body) = updated.next() {
                cp.body = body;
            }
        }
        for asteroid in &mut self.asteroids {
            if let Some(body) = updated.next() {
                asteroid.body = body;
            }
        }
        for (projectile, was_hit) in self.projectiles.iter_mut().zip(spent) {
            if let Some(body) = updated.next() {
                projectile.body = body;
            }
            projectile.spent = was_hit;
        }
    }

    fn cull(&mut self) {
        let radius = self.arena_radius;
        let mut removed = Vec::new();

        self.ships.retain(|ship| {
            let body = ship.body();
            let gone = body.is_destroyed() || body.is_outside(radius);
            if gone {
                if body.is_destroyed() {
                    log::info!("ship {} of fleet '{}' destroyed", body.id(), ship.fleet());
                } else {
                    log::info!("ship {} of fleet '{}' left the arena", body.id(), ship.fleet());
                }
                removed.push(body.id());
            }
            !gone
        });
        self.projectiles.retain(|p| {
            let gone = p.spent || p.body.is_destroyed() || p.body.is_outside(radius);
            if gone {
                removed.push(p.body.id());
            }
            !gone
        });

        for id in removed {
            if self.drawn.remove(&id) {
                self.deleted.push(id);
            }
        }
    }

    /// End conditions, in priority order
    fn outcome(&self) -> Option<Outcome> {
        let top = self.max_score;
        let leaders: Vec<String> = self
            .scores
            .iter()
            .filter(|(_, score)| **score == top)
            .map(|(fleet, _)| fleet.clone())
            .collect();

        let reason = if self.conf.max_ticks.is_some_and(|max| self.tick >= max) {
            EndReason::MaxTicks
        } else if self.ships.is_empty() {
            EndReason::NoShips
        } else if self.score_limit.is_some_and(|limit| top > limit) {
            EndReason::ScoreLimit
        } else {
            let survivors = self.survivors();
            let sole_survivor = survivors.len() == 1
                && leaders.len() == 1
                && survivors.contains(leaders[0].as_str());
            if !sole_survivor {
                return None;
            }
            EndReason::LastFleetStanding
        };

        Some(Outcome {
            winners: leaders,
            score: top,
            reason,
            tick: self.tick,
        })
    }

    fn drawables(&self) -> Vec<Drawable> {
        let ships = self.ships.iter().map(|s| Drawable::new(s.body(), "ship"));
        let cps = self
            .control_points
            .iter()
            .map(|c| Drawable::new(&c.body, "control_point"));
        let asteroids = self
            .asteroids
            .iter()
            .map(|a| Drawable::new(&a.body, a.texture.as_str()));
        let projectiles = self
            .projectiles
            .iter()
            .map(|p| Drawable::new(&p.body, "projectile"));
        cps.chain(asteroids).chain(ships).chain(projectiles).collect()
    }

    fn emit_frame(&mut self) {
        if self.drawer.is_none() {
            return;
        }
        let (new, updated): (Vec<_>, Vec<_>) = self
            .drawables()
            .into_iter()
            .partition(|d| !self.drawn.contains(&d.id));
        self.drawn.extend(new.iter().map(|d| d.id));

        let frame = Frame {
            tick: self.tick,
            sim_time: self.sim_time(),
            scores: self.scores.clone(),
            new,
            updated,
            deleted: std::mem::take(&mut self.deleted),
        };
        if let Some(drawer) = self.drawer.as_mut() {
            drawer.draw(frame);
        }
    }

    /// Ids of every live object, for diagnostics
    pub fn object_ids(&self) -> BTreeSet<ObjectId> {
        self.bodies().map(|b| b.id()).collect()
    }
}
