//! Ship controllers
//!
//! A [`Pilot`] is handed a [`ShipControl`] once per tick and drives its ship
//! through it. Pilots are created by name from a [`PilotRegistry`].

pub mod builtin;
pub mod nav;
mod registry;

pub use nav::{Nav, Steer, Waypoint};
pub use registry::{PilotFactory, PilotRegistry};

use crate::conf::{vec_from_slice, PartsConf, ShipPartConf};
use crate::error::SimError;
use crate::sim::{Engine, Part, PartKind, Sensor, ShipControl, Thruster, Weapon};

/// Decision-making for one ship
///
/// Pilots run concurrently during the decide phase, one per ship, so they must
/// be `Send`. A pilot only ever sees its own ship and sensor readings.
pub trait Pilot: Send {
    /// Called once before the match with the fleet the ship belongs to
    fn join_fleet(&mut self, _fleet: &str) {}

    /// Build the ship's parts from its roster entry
    fn link_parts(
        &mut self,
        roster: &[ShipPartConf],
        catalog: &PartsConf,
        dt: f64,
    ) -> Result<Vec<Part>, SimError> {
        link_catalog_parts(roster, catalog, dt)
    }

    /// Act for one tick; each part may act at most once
    fn tick(&mut self, tick: u64, ship: &mut ShipControl<'_>);
}

/// Look up every named part in the catalog and place it at its position
pub fn link_catalog_parts(
    roster: &[ShipPartConf],
    catalog: &PartsConf,
    dt: f64,
) -> Result<Vec<Part>, SimError> {
    roster
        .iter()
        .map(|entry| {
            let position = vec_from_slice(&entry.position)?;
            let missing = || SimError::PartNotAvailable {
                kind: entry.kind,
                name: entry.name.clone(),
            };
            let part = match entry.kind {
                PartKind::Engine => {
                    Engine::from_conf(position, catalog.engines.get(&entry.name).ok_or_else(missing)?)
                        .into()
                }
                PartKind::Thruster => Thruster::from_conf(
                    position,
                    catalog.thrusters.get(&entry.name).ok_or_else(missing)?,
                )
                .into(),
                PartKind::Weapon => Weapon::from_conf(
                    position,
                    catalog.weapons.get(&entry.name).ok_or_else(missing)?,
                    dt,
                )
                .into(),
                PartKind::Sensor => {
                    Sensor::from_conf(position, catalog.sensors.get(&entry.name).ok_or_else(missing)?)
                        .into()
                }
            };
            Ok(part)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::ShipConf;

    #[test]
    fn test_link_standard_loadout() {
        let entry = ShipConf::standard("idle", [0.0; 3]);
        let parts = link_catalog_parts(&entry.parts, &PartsConf::standard(), 0.01).unwrap();
        let kinds: Vec<_> = parts.iter().map(Part::kind).collect();
        assert_eq!(
            kinds,
            vec![PartKind::Engine, PartKind::Thruster, PartKind::Weapon, PartKind::Sensor]
        );
        match &parts[2] {
            Part::Weapon(weapon) => assert_eq!(weapon.cooldown_ticks(), 50),
            other => panic!("expected a weapon, got {:?}", other),
        }
    }

    #[test]
    fn test_link_unknown_name() {
        let roster = [ShipPartConf {
            kind: PartKind::Sensor,
            name: "lidar".into(),
            position: vec![0.0; 3],
        }];
        let err = link_catalog_parts(&roster, &PartsConf::standard(), 0.01).unwrap_err();
        assert_eq!(err.to_string(), "sensor 'lidar' is not available in the part catalog");
    }

    #[test]
    fn test_link_bad_position() {
        let roster = [ShipPartConf {
            kind: PartKind::Engine,
            name: "fusion".into(),
            position: vec![0.0, f64::NAN, 0.0],
        }];
        let result = link_catalog_parts(&roster, &PartsConf::standard(), 0.01);
        assert!(matches!(result, Err(SimError::InvalidPosition(_))));
    }
}
