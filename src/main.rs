//! Void Arena entry point
//!
//! `void-arena [map.json parts.json fleet.json...]` runs a match from files.
//! With no arguments a generated two-fleet match is played instead.

use std::thread;

use void_arena::conf::{generate_map, load_json, MapGenConf, ShipConf};
use void_arena::{
    ChannelDrawer, FleetConf, MapConf, PartsConf, PilotRegistry, SimConf, SimError,
    SimulationBuilder,
};

/// Demo matches end here if nobody wins first
const DEMO_MAX_TICKS: u64 = 12_000;

fn demo(seed: u64) -> (MapConf, PartsConf, Vec<FleetConf>) {
    let map = generate_map(seed, &MapGenConf::default());
    let fleet = |name: &str, pilot: &str| FleetConf {
        name: name.into(),
        ships: (0..3)
            .map(|i| ShipConf::standard(pilot, [0.0, (i as f64 - 1.0) * 30.0, 0.0]))
            .collect(),
    };
    (
        map,
        PartsConf::standard(),
        vec![fleet("hunters", "hunter"), fleet("drifters", "wanderer")],
    )
}

fn load(args: &[String]) -> Result<(MapConf, PartsConf, Vec<FleetConf>), SimError> {
    let [map, parts, fleets @ ..] = args else {
        return Err(SimError::InvalidConfig(
            "usage: void-arena [map.json parts.json fleet.json...]".into(),
        ));
    };
    let fleets = fleets
        .iter()
        .map(|path| load_json::<FleetConf>(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((load_json(map)?, load_json(parts)?, fleets))
}

fn main() -> Result<(), SimError> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (map, parts, fleets) = if args.is_empty() {
        let seed = std::env::var("VOID_ARENA_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        log::info!("no configuration given, running demo match with seed {}", seed);
        demo(seed)
    } else {
        load(&args)?
    };

    let conf = SimConf {
        max_ticks: Some(DEMO_MAX_TICKS),
        ..Default::default()
    };
    let (drawer, frames) = ChannelDrawer::new(conf.frame_buffer);
    let registry = PilotRegistry::with_builtins();
    let mut sim = SimulationBuilder::new(map, &registry)
        .parts(parts)
        .fleets(fleets)
        .conf(conf)
        .drawer(drawer)
        .build()?;

    let viewer = thread::spawn(move || {
        let mut count = 0u64;
        while let Some(frame) = frames.recv() {
            count += 1;
            if frame.tick % 1000 == 0 {
                let scores: Vec<_> = frame
                    .scores
                    .iter()
                    .map(|(fleet, score)| format!("{fleet} {score:.2}"))
                    .collect();
                println!(
                    "t={:>7.2}s  objects={:>3}  removed={:>2}  {}",
                    frame.sim_time,
                    frame.new.len() + frame.updated.len(),
                    frame.deleted.len(),
                    scores.join("  ")
                );
            }
        }
        count
    });

    let outcome = sim.run()?;
    // Closes the channel so the viewer finishes
    drop(sim);
    let frames_seen = viewer.join().unwrap_or(0);

    println!("{}", outcome);
    println!("{} frames received", frames_seen);
    Ok(())
}
