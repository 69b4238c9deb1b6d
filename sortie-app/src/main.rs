//! Headless demo: a small dogfight on the tick thread, sampled by a 60 Hz
//! "renderer" loop on the main thread.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::{Quat, Vec3};
use log::info;
use sortie::{
    spawn_tick_thread, EntityKind, LoopControl, RenderClock, Simulation, SimulationConfig,
    Spawner,
};

const FRAME: Duration = Duration::from_micros(16_667);
const RUN_FOR: Duration = Duration::from_secs(3);

fn populate(spawner: &Spawner) -> anyhow::Result<()> {
    // Two fighters on a head-on course with an asteroid between them.
    spawner.spawn(
        EntityKind::Fighter,
        Vec3::new(0.0, 0.0, 60.0),
        Quat::IDENTITY,
        Vec3::new(0.0, 0.0, -25.0),
    )?;
    spawner.spawn(
        EntityKind::Fighter,
        Vec3::new(0.5, 0.0, -60.0),
        Quat::from_rotation_y(std::f32::consts::PI),
        Vec3::new(0.0, 0.0, 25.0),
    )?;
    spawner.spawn(EntityKind::Asteroid, Vec3::ZERO, Quat::IDENTITY, Vec3::ZERO)?;
    spawner.spawn(
        EntityKind::Checkpoint,
        Vec3::new(0.0, 0.0, 30.0),
        Quat::IDENTITY,
        Vec3::ZERO,
    )?;
    Ok(())
}

fn fire_volley(spawner: &Spawner, round: u32) -> anyhow::Result<()> {
    let spread = (round as f32 * 0.7).sin() * 2.0;
    spawner.spawn(
        EntityKind::Bullet,
        Vec3::new(spread, 0.5, 55.0),
        Quat::IDENTITY,
        Vec3::new(0.0, 0.0, -300.0),
    )?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let simulation = Simulation::new(SimulationConfig::default());
    let spawner = simulation.spawner();
    let snapshots = simulation.snapshots();
    let control = LoopControl::new();

    populate(&spawner)?;
    let handle = spawn_tick_thread(simulation, Arc::clone(&control))?;

    let clock = RenderClock::default();
    let start = Instant::now();
    let mut frames = 0u32;
    let mut volleys = 0u32;
    while start.elapsed() < RUN_FOR {
        let snapshot = snapshots.load();
        let f = clock.fraction(&snapshot, Instant::now());

        if frames % 30 == 0 {
            fire_volley(&spawner, volleys)?;
            volleys += 1;
            for entry in snapshot.iter() {
                let position = entry.state.position(f);
                info!(
                    "tick {} f={f:.2} {} {:?} at ({:.1}, {:.1}, {:.1})",
                    snapshot.tick(),
                    entry.id,
                    entry.kind,
                    position.x,
                    position.y,
                    position.z
                );
            }
        }

        frames += 1;
        thread::sleep(FRAME);
    }

    control.cancel();
    let simulation = handle
        .join()
        .map_err(|_| anyhow::anyhow!("tick thread panicked"))?;

    let view = simulation.view();
    println!(
        "{} ticks, {} frames, {} volleys, {} entities left",
        simulation.tick_count(),
        frames,
        volleys,
        view.len()
    );
    for entry in view.iter() {
        let end = entry.state.position(1.0);
        println!("  {} {:?} at ({:.1}, {:.1}, {:.1})", entry.id, entry.kind, end.x, end.y, end.z);
    }
    Ok(())
}
