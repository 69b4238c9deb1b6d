//! Dedicated tick thread with cooperative pause and cancellation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, info};

use super::Simulation;

#[derive(Debug, Default)]
struct Flags {
    paused: bool,
    cancelled: bool,
}

/// Shared switches for a running tick thread.
///
/// Both pause and cancel take effect between ticks only; a tick in progress
/// always completes.
#[derive(Debug, Default)]
pub struct LoopControl {
    flags: Mutex<Flags>,
    changed: Condvar,
    ticks: AtomicU64,
}

impl LoopControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pause(&self) {
        self.update(|flags| flags.paused = true);
    }

    pub fn resume(&self) {
        self.update(|flags| flags.paused = false);
    }

    pub fn cancel(&self) {
        self.update(|flags| flags.cancelled = true);
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Ticks completed by the thread so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Flags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut Flags)) {
        f(&mut self.lock());
        self.changed.notify_all();
    }

    /// Block while paused. Returns `None` once cancelled, otherwise whether
    /// the thread had to wait.
    fn checkpoint(&self) -> Option<bool> {
        let guard = self.lock();
        let waited = guard.paused && !guard.cancelled;
        let guard = self
            .changed
            .wait_while(guard, |flags| flags.paused && !flags.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        (!guard.cancelled).then_some(waited)
    }
}

/// Run `simulation` on its own thread until `control` is cancelled. The
/// simulation is handed back through the join handle.
pub fn spawn_tick_thread(
    simulation: Simulation,
    control: Arc<LoopControl>,
) -> anyhow::Result<JoinHandle<Simulation>> {
    thread::Builder::new()
        .name("sortie-tick".into())
        .spawn(move || run(simulation, &control))
        .context("failed to spawn tick thread")
}

fn run(mut simulation: Simulation, control: &LoopControl) -> Simulation {
    let tick = simulation.tick_duration();
    let realtime = simulation.config().realtime;
    info!(?tick, realtime, "tick thread started");

    let mut deadline = Instant::now();
    while let Some(waited) = control.checkpoint() {
        if waited {
            debug!("tick thread resumed");
            deadline = Instant::now();
        }

        simulation.tick();
        control.ticks.fetch_add(1, Ordering::Release);

        if realtime {
            deadline += tick;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                // Running late; do not try to catch up with a burst.
                deadline = now;
            }
        }
    }

    info!(ticks = simulation.tick_count(), "tick thread stopped");
    simulation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulationConfig;
    use std::time::Duration;

    fn wait_for(control: &LoopControl, ticks: u64) {
        let start = Instant::now();
        while control.ticks() < ticks {
            assert!(start.elapsed() < Duration::from_secs(10), "tick thread stalled");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_cancel_returns_simulation() {
        let sim = Simulation::new(SimulationConfig {
            realtime: false,
            ..Default::default()
        });
        let control = LoopControl::new();
        let handle = spawn_tick_thread(sim, Arc::clone(&control)).unwrap();

        wait_for(&control, 5);
        control.cancel();
        let sim = handle.join().unwrap();
        assert!(sim.tick_count() >= 5);
        assert_eq!(sim.tick_count(), control.ticks());
    }

    #[test]
    fn test_pause_holds_between_ticks() {
        let sim = Simulation::new(SimulationConfig {
            realtime: false,
            ..Default::default()
        });
        let control = LoopControl::new();
        let handle = spawn_tick_thread(sim, Arc::clone(&control)).unwrap();

        wait_for(&control, 1);
        control.pause();
        // At most the tick in flight finishes after pausing.
        thread::sleep(Duration::from_millis(20));
        let held = control.ticks();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(control.ticks(), held);
        assert!(control.is_paused());

        control.resume();
        wait_for(&control, held + 3);

        // Cancelling a paused loop also stops it.
        control.pause();
        control.cancel();
        let sim = handle.join().unwrap();
        assert_eq!(sim.tick_count(), control.ticks());
    }

    #[test]
    fn test_realtime_paces_ticks() {
        let sim = Simulation::new(SimulationConfig::default());
        let control = LoopControl::new();
        let start = Instant::now();
        let handle = spawn_tick_thread(sim, Arc::clone(&control)).unwrap();

        wait_for(&control, 3);
        control.cancel();
        handle.join().unwrap();
        // Three ticks of 50 ms cannot finish in much less than 100 ms.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
