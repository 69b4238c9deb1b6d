//! Swept collision detection and resolution for one fixed tick.
//!
//! # Architecture
//!
//! The physics pipeline runs in a fixed timestep loop:
//!
//! 1. Move entities that have no collider
//! 2. Build a swept body per touchable entity (tick-start transform + velocity)
//! 3. Broadphase: sweep-and-prune over the swept extents
//! 4. Narrowphase: swept vertices/points against convex polygons, edges against edges
//! 5. Resolve contacts in time order, re-testing only what changed
//! 6. Write back end-of-tick transforms and velocities
//! 7. Despawn bodies destroyed by their collision response

pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod narrowphase;
pub mod polygon;
pub mod response;
pub mod rigid_body;
pub mod solver;

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::ecs::components::physics::{Movable, Touchable};
use crate::ecs::components::transform::Transform;
use crate::identity::EntityId;

use self::broadphase::SweepAndPrune;
use self::response::Contact;
use self::rigid_body::{integrate_rotation, SweptBody};
use self::solver::DoneReason;

/// Configuration for the physics simulation.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Ticks per second. Default: 20.
    pub tick_rate: f64,
    /// Collision iterations allowed per simulated second. Default: 400.
    pub iterations_per_second: u32,
    /// Explicit per-tick iteration bound, overriding the per-second budget.
    pub max_iterations: Option<u32>,
    /// Maximum number of ticks per [`PhysicsWorld::step`] call. Default: 4.
    pub max_substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20.0,
            iterations_per_second: 400,
            max_iterations: None,
            max_substeps: 4,
        }
    }
}

impl PhysicsConfig {
    /// Tick length in seconds.
    pub fn fixed_timestep(&self) -> f64 {
        1.0 / self.tick_rate
    }

    /// Per-tick iteration bound; a higher tick rate gets fewer iterations
    /// per tick so the per-second total stays constant.
    pub fn iteration_budget(&self) -> u32 {
        self.max_iterations.unwrap_or_else(|| {
            ((self.iterations_per_second as f64 / self.tick_rate).floor() as u32).max(1)
        })
    }
}

/// Outcome of one [`PhysicsWorld::fixed_step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub iterations: u32,
    pub collisions: u32,
    pub reason: DoneReason,
    /// Entities despawned because a collision destroyed them.
    pub destroyed: Vec<EntityId>,
}

/// Fixed-timestep accumulator shared by [`PhysicsWorld::step`] and the
/// simulation's own tick loop.
#[derive(Debug, Clone, Default)]
pub struct FixedTimestep {
    accumulator: f64,
}

impl FixedTimestep {
    /// Add `delta_time` seconds and return how many whole ticks of `fixed`
    /// seconds to run now, at most `max_substeps`.
    pub fn advance(&mut self, delta_time: f64, fixed: f64, max_substeps: u32) -> u32 {
        self.accumulator += delta_time;
        let mut ticks = 0;
        while self.accumulator >= fixed && ticks < max_substeps {
            self.accumulator -= fixed;
            ticks += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > fixed * max_substeps as f64 {
            debug!(behind = self.accumulator, "fell behind, dropping time");
            self.accumulator = 0.0;
        }
        ticks
    }

    /// Seconds accumulated but not yet simulated.
    pub fn pending(&self) -> f64 {
        self.accumulator
    }
}

/// The main physics world managing simulation state.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    timestep: FixedTimestep,
    broadphase: SweepAndPrune,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            timestep: FixedTimestep::default(),
            broadphase: SweepAndPrune::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn broadphase(&self) -> &SweepAndPrune {
        &self.broadphase
    }

    /// Step a bare hecs world forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator to ensure deterministic simulation.
    /// Returns the reports of the ticks that ran. A [`Simulation`] paces its
    /// own ticks and only calls [`fixed_step`](Self::fixed_step).
    ///
    /// [`Simulation`]: crate::engine::Simulation
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) -> Vec<StepReport> {
        let fixed = self.config.fixed_timestep();
        let ticks = self
            .timestep
            .advance(delta_time, fixed, self.config.max_substeps);
        (0..ticks)
            .map(|_| self.fixed_step(world, fixed as f32))
            .collect()
    }

    /// Run exactly one tick of length `dt` seconds.
    pub fn fixed_step(&mut self, world: &mut hecs::World, dt: f32) -> StepReport {
        // 1. Colliderless motion
        rigid_body::integrate_free_bodies(world, dt);

        // 2. Swept bodies, in id order so resolution is reproducible
        let mut bodies: Vec<SweptBody> = world
            .query::<(&EntityId, &Transform, &Touchable, Option<&Movable>)>()
            .iter()
            .map(|(entity, (id, transform, touchable, movable))| {
                SweptBody::new(
                    *id,
                    entity,
                    transform,
                    Arc::clone(&touchable.collider),
                    movable.map(|m| m.velocity),
                    dt,
                )
                .with_sensor(touchable.is_sensor)
            })
            .collect();
        bodies.sort_by_key(|b| b.id);

        // 3-5. Broad phase, narrow phase and ordered resolution
        let budget = self.config.iteration_budget();
        let report = {
            let world: &hecs::World = world;
            solver::resolve_collisions(
                &mut bodies,
                &mut self.broadphase,
                budget,
                |body, collision, source_is_sensor| {
                    let Ok(mut touchable) = world.get::<&mut Touchable>(body.entity) else {
                        return false;
                    };
                    let mut destroyed = false;
                    let mut contact = Contact::new(
                        collision,
                        &mut body.velocity,
                        source_is_sensor,
                        &mut destroyed,
                    );
                    touchable.response.accept_collision(&mut contact);
                    destroyed
                },
            )
        };
        self.broadphase.finish();

        // 6. Write back
        for body in bodies.iter().filter(|b| b.active && b.movable) {
            if let Ok((transform, movable)) =
                world.query_one_mut::<(&mut Transform, &mut Movable)>(body.entity)
            {
                transform.position = body.position_at(1.0);
                transform.rotation =
                    integrate_rotation(transform.rotation, movable.angular_velocity, dt);
                movable.velocity = body.velocity;
            }
        }

        // 7. Despawn destroyed bodies
        let mut destroyed = Vec::with_capacity(report.destroyed.len());
        for &slot in &report.destroyed {
            let body = &bodies[slot];
            if let Err(err) = world.despawn(body.entity) {
                warn!(id = %body.id, %err, "destroyed body was already gone");
            }
            destroyed.push(body.id);
        }

        trace!(
            bodies = bodies.len(),
            iterations = report.iterations,
            collisions = report.collisions,
            destroyed = destroyed.len(),
            "physics tick"
        );

        StepReport {
            iterations: report.iterations,
            collisions: report.collisions,
            reason: report.reason,
            destroyed,
        }
    }
}
