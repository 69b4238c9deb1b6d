//! The owning simulation loop.
//!
//! [`Simulation`] owns the entity world and is the only thing that mutates
//! it. Other subsystems propose changes through a cloneable [`Spawner`];
//! proposals are applied at the next tick boundary. Everyone else reads the
//! world through the [`WorldView`] published at each commit.

pub mod runner;

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Quat, Vec3};
use tracing::warn;

use crate::ecs::components::physics::{Keyframes, Lifetime, Movable};
use crate::ecs::components::transform::Transform;
use crate::identity::{EntityId, IdentityAllocator};
use crate::physics::{FixedTimestep, PhysicsConfig, PhysicsWorld, StepReport};
use crate::spawn::factory::spawn_entity;
use crate::spawn::{EntityKind, SpawnError, SpawnRecord};
use crate::state::{EntityState, Keyframe, Snapshot, SnapshotCell, SnapshotEntry, WorldView};

pub use runner::{spawn_tick_thread, LoopControl};

/// Simulation configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub physics: PhysicsConfig,
    /// Whether the tick thread sleeps to hold the tick rate. Default: true.
    pub realtime: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            realtime: true,
        }
    }
}

/// A structural change proposed to the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Spawn(SpawnRecord),
    Despawn(EntityId),
}

/// Producer handle for spawn and despawn requests. Cheap to clone and safe
/// to use from any thread.
#[derive(Debug, Clone)]
pub struct Spawner {
    identity: Arc<IdentityAllocator>,
    commands: Sender<Command>,
}

impl Spawner {
    /// Allocate an id and queue a new entity.
    pub fn spawn(
        &self,
        kind: EntityKind,
        position: Vec3,
        rotation: Quat,
        velocity: Vec3,
    ) -> Result<EntityId, SpawnError> {
        let mut record = SpawnRecord::new(kind, EntityId::NONE, position, rotation, velocity);
        record.validate_motion()?;
        record.id = self.identity.allocate()?;
        self.send(Command::Spawn(record))?;
        Ok(record.id)
    }

    /// Queue a record whose id was assigned elsewhere (e.g. by a peer).
    pub fn submit(&self, record: SpawnRecord) -> Result<(), SpawnError> {
        record.validate()?;
        self.identity.reserve(record.id)?;
        self.send(Command::Spawn(record))
    }

    /// Decode and queue a batch of encoded records. Nothing is queued if
    /// any record in the batch is malformed.
    pub fn submit_encoded(&self, bytes: &[u8]) -> Result<usize, SpawnError> {
        let records = SpawnRecord::decode_all(bytes).inspect_err(|err| {
            warn!(%err, len = bytes.len(), "rejected spawn batch");
        })?;
        for record in &records {
            self.submit(*record)?;
        }
        Ok(records.len())
    }

    pub fn despawn(&self, id: EntityId) -> Result<(), SpawnError> {
        self.send(Command::Despawn(id))
    }

    fn send(&self, command: Command) -> Result<(), SpawnError> {
        self.commands.send(command).map_err(|_| SpawnError::Closed)
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub spawned: usize,
    pub despawned: usize,
    /// Removed because their lifetime ran out.
    pub expired: usize,
    pub physics: StepReport,
}

/// The authoritative world and its fixed-tick loop.
pub struct Simulation {
    config: SimulationConfig,
    world: hecs::World,
    physics: PhysicsWorld,
    index: HashMap<EntityId, hecs::Entity>,
    /// Ids of entities that existed and are gone; never spawned again.
    retired: HashSet<EntityId>,
    identity: Arc<IdentityAllocator>,
    sender: Sender<Command>,
    commands: Receiver<Command>,
    snapshots: Arc<SnapshotCell>,
    tick: u64,
    timestep: FixedTimestep,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_identity(config, Arc::new(IdentityAllocator::new()))
    }

    /// Share an allocator with other simulation contexts.
    pub fn with_identity(config: SimulationConfig, identity: Arc<IdentityAllocator>) -> Self {
        let (sender, commands) = mpsc::channel();
        let tick_duration = Duration::from_secs_f64(config.physics.fixed_timestep());
        Self {
            physics: PhysicsWorld::new(config.physics.clone()),
            config,
            world: hecs::World::new(),
            index: HashMap::new(),
            retired: HashSet::new(),
            identity,
            sender,
            commands,
            snapshots: Arc::new(SnapshotCell::new(Snapshot::empty(tick_duration))),
            tick: 0,
            timestep: FixedTimestep::default(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn spawner(&self) -> Spawner {
        Spawner {
            identity: Arc::clone(&self.identity),
            commands: self.sender.clone(),
        }
    }

    pub fn identity(&self) -> &Arc<IdentityAllocator> {
        &self.identity
    }

    /// Publication point for committed snapshots; hand this to readers.
    pub fn snapshots(&self) -> Arc<SnapshotCell> {
        Arc::clone(&self.snapshots)
    }

    /// The world as of the last committed tick.
    pub fn view(&self) -> WorldView {
        self.snapshots.view()
    }

    pub fn world(&self) -> &hecs::World {
        &self.world
    }

    pub fn entity(&self, id: EntityId) -> Option<hecs::Entity> {
        self.index.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.config.physics.fixed_timestep())
    }

    /// Advance by `delta_time` seconds of wall time, running as many whole
    /// ticks as fit (at most `max_substeps`).
    pub fn step(&mut self, delta_time: f64) -> Vec<TickReport> {
        let physics = &self.config.physics;
        let ticks = self.timestep.advance(
            delta_time,
            physics.fixed_timestep(),
            physics.max_substeps,
        );
        (0..ticks).map(|_| self.tick()).collect()
    }

    /// Run exactly one tick: apply queued commands, run physics, retire
    /// overdue entities, then commit and publish.
    pub fn tick(&mut self) -> TickReport {
        let dt = self.config.physics.fixed_timestep() as f32;

        // 1. Structural changes proposed since the last tick
        let mut spawned = HashSet::new();
        let mut despawned = 0;
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Spawn(record) => {
                    if self.index.contains_key(&record.id) {
                        warn!(id = %record.id, "duplicate spawn ignored");
                        continue;
                    }
                    if self.retired.contains(&record.id) {
                        warn!(id = %record.id, "spawn reuses a retired id, ignored");
                        continue;
                    }
                    let entity = spawn_entity(&mut self.world, &record, dt);
                    self.index.insert(record.id, entity);
                    spawned.insert(entity);
                }
                Command::Despawn(id) => {
                    if self.remove(id) {
                        despawned += 1;
                    }
                }
            }
        }

        // 2. Physics
        let physics = self.physics.fixed_step(&mut self.world, dt);
        for id in &physics.destroyed {
            self.index.remove(id);
            self.retired.insert(*id);
        }

        // 3. Overdue entities
        let overdue: Vec<EntityId> = self
            .world
            .query_mut::<(&EntityId, &mut Lifetime)>()
            .into_iter()
            .filter_map(|(_, (id, lifetime))| {
                lifetime.remaining_ticks = lifetime.remaining_ticks.saturating_sub(1);
                (lifetime.remaining_ticks == 0).then_some(*id)
            })
            .collect();
        let expired = overdue.iter().filter(|id| self.remove(**id)).count();

        // 4. Commit
        self.tick += 1;
        self.commit(&spawned);

        TickReport {
            tick: self.tick,
            spawned: spawned.len(),
            despawned,
            expired,
            physics,
        }
    }

    fn remove(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.index.remove(&id) else {
            return false;
        };
        self.retired.insert(id);
        self.world.despawn(entity).is_ok()
    }

    fn commit(&mut self, spawned: &HashSet<hecs::Entity>) {
        let mut entries = Vec::with_capacity(self.index.len());
        for (entity, (id, kind, transform, movable, keyframes)) in self.world.query_mut::<(
            &EntityId,
            &EntityKind,
            &Transform,
            Option<&Movable>,
            &mut Keyframes,
        )>() {
            let next = Keyframe::new(
                transform.position,
                transform.rotation,
                movable.map_or(Vec3::ZERO, |m| m.velocity),
            );
            keyframes.0 = if spawned.contains(&entity) {
                // First tick: start from where it was spawned.
                EntityState::new(*keyframes.0.first(), next)
            } else {
                keyframes.0.advance(next)
            };
            entries.push(SnapshotEntry {
                id: *id,
                kind: *kind,
                state: keyframes.0,
            });
        }

        self.snapshots.publish(Snapshot::new(
            self.tick,
            self.tick_duration(),
            Instant::now(),
            entries,
        ));
    }
}
