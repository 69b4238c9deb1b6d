//! Sortie simulation core
//!
//! Collision detection and entity-state interpolation for a networked
//! flight-combat simulation, on a hecs ECS world.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **identity** - Process-wide entity ids
//! 2. **ecs** - Components (transform, motion, collider, keyframes)
//! 3. **physics** - Swept polygons, sweep-and-prune, ordered collision loop
//! 4. **state** - Dual-keyframe entity state, snapshots, render clock
//! 5. **spawn** - Entity kinds, spawn record wire format, factory
//! 6. **engine** - Tick loop, command queue, tick thread

pub mod ecs;
pub mod engine;
pub mod identity;
pub mod physics;
pub mod spawn;
pub mod state;

// Re-export commonly used types
pub use ecs::prelude::*;

pub use engine::{
    spawn_tick_thread, Command, LoopControl, Simulation, SimulationConfig, Spawner, TickReport,
};

pub use identity::{EntityId, IdentityAllocator, IdentityError};

pub use physics::collider::{Collider, PhysicsAabb};
pub use physics::contact::Collision;
pub use physics::response::{
    Bounce, CheckpointGate, CollisionResponse, Contact, DestroyOnContact, Hull, Inert,
};
pub use physics::solver::{DoneReason, IterationReport};
pub use physics::{FixedTimestep, PhysicsConfig, PhysicsWorld, StepReport};

pub use spawn::{EntityKind, SpawnError, SpawnRecord};

pub use state::{
    EntityState, Keyframe, RenderClock, Snapshot, SnapshotCell, SnapshotEntry, WorldView,
};

// Re-export glam for convenience
pub use glam;
pub use hecs;
