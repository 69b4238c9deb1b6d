//! Component bundles per entity kind.

use glam::{Quat, Vec3};
use tracing::warn;

use crate::ecs::components::physics::{Keyframes, Lifetime, Movable, Touchable};
use crate::ecs::components::transform::Transform;
use crate::physics::collider::Collider;
use crate::physics::response::{CheckpointGate, DestroyOnContact, Hull, Inert};
use crate::state::EntityState;

use super::{EntityKind, SpawnRecord};

pub const FIGHTER_HALF_EXTENTS: Vec3 = Vec3::new(2.0, 1.0, 4.0);
pub const ASTEROID_RADIUS: f32 = 6.0;
pub const CHECKPOINT_RADIUS: f32 = 10.0;
pub const MISSILE_LIFETIME_TICKS: u32 = 100;
pub const BULLET_LIFETIME_TICKS: u32 = 40;

/// Create the entity `record` describes. `dt` is the tick length, used to
/// seed the keyframes of an entity that has not been through a tick yet.
///
/// Records are expected to have passed [`SpawnRecord::validate`]; a
/// degenerate rotation that slips through is replaced by the identity.
pub fn spawn_entity(world: &mut hecs::World, record: &SpawnRecord, dt: f32) -> hecs::Entity {
    let usable = record.rotation.is_finite() && record.rotation.length_squared() > f32::EPSILON;
    let rotation = if usable {
        record.rotation.normalize()
    } else {
        warn!(
            id = %record.id,
            rotation = ?record.rotation,
            "degenerate spawn rotation, using identity"
        );
        Quat::IDENTITY
    };
    let transform = Transform::from_position_rotation(record.position, rotation);
    let keyframes = Keyframes(EntityState::extrapolated(
        record.position,
        rotation,
        record.velocity,
        dt,
    ));
    let movable = Movable::new(record.velocity);

    match record.kind {
        EntityKind::Fighter => world.spawn((
            record.id,
            record.kind,
            transform,
            movable,
            Touchable::new(Collider::cuboid(FIGHTER_HALF_EXTENTS)).with_response(Hull {
                health: 100.0,
                damage_per_hit: 25.0,
                restitution: 0.5,
            }),
            keyframes,
        )),
        EntityKind::Missile | EntityKind::Bullet => {
            let remaining_ticks = if record.kind == EntityKind::Missile {
                MISSILE_LIFETIME_TICKS
            } else {
                BULLET_LIFETIME_TICKS
            };
            world.spawn((
                record.id,
                record.kind,
                transform,
                movable,
                Touchable::new(Collider::Point).with_response(DestroyOnContact),
                Lifetime { remaining_ticks },
                keyframes,
            ))
        }
        EntityKind::Asteroid => world.spawn((
            record.id,
            record.kind,
            transform,
            movable,
            Touchable::new(Collider::tetrahedron(ASTEROID_RADIUS)).with_response(Inert),
            keyframes,
        )),
        EntityKind::Checkpoint => world.spawn((
            record.id,
            record.kind,
            transform,
            Touchable::new(Collider::ring(CHECKPOINT_RADIUS))
                .with_response(CheckpointGate::new())
                .sensor(),
            Keyframes(EntityState::fixed(record.position, rotation)),
        )),
    }
}
