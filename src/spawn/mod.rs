//! Entity kinds and the fixed-layout spawn record exchanged with spawners
//! and the network.

pub mod factory;

use glam::{Quat, Vec3};
use thiserror::Error;

use crate::identity::{EntityId, IdentityError};

/// Closed set of concrete entity kinds a spawn record can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EntityKind {
    Fighter = 1,
    Missile = 2,
    Bullet = 3,
    Asteroid = 4,
    Checkpoint = 5,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Fighter,
        EntityKind::Missile,
        EntityKind::Bullet,
        EntityKind::Asteroid,
        EntityKind::Checkpoint,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for EntityKind {
    type Error = SpawnError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(EntityKind::Fighter),
            2 => Ok(EntityKind::Missile),
            3 => Ok(EntityKind::Bullet),
            4 => Ok(EntityKind::Asteroid),
            5 => Ok(EntityKind::Checkpoint),
            other => Err(SpawnError::InvalidSpawnType(other)),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("invalid spawn type {0}")]
    InvalidSpawnType(u32),
    #[error("spawn record truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("spawn record uses the reserved id 0")]
    NoEntityId,
    #[error("spawn record {0} has a non-finite or zero-length transform")]
    Degenerate(EntityId),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("simulation is no longer accepting commands")]
    Closed,
}

/// Wire layout of a spawn record, native byte order.
///
/// Field order is fixed: kind, id, position, rotation (x, y, z, w), velocity.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RawSpawnRecord {
    pub kind: u32,
    pub _padding: u32,
    pub id: u64,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub velocity: [f32; 3],
}

/// Size in bytes of one encoded record.
pub const RECORD_SIZE: usize = std::mem::size_of::<RawSpawnRecord>();

/// Request to create one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRecord {
    pub kind: EntityKind,
    pub id: EntityId,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

impl SpawnRecord {
    pub fn new(
        kind: EntityKind,
        id: EntityId,
        position: Vec3,
        rotation: Quat,
        velocity: Vec3,
    ) -> Self {
        Self {
            kind,
            id,
            position,
            rotation,
            velocity,
        }
    }

    pub fn to_raw(&self) -> RawSpawnRecord {
        RawSpawnRecord {
            kind: self.kind.tag(),
            _padding: 0,
            id: self.id.raw(),
            position: self.position.to_array(),
            rotation: self.rotation.to_array(),
            velocity: self.velocity.to_array(),
        }
    }

    pub fn from_raw(raw: &RawSpawnRecord) -> Result<Self, SpawnError> {
        let record = Self {
            kind: EntityKind::try_from(raw.kind)?,
            id: EntityId::from_raw(raw.id),
            position: Vec3::from_array(raw.position),
            rotation: Quat::from_array(raw.rotation),
            velocity: Vec3::from_array(raw.velocity),
        };
        record.validate()?;
        Ok(record)
    }

    /// Reject records that cannot become an entity: the sentinel id, or a
    /// transform that would put NaN into the world.
    pub fn validate(&self) -> Result<(), SpawnError> {
        if self.id.is_none() {
            return Err(SpawnError::NoEntityId);
        }
        self.validate_motion()
    }

    pub(crate) fn validate_motion(&self) -> Result<(), SpawnError> {
        let rotation_len = self.rotation.length_squared();
        if self.position.is_finite()
            && self.velocity.is_finite()
            && self.rotation.is_finite()
            && rotation_len > f32::EPSILON
        {
            Ok(())
        } else {
            Err(SpawnError::Degenerate(self.id))
        }
    }

    /// Append the encoded record to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(bytemuck::bytes_of(&self.to_raw()));
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_SIZE);
        self.encode_into(&mut out);
        out
    }

    /// Decode the record at the start of `bytes`. Trailing bytes are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, SpawnError> {
        let truncated = SpawnError::Truncated {
            expected: RECORD_SIZE,
            found: bytes.len(),
        };
        let head = bytes.get(..RECORD_SIZE).ok_or(truncated)?;
        let raw: RawSpawnRecord = bytemuck::try_pod_read_unaligned(head).map_err(|_| {
            SpawnError::Truncated {
                expected: RECORD_SIZE,
                found: head.len(),
            }
        })?;
        Self::from_raw(&raw)
    }

    /// Decode a back-to-back batch of records.
    pub fn decode_all(bytes: &[u8]) -> Result<Vec<Self>, SpawnError> {
        let chunks = bytes.chunks_exact(RECORD_SIZE);
        let rest = chunks.remainder().len();
        if rest != 0 {
            return Err(SpawnError::Truncated {
                expected: RECORD_SIZE,
                found: rest,
            });
        }
        chunks.map(Self::decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SpawnRecord {
        SpawnRecord::new(
            EntityKind::Missile,
            EntityId::from_raw(42),
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.5),
            Vec3::new(0.0, 0.0, -80.0),
        )
    }

    #[test]
    fn test_record_layout() {
        assert_eq!(RECORD_SIZE, 56);
        let bytes = record().encode();
        assert_eq!(bytes.len(), RECORD_SIZE);
        assert_eq!(bytes[..4], 2u32.to_ne_bytes());
        assert_eq!(bytes[8..16], 42u64.to_ne_bytes());
        assert_eq!(bytes[16..20], 1.0f32.to_ne_bytes());
    }

    #[test]
    fn test_decode_restores_record() {
        let original = record();
        assert_eq!(SpawnRecord::decode(&original.encode()), Ok(original));
    }

    #[test]
    fn test_decode_unaligned_input() {
        let mut buffer = vec![0u8];
        record().encode_into(&mut buffer);
        assert_eq!(SpawnRecord::decode(&buffer[1..]), Ok(record()));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut raw = record().to_raw();
        raw.kind = 9;
        let bytes = bytemuck::bytes_of(&raw);
        assert_eq!(SpawnRecord::decode(bytes), Err(SpawnError::InvalidSpawnType(9)));
        assert_eq!(EntityKind::try_from(0), Err(SpawnError::InvalidSpawnType(0)));
    }

    #[test]
    fn test_short_input_is_truncated() {
        let bytes = record().encode();
        assert_eq!(
            SpawnRecord::decode(&bytes[..20]),
            Err(SpawnError::Truncated {
                expected: RECORD_SIZE,
                found: 20
            })
        );
    }

    #[test]
    fn test_decode_batch() {
        let mut bytes = Vec::new();
        for kind in EntityKind::ALL {
            SpawnRecord { kind, ..record() }.encode_into(&mut bytes);
        }
        let records = SpawnRecord::decode_all(&bytes).unwrap();
        let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, EntityKind::ALL);

        bytes.pop();
        assert!(matches!(
            SpawnRecord::decode_all(&bytes),
            Err(SpawnError::Truncated { found: 55, .. })
        ));
    }

    #[test]
    fn test_sentinel_id_is_rejected() {
        let mut raw = record().to_raw();
        raw.id = 0;
        assert_eq!(
            SpawnRecord::decode(bytemuck::bytes_of(&raw)),
            Err(SpawnError::NoEntityId)
        );
    }

    #[test]
    fn test_degenerate_motion_is_rejected() {
        let id = EntityId::from_raw(42);
        let zero = SpawnRecord {
            rotation: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
            ..record()
        };
        assert_eq!(zero.validate(), Err(SpawnError::Degenerate(id)));
        assert_eq!(
            SpawnRecord::decode(&zero.encode()),
            Err(SpawnError::Degenerate(id))
        );

        let nan = SpawnRecord {
            position: Vec3::new(f32::NAN, 0.0, 0.0),
            ..record()
        };
        assert_eq!(nan.validate(), Err(SpawnError::Degenerate(id)));
        let inf = SpawnRecord {
            velocity: Vec3::splat(f32::INFINITY),
            ..record()
        };
        assert_eq!(inf.validate(), Err(SpawnError::Degenerate(id)));
        assert_eq!(record().validate(), Ok(()));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(SpawnError::InvalidSpawnType(7).to_string(), "invalid spawn type 7");
    }
}
