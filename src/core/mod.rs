pub mod world;
pub mod config;
pub mod storage;
pub mod events;
pub mod ids;
pub mod detect_collisions;

pub use self::world::DynamicsWorld;
pub use self::config::{WorldConfig, TransportConfig, SceneConfig, IntegratorKind};
pub use self::storage::{Handle, HandleStorage, Slots};
pub use self::events::{EventQueue, SceneEvent, CollisionEvent};
pub use self::ids::{IdAllocator, MAX_WIRE_ID};

use crate::math::Vector3;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

macro_rules! shared_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serialize", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(pub u32);

        impl $name {
            /// Encodes the id as a report float
            #[inline]
            pub fn to_f32(self) -> f32 {
                self.0 as f32
            }

            /// Decodes a report float; zero, negative and fractional values are not ids
            #[inline]
            pub fn from_f32(value: f32) -> Option<Self> {
                if value >= 1.0 && value.fract() == 0.0 && value <= u32::MAX as f32 {
                    Some(Self(value as u32))
                } else {
                    None
                }
            }

            /// Index of this id in slot storage
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

shared_id! {
    /// Identifier of a body, shared by the main thread and the worker
    BodyId
}

shared_id! {
    /// Identifier of a raycast vehicle, shared by the main thread and the worker
    VehicleId
}

shared_id! {
    /// Identifier of a constraint, shared by the main thread and the worker
    ConstraintId
}

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl Handle for $name {
            fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

native_handle! {
    /// A handle to a rigid body inside the dynamics world
    BodyHandle
}

native_handle! {
    /// A handle to a soft body inside the dynamics world
    SoftBodyHandle
}

native_handle! {
    /// A handle to a raycast vehicle inside the dynamics world
    VehicleHandle
}

native_handle! {
    /// A handle to a joint inside the dynamics world
    JointHandle
}

/// A contact point between two bodies
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint {
    /// The position of the contact point in world space
    pub position: Vector3,

    /// The normal of the contact surface, pointing from body A to body B
    pub normal: Vector3,

    /// The penetration depth of the contact
    pub penetration: f32,
}

/// Which kind of body a record refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum BodyKind {
    /// A rigid body
    Rigid,

    /// A soft body (rope, cloth or triangle mesh)
    Soft,
}
