mod rigid_body;
mod material;
mod body_type;
mod soft_body;
mod vehicle;

pub use self::rigid_body::{RigidBody, RigidBodyHandle};
pub use self::material::Material;
pub use self::body_type::RigidBodyType;
pub use self::soft_body::{SoftBody, SoftBodyKind, SoftNode, SoftLink, SoftAnchor};
pub use self::vehicle::{RaycastVehicle, VehicleTuning, WheelInfo};

use bitflags::bitflags;

bitflags! {
    /// Flags for controlling the behavior of rigid bodies
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BodyFlags: u32 {
        /// Body can go to sleep when inactive
        const CAN_SLEEP = 0x01;

        /// Body is currently sleeping
        const SLEEPING = 0x02;

        /// Body is affected by gravity
        const AFFECTED_BY_GRAVITY = 0x08;

        /// Body is enabled for continuous collision detection
        const CCD_ENABLED = 0x10;
    }
}
