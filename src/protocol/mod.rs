//! The wire format shared by the main thread and the worker.
//!
//! Commands travel main → worker as [`Command`] values. Reports travel
//! worker → main as flat `f32` buffers whose first element is a
//! [`ReportKind`] tag; their layouts live in [`report`].

mod descriptions;
mod command;
mod message;
pub mod report;

pub use self::descriptions::{
    AnchorDescription, ChildDescription, ConstraintDescription, ConstraintKind, ObjectDescription, ShapeDescription,
    SoftParameters, VehicleDescription, WheelDescription,
};
pub use self::command::{
    BodyRef, Command, ConeTwistLimit, ConeTwistMotorTarget, ConstraintRef, DampingParams, DofAxis, DofLimit,
    DofMotorConfig, FlagParams, HingeLimits, ImpulseLimit, MassParams, MotorParams, PointForce, ScalarParams,
    SimulateParams, SliderLimits, SliderRestitution, ThresholdParams, TransformUpdate, VectorParams, VehicleRef,
    WheelValue,
};
pub use self::message::{ControlMessage, MainMessage, WorkerMessage};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Report buffers grow in multiples of this many items unless configured
pub const REPORT_CHUNK_SIZE: usize = 100;

/// Floats per world report item
pub const WORLD_STRIDE: usize = 14;

/// Header of the world report: `[tag, count]`
pub const WORLD_HEADER: usize = 2;

/// Floats per collision report item
pub const COLLISION_STRIDE: usize = 5;

/// Header of the collision report: `[tag, count]`
pub const COLLISION_HEADER: usize = 2;

/// Floats per vehicle report item (one per wheel)
pub const VEHICLE_STRIDE: usize = 9;

/// Header of the vehicle report: `[tag]`
pub const VEHICLE_HEADER: usize = 1;

/// Floats per constraint report item
pub const CONSTRAINT_STRIDE: usize = 6;

/// Header of the constraint report: `[tag]`
pub const CONSTRAINT_HEADER: usize = 1;

/// Header of the soft body report: `[tag]`
pub const SOFT_HEADER: usize = 1;

/// Per-body header inside the soft body report: `[id, element count]`
pub const SOFT_ITEM_HEADER: usize = 2;

/// The tag stored in the first float of every report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReportKind {
    /// Rigid body transforms and velocities
    World = 0,

    /// Touching pairs
    Collision = 1,

    /// Wheel transforms
    Vehicle = 2,

    /// Joint anchors and impulses
    Constraint = 3,

    /// Soft body node data
    Soft = 4,
}

impl ReportKind {
    /// Every report kind, in tag order
    pub const ALL: [ReportKind; 5] = [Self::World, Self::Collision, Self::Vehicle, Self::Constraint, Self::Soft];

    /// The tag as written into the buffer
    #[inline]
    pub fn tag(self) -> f32 {
        self as u8 as f32
    }

    /// Reads a tag back
    pub fn from_tag(tag: f32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Number of header floats before the first record
    pub fn header_len(self) -> usize {
        match self {
            Self::World => WORLD_HEADER,
            Self::Collision => COLLISION_HEADER,
            Self::Vehicle => VEHICLE_HEADER,
            Self::Constraint => CONSTRAINT_HEADER,
            Self::Soft => SOFT_HEADER,
        }
    }

    /// Floats per record; `None` for the variable-length soft report
    pub fn stride(self) -> Option<usize> {
        match self {
            Self::World => Some(WORLD_STRIDE),
            Self::Collision => Some(COLLISION_STRIDE),
            Self::Vehicle => Some(VEHICLE_STRIDE),
            Self::Constraint => Some(CONSTRAINT_STRIDE),
            Self::Soft => None,
        }
    }

    /// Whether the header carries an item count
    pub fn has_count(self) -> bool {
        matches!(self, Self::World | Self::Collision)
    }
}

/// How a soft body's payload is laid out in the soft report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum SoftLayout {
    /// One position per node
    Rope,

    /// Position and normal per node
    Cloth,

    /// Three vertices per face, each with position and normal
    Trimesh,
}

impl SoftLayout {
    /// Floats written per node (rope, cloth) or face (trimesh)
    pub fn floats_per_element(self) -> usize {
        match self {
            Self::Rope => 3,
            Self::Cloth => 6,
            Self::Trimesh => 18,
        }
    }

    /// Floats taken by one body's record, header included
    pub fn record_len(self, elements: usize) -> usize {
        SOFT_ITEM_HEADER + elements * self.floats_per_element()
    }
}
