//! Construction requests carried by `addObject`, `addVehicle`, `addWheel`,
//! `addConstraint` and `appendAnchor`.

use crate::bodies::VehicleTuning;
use crate::core::{BodyId, ConstraintId, VehicleId};
use crate::math::{Quaternion, Vector3};
use crate::protocol::SoftLayout;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Geometry of a body
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize), serde(tag = "type", rename_all = "camelCase"))]
pub enum ShapeDescription {
    /// Infinite plane `normal · p = distance`
    Plane { normal: Vector3, distance: f32 },

    /// Box from full dimensions
    Box { width: f32, height: f32, depth: f32 },

    /// Sphere
    Sphere { radius: f32 },

    /// Y-aligned cylinder
    Cylinder { radius: f32, height: f32 },

    /// Y-aligned capsule; `height` excludes the caps
    Capsule { radius: f32, height: f32 },

    /// Y-aligned cone
    Cone { radius: f32, height: f32 },

    /// Convex hull of a point cloud
    Convex { points: Vec<Vector3> },

    /// Concave triangle mesh
    Concave { vertices: Vec<Vector3>, indices: Vec<[u32; 3]> },

    /// Terrain grid, heights row-major
    Heightfield { columns: usize, rows: usize, size_x: f32, size_z: f32, heights: Vec<f32> },

    /// Several child shapes under one body
    Compound { children: Vec<ChildDescription> },

    /// Soft rope from `start` to `end`
    SoftRopeMesh { start: Vector3, end: Vector3, segments: u32 },

    /// Soft cloth patch spanned by four corners (in winding order)
    SoftClothMesh { corners: [Vector3; 4], segments_x: u32, segments_z: u32 },

    /// Soft volume from a triangle mesh
    SoftTrimesh { vertices: Vec<Vector3>, indices: Vec<[u32; 3]> },

    /// A shape type this build does not know
    #[cfg_attr(feature = "serialize", serde(other))]
    Unrecognized,
}

impl ShapeDescription {
    /// The wire name of the shape type
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Plane { .. } => "plane",
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::Capsule { .. } => "capsule",
            Self::Cone { .. } => "cone",
            Self::Convex { .. } => "convex",
            Self::Concave { .. } => "concave",
            Self::Heightfield { .. } => "heightfield",
            Self::Compound { .. } => "compound",
            Self::SoftRopeMesh { .. } => "softRopeMesh",
            Self::SoftClothMesh { .. } => "softClothMesh",
            Self::SoftTrimesh { .. } => "softTrimesh",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Report layout of a soft shape, `None` for rigid shapes
    pub fn soft_layout(&self) -> Option<SoftLayout> {
        match self {
            Self::SoftRopeMesh { .. } => Some(SoftLayout::Rope),
            Self::SoftClothMesh { .. } => Some(SoftLayout::Cloth),
            Self::SoftTrimesh { .. } => Some(SoftLayout::Trimesh),
            _ => None,
        }
    }

    /// Whether this describes a soft body
    pub fn is_soft(&self) -> bool {
        self.soft_layout().is_some()
    }
}

/// A child of a compound shape
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ChildDescription {
    /// Offset in the parent's frame
    pub position: Vector3,

    /// Rotation in the parent's frame
    pub rotation: Quaternion,

    /// Child geometry
    pub shape: ShapeDescription,
}

impl ChildDescription {
    /// Creates a child at an offset with no rotation
    pub fn new(shape: ShapeDescription, position: Vector3) -> Self {
        Self {
            position,
            rotation: Quaternion::identity(),
            shape,
        }
    }
}

/// Tuning for soft bodies
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize), serde(default))]
pub struct SoftParameters {
    /// Link stiffness in `[0, 1]`
    pub stiffness: f32,

    /// Constraint relaxation passes per step
    pub iterations: u32,

    /// Velocity damping in `[0, 1]`
    pub damping: f32,

    /// Collision margin around each node
    pub margin: f32,
}

impl Default for SoftParameters {
    fn default() -> Self {
        Self {
            stiffness: 0.9,
            iterations: 10,
            damping: 0.01,
            margin: 0.05,
        }
    }
}

/// Everything needed to build one body
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize), serde(default))]
pub struct ObjectDescription {
    /// Shared id, assigned by the main thread
    pub id: BodyId,

    /// Geometry
    #[cfg_attr(feature = "serialize", serde(flatten))]
    pub shape: ShapeDescription,

    /// Initial position
    pub position: Vector3,

    /// Initial rotation
    pub rotation: Quaternion,

    /// Mass; zero makes the body static
    pub mass: f32,

    /// Surface friction
    pub friction: f32,

    /// Restitution (bounciness)
    pub restitution: f32,

    /// Linear damping
    pub linear_damping: f32,

    /// Angular damping
    pub angular_damping: f32,

    /// Collision group bits
    pub collision_group: u32,

    /// Groups this body collides with
    pub collision_mask: u32,

    /// Soft body tuning, ignored for rigid shapes
    pub soft: SoftParameters,
}

impl Default for ObjectDescription {
    fn default() -> Self {
        Self::new(ShapeDescription::Unrecognized)
    }
}

impl ObjectDescription {
    /// Creates a description with default material and no id yet
    pub fn new(shape: ShapeDescription) -> Self {
        Self {
            id: BodyId(0),
            shape,
            position: Vector3::zero(),
            rotation: Quaternion::identity(),
            mass: 0.0,
            friction: 0.5,
            restitution: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            collision_group: 1,
            collision_mask: u32::MAX,
            soft: SoftParameters::default(),
        }
    }

    /// Sets the shared id
    pub fn with_id(mut self, id: BodyId) -> Self {
        self.id = id;
        self
    }

    /// Sets the initial position
    pub fn with_position(mut self, position: Vector3) -> Self {
        self.position = position;
        self
    }

    /// Sets the initial rotation
    pub fn with_rotation(mut self, rotation: Quaternion) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the mass
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Sets friction and restitution
    pub fn with_material(mut self, friction: f32, restitution: f32) -> Self {
        self.friction = friction;
        self.restitution = restitution;
        self
    }

    /// Sets linear and angular damping
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Sets the collision group and mask
    pub fn with_collision_filter(mut self, group: u32, mask: u32) -> Self {
        self.collision_group = group;
        self.collision_mask = mask;
        self
    }

    /// Sets soft body tuning
    pub fn with_soft_parameters(mut self, soft: SoftParameters) -> Self {
        self.soft = soft;
        self
    }
}

/// Request to build a raycast vehicle on a rigid chassis
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct VehicleDescription {
    /// Shared id
    pub id: VehicleId,

    /// The chassis body
    pub chassis: BodyId,

    /// Default tuning
    pub tuning: VehicleTuning,
}

/// Request to append a wheel to a vehicle
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct WheelDescription {
    /// The vehicle receiving the wheel
    pub vehicle: VehicleId,

    /// Suspension hard point in chassis space
    pub connection_point: Vector3,

    /// Suspension direction in chassis space
    pub wheel_direction: Vector3,

    /// Axle direction in chassis space
    pub wheel_axle: Vector3,

    /// Suspension rest length
    pub suspension_rest_length: f32,

    /// Wheel radius
    pub wheel_radius: f32,

    /// Whether the wheel steers
    pub is_front_wheel: bool,

    /// Wheel tuning
    pub tuning: VehicleTuning,
}

impl WheelDescription {
    /// A downward-facing wheel with a -X axle and default tuning
    pub fn new(vehicle: VehicleId, connection_point: Vector3, suspension_rest_length: f32, wheel_radius: f32, is_front_wheel: bool) -> Self {
        Self {
            vehicle,
            connection_point,
            wheel_direction: Vector3::new(0.0, -1.0, 0.0),
            wheel_axle: Vector3::new(-1.0, 0.0, 0.0),
            suspension_rest_length,
            wheel_radius,
            is_front_wheel,
            tuning: VehicleTuning::default(),
        }
    }
}

/// Joint family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum ConstraintKind {
    /// Ball-and-socket
    Point,

    /// Single rotational axis
    Hinge,

    /// Translation along (and rotation about) one axis
    Slider,

    /// Swing cone plus twist
    #[cfg_attr(feature = "serialize", serde(rename = "conetwist"))]
    ConeTwist,

    /// Generic six degrees of freedom
    Dof,
}

impl ConstraintKind {
    /// The wire name of the joint family
    pub fn name(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Hinge => "hinge",
            Self::Slider => "slider",
            Self::ConeTwist => "conetwist",
            Self::Dof => "dof",
        }
    }
}

/// Request to build a joint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ConstraintDescription {
    /// Shared id
    pub id: ConstraintId,

    /// Joint family
    #[cfg_attr(feature = "serialize", serde(rename = "type"))]
    pub kind: ConstraintKind,

    /// First body
    pub object_a: BodyId,

    /// Second body; `None` pins the first body to the world
    pub object_b: Option<BodyId>,

    /// Pivot in A's frame
    pub position_a: Vector3,

    /// Pivot in B's frame
    pub position_b: Vector3,

    /// Joint axis in A's frame (hinge, slider, twist and 6-DOF X axis)
    pub axis: Vector3,
}

impl ConstraintDescription {
    /// Creates a description with pivots at the body origins and an X axis
    pub fn new(kind: ConstraintKind, object_a: BodyId, object_b: Option<BodyId>) -> Self {
        Self {
            id: ConstraintId(0),
            kind,
            object_a,
            object_b,
            position_a: Vector3::zero(),
            position_b: Vector3::zero(),
            axis: Vector3::unit_x(),
        }
    }

    /// Sets both pivots
    pub fn with_pivots(mut self, position_a: Vector3, position_b: Vector3) -> Self {
        self.position_a = position_a;
        self.position_b = position_b;
        self
    }

    /// Sets the joint axis
    pub fn with_axis(mut self, axis: Vector3) -> Self {
        self.axis = axis;
        self
    }
}

/// Pins a soft body node to a rigid body
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct AnchorDescription {
    /// The soft body
    pub soft_body: BodyId,

    /// The rigid body
    pub rigid_body: BodyId,

    /// Index of the soft body node
    pub node: usize,

    /// How strongly the node follows the rigid body, `[0, 1]`
    pub influence: f32,

    /// Whether the anchored node still collides with the rigid body
    pub collision_between_linked_bodies: bool,
}
