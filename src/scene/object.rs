use std::mem;

use bitflags::bitflags;

use crate::core::{BodyId, BodyKind, ConstraintId, VehicleId};
use crate::math::{Quaternion, Transform, Vector3};
use crate::protocol::{ConstraintKind, ObjectDescription, SoftLayout};

bitflags! {
    /// Local edits not yet pushed to the worker
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// Position was set locally
        const POSITION = 0x01;

        /// Rotation was set locally
        const ROTATION = 0x02;
    }
}

/// Main-thread shadow of a body
#[derive(Debug, Clone)]
pub struct SceneObject {
    id: BodyId,
    kind: BodyKind,
    soft_layout: Option<SoftLayout>,
    mass: f32,
    position: Vector3,
    rotation: Quaternion,
    linear_velocity: Vector3,
    angular_velocity: Vector3,
    dirty: DirtyFlags,
    touches: Vec<BodyId>,

    /// Soft bodies zero their own transform once, on their first report
    soft_initialized: bool,
    soft_elements: usize,
    soft_data: Vec<f32>,
}

impl SceneObject {
    /// Creates the shadow of a body about to be added
    pub fn new(description: &ObjectDescription) -> Self {
        let soft_layout = description.shape.soft_layout();
        Self {
            id: description.id,
            kind: if soft_layout.is_some() { BodyKind::Soft } else { BodyKind::Rigid },
            soft_layout,
            mass: description.mass,
            position: description.position,
            rotation: description.rotation,
            linear_velocity: Vector3::zero(),
            angular_velocity: Vector3::zero(),
            dirty: DirtyFlags::empty(),
            touches: Vec::new(),
            soft_initialized: false,
            soft_elements: 0,
            soft_data: Vec::new(),
        }
    }

    pub fn get_id(&self) -> BodyId {
        self.id
    }

    pub fn get_kind(&self) -> BodyKind {
        self.kind
    }

    pub fn is_soft(&self) -> bool {
        self.kind == BodyKind::Soft
    }

    pub fn get_soft_layout(&self) -> Option<SoftLayout> {
        self.soft_layout
    }

    /// Mass as last sent to the worker
    pub fn get_mass(&self) -> f32 {
        self.mass
    }

    pub(crate) fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
    }

    pub fn get_position(&self) -> Vector3 {
        self.position
    }

    /// Moves the body; the worker picks the change up on the next simulate
    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
        self.dirty |= DirtyFlags::POSITION;
    }

    pub fn get_rotation(&self) -> Quaternion {
        self.rotation
    }

    /// Rotates the body; the worker picks the change up on the next simulate
    pub fn set_rotation(&mut self, rotation: Quaternion) {
        self.rotation = rotation;
        self.dirty |= DirtyFlags::ROTATION;
    }

    pub fn get_transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }

    pub fn get_linear_velocity(&self) -> Vector3 {
        self.linear_velocity
    }

    pub fn get_angular_velocity(&self) -> Vector3 {
        self.angular_velocity
    }

    pub(crate) fn set_velocities(&mut self, linear: Vector3, angular: Vector3) {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
    }

    pub(crate) fn set_linear_velocity(&mut self, linear: Vector3) {
        self.linear_velocity = linear;
    }

    pub(crate) fn set_angular_velocity(&mut self, angular: Vector3) {
        self.angular_velocity = angular;
    }

    pub fn get_dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn is_position_dirty(&self) -> bool {
        self.dirty.contains(DirtyFlags::POSITION)
    }

    pub fn is_rotation_dirty(&self) -> bool {
        self.dirty.contains(DirtyFlags::ROTATION)
    }

    /// Raises dirty flags without changing the values
    pub fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }

    /// Clears and returns the dirty flags
    pub(crate) fn take_dirty(&mut self) -> DirtyFlags {
        mem::take(&mut self.dirty)
    }

    /// Applies simulated values, keeping whatever the user has edited
    pub(crate) fn apply_simulated(&mut self, position: Vector3, rotation: Quaternion) {
        if !self.is_position_dirty() {
            self.position = position;
        }
        if !self.is_rotation_dirty() {
            self.rotation = rotation;
        }
    }

    /// Bodies this one is touching, in the order contact began
    pub fn get_touches(&self) -> &[BodyId] {
        &self.touches
    }

    pub fn is_touching(&self, other: BodyId) -> bool {
        self.touches.contains(&other)
    }

    pub(crate) fn touches_mut(&mut self) -> &mut Vec<BodyId> {
        &mut self.touches
    }

    /// Whether a soft report has been applied yet
    pub fn is_soft_initialized(&self) -> bool {
        self.soft_initialized
    }

    /// Node (rope, cloth) or face (trimesh) count of the last soft report
    pub fn get_soft_element_count(&self) -> usize {
        self.soft_elements
    }

    /// Payload of the last soft report, in world space
    pub fn get_soft_data(&self) -> &[f32] {
        &self.soft_data
    }

    pub(crate) fn apply_soft(&mut self, elements: usize, data: &[f32]) {
        if !self.soft_initialized {
            self.position = Vector3::zero();
            self.rotation = Quaternion::identity();
            self.soft_initialized = true;
        }
        self.soft_elements = elements;
        self.soft_data.clear();
        self.soft_data.extend_from_slice(data);
    }
}

/// Main-thread shadow of a vehicle
#[derive(Debug, Clone)]
pub struct SceneVehicle {
    id: VehicleId,
    chassis: BodyId,
    wheels: Vec<Transform>,
}

impl SceneVehicle {
    pub fn new(id: VehicleId, chassis: BodyId) -> Self {
        Self {
            id,
            chassis,
            wheels: Vec::new(),
        }
    }

    pub fn get_id(&self) -> VehicleId {
        self.id
    }

    pub fn get_chassis(&self) -> BodyId {
        self.chassis
    }

    pub fn get_num_wheels(&self) -> usize {
        self.wheels.len()
    }

    /// World transform of a wheel as of the last vehicle report
    pub fn get_wheel_transform(&self, wheel: usize) -> Option<Transform> {
        self.wheels.get(wheel).copied()
    }

    pub(crate) fn push_wheel(&mut self) -> usize {
        self.wheels.push(Transform::identity());
        self.wheels.len() - 1
    }

    pub(crate) fn set_wheel_transform(&mut self, wheel: usize, transform: Transform) {
        if wheel >= self.wheels.len() {
            self.wheels.resize(wheel + 1, Transform::identity());
        }
        self.wheels[wheel] = transform;
    }
}

/// Main-thread shadow of a joint
#[derive(Debug, Clone)]
pub struct SceneConstraint {
    id: ConstraintId,
    kind: ConstraintKind,
    object_a: BodyId,
    object_b: Option<BodyId>,
    anchor: Vector3,
    applied_impulse: f32,
}

impl SceneConstraint {
    pub fn new(id: ConstraintId, kind: ConstraintKind, object_a: BodyId, object_b: Option<BodyId>) -> Self {
        Self {
            id,
            kind,
            object_a,
            object_b,
            anchor: Vector3::zero(),
            applied_impulse: 0.0,
        }
    }

    pub fn get_id(&self) -> ConstraintId {
        self.id
    }

    pub fn get_kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn get_object_a(&self) -> BodyId {
        self.object_a
    }

    pub fn get_object_b(&self) -> Option<BodyId> {
        self.object_b
    }

    pub fn involves(&self, body: BodyId) -> bool {
        self.object_a == body || self.object_b == Some(body)
    }

    /// The pivot on body A in world space
    pub fn get_world_anchor(&self) -> Vector3 {
        self.anchor
    }

    /// Impulse the joint applied in the last step
    pub fn get_applied_impulse(&self) -> f32 {
        self.applied_impulse
    }

    pub(crate) fn update(&mut self, anchor: Vector3, applied_impulse: f32) {
        self.anchor = anchor;
        self.applied_impulse = applied_impulse;
    }
}
