use crate::bodies::{BodyFlags, Material, RigidBodyType};
use crate::core::BodyHandle;
use crate::math::{self, Vector3, Transform, Matrix3, Quaternion, Aabb};
use crate::shapes::Shape;

use std::sync::Arc;

/// Type alias for a handle to a rigid body
pub type RigidBodyHandle = BodyHandle;

/// A rigid body for physics simulation
#[derive(Debug)]
pub struct RigidBody {
    /// The body's transform in world space
    transform: Transform,

    /// Transform as of the end of the last step, read by reports
    motion_state: Transform,

    /// The body's linear velocity
    linear_velocity: Vector3,

    /// The body's angular velocity
    angular_velocity: Vector3,

    /// The body's material properties
    material: Material,

    /// The body's collision shape
    shape: Arc<dyn Shape>,

    /// The body's type (dynamic or static)
    body_type: RigidBodyType,

    /// The body's mass
    mass: f32,

    /// Inverse of the body's mass (for efficiency)
    inv_mass: f32,

    /// Principal moments of inertia in local space
    local_inertia: Vector3,

    /// Inverse of the body's inertia tensor in world space
    inv_inertia_tensor_world: Matrix3,

    /// The body's linear damping
    linear_damping: f32,

    /// The body's angular damping
    angular_damping: f32,

    /// Per-axis scale on linear motion
    linear_factor: Vector3,

    /// Per-axis scale on angular motion
    angular_factor: Vector3,

    /// Motion per step above which continuous collision is considered
    ccd_motion_threshold: f32,

    /// Radius of the sphere swept for continuous collision
    ccd_swept_sphere_radius: f32,

    /// Collision group bits
    collision_group: u32,

    /// Groups this body collides with
    collision_mask: u32,

    /// The body's flags
    flags: BodyFlags,

    /// How long the body has been "inactive" (for sleeping)
    sleeping_time: f32,

    /// Force accumulated until the end of the current step
    total_force: Vector3,

    /// Torque accumulated until the end of the current step
    total_torque: Vector3,
}

impl RigidBody {
    /// Creates a new rigid body; a mass of zero makes it static
    pub fn new(shape: Arc<dyn Shape>, transform: Transform, mass: f32) -> Self {
        let mut body = Self {
            transform,
            motion_state: transform,
            linear_velocity: Vector3::zero(),
            angular_velocity: Vector3::zero(),
            material: Material::default(),
            shape,
            body_type: RigidBodyType::from_mass(mass),
            mass: 0.0,
            inv_mass: 0.0,
            local_inertia: Vector3::zero(),
            inv_inertia_tensor_world: Matrix3::zeros(),
            linear_damping: 0.0,
            angular_damping: 0.0,
            linear_factor: Vector3::one(),
            angular_factor: Vector3::one(),
            ccd_motion_threshold: 0.0,
            ccd_swept_sphere_radius: 0.0,
            collision_group: 1,
            collision_mask: u32::MAX,
            flags: BodyFlags::CAN_SLEEP | BodyFlags::AFFECTED_BY_GRAVITY,
            sleeping_time: 0.0,
            total_force: Vector3::zero(),
            total_torque: Vector3::zero(),
        };
        body.set_mass(mass);
        body
    }

    /// Creates a new dynamic rigid body with the given shape and position
    pub fn new_dynamic(shape: Arc<dyn Shape>, position: Vector3, mass: f32) -> Self {
        Self::new(shape, Transform::from_position(position), mass.max(math::EPSILON))
    }

    /// Creates a new static rigid body with the given shape and position
    pub fn new_static(shape: Arc<dyn Shape>, position: Vector3) -> Self {
        Self::new(shape, Transform::from_position(position), 0.0)
    }

    /// Returns the body's transform
    pub fn get_transform(&self) -> Transform {
        self.transform
    }

    /// Sets the body's transform and its motion state
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.motion_state = transform;
        self.update_inertia_tensor_world();
    }

    /// Returns the transform cached at the end of the last step
    pub fn get_motion_state(&self) -> Transform {
        self.motion_state
    }

    /// Copies the current transform into the motion state
    pub fn sync_motion_state(&mut self) {
        self.motion_state = self.transform;
    }

    /// Returns the body's position
    pub fn get_position(&self) -> Vector3 {
        self.transform.position
    }

    /// Sets the body's position
    pub fn set_position(&mut self, position: Vector3) {
        self.transform.position = position;
    }

    /// Returns the body's rotation as a quaternion
    pub fn get_rotation(&self) -> Quaternion {
        self.transform.rotation
    }

    /// Sets the body's rotation as a quaternion
    pub fn set_rotation(&mut self, rotation: Quaternion) {
        self.transform.rotation = rotation.normalize();
        self.update_inertia_tensor_world();
    }

    /// Returns the body's linear velocity
    pub fn get_linear_velocity(&self) -> Vector3 {
        self.linear_velocity
    }

    /// Sets the body's linear velocity
    pub fn set_linear_velocity(&mut self, velocity: Vector3) {
        if self.is_static() {
            return;
        }
        self.linear_velocity = velocity;
        self.wake_up();
    }

    /// Returns the body's angular velocity
    pub fn get_angular_velocity(&self) -> Vector3 {
        self.angular_velocity
    }

    /// Sets the body's angular velocity
    pub fn set_angular_velocity(&mut self, velocity: Vector3) {
        if self.is_static() {
            return;
        }
        self.angular_velocity = velocity;
        self.wake_up();
    }

    /// Overwrites both velocities without waking the body
    pub(crate) fn store_velocities(&mut self, linear: Vector3, angular: Vector3) {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
    }

    /// Velocity of a point given relative to the center of mass
    pub fn get_velocity_at(&self, relative_position: Vector3) -> Vector3 {
        self.linear_velocity + self.angular_velocity.cross(&relative_position)
    }

    /// Returns the body's material
    pub fn get_material(&self) -> &Material {
        &self.material
    }

    /// Sets the body's material
    pub fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    /// Returns a reference to the body's shape
    pub fn get_shape(&self) -> &Arc<dyn Shape> {
        &self.shape
    }

    /// World bounds of the body's shape
    pub fn get_world_bounds(&self) -> Aabb {
        self.shape.get_world_bounds(&self.transform)
    }

    /// Returns the body's mass
    pub fn get_mass(&self) -> f32 {
        self.mass
    }

    /// Sets the body's mass and recomputes its inertia; zero makes it static
    pub fn set_mass(&mut self, mass: f32) {
        self.body_type = RigidBodyType::from_mass(mass);
        match self.body_type {
            RigidBodyType::Dynamic => {
                self.mass = mass;
                self.inv_mass = 1.0 / mass;
                self.local_inertia = self.shape.get_local_inertia(mass);
            }
            RigidBodyType::Static => {
                self.mass = 0.0;
                self.inv_mass = 0.0;
                self.local_inertia = Vector3::zero();
                self.linear_velocity = Vector3::zero();
                self.angular_velocity = Vector3::zero();
            }
        }
        self.update_inertia_tensor_world();
    }

    /// Returns the body's inverse mass
    pub fn get_inverse_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Returns the principal moments of inertia in local space
    pub fn get_local_inertia(&self) -> Vector3 {
        self.local_inertia
    }

    /// Returns the body's inverse inertia tensor in world space
    pub fn get_inverse_inertia_tensor_world(&self) -> &Matrix3 {
        &self.inv_inertia_tensor_world
    }

    /// Returns the body type
    pub fn get_body_type(&self) -> RigidBodyType {
        self.body_type
    }

    /// Whether the body never moves
    pub fn is_static(&self) -> bool {
        self.body_type == RigidBodyType::Static
    }

    /// Whether the body is simulated
    pub fn is_dynamic(&self) -> bool {
        self.body_type == RigidBodyType::Dynamic
    }

    /// Sets linear and angular damping, each clamped to `[0, 1]`
    pub fn set_damping(&mut self, linear: f32, angular: f32) {
        self.linear_damping = linear.clamp(0.0, 1.0);
        self.angular_damping = angular.clamp(0.0, 1.0);
    }

    /// Returns the body's linear damping
    pub fn get_linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Returns the body's angular damping
    pub fn get_angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// Returns the per-axis linear factor
    pub fn get_linear_factor(&self) -> Vector3 {
        self.linear_factor
    }

    /// Sets the per-axis linear factor
    pub fn set_linear_factor(&mut self, factor: Vector3) {
        self.linear_factor = factor;
    }

    /// Returns the per-axis angular factor
    pub fn get_angular_factor(&self) -> Vector3 {
        self.angular_factor
    }

    /// Sets the per-axis angular factor
    pub fn set_angular_factor(&mut self, factor: Vector3) {
        self.angular_factor = factor;
    }

    /// Returns the CCD motion threshold
    pub fn get_ccd_motion_threshold(&self) -> f32 {
        self.ccd_motion_threshold
    }

    /// Sets the CCD motion threshold; zero disables continuous collision
    pub fn set_ccd_motion_threshold(&mut self, threshold: f32) {
        self.ccd_motion_threshold = threshold.max(0.0);
        self.flags.set(BodyFlags::CCD_ENABLED, self.ccd_motion_threshold > 0.0);
    }

    /// Returns the CCD swept sphere radius
    pub fn get_ccd_swept_sphere_radius(&self) -> f32 {
        self.ccd_swept_sphere_radius
    }

    /// Sets the CCD swept sphere radius
    pub fn set_ccd_swept_sphere_radius(&mut self, radius: f32) {
        self.ccd_swept_sphere_radius = radius.max(0.0);
    }

    /// Returns whether the body has CCD enabled
    pub fn is_ccd_enabled(&self) -> bool {
        self.flags.contains(BodyFlags::CCD_ENABLED)
    }

    /// Returns the collision group bits
    pub fn get_collision_group(&self) -> u32 {
        self.collision_group
    }

    /// Returns the collision mask bits
    pub fn get_collision_mask(&self) -> u32 {
        self.collision_mask
    }

    /// Sets the collision group and mask
    pub fn set_collision_filter(&mut self, group: u32, mask: u32) {
        self.collision_group = group;
        self.collision_mask = mask;
    }

    /// Returns whether the body is sleeping
    pub fn is_sleeping(&self) -> bool {
        self.flags.contains(BodyFlags::SLEEPING)
    }

    /// Puts the body to sleep
    pub fn put_to_sleep(&mut self) {
        if self.is_dynamic() && !self.is_sleeping() {
            self.flags.insert(BodyFlags::SLEEPING);
            self.linear_velocity = Vector3::zero();
            self.angular_velocity = Vector3::zero();
        }
    }

    /// Wakes up the body
    pub fn wake_up(&mut self) {
        self.flags.remove(BodyFlags::SLEEPING);
        self.sleeping_time = 0.0;
    }

    /// Returns whether the body can sleep
    pub fn can_sleep(&self) -> bool {
        self.flags.contains(BodyFlags::CAN_SLEEP)
    }

    /// Sets whether the body can sleep
    pub fn set_can_sleep(&mut self, can_sleep: bool) {
        self.flags.set(BodyFlags::CAN_SLEEP, can_sleep);
        if !can_sleep {
            self.wake_up();
        }
    }

    /// Returns whether the body is affected by gravity
    pub fn is_affected_by_gravity(&self) -> bool {
        self.flags.contains(BodyFlags::AFFECTED_BY_GRAVITY)
    }

    /// Sets whether the body is affected by gravity
    pub fn set_affected_by_gravity(&mut self, affected: bool) {
        self.flags.set(BodyFlags::AFFECTED_BY_GRAVITY, affected);
    }

    /// Returns the time the body has been inactive
    pub fn get_sleeping_time(&self) -> f32 {
        self.sleeping_time
    }

    /// Sets the time the body has been inactive
    pub fn set_sleeping_time(&mut self, time: f32) {
        self.sleeping_time = time;
    }

    /// Updates the inverse inertia tensor in world space
    fn update_inertia_tensor_world(&mut self) {
        if !self.is_dynamic() {
            self.inv_inertia_tensor_world = Matrix3::zeros();
            return;
        }

        let inv_local = Vector3::new(
            if self.local_inertia.x > 0.0 { 1.0 / self.local_inertia.x } else { 0.0 },
            if self.local_inertia.y > 0.0 { 1.0 / self.local_inertia.y } else { 0.0 },
            if self.local_inertia.z > 0.0 { 1.0 / self.local_inertia.z } else { 0.0 },
        );

        // R * inv_I * R^T
        let rotation_matrix = self.transform.rotation.to_rotation_matrix();
        self.inv_inertia_tensor_world = rotation_matrix * math::diagonal(inv_local) * rotation_matrix.transpose();
    }

    /// Accumulates a force at the center of mass
    pub fn apply_central_force(&mut self, force: Vector3) {
        if self.is_dynamic() {
            self.total_force += force.component_mul(&self.linear_factor);
        }
    }

    /// Accumulates a force applied at a point relative to the center of mass
    pub fn apply_force(&mut self, force: Vector3, relative_position: Vector3) {
        if self.is_dynamic() {
            self.apply_central_force(force);
            self.apply_torque(relative_position.cross(&force.component_mul(&self.linear_factor)));
        }
    }

    /// Accumulates a torque
    pub fn apply_torque(&mut self, torque: Vector3) {
        if self.is_dynamic() {
            self.total_torque += torque.component_mul(&self.angular_factor);
        }
    }

    /// Applies an impulse at the center of mass
    pub fn apply_central_impulse(&mut self, impulse: Vector3) {
        if self.is_dynamic() {
            self.linear_velocity += impulse.component_mul(&self.linear_factor) * self.inv_mass;
        }
    }

    /// Applies an impulse at a point relative to the center of mass
    pub fn apply_impulse(&mut self, impulse: Vector3, relative_position: Vector3) {
        if self.is_dynamic() {
            self.apply_central_impulse(impulse);
            self.apply_torque_impulse(relative_position.cross(&impulse.component_mul(&self.linear_factor)));
        }
    }

    /// Applies an angular impulse
    pub fn apply_torque_impulse(&mut self, impulse: Vector3) {
        if self.is_dynamic() {
            let delta = math::mul_matrix_vector(&self.inv_inertia_tensor_world, impulse);
            self.angular_velocity += delta.component_mul(&self.angular_factor);
        }
    }

    /// Returns the accumulated force
    pub fn get_total_force(&self) -> Vector3 {
        self.total_force
    }

    /// Returns the accumulated torque
    pub fn get_total_torque(&self) -> Vector3 {
        self.total_torque
    }

    /// Drops accumulated forces and torques
    pub fn clear_forces(&mut self) {
        self.total_force = Vector3::zero();
        self.total_torque = Vector3::zero();
    }

    /// Integrates gravity and accumulated forces into the velocities
    pub fn integrate_forces(&mut self, gravity: Vector3, dt: f32) {
        if !self.is_dynamic() || self.is_sleeping() {
            return;
        }

        let mut acceleration = self.total_force * self.inv_mass;
        if self.is_affected_by_gravity() {
            acceleration += gravity.component_mul(&self.linear_factor);
        }
        self.linear_velocity += acceleration * dt;

        let angular_acceleration = math::mul_matrix_vector(&self.inv_inertia_tensor_world, self.total_torque);
        self.angular_velocity += angular_acceleration.component_mul(&self.angular_factor) * dt;
    }

    /// Applies damping to the body's velocities
    pub fn apply_damping(&mut self, dt: f32) {
        if !self.is_dynamic() || self.is_sleeping() {
            return;
        }

        self.linear_velocity *= (1.0 - self.linear_damping).powf(dt);
        self.angular_velocity *= (1.0 - self.angular_damping).powf(dt);
    }

    /// Advances position and rotation by the given velocities
    pub fn integrate_transform(&mut self, linear_velocity: Vector3, angular_velocity: Vector3, dt: f32) {
        if !self.is_dynamic() || self.is_sleeping() {
            return;
        }

        self.transform.position += linear_velocity * dt;
        if !angular_velocity.is_zero() {
            self.transform.rotation = self.transform.rotation.integrate(angular_velocity, dt);
            self.update_inertia_tensor_world();
        }
    }
}
