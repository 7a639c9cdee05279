use crate::bodies::{RaycastVehicle, RigidBody, SoftBody};
use crate::collision::{BroadPhase, BruteForceBroadPhase, ContactManifold, ContactSolver, NarrowPhase, SatNarrowPhase, SequentialImpulseSolver};
use crate::constraints::{Constraint, SolverBodies};
use crate::core::detect_collisions::{detect_collisions, wake_touched_bodies};
use crate::core::{BodyHandle, HandleStorage, JointHandle, SoftBodyHandle, VehicleHandle, WorldConfig};
use crate::error::PhysicsError;
use crate::integration::{create_integrator, Integrator, StartVelocities};
use crate::math::{Ray, Vector3};
use crate::shapes::RayHit;
use crate::Result;

use std::collections::HashMap;

/// Tolerance on the sub-step count, so accumulated rounding does not drop a step
const SUBSTEP_EPSILON: f32 = 1.0e-4;

/// The dynamics world: rigid bodies, soft bodies, vehicles and joints,
/// advanced with fixed sub-steps
pub struct DynamicsWorld {
    bodies: HandleStorage<BodyHandle, RigidBody>,
    soft_bodies: HandleStorage<SoftBodyHandle, SoftBody>,
    vehicles: HandleStorage<VehicleHandle, RaycastVehicle>,
    joints: HandleStorage<JointHandle, Box<dyn Constraint>>,

    /// Manifolds of the last sub-step
    manifolds: Vec<ContactManifold>,

    config: WorldConfig,
    broad_phase: Box<dyn BroadPhase>,
    narrow_phase: Box<dyn NarrowPhase>,
    contact_solver: Box<dyn ContactSolver>,
    integrator: Box<dyn Integrator>,

    /// Time not yet consumed by a fixed sub-step
    local_time: f32,

    /// The total simulated time
    time: f32,
}

impl Default for DynamicsWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl std::fmt::Debug for DynamicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicsWorld")
            .field("bodies", &self.bodies.len())
            .field("soft_bodies", &self.soft_bodies.len())
            .field("vehicles", &self.vehicles.len())
            .field("joints", &self.joints.len())
            .field("manifolds", &self.manifolds.len())
            .field("integrator", &self.integrator.name())
            .field("time", &self.time)
            .finish()
    }
}

impl DynamicsWorld {
    /// Creates an empty world
    pub fn new(config: WorldConfig) -> Self {
        Self {
            bodies: HandleStorage::new(),
            soft_bodies: HandleStorage::new(),
            vehicles: HandleStorage::new(),
            joints: HandleStorage::new(),
            manifolds: Vec::new(),
            broad_phase: Box::new(BruteForceBroadPhase::new()),
            narrow_phase: Box::new(SatNarrowPhase::new()),
            contact_solver: Box::new(SequentialImpulseSolver::new(
                config.contact_bias_factor,
                config.contact_slop,
                config.restitution_velocity_threshold,
            )),
            integrator: create_integrator(config.integrator),
            config,
            local_time: 0.0,
            time: 0.0,
        }
    }

    /// Returns the world configuration
    pub fn get_config(&self) -> &WorldConfig {
        &self.config
    }

    /// Sets the gravity
    pub fn set_gravity(&mut self, gravity: Vector3) {
        self.config.gravity = gravity;
    }

    /// Gets the current gravity
    pub fn get_gravity(&self) -> Vector3 {
        self.config.gravity
    }

    /// Returns the total simulated time
    pub fn get_time(&self) -> f32 {
        self.time
    }

    /// Adds a rigid body to the world and returns its handle
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.bodies.add(body)
    }

    /// Removes a rigid body along with its joints and the soft-body anchors
    /// that point at it
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let body = self
            .bodies
            .remove(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("body {:?}", handle)))?;

        let attached: Vec<JointHandle> = self
            .joints
            .iter()
            .filter(|(_, joint)| joint.involves_body(handle))
            .map(|(joint_handle, _)| joint_handle)
            .collect();
        for joint in attached {
            self.joints.remove(joint);
        }
        for (_, soft_body) in self.soft_bodies.iter_mut() {
            soft_body.remove_anchors_to(handle);
        }
        self.manifolds.retain(|manifold| !manifold.pair.contains(handle));

        Ok(body)
    }

    /// Gets a reference to a rigid body by its handle
    pub fn get_body(&self, handle: BodyHandle) -> Result<&RigidBody> {
        self.bodies.get_or_err(handle)
    }

    /// Gets a mutable reference to a rigid body by its handle
    pub fn get_body_mut(&mut self, handle: BodyHandle) -> Result<&mut RigidBody> {
        self.bodies.get_mut_or_err(handle)
    }

    /// Returns every rigid body
    pub fn get_bodies(&self) -> &HandleStorage<BodyHandle, RigidBody> {
        &self.bodies
    }

    /// Adds a soft body
    pub fn add_soft_body(&mut self, body: SoftBody) -> SoftBodyHandle {
        self.soft_bodies.add(body)
    }

    /// Removes a soft body
    pub fn remove_soft_body(&mut self, handle: SoftBodyHandle) -> Result<SoftBody> {
        self.soft_bodies
            .remove(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("soft body {:?}", handle)))
    }

    /// Gets a soft body
    pub fn get_soft_body(&self, handle: SoftBodyHandle) -> Result<&SoftBody> {
        self.soft_bodies.get_or_err(handle)
    }

    /// Gets a soft body mutably
    pub fn get_soft_body_mut(&mut self, handle: SoftBodyHandle) -> Result<&mut SoftBody> {
        self.soft_bodies.get_mut_or_err(handle)
    }

    /// Pins a soft-body node to a rigid body at the node's current position
    pub fn append_anchor(
        &mut self,
        soft: SoftBodyHandle,
        node: usize,
        body: BodyHandle,
        influence: f32,
        collide_with_body: bool,
    ) -> Result<()> {
        let rigid = self.bodies.get_or_err(body)?;
        let soft_body = self.soft_bodies.get_mut_or_err(soft)?;
        if soft_body.append_anchor(node, body, rigid, influence, collide_with_body) {
            Ok(())
        } else {
            Err(PhysicsError::InvalidParameter(format!(
                "node {} is out of range for a soft body with {} nodes",
                node,
                soft_body.get_nodes().len()
            )))
        }
    }

    /// Adds a vehicle; its chassis must already be in the world
    pub fn add_vehicle(&mut self, vehicle: RaycastVehicle) -> Result<VehicleHandle> {
        self.bodies.get_or_err(vehicle.get_chassis())?;
        Ok(self.vehicles.add(vehicle))
    }

    /// Removes a vehicle
    pub fn remove_vehicle(&mut self, handle: VehicleHandle) -> Result<RaycastVehicle> {
        self.vehicles
            .remove(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("vehicle {:?}", handle)))
    }

    /// Gets a vehicle
    pub fn get_vehicle(&self, handle: VehicleHandle) -> Result<&RaycastVehicle> {
        self.vehicles.get_or_err(handle)
    }

    /// Gets a vehicle mutably
    pub fn get_vehicle_mut(&mut self, handle: VehicleHandle) -> Result<&mut RaycastVehicle> {
        self.vehicles.get_mut_or_err(handle)
    }

    /// Adds a joint and wakes the bodies it connects
    pub fn add_joint(&mut self, joint: Box<dyn Constraint>) -> Result<JointHandle> {
        let (a, b) = joint.bodies();
        self.bodies.get_or_err(a)?;
        if let Some(b) = b {
            self.bodies.get_or_err(b)?;
        }
        for handle in std::iter::once(a).chain(b) {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.wake_up();
            }
        }
        Ok(self.joints.add(joint))
    }

    /// Removes a joint and wakes the bodies it connected
    pub fn remove_joint(&mut self, handle: JointHandle) -> Result<Box<dyn Constraint>> {
        let joint = self
            .joints
            .remove(handle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("joint {:?}", handle)))?;
        let (a, b) = joint.bodies();
        for handle in std::iter::once(a).chain(b) {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.wake_up();
            }
        }
        Ok(joint)
    }

    /// Gets a joint
    pub fn get_joint(&self, handle: JointHandle) -> Result<&dyn Constraint> {
        self.joints.get_or_err(handle).map(|joint| joint.as_ref())
    }

    /// Gets a joint mutably
    pub fn get_joint_mut(&mut self, handle: JointHandle) -> Result<&mut dyn Constraint> {
        self.joints.get_mut_or_err(handle).map(|joint| joint.as_mut())
    }

    /// Gets a joint of a concrete type
    pub fn get_joint_as<T: Constraint>(&self, handle: JointHandle) -> Result<&T> {
        let joint = self.get_joint(handle)?;
        let kind = joint.kind();
        joint
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| PhysicsError::TypeMismatch(format!("joint {:?} is a {} constraint", handle, kind.name())))
    }

    /// Gets a joint of a concrete type mutably
    pub fn get_joint_as_mut<T: Constraint>(&mut self, handle: JointHandle) -> Result<&mut T> {
        let joint = self.get_joint_mut(handle)?;
        let kind = joint.kind();
        joint
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| PhysicsError::TypeMismatch(format!("joint {:?} is a {} constraint", handle, kind.name())))
    }

    /// The contact manifolds of the last sub-step
    pub fn get_manifolds(&self) -> &[ContactManifold] {
        &self.manifolds
    }

    /// Returns the number of rigid bodies in the world
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Returns the number of joints in the world
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Casts a ray and returns the closest body it hits
    pub fn ray_test(&self, ray: &Ray, max_distance: f32) -> Option<(BodyHandle, RayHit)> {
        self.bodies
            .iter()
            .filter_map(|(handle, body)| {
                body.get_shape()
                    .intersects_ray(ray, &body.get_transform(), max_distance)
                    .map(|hit| (handle, hit))
            })
            .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
    }

    /// Advances the world by `time_step` in fixed sub-steps of `fixed_time_step`.
    ///
    /// Time that does not fill a whole sub-step carries over to the next call.
    /// At most `max_sub_steps` sub-steps run; with `max_sub_steps == 0` the
    /// world takes one variable step of `time_step`. Returns the number of
    /// sub-steps the elapsed time called for.
    pub fn step_simulation(&mut self, time_step: f32, max_sub_steps: u32, fixed_time_step: f32) -> u32 {
        let (steps, step_length) = if max_sub_steps > 0 && fixed_time_step > 0.0 {
            self.local_time += time_step;
            let steps = (self.local_time / fixed_time_step + SUBSTEP_EPSILON).floor().max(0.0) as u32;
            self.local_time = (self.local_time - steps as f32 * fixed_time_step).max(0.0);
            (steps, fixed_time_step)
        } else {
            self.local_time = 0.0;
            (u32::from(time_step > 0.0), time_step)
        };

        let clamped = if max_sub_steps > 0 { steps.min(max_sub_steps) } else { steps };
        for _ in 0..clamped {
            self.single_step(step_length);
        }

        for (_, body) in self.bodies.iter_mut() {
            body.sync_motion_state();
            body.clear_forces();
        }
        steps
    }

    fn single_step(&mut self, dt: f32) {
        let gravity = self.config.gravity;

        let start: HashMap<BodyHandle, StartVelocities> = self
            .bodies
            .iter()
            .map(|(handle, body)| (handle, StartVelocities::of(body)))
            .collect();

        for (_, body) in self.bodies.iter_mut() {
            body.integrate_forces(gravity, dt);
            body.apply_damping(dt);
        }

        for (handle, vehicle) in self.vehicles.iter_mut() {
            if let Err(error) = vehicle.update(dt, &mut self.bodies) {
                log::trace!("vehicle {:?} skipped: {}", handle, error);
            }
        }

        let previous = std::mem::take(&mut self.manifolds);
        self.manifolds = detect_collisions(&self.bodies, previous, self.broad_phase.as_mut(), self.narrow_phase.as_ref());
        wake_touched_bodies(
            &mut self.bodies,
            &self.manifolds,
            self.config.linear_sleep_threshold,
            self.config.angular_sleep_threshold,
        );

        self.solve(dt);

        for (handle, body) in self.bodies.iter_mut() {
            let velocities = start.get(&handle).copied().unwrap_or_else(|| StartVelocities::of(body));
            self.integrator.integrate(body, velocities, dt);
        }

        self.contact_solver.solve_position(&self.manifolds, &mut self.bodies);

        if self.config.soft_bodies {
            for (_, soft_body) in self.soft_bodies.iter_mut() {
                soft_body.step(dt, gravity, &self.bodies);
            }
        }

        self.update_sleeping(dt);
        self.time += dt;
    }

    fn solve(&mut self, dt: f32) {
        let mut solver_bodies = SolverBodies::gather(&self.bodies);
        self.contact_solver.prepare(&self.manifolds, &solver_bodies, dt);

        let mut active: Vec<(JointHandle, usize, usize)> = Vec::new();
        for (handle, joint) in self.joints.iter_mut() {
            if !joint.core().enabled {
                continue;
            }
            let (a, b) = joint.bodies();
            let index_a = solver_bodies.index_of(Some(a));
            let index_b = solver_bodies.index_of(b);
            let (body_a, body_b) = (solver_bodies.get(index_a), solver_bodies.get(index_b));
            if index_a == index_b || (!body_a.is_movable() && !body_b.is_movable()) {
                continue;
            }
            joint.prepare(body_a, body_b, dt);
            active.push((handle, index_a, index_b));
        }

        for _ in 0..self.config.solver_iterations {
            self.contact_solver.solve_velocity(&mut solver_bodies);
            for &(handle, a, b) in &active {
                let (Some(joint), Some((body_a, body_b))) = (self.joints.get_mut(handle), solver_bodies.pair_mut(a, b)) else {
                    continue;
                };
                joint.solve_velocity(body_a, body_b);
            }
        }

        for &(handle, _, _) in &active {
            if let Some(joint) = self.joints.get_mut(handle) {
                joint.finish();
                if !joint.core().enabled {
                    log::debug!("joint {:?} broke at impulse {}", handle, joint.applied_impulse());
                }
            }
        }

        solver_bodies.write_back(&mut self.bodies);
    }

    fn update_sleeping(&mut self, dt: f32) {
        if !self.config.allow_sleeping {
            return;
        }
        let linear_threshold = self.config.linear_sleep_threshold;
        let angular_threshold = self.config.angular_sleep_threshold;
        let time_threshold = self.config.sleep_time_threshold;

        for (_, body) in self.bodies.iter_mut() {
            if !body.is_dynamic() || body.is_sleeping() || !body.can_sleep() {
                continue;
            }
            let resting = body.get_linear_velocity().length() < linear_threshold
                && body.get_angular_velocity().length() < angular_threshold;
            if !resting {
                body.set_sleeping_time(0.0);
                continue;
            }
            let sleeping_time = body.get_sleeping_time() + dt;
            body.set_sleeping_time(sleeping_time);
            if sleeping_time >= time_threshold {
                body.put_to_sleep();
            }
        }
    }
}
