use std::collections::HashMap;
use std::mem;
use std::time::Instant;

use crate::bodies::{Material, RaycastVehicle, RigidBody, SoftBody};
use crate::constraints::{
    ConeTwistConstraint, Constraint, DofConstraint, HingeConstraint, PointConstraint, SliderConstraint,
};
use crate::core::{
    BodyHandle, BodyId, BodyKind, ConstraintId, DynamicsWorld, JointHandle, Slots, SoftBodyHandle, TransportConfig,
    VehicleHandle, VehicleId, WorldConfig, MAX_WIRE_ID,
};
use crate::error::PhysicsError;
use crate::math::Transform;
use crate::protocol::report::{chunked_len, ensure_len};
use crate::protocol::{
    AnchorDescription, Command, ConstraintDescription, ConstraintKind, ControlMessage, ObjectDescription,
    ReportKind, ShapeDescription, SimulateParams, SoftLayout, TransformUpdate, VehicleDescription, WheelDescription,
    WheelValue, WorkerMessage, CONSTRAINT_HEADER, CONSTRAINT_STRIDE, REPORT_CHUNK_SIZE, VEHICLE_HEADER,
    VEHICLE_STRIDE,
};
use crate::shapes::{build_shape, BuiltShape, ShapeCache};
use crate::transport::{self, TransferMode};
use crate::worker::reports::ReportBuffers;
use crate::Result;

/// The native object behind a body id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeBody {
    Rigid(BodyHandle),
    Soft(SoftBodyHandle),
}

/// A registered body
#[derive(Debug)]
pub struct BodyRecord {
    pub id: BodyId,
    pub kind: BodyKind,
    pub native: NativeBody,

    /// Shape type from the description
    pub type_name: &'static str,

    /// Report layout of a soft body
    pub soft_layout: Option<SoftLayout>,

    /// Held until removal so per-body shapes are released with the body
    shape: Option<BuiltShape>,
}

impl BodyRecord {
    /// Whether the body owns a shape that is not shared through the cache
    pub fn owns_shape(&self) -> bool {
        self.shape.as_ref().is_some_and(|shape| !shape.is_cached())
    }
}

/// A registered vehicle
#[derive(Debug)]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub chassis: BodyId,
    pub handle: VehicleHandle,
    pub wheels: usize,
}

/// A registered joint
#[derive(Debug)]
pub struct JointRecord {
    pub id: ConstraintId,
    pub kind: ConstraintKind,
    pub body_a: BodyId,
    pub body_b: Option<BodyId>,
    pub handle: JointHandle,
}

/// Worker-side state: the dynamics world, the id registries, report buffers
/// and everything else one worker owns for its lifetime.
///
/// Commands go in through [`SimulationWorld::handle`]; whatever the worker
/// has to say back (control messages, reports) collects in an outbox drained
/// with [`SimulationWorld::take_messages`].
#[derive(Debug)]
pub struct SimulationWorld {
    pub(crate) world: Option<DynamicsWorld>,
    pub(crate) bodies: Slots<BodyRecord>,
    pub(crate) vehicles: Slots<VehicleRecord>,
    pub(crate) joints: Slots<JointRecord>,
    pub(crate) ids_by_handle: HashMap<BodyHandle, BodyId>,
    pub(crate) buffers: ReportBuffers,
    pub(crate) transfer: TransferMode,
    pub(crate) chunk: usize,
    pub(crate) rigid_count: usize,
    pub(crate) soft_count: usize,
    pub(crate) wheel_count: usize,
    pub(crate) joint_count: usize,
    shapes: ShapeCache,
    fixed_time_step: f32,
    last_simulate: Option<Instant>,
    pub(crate) outbox: Vec<WorkerMessage>,
}

impl Default for SimulationWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn check_id(raw: u32, what: &str) -> Result<()> {
    if raw == 0 {
        Err(PhysicsError::InvalidParameter(format!("{what} id 0 is reserved")))
    } else if raw > MAX_WIRE_ID {
        Err(PhysicsError::InvalidParameter(format!("{what} id {raw} exceeds {MAX_WIRE_ID}")))
    } else {
        Ok(())
    }
}

impl SimulationWorld {
    /// Creates a worker with no world yet
    pub fn new() -> Self {
        Self {
            world: None,
            bodies: Slots::new(),
            vehicles: Slots::new(),
            joints: Slots::new(),
            ids_by_handle: HashMap::new(),
            buffers: ReportBuffers::default(),
            transfer: TransferMode::Copy,
            chunk: REPORT_CHUNK_SIZE,
            rigid_count: 0,
            soft_count: 0,
            wheel_count: 0,
            joint_count: 0,
            shapes: ShapeCache::new(),
            fixed_time_step: WorldConfig::default().fixed_time_step,
            last_simulate: None,
            outbox: Vec::new(),
        }
    }

    /// Runs one command
    pub fn handle(&mut self, command: Command) -> Result<()> {
        log::debug!("worker command: {}", command.name());
        if self.world.is_none() && !command.is_handshake() {
            return Err(PhysicsError::NotInitialized("world"));
        }

        match command {
            Command::Init(config) => self.init(config),
            Command::MakeWorld(config) => self.make_world(config),
            Command::SetFixedTimeStep(step) => {
                if step <= 0.0 || !step.is_finite() {
                    return Err(PhysicsError::InvalidParameter(format!("fixed time step must be positive, got {step}")));
                }
                self.fixed_time_step = step;
                Ok(())
            }
            Command::SetGravity(gravity) => {
                self.world_mut()?.set_gravity(gravity);
                Ok(())
            }
            Command::AppendAnchor(anchor) => self.append_anchor(&anchor),

            Command::AddObject(description) => self.add_object(*description),
            Command::RemoveObject(params) => self.remove_object(params.id),
            Command::UpdateTransform(update) => self.update_transform(update),
            Command::UpdateMass(params) => self.with_rigid(params.id, true, |body| body.set_mass(params.mass)),
            Command::ApplyCentralImpulse(params) => {
                self.with_rigid(params.id, true, |body| body.apply_central_impulse(params.vector))
            }
            Command::ApplyImpulse(params) => self.with_rigid(params.id, true, |body| {
                body.apply_impulse(params.vector, params.relative_position)
            }),
            Command::ApplyTorque(params) => self.with_rigid(params.id, true, |body| body.apply_torque(params.vector)),
            Command::ApplyCentralForce(params) => {
                self.with_rigid(params.id, true, |body| body.apply_central_force(params.vector))
            }
            Command::ApplyForce(params) => self.with_rigid(params.id, true, |body| {
                body.apply_force(params.vector, params.relative_position)
            }),
            Command::SetAngularVelocity(params) => {
                self.with_rigid(params.id, true, |body| body.set_angular_velocity(params.vector))
            }
            Command::SetLinearVelocity(params) => {
                self.with_rigid(params.id, true, |body| body.set_linear_velocity(params.vector))
            }
            Command::SetAngularFactor(params) => {
                self.with_rigid(params.id, false, |body| body.set_angular_factor(params.vector))
            }
            Command::SetLinearFactor(params) => {
                self.with_rigid(params.id, false, |body| body.set_linear_factor(params.vector))
            }
            Command::SetDamping(params) => {
                self.with_rigid(params.id, false, |body| body.set_damping(params.linear, params.angular))
            }
            Command::SetCcdMotionThreshold(params) => {
                self.with_rigid(params.id, false, |body| body.set_ccd_motion_threshold(params.value))
            }
            Command::SetCcdSweptSphereRadius(params) => {
                self.with_rigid(params.id, false, |body| body.set_ccd_swept_sphere_radius(params.value))
            }

            Command::AddVehicle(description) => self.add_vehicle(description),
            Command::RemoveVehicle(params) => self.remove_vehicle(params.id),
            Command::AddWheel(description) => self.add_wheel(description),
            Command::SetSteering(params) => self.with_vehicle(params, RaycastVehicle::set_steering_value),
            Command::SetBrake(params) => self.with_vehicle(params, RaycastVehicle::set_brake),
            Command::ApplyEngineForce(params) => self.with_vehicle(params, RaycastVehicle::apply_engine_force),

            Command::AddConstraint(description) => self.add_constraint(description),
            Command::RemoveConstraint(params) => self.remove_constraint(params.id),
            Command::ConstraintSetBreakingImpulseThreshold(params) => {
                let handle = self.joint_record(params.id)?.handle;
                self.world_mut()?.get_joint_mut(handle)?.core_mut().breaking_impulse_threshold = params.threshold;
                Ok(())
            }

            Command::HingeSetLimits(p) => self.configure_joint(p.id, |joint: &mut HingeConstraint| {
                joint.set_limits(p.low, p.high, p.bias_factor, p.relaxation_factor);
                Ok(())
            }),
            Command::HingeEnableAngularMotor(p) => self.configure_joint(p.id, |joint: &mut HingeConstraint| {
                joint.enable_angular_motor(p.velocity, p.max_impulse);
                Ok(())
            }),
            Command::HingeDisableMotor(p) => self.configure_joint(p.id, |joint: &mut HingeConstraint| {
                joint.disable_motor();
                Ok(())
            }),

            Command::SliderSetLimits(p) => self.configure_joint(p.id, |joint: &mut SliderConstraint| {
                joint.set_limits(p.linear_lower, p.linear_upper, p.angular_lower, p.angular_upper);
                Ok(())
            }),
            Command::SliderSetRestitution(p) => self.configure_joint(p.id, |joint: &mut SliderConstraint| {
                joint.set_restitution(p.linear, p.angular);
                Ok(())
            }),
            Command::SliderEnableLinearMotor(p) => self.configure_joint(p.id, |joint: &mut SliderConstraint| {
                joint.enable_linear_motor(p.velocity, p.max_impulse);
                Ok(())
            }),
            Command::SliderDisableLinearMotor(p) => self.configure_joint(p.id, |joint: &mut SliderConstraint| {
                joint.disable_linear_motor();
                Ok(())
            }),
            Command::SliderEnableAngularMotor(p) => self.configure_joint(p.id, |joint: &mut SliderConstraint| {
                joint.enable_angular_motor(p.velocity, p.max_impulse);
                Ok(())
            }),
            Command::SliderDisableAngularMotor(p) => self.configure_joint(p.id, |joint: &mut SliderConstraint| {
                joint.disable_angular_motor();
                Ok(())
            }),

            Command::ConeTwistSetLimit(p) => self.configure_joint(p.id, |joint: &mut ConeTwistConstraint| {
                joint.set_limit(p.swing_span1, p.swing_span2, p.twist_span);
                Ok(())
            }),
            Command::ConeTwistSetAngularOnly(p) => self.configure_joint(p.id, |joint: &mut ConeTwistConstraint| {
                joint.set_angular_only(p.enabled);
                Ok(())
            }),
            Command::ConeTwistEnableMotor(p) => self.configure_joint(p.id, |joint: &mut ConeTwistConstraint| {
                joint.enable_motor();
                Ok(())
            }),
            Command::ConeTwistSetMaxMotorImpulse(p) => self.configure_joint(p.id, |joint: &mut ConeTwistConstraint| {
                joint.set_max_motor_impulse(p.max_impulse);
                Ok(())
            }),
            Command::ConeTwistSetMotorTarget(p) => self.configure_joint(p.id, |joint: &mut ConeTwistConstraint| {
                joint.set_motor_target(p.target);
                Ok(())
            }),
            Command::ConeTwistDisableMotor(p) => self.configure_joint(p.id, |joint: &mut ConeTwistConstraint| {
                joint.disable_motor();
                Ok(())
            }),

            Command::DofSetLinearLowerLimit(p) => self.configure_joint(p.id, |joint: &mut DofConstraint| {
                joint.set_linear_lower_limit(p.limit);
                Ok(())
            }),
            Command::DofSetLinearUpperLimit(p) => self.configure_joint(p.id, |joint: &mut DofConstraint| {
                joint.set_linear_upper_limit(p.limit);
                Ok(())
            }),
            Command::DofSetAngularLowerLimit(p) => self.configure_joint(p.id, |joint: &mut DofConstraint| {
                joint.set_angular_lower_limit(p.limit);
                Ok(())
            }),
            Command::DofSetAngularUpperLimit(p) => self.configure_joint(p.id, |joint: &mut DofConstraint| {
                joint.set_angular_upper_limit(p.limit);
                Ok(())
            }),
            Command::DofEnableAngularMotor(p) => self.configure_joint(p.id, |joint: &mut DofConstraint| {
                axis_result(joint.enable_angular_motor(p.which), p.which)
            }),
            Command::DofConfigureAngularMotor(p) => self.configure_joint(p.id, |joint: &mut DofConstraint| {
                axis_result(
                    joint.configure_angular_motor(p.which, p.low_angle, p.high_angle, p.velocity, p.max_force),
                    p.which,
                )
            }),
            Command::DofDisableAngularMotor(p) => self.configure_joint(p.id, |joint: &mut DofConstraint| {
                axis_result(joint.disable_angular_motor(p.which), p.which)
            }),

            Command::OnSimulationResume => {
                self.last_simulate = Some(Instant::now());
                Ok(())
            }
            Command::Simulate(params) => self.simulate(params),

            Command::Unknown(name) => Err(PhysicsError::UnknownCommand(name)),
        }
    }

    /// Removes and returns everything queued for the main thread
    pub fn take_messages(&mut self) -> Vec<WorkerMessage> {
        mem::take(&mut self.outbox)
    }

    /// Takes back a report buffer the main thread is done with
    pub fn reclaim(&mut self, buffer: Vec<f32>) {
        let Some(kind) = crate::protocol::report::report_kind(&buffer) else {
            log::trace!("ignoring returned buffer of {} floats", buffer.len());
            return;
        };
        let slot = self.buffers.get_mut(kind);
        if buffer.len() >= slot.len() {
            *slot = buffer;
        }
    }

    /// Whether `makeWorld` has run
    pub fn is_ready(&self) -> bool {
        self.world.is_some()
    }

    /// The dynamics world
    pub fn get_world(&self) -> Result<&DynamicsWorld> {
        self.world.as_ref().ok_or(PhysicsError::NotInitialized("world"))
    }

    fn world_mut(&mut self) -> Result<&mut DynamicsWorld> {
        self.world.as_mut().ok_or(PhysicsError::NotInitialized("world"))
    }

    /// How report buffers are handed to the main thread
    pub fn get_transfer_mode(&self) -> TransferMode {
        self.transfer
    }

    /// The fixed sub-step length
    pub fn get_fixed_time_step(&self) -> f32 {
        self.fixed_time_step
    }

    /// Number of live rigid bodies
    pub fn rigid_count(&self) -> usize {
        self.rigid_count
    }

    /// Number of live soft bodies
    pub fn soft_count(&self) -> usize {
        self.soft_count
    }

    /// Number of wheels over all live vehicles
    pub fn wheel_count(&self) -> usize {
        self.wheel_count
    }

    /// Number of live constraints
    pub fn constraint_count(&self) -> usize {
        self.joint_count
    }

    /// Number of distinct primitive shapes in the cache
    pub fn cached_shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// The record of a live body
    pub fn get_body_record(&self, id: BodyId) -> Option<&BodyRecord> {
        self.bodies.get(id.index())
    }

    /// Whether `id` named a body that has since been removed
    pub fn is_body_removed(&self, id: BodyId) -> bool {
        self.bodies.is_removed(id.index())
    }

    /// The rigid body registered under `id`
    pub fn get_rigid_body(&self, id: BodyId) -> Result<&RigidBody> {
        let handle = self.rigid_handle(id)?;
        self.get_world()?.get_body(handle)
    }

    /// The soft body registered under `id`
    pub fn get_soft_body(&self, id: BodyId) -> Result<&SoftBody> {
        let handle = self.soft_handle(id)?;
        self.get_world()?.get_soft_body(handle)
    }

    /// The vehicle registered under `id`
    pub fn get_vehicle(&self, id: VehicleId) -> Result<&RaycastVehicle> {
        let handle = self.vehicle_record(id)?.handle;
        self.get_world()?.get_vehicle(handle)
    }

    /// The joint registered under `id`
    pub fn get_constraint(&self, id: ConstraintId) -> Result<&dyn Constraint> {
        let handle = self.joint_record(id)?.handle;
        self.get_world()?.get_joint(handle)
    }

    /// The current contents of a report buffer; empty while it is with the
    /// main thread
    pub fn report_buffer(&self, kind: ReportKind) -> &[f32] {
        self.buffers.get(kind)
    }

    fn body_record(&self, id: BodyId) -> Result<&BodyRecord> {
        self.bodies
            .get(id.index())
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("body {}", id)))
    }

    fn rigid_handle(&self, id: BodyId) -> Result<BodyHandle> {
        match self.body_record(id)?.native {
            NativeBody::Rigid(handle) => Ok(handle),
            NativeBody::Soft(_) => Err(PhysicsError::TypeMismatch(format!("body {} is a soft body", id))),
        }
    }

    fn soft_handle(&self, id: BodyId) -> Result<SoftBodyHandle> {
        match self.body_record(id)?.native {
            NativeBody::Soft(handle) => Ok(handle),
            NativeBody::Rigid(_) => Err(PhysicsError::TypeMismatch(format!("body {} is a rigid body", id))),
        }
    }

    fn vehicle_record(&self, id: VehicleId) -> Result<&VehicleRecord> {
        self.vehicles
            .get(id.index())
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("vehicle {}", id)))
    }

    fn joint_record(&self, id: ConstraintId) -> Result<&JointRecord> {
        self.joints
            .get(id.index())
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("constraint {}", id)))
    }

    fn with_rigid(&mut self, id: BodyId, wake: bool, apply: impl FnOnce(&mut RigidBody)) -> Result<()> {
        let handle = self.rigid_handle(id)?;
        let body = self.world_mut()?.get_body_mut(handle)?;
        apply(body);
        if wake {
            body.wake_up();
        }
        Ok(())
    }

    fn with_vehicle(
        &mut self,
        params: WheelValue,
        apply: impl FnOnce(&mut RaycastVehicle, usize, f32) -> Result<()>,
    ) -> Result<()> {
        let handle = self.vehicle_record(params.id)?.handle;
        apply(self.world_mut()?.get_vehicle_mut(handle)?, params.wheel, params.value)
    }

    fn configure_joint<T: Constraint>(&mut self, id: ConstraintId, apply: impl FnOnce(&mut T) -> Result<()>) -> Result<()> {
        let handle = self.joint_record(id)?.handle;
        let world = self.world_mut()?;
        apply(world.get_joint_as_mut::<T>(handle)?)?;

        let (a, b) = world.get_joint(handle)?.bodies();
        for body in std::iter::once(a).chain(b) {
            world.get_body_mut(body)?.wake_up();
        }
        Ok(())
    }

    fn init(&mut self, config: TransportConfig) -> Result<()> {
        let outbox = &mut self.outbox;
        self.transfer = transport::probe(config.transferables, |bytes| {
            outbox.push(WorkerMessage::Probe(bytes));
            Ok(())
        })?;
        self.outbox.push(ControlMessage::EngineLoaded.into());
        Ok(())
    }

    fn make_world(&mut self, config: WorldConfig) -> Result<()> {
        if self.world.is_some() {
            return Err(PhysicsError::InvalidParameter("the world is already built".into()));
        }
        if config.fixed_time_step <= 0.0 || !config.fixed_time_step.is_finite() {
            return Err(PhysicsError::InvalidParameter(format!(
                "fixed time step must be positive, got {}",
                config.fixed_time_step
            )));
        }

        log::info!(
            "building world: gravity {}, fixed step {}s, soft bodies {}",
            config.gravity,
            config.fixed_time_step,
            config.soft_bodies
        );
        self.fixed_time_step = config.fixed_time_step;
        self.chunk = config.report_chunk_size.max(1);
        self.world = Some(DynamicsWorld::new(config));
        self.outbox.push(ControlMessage::WorldReady.into());
        Ok(())
    }

    fn add_object(&mut self, description: ObjectDescription) -> Result<()> {
        let id = description.id;
        check_id(id.0, "body")?;
        if self.bodies.contains(id.index()) {
            return Err(PhysicsError::InvalidParameter(format!("body {} is already registered", id)));
        }

        let record = match description.shape.soft_layout() {
            Some(layout) => self.build_soft_body(&description, layout)?,
            None => self.build_rigid_body(&description)?,
        };
        log::debug!("registered {} body {}", record.type_name, id);
        self.bodies.insert(id.index(), record);
        self.outbox.push(ControlMessage::ObjectReady(id).into());
        Ok(())
    }

    fn build_rigid_body(&mut self, description: &ObjectDescription) -> Result<BodyRecord> {
        let world = self.world.as_mut().ok_or(PhysicsError::NotInitialized("world"))?;
        let shape = build_shape(&description.shape, &mut self.shapes)?;

        let transform = Transform::new(description.position, description.rotation.normalize());
        let mut body = RigidBody::new(shape.shape(), transform, description.mass);
        body.set_material(Material::new(description.friction, description.restitution));
        body.set_damping(description.linear_damping, description.angular_damping);
        body.set_collision_filter(description.collision_group, description.collision_mask);

        let handle = world.add_body(body);
        self.ids_by_handle.insert(handle, description.id);
        self.rigid_count += 1;

        Ok(BodyRecord {
            id: description.id,
            kind: BodyKind::Rigid,
            native: NativeBody::Rigid(handle),
            type_name: description.shape.type_name(),
            soft_layout: None,
            shape: Some(shape),
        })
    }

    fn build_soft_body(&mut self, description: &ObjectDescription, layout: SoftLayout) -> Result<BodyRecord> {
        let world = self.world.as_mut().ok_or(PhysicsError::NotInitialized("world"))?;
        if !world.get_config().soft_bodies {
            return Err(PhysicsError::InvalidParameter(format!(
                "body {}: soft bodies are disabled in this world",
                description.id
            )));
        }

        let parameters = description.soft.clone();
        let mass = description.mass;
        let soft = match &description.shape {
            ShapeDescription::SoftRopeMesh { start, end, segments } => {
                SoftBody::rope(*start, *end, *segments, mass, parameters)
            }
            ShapeDescription::SoftClothMesh { corners, segments_x, segments_z } => {
                SoftBody::cloth(*corners, *segments_x, *segments_z, mass, parameters)
            }
            ShapeDescription::SoftTrimesh { vertices, indices } => {
                SoftBody::trimesh(vertices.clone(), indices, mass, parameters)
            }
            other => return Err(PhysicsError::UnknownShape(other.type_name().to_string())),
        };
        let mut soft = soft.ok_or_else(|| {
            PhysicsError::InvalidParameter(format!("{} description has no usable geometry", description.shape.type_name()))
        })?;

        soft.apply_transform(&Transform::new(description.position, description.rotation.normalize()));
        soft.set_collision_filter(description.collision_group, description.collision_mask);

        let handle = world.add_soft_body(soft);
        self.soft_count += 1;

        Ok(BodyRecord {
            id: description.id,
            kind: BodyKind::Soft,
            native: NativeBody::Soft(handle),
            type_name: description.shape.type_name(),
            soft_layout: Some(layout),
            shape: None,
        })
    }

    fn remove_object(&mut self, id: BodyId) -> Result<()> {
        let native = self.body_record(id)?.native;

        let joints: Vec<ConstraintId> = self
            .joints
            .iter()
            .filter(|(_, joint)| joint.body_a == id || joint.body_b == Some(id))
            .map(|(_, joint)| joint.id)
            .collect();
        for joint in joints {
            self.remove_constraint(joint)?;
        }

        let vehicles: Vec<VehicleId> = self
            .vehicles
            .iter()
            .filter(|(_, vehicle)| vehicle.chassis == id)
            .map(|(_, vehicle)| vehicle.id)
            .collect();
        for vehicle in vehicles {
            self.remove_vehicle(vehicle)?;
        }

        let world = self.world_mut()?;
        match native {
            NativeBody::Rigid(handle) => {
                world.remove_body(handle)?;
                self.ids_by_handle.remove(&handle);
            }
            NativeBody::Soft(handle) => {
                world.remove_soft_body(handle)?;
            }
        }

        if let Some(record) = self.bodies.remove(id.index()) {
            match record.kind {
                BodyKind::Rigid => self.rigid_count = self.rigid_count.saturating_sub(1),
                BodyKind::Soft => self.soft_count = self.soft_count.saturating_sub(1),
            }
            if record.owns_shape() {
                log::trace!("released {} shape of body {}", record.type_name, id);
            }
        }
        Ok(())
    }

    fn update_transform(&mut self, update: TransformUpdate) -> Result<()> {
        let native = self.body_record(update.id)?.native;
        let world = self.world_mut()?;
        match native {
            NativeBody::Rigid(handle) => {
                let body = world.get_body_mut(handle)?;
                let mut transform = body.get_transform();
                if let Some(position) = update.pos {
                    transform.position = position;
                }
                if let Some(rotation) = update.quat {
                    transform.rotation = rotation.normalize();
                }
                body.set_transform(transform);
                body.wake_up();
            }
            NativeBody::Soft(handle) => {
                // Soft nodes are absolute; the update is applied as an offset
                let mut scratch = Transform::identity();
                if let Some(position) = update.pos {
                    scratch.position = position;
                }
                if let Some(rotation) = update.quat {
                    scratch.rotation = rotation.normalize();
                }
                world.get_soft_body_mut(handle)?.apply_transform(&scratch);
            }
        }
        Ok(())
    }

    fn append_anchor(&mut self, anchor: &AnchorDescription) -> Result<()> {
        let soft = self.soft_handle(anchor.soft_body)?;
        let rigid = self.rigid_handle(anchor.rigid_body)?;
        self.world_mut()?.append_anchor(
            soft,
            anchor.node,
            rigid,
            anchor.influence,
            anchor.collision_between_linked_bodies,
        )
    }

    fn add_vehicle(&mut self, description: VehicleDescription) -> Result<()> {
        check_id(description.id.0, "vehicle")?;
        if self.vehicles.contains(description.id.index()) {
            return Err(PhysicsError::InvalidParameter(format!("vehicle {} is already registered", description.id)));
        }

        let chassis = self.rigid_handle(description.chassis)?;
        let world = self.world_mut()?;
        let handle = world.add_vehicle(RaycastVehicle::new(chassis, description.tuning))?;
        let body = world.get_body_mut(chassis)?;
        body.set_can_sleep(false);
        body.wake_up();

        self.vehicles.insert(
            description.id.index(),
            VehicleRecord {
                id: description.id,
                chassis: description.chassis,
                handle,
                wheels: 0,
            },
        );
        Ok(())
    }

    fn remove_vehicle(&mut self, id: VehicleId) -> Result<()> {
        let handle = self.vehicle_record(id)?.handle;
        self.world_mut()?.remove_vehicle(handle)?;
        if let Some(record) = self.vehicles.remove(id.index()) {
            self.wheel_count = self.wheel_count.saturating_sub(record.wheels);
        }
        Ok(())
    }

    fn add_wheel(&mut self, description: WheelDescription) -> Result<()> {
        let handle = self.vehicle_record(description.vehicle)?.handle;
        let world = self.world_mut()?;
        let chassis = world.get_body(world.get_vehicle(handle)?.get_chassis())?.get_transform();

        let vehicle = world.get_vehicle_mut(handle)?;
        vehicle.add_wheel(
            description.connection_point,
            description.wheel_direction,
            description.wheel_axle,
            description.suspension_rest_length,
            description.wheel_radius,
            description.tuning,
            description.is_front_wheel,
        );
        vehicle.update_wheel_transforms(&chassis);

        if let Some(record) = self.vehicles.get_mut(description.vehicle.index()) {
            record.wheels += 1;
        }
        self.wheel_count += 1;

        let len = chunked_len(VEHICLE_HEADER, self.wheel_count, VEHICLE_STRIDE, self.chunk);
        let buffer = self.buffers.get_mut(ReportKind::Vehicle);
        ensure_len(buffer, len);
        buffer[0] = ReportKind::Vehicle.tag();
        Ok(())
    }

    fn add_constraint(&mut self, description: ConstraintDescription) -> Result<()> {
        check_id(description.id.0, "constraint")?;
        if self.joints.contains(description.id.index()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "constraint {} is already registered",
                description.id
            )));
        }

        let a = self.rigid_handle(description.object_a)?;
        let b = description.object_b.map(|b| self.rigid_handle(b)).transpose()?;
        let (pivot_a, pivot_b, axis) = (description.position_a, description.position_b, description.axis);

        let joint: Box<dyn Constraint> = match description.kind {
            ConstraintKind::Point => Box::new(PointConstraint::new(a, b, pivot_a, pivot_b)),
            ConstraintKind::Hinge => Box::new(HingeConstraint::new(a, b, pivot_a, pivot_b, axis)),
            ConstraintKind::Slider => Box::new(SliderConstraint::new(a, b, pivot_a, pivot_b, axis)),
            ConstraintKind::ConeTwist => {
                let b = b.ok_or_else(|| {
                    PhysicsError::InvalidParameter(format!("conetwist constraint {} needs two bodies", description.id))
                })?;
                Box::new(ConeTwistConstraint::new(a, b, pivot_a, pivot_b, axis))
            }
            ConstraintKind::Dof => Box::new(DofConstraint::new(a, b, pivot_a, pivot_b, axis)),
        };
        let handle = self.world_mut()?.add_joint(joint)?;

        self.joints.insert(
            description.id.index(),
            JointRecord {
                id: description.id,
                kind: description.kind,
                body_a: description.object_a,
                body_b: description.object_b,
                handle,
            },
        );
        self.joint_count += 1;

        let len = chunked_len(CONSTRAINT_HEADER, self.joint_count, CONSTRAINT_STRIDE, self.chunk);
        let buffer = self.buffers.get_mut(ReportKind::Constraint);
        ensure_len(buffer, len);
        buffer[0] = ReportKind::Constraint.tag();
        Ok(())
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<()> {
        let handle = self.joint_record(id)?.handle;
        self.world_mut()?.remove_joint(handle)?;
        self.joints.remove(id.index());
        self.joint_count = self.joint_count.saturating_sub(1);
        Ok(())
    }

    /// Steps the world and reports. The reports go out even when the step
    /// is rejected; if they cannot be written the main thread gets
    /// `StepFailed` instead, so it never waits on a report that is not coming.
    fn simulate(&mut self, params: SimulateParams) -> Result<()> {
        let stepped = self.step(params);
        if let Err(err) = self.send_reports() {
            self.outbox.push(ControlMessage::StepFailed(err.to_string()).into());
            return Err(err);
        }
        stepped
    }

    fn step(&mut self, params: SimulateParams) -> Result<()> {
        let fixed = self.fixed_time_step;
        let now = Instant::now();
        let elapsed = match (params.time_step, self.last_simulate) {
            (Some(step), _) => step,
            (None, Some(previous)) => now.duration_since(previous).as_secs_f32(),
            (None, None) => fixed,
        };
        self.last_simulate = Some(now);
        if !elapsed.is_finite() {
            return Err(PhysicsError::SimulationError(format!("time step {} is not finite", elapsed)));
        }

        let time_step = elapsed.max(fixed);
        let max_sub_steps = params
            .max_sub_steps
            .unwrap_or_else(|| (time_step / fixed).ceil() as u32);

        let steps = self.world_mut()?.step_simulation(time_step, max_sub_steps, fixed);
        log::trace!("simulated {}s in {} sub-steps", time_step, steps);
        Ok(())
    }
}

fn axis_result(found: bool, which: usize) -> Result<()> {
    if found {
        Ok(())
    } else {
        Err(PhysicsError::InvalidParameter(format!("6-DOF motor axis {which} is out of range")))
    }
}
