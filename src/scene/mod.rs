//! The main-thread side of the bridge.
//!
//! [`PhysicsScene`] allocates ids, keeps a shadow of every body, vehicle and
//! joint, forwards commands to the worker and applies the reports that come
//! back. Commands issued before the worker reports `WorldReady` wait in a
//! defer queue and run in order once it does.

mod collisions;
mod decode;
mod object;

pub use self::collisions::{build_adjacency, reconcile, Adjacency, NormalOwner};
pub use self::decode::{apply_constraint_report, apply_soft_report, apply_vehicle_report, apply_world_report};
pub use self::object::{DirtyFlags, SceneConstraint, SceneObject, SceneVehicle};

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;

use crate::bodies::VehicleTuning;
use crate::core::{BodyId, ConstraintId, EventQueue, IdAllocator, SceneConfig, SceneEvent, VehicleId};
use crate::error::PhysicsError;
use crate::math::{Quaternion, Vector3};
use crate::protocol::report::report_kind;
use crate::protocol::{
    AnchorDescription, BodyRef, Command, ConstraintDescription, ConstraintRef, ControlMessage, DampingParams,
    MainMessage, MassParams, ObjectDescription, PointForce, ReportKind, ScalarParams, SimulateParams, SoftLayout,
    ThresholdParams, TransformUpdate, VectorParams, VehicleDescription, VehicleRef, WheelDescription, WheelValue,
    WorkerMessage,
};
use crate::transport::{self, channel_pair, Port, TransferMode};
use crate::worker::PhysicsWorker;
use crate::Result;

/// Port type held by the scene
pub type ScenePort = Port<MainMessage, WorkerMessage>;

/// Work queued until the worker's world exists
pub type DeferredTask = Box<dyn FnOnce(&mut PhysicsScene) + Send>;

/// The main-thread physics scene
pub struct PhysicsScene {
    port: ScenePort,
    worker: Option<PhysicsWorker>,
    config: SceneConfig,
    transfer: TransferMode,

    ids: IdAllocator,
    objects: BTreeMap<BodyId, SceneObject>,
    soft_layouts: HashMap<BodyId, SoftLayout>,
    vehicles: BTreeMap<VehicleId, SceneVehicle>,
    constraints: BTreeMap<ConstraintId, SceneConstraint>,

    events: EventQueue,
    deferred: VecDeque<DeferredTask>,
    is_loaded: bool,
    is_simulating: bool,
}

impl PhysicsScene {
    /// Starts a worker thread and begins the handshake with it
    pub fn new(config: SceneConfig) -> Result<Self> {
        let (port, worker_port) = channel_pair();
        let worker = PhysicsWorker::spawn(worker_port)?;
        let mut scene = Self::connect(config, port)?;
        scene.worker = Some(worker);
        Ok(scene)
    }

    /// Begins the handshake with a worker served elsewhere
    pub fn connect(config: SceneConfig, port: ScenePort) -> Result<Self> {
        let transfer = transport::probe(config.transport.transferables, |bytes| port.post(MainMessage::Probe(bytes)))?;
        port.post(Command::Init(config.transport.clone()))?;

        Ok(Self {
            port,
            worker: None,
            config,
            transfer,
            ids: IdAllocator::new(),
            objects: BTreeMap::new(),
            soft_layouts: HashMap::new(),
            vehicles: BTreeMap::new(),
            constraints: BTreeMap::new(),
            events: EventQueue::new(),
            deferred: VecDeque::new(),
            is_loaded: false,
            is_simulating: false,
        })
    }

    pub fn get_config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn get_transfer_mode(&self) -> TransferMode {
        self.transfer
    }

    /// Whether the worker has reported `WorldReady`
    pub fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    /// Whether a step is in flight
    pub fn is_simulating(&self) -> bool {
        self.is_simulating
    }

    /// Number of tasks waiting for the world
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Posts a command to the worker right away
    pub fn execute(&self, command: Command) -> Result<()> {
        log::trace!("posting {}", command.name());
        self.port.post(command)
    }

    /// Runs `task` now if the world is ready, otherwise once it is
    pub fn defer<F>(&mut self, task: F)
    where
        F: FnOnce(&mut PhysicsScene) + Send + 'static,
    {
        if self.is_loaded {
            task(self);
        } else {
            self.deferred.push_back(Box::new(task));
        }
    }

    /// Posts a command once the world is ready
    pub fn execute_when_ready(&mut self, command: Command) {
        self.defer(move |scene| {
            let name = command.name().to_owned();
            if let Err(err) = scene.execute(command) {
                log::warn!("failed to post {}: {}", name, err);
            }
        });
    }

    /// Handles every message already waiting and returns how many there were
    pub fn poll(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Some(message) = self.port.try_recv()? {
            self.handle_message(message)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Blocks until the worker reports `WorldReady`, up to the configured timeout
    pub fn wait_until_ready(&mut self) -> Result<()> {
        self.wait_while(|scene| !scene.is_loaded, "world")
    }

    /// Blocks until the step in flight has been reported, up to the configured timeout
    pub fn wait_for_update(&mut self) -> Result<()> {
        self.wait_while(|scene| scene.is_simulating, "world report")
    }

    fn wait_while(&mut self, pending: impl Fn(&Self) -> bool, what: &'static str) -> Result<()> {
        let deadline = Instant::now() + self.config.ready_timeout;
        while pending(self) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PhysicsError::Timeout(what));
            }
            if let Some(message) = self.port.recv_timeout(remaining)? {
                self.handle_message(message)?;
            }
        }
        Ok(())
    }

    /// Applies one message from the worker
    pub fn handle_message(&mut self, message: WorkerMessage) -> Result<()> {
        match message {
            WorkerMessage::Report(buffer) => self.handle_report(buffer),
            WorkerMessage::Control(control) => self.handle_control(control),
            WorkerMessage::Probe(bytes) => {
                if !transport::is_probe(&bytes) {
                    log::warn!("ignoring {}-byte probe of unexpected size", bytes.len());
                }
                Ok(())
            }
        }
    }

    fn handle_control(&mut self, control: ControlMessage) -> Result<()> {
        match control {
            ControlMessage::EngineLoaded => {
                log::debug!("engine loaded, building world");
                self.execute(Command::MakeWorld(self.config.world.clone()))
            }
            ControlMessage::WorldReady => {
                log::debug!("world ready, running {} deferred tasks", self.deferred.len());
                self.is_loaded = true;
                self.events.push(SceneEvent::Ready);
                while let Some(task) = self.deferred.pop_front() {
                    task(self);
                }
                Ok(())
            }
            ControlMessage::ObjectReady(id) => {
                self.events.push(SceneEvent::ObjectReady(id));
                Ok(())
            }
            ControlMessage::StepFailed(reason) => {
                log::warn!("step produced no world report: {}", reason);
                self.is_simulating = false;
                Ok(())
            }
            ControlMessage::Debug(text) => {
                log::debug!("worker: {}", text);
                Ok(())
            }
        }
    }

    fn handle_report(&mut self, buffer: Vec<f32>) -> Result<()> {
        match report_kind(&buffer) {
            Some(kind) => {
                if let Err(err) = self.apply_report(kind, &buffer) {
                    log::warn!("dropping {:?} report: {}", kind, err);
                }
            }
            None => match buffer.first() {
                Some(tag) => log::warn!("unknown report tag {}", tag),
                None => log::warn!("dropping empty report buffer"),
            },
        }

        if self.transfer.is_transfer() && !buffer.is_empty() {
            self.port.post(MainMessage::Buffer(buffer))?;
        }
        Ok(())
    }

    fn apply_report(&mut self, kind: ReportKind, data: &[f32]) -> Result<()> {
        match kind {
            ReportKind::World => {
                // Whatever the payload, the step is over.
                self.is_simulating = false;
                let applied = apply_world_report(&mut self.objects, data)?;
                log::trace!("applied world report to {} bodies", applied);
                self.events.push(SceneEvent::Update);
            }
            ReportKind::Collision => {
                let legacy = self.config.legacy_relative_angular_velocity;
                for event in reconcile(&mut self.objects, data, legacy)? {
                    self.events.push(SceneEvent::Collision(event));
                }
            }
            ReportKind::Vehicle => {
                apply_vehicle_report(&mut self.vehicles, data)?;
            }
            ReportKind::Constraint => {
                apply_constraint_report(&mut self.constraints, &self.objects, data)?;
            }
            ReportKind::Soft => {
                apply_soft_report(&mut self.objects, &self.soft_layouts, data)?;
            }
        }
        Ok(())
    }

    /// Pushes local transform edits and asks the worker to step.
    ///
    /// Returns `Ok(false)` without doing anything while the world is not
    /// ready or the previous step has not been reported yet. A non-finite
    /// `time_step` is an error.
    pub fn simulate(&mut self, time_step: Option<f32>, max_sub_steps: Option<u32>) -> Result<bool> {
        if let Some(step) = time_step.filter(|step| !step.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!("time step {step} is not finite")));
        }
        if !self.is_loaded || self.is_simulating {
            return Ok(false);
        }

        let updates: Vec<TransformUpdate> = self
            .objects
            .values_mut()
            .filter_map(|object| {
                let dirty = object.take_dirty();
                if dirty.is_empty() {
                    return None;
                }
                Some(TransformUpdate {
                    id: object.get_id(),
                    pos: dirty.contains(DirtyFlags::POSITION).then(|| object.get_position()),
                    quat: dirty.contains(DirtyFlags::ROTATION).then(|| object.get_rotation()),
                })
            })
            .collect();
        for update in updates {
            self.execute(Command::UpdateTransform(update))?;
        }

        self.is_simulating = true;
        self.execute(Command::Simulate(SimulateParams {
            time_step,
            max_sub_steps,
        }))?;
        Ok(true)
    }

    /// Tells the worker to measure the next wall-clock step from now
    pub fn on_simulation_resume(&mut self) {
        self.execute_when_ready(Command::OnSimulationResume);
    }

    pub fn set_gravity(&mut self, gravity: Vector3) {
        self.config.world.gravity = gravity;
        self.execute_when_ready(Command::SetGravity(gravity));
    }

    pub fn set_fixed_time_step(&mut self, fixed_time_step: f32) {
        self.config.world.fixed_time_step = fixed_time_step;
        self.execute_when_ready(Command::SetFixedTimeStep(fixed_time_step));
    }

    /// Registers a body and returns the id assigned to it
    pub fn add_object(&mut self, mut description: ObjectDescription) -> BodyId {
        let id = self.ids.next_body();
        description.id = id;

        if let Some(layout) = description.shape.soft_layout() {
            self.soft_layouts.insert(id, layout);
        }
        self.objects.insert(id, SceneObject::new(&description));
        self.execute_when_ready(Command::AddObject(Box::new(description)));
        id
    }

    /// Removes a body along with the vehicles and joints built on it
    pub fn remove_object(&mut self, id: BodyId) -> Result<()> {
        if self.objects.remove(&id).is_none() {
            return Err(PhysicsError::ResourceNotFound(format!("body {}", id)));
        }

        for object in self.objects.values_mut() {
            object.touches_mut().retain(|touch| *touch != id);
        }
        self.vehicles.retain(|_, vehicle| vehicle.get_chassis() != id);
        self.constraints.retain(|_, constraint| !constraint.involves(id));

        self.execute_when_ready(Command::RemoveObject(BodyRef { id }));
        Ok(())
    }

    pub fn get_object(&self, id: BodyId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_object_mut(&mut self, id: BodyId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    /// All shadow bodies in id order
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn object_mut(&mut self, id: BodyId) -> Result<&mut SceneObject> {
        self.objects
            .get_mut(&id)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("body {}", id)))
    }

    /// Moves a body; sent with the next simulate
    pub fn set_position(&mut self, id: BodyId, position: Vector3) -> Result<()> {
        self.object_mut(id)?.set_position(position);
        Ok(())
    }

    /// Rotates a body; sent with the next simulate
    pub fn set_rotation(&mut self, id: BodyId, rotation: Quaternion) -> Result<()> {
        self.object_mut(id)?.set_rotation(rotation);
        Ok(())
    }

    fn body_command(&mut self, id: BodyId, command: Command) -> Result<()> {
        if !self.objects.contains_key(&id) {
            return Err(PhysicsError::ResourceNotFound(format!("body {}", id)));
        }
        self.execute_when_ready(command);
        Ok(())
    }

    pub fn update_mass(&mut self, id: BodyId, mass: f32) -> Result<()> {
        self.object_mut(id)?.set_mass(mass);
        self.body_command(id, Command::UpdateMass(MassParams { id, mass }))
    }

    pub fn apply_central_impulse(&mut self, id: BodyId, impulse: Vector3) -> Result<()> {
        self.body_command(id, Command::ApplyCentralImpulse(VectorParams { id, vector: impulse }))
    }

    /// Applies an impulse at an offset from the center of mass
    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vector3, relative_position: Vector3) -> Result<()> {
        let params = PointForce {
            id,
            vector: impulse,
            relative_position,
        };
        self.body_command(id, Command::ApplyImpulse(params))
    }

    pub fn apply_torque(&mut self, id: BodyId, torque: Vector3) -> Result<()> {
        self.body_command(id, Command::ApplyTorque(VectorParams { id, vector: torque }))
    }

    pub fn apply_central_force(&mut self, id: BodyId, force: Vector3) -> Result<()> {
        self.body_command(id, Command::ApplyCentralForce(VectorParams { id, vector: force }))
    }

    /// Applies a force at an offset from the center of mass
    pub fn apply_force(&mut self, id: BodyId, force: Vector3, relative_position: Vector3) -> Result<()> {
        let params = PointForce {
            id,
            vector: force,
            relative_position,
        };
        self.body_command(id, Command::ApplyForce(params))
    }

    pub fn set_linear_velocity(&mut self, id: BodyId, velocity: Vector3) -> Result<()> {
        self.object_mut(id)?.set_linear_velocity(velocity);
        self.body_command(id, Command::SetLinearVelocity(VectorParams { id, vector: velocity }))
    }

    pub fn set_angular_velocity(&mut self, id: BodyId, velocity: Vector3) -> Result<()> {
        self.object_mut(id)?.set_angular_velocity(velocity);
        self.body_command(id, Command::SetAngularVelocity(VectorParams { id, vector: velocity }))
    }

    pub fn set_linear_factor(&mut self, id: BodyId, factor: Vector3) -> Result<()> {
        self.body_command(id, Command::SetLinearFactor(VectorParams { id, vector: factor }))
    }

    pub fn set_angular_factor(&mut self, id: BodyId, factor: Vector3) -> Result<()> {
        self.body_command(id, Command::SetAngularFactor(VectorParams { id, vector: factor }))
    }

    pub fn set_damping(&mut self, id: BodyId, linear: f32, angular: f32) -> Result<()> {
        self.body_command(id, Command::SetDamping(DampingParams { id, linear, angular }))
    }

    pub fn set_ccd_motion_threshold(&mut self, id: BodyId, value: f32) -> Result<()> {
        self.body_command(id, Command::SetCcdMotionThreshold(ScalarParams { id, value }))
    }

    pub fn set_ccd_swept_sphere_radius(&mut self, id: BodyId, value: f32) -> Result<()> {
        self.body_command(id, Command::SetCcdSweptSphereRadius(ScalarParams { id, value }))
    }

    /// Pins a soft body node to a rigid body
    pub fn append_anchor(&mut self, anchor: AnchorDescription) -> Result<()> {
        for id in [anchor.soft_body, anchor.rigid_body] {
            if !self.objects.contains_key(&id) {
                return Err(PhysicsError::ResourceNotFound(format!("body {}", id)));
            }
        }
        self.execute_when_ready(Command::AppendAnchor(anchor));
        Ok(())
    }

    /// Builds a raycast vehicle on an existing chassis body
    pub fn add_vehicle(&mut self, chassis: BodyId, tuning: VehicleTuning) -> Result<VehicleId> {
        if !self.objects.contains_key(&chassis) {
            return Err(PhysicsError::ResourceNotFound(format!("chassis body {}", chassis)));
        }
        let id = self.ids.next_vehicle();
        self.vehicles.insert(id, SceneVehicle::new(id, chassis));
        self.execute_when_ready(Command::AddVehicle(VehicleDescription { id, chassis, tuning }));
        Ok(id)
    }

    /// Appends a wheel and returns its index on the vehicle
    pub fn add_wheel(&mut self, description: WheelDescription) -> Result<usize> {
        let vehicle = self
            .vehicles
            .get_mut(&description.vehicle)
            .ok_or_else(|| PhysicsError::ResourceNotFound(format!("vehicle {}", description.vehicle)))?;
        let wheel = vehicle.push_wheel();
        self.execute_when_ready(Command::AddWheel(description));
        Ok(wheel)
    }

    pub fn remove_vehicle(&mut self, id: VehicleId) -> Result<()> {
        if self.vehicles.remove(&id).is_none() {
            return Err(PhysicsError::ResourceNotFound(format!("vehicle {}", id)));
        }
        self.execute_when_ready(Command::RemoveVehicle(VehicleRef { id }));
        Ok(())
    }

    pub fn get_vehicle(&self, id: VehicleId) -> Option<&SceneVehicle> {
        self.vehicles.get(&id)
    }

    fn wheel_command(&mut self, id: VehicleId, command: Command) -> Result<()> {
        if !self.vehicles.contains_key(&id) {
            return Err(PhysicsError::ResourceNotFound(format!("vehicle {}", id)));
        }
        self.execute_when_ready(command);
        Ok(())
    }

    pub fn set_steering(&mut self, id: VehicleId, wheel: usize, value: f32) -> Result<()> {
        self.wheel_command(id, Command::SetSteering(WheelValue { id, wheel, value }))
    }

    pub fn set_brake(&mut self, id: VehicleId, wheel: usize, value: f32) -> Result<()> {
        self.wheel_command(id, Command::SetBrake(WheelValue { id, wheel, value }))
    }

    pub fn apply_engine_force(&mut self, id: VehicleId, wheel: usize, value: f32) -> Result<()> {
        self.wheel_command(id, Command::ApplyEngineForce(WheelValue { id, wheel, value }))
    }

    /// Builds a joint between existing bodies and returns its id
    pub fn add_constraint(&mut self, mut description: ConstraintDescription) -> Result<ConstraintId> {
        for id in std::iter::once(description.object_a).chain(description.object_b) {
            if !self.objects.contains_key(&id) {
                return Err(PhysicsError::ResourceNotFound(format!("body {}", id)));
            }
        }

        let id = self.ids.next_constraint();
        description.id = id;
        self.constraints.insert(
            id,
            SceneConstraint::new(id, description.kind, description.object_a, description.object_b),
        );
        self.execute_when_ready(Command::AddConstraint(description));
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<()> {
        if self.constraints.remove(&id).is_none() {
            return Err(PhysicsError::ResourceNotFound(format!("constraint {}", id)));
        }
        self.execute_when_ready(Command::RemoveConstraint(ConstraintRef { id }));
        Ok(())
    }

    pub fn get_constraint(&self, id: ConstraintId) -> Option<&SceneConstraint> {
        self.constraints.get(&id)
    }

    /// Breaks the joint once a step needs more than `threshold` impulse
    pub fn set_breaking_impulse_threshold(&mut self, id: ConstraintId, threshold: f32) -> Result<()> {
        if !self.constraints.contains_key(&id) {
            return Err(PhysicsError::ResourceNotFound(format!("constraint {}", id)));
        }
        self.execute_when_ready(Command::ConstraintSetBreakingImpulseThreshold(ThresholdParams { id, threshold }));
        Ok(())
    }

    pub fn next_event(&mut self) -> Option<SceneEvent> {
        self.events.next_event()
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain()
    }

    pub fn get_events(&self) -> &EventQueue {
        &self.events
    }

    /// Hangs up on the worker and waits for its thread to stop
    pub fn shutdown(self) -> Result<()> {
        let Self { port, worker, .. } = self;
        drop(port);
        match worker {
            Some(worker) => worker.join(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for PhysicsScene {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PhysicsScene")
            .field("is_loaded", &self.is_loaded)
            .field("is_simulating", &self.is_simulating)
            .field("transfer", &self.transfer)
            .field("objects", &self.objects.len())
            .field("vehicles", &self.vehicles.len())
            .field("constraints", &self.constraints.len())
            .field("deferred", &self.deferred.len())
            .finish()
    }
}
