use crate::bodies::RigidBody;
use crate::core::{BodyHandle, HandleStorage};
use crate::math::{self, Vector3, Quaternion, Matrix3};
use crate::protocol::ConstraintKind;

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;

/// Error reduction applied by joints each step
pub const JOINT_ERP: f32 = 0.2;

/// Velocity state of one body while the solver runs
#[derive(Debug, Clone)]
pub struct SolverBody {
    /// Source body; `None` for the fixed world
    pub handle: Option<BodyHandle>,

    /// Center of mass in world space
    pub position: Vector3,

    /// Orientation in world space
    pub rotation: Quaternion,

    /// Linear velocity
    pub linear_velocity: Vector3,

    /// Angular velocity
    pub angular_velocity: Vector3,

    /// Inverse mass; zero for static and sleeping bodies
    pub inv_mass: f32,

    /// Inverse inertia in world space
    pub inv_inertia: Matrix3,

    /// Per-axis linear factor
    pub linear_factor: Vector3,

    /// Per-axis angular factor
    pub angular_factor: Vector3,
}

impl SolverBody {
    /// An immovable body at the origin
    pub fn fixed() -> Self {
        Self {
            handle: None,
            position: Vector3::zero(),
            rotation: Quaternion::identity(),
            linear_velocity: Vector3::zero(),
            angular_velocity: Vector3::zero(),
            inv_mass: 0.0,
            inv_inertia: Matrix3::zeros(),
            linear_factor: Vector3::zero(),
            angular_factor: Vector3::zero(),
        }
    }

    /// Snapshot of a rigid body
    pub fn from_body(handle: BodyHandle, body: &RigidBody) -> Self {
        let movable = body.is_dynamic() && !body.is_sleeping();
        Self {
            handle: Some(handle),
            position: body.get_position(),
            rotation: body.get_rotation(),
            linear_velocity: body.get_linear_velocity(),
            angular_velocity: body.get_angular_velocity(),
            inv_mass: if movable { body.get_inverse_mass() } else { 0.0 },
            inv_inertia: if movable { *body.get_inverse_inertia_tensor_world() } else { Matrix3::zeros() },
            linear_factor: body.get_linear_factor(),
            angular_factor: body.get_angular_factor(),
        }
    }

    /// Whether impulses can move this body
    pub fn is_movable(&self) -> bool {
        self.inv_mass > 0.0
    }

    /// Velocity of a point given relative to the center of mass
    pub fn velocity_at(&self, relative: Vector3) -> Vector3 {
        self.linear_velocity + self.angular_velocity.cross(&relative)
    }

    /// Applies a linear and an angular impulse
    pub fn apply_impulse(&mut self, linear: Vector3, angular: Vector3) {
        if !self.is_movable() {
            return;
        }
        self.linear_velocity += linear.component_mul(&self.linear_factor) * self.inv_mass;
        self.angular_velocity += math::mul_matrix_vector(&self.inv_inertia, angular).component_mul(&self.angular_factor);
    }

    fn inverse_mass_along(&self, linear: Vector3, angular: Vector3) -> f32 {
        let linear_part = linear.component_mul(&self.linear_factor).dot(&linear) * self.inv_mass;
        let angular_part = math::mul_matrix_vector(&self.inv_inertia, angular)
            .component_mul(&self.angular_factor)
            .dot(&angular);
        linear_part + angular_part
    }
}

/// The solver bodies of one step, with the fixed world at index 0
#[derive(Debug)]
pub struct SolverBodies {
    bodies: Vec<SolverBody>,
    index: HashMap<BodyHandle, usize>,
}

impl SolverBodies {
    /// Snapshots every rigid body
    pub fn gather(storage: &HandleStorage<BodyHandle, RigidBody>) -> Self {
        let mut bodies = Vec::with_capacity(storage.len() + 1);
        let mut index = HashMap::with_capacity(storage.len());
        bodies.push(SolverBody::fixed());
        for (handle, body) in storage.iter() {
            index.insert(handle, bodies.len());
            bodies.push(SolverBody::from_body(handle, body));
        }
        Self { bodies, index }
    }

    /// Index of a body; `None` and unknown handles map to the fixed world
    pub fn index_of(&self, handle: Option<BodyHandle>) -> usize {
        handle.and_then(|h| self.index.get(&h).copied()).unwrap_or(0)
    }

    /// Returns a solver body by index
    pub fn get(&self, index: usize) -> &SolverBody {
        &self.bodies[index]
    }

    /// Two distinct solver bodies at once
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut SolverBody, &mut SolverBody)> {
        if a == b || a >= self.bodies.len() || b >= self.bodies.len() {
            return None;
        }
        if a < b {
            let (low, high) = self.bodies.split_at_mut(b);
            Some((&mut low[a], &mut high[0]))
        } else {
            let (low, high) = self.bodies.split_at_mut(a);
            Some((&mut high[0], &mut low[b]))
        }
    }

    /// Copies solved velocities back into the rigid bodies
    pub fn write_back(&self, storage: &mut HandleStorage<BodyHandle, RigidBody>) {
        for solver_body in &self.bodies[1..] {
            if !solver_body.is_movable() {
                continue;
            }
            if let Some(body) = solver_body.handle.and_then(|h| storage.get_mut(h)) {
                body.store_velocities(solver_body.linear_velocity, solver_body.angular_velocity);
            }
        }
    }
}

/// One scalar velocity constraint between two solver bodies
#[derive(Debug, Clone)]
pub struct JacobianRow {
    linear_a: Vector3,
    angular_a: Vector3,
    linear_b: Vector3,
    angular_b: Vector3,
    effective_mass: f32,

    /// Target relative velocity along the row
    pub rhs: f32,

    /// Lower bound of the accumulated impulse
    pub lower: f32,

    /// Upper bound of the accumulated impulse
    pub upper: f32,

    /// Impulse accumulated this step
    pub accumulated: f32,
}

impl JacobianRow {
    fn build(a: &SolverBody, b: &SolverBody, linear_a: Vector3, angular_a: Vector3, linear_b: Vector3, angular_b: Vector3) -> Self {
        let k = a.inverse_mass_along(linear_a, angular_a) + b.inverse_mass_along(linear_b, angular_b);
        Self {
            linear_a,
            angular_a,
            linear_b,
            angular_b,
            effective_mass: if k > math::EPSILON { 1.0 / k } else { 0.0 },
            rhs: 0.0,
            lower: f32::NEG_INFINITY,
            upper: f32::INFINITY,
            accumulated: 0.0,
        }
    }

    /// Relative point velocity along `axis`, with lever arms `ra` and `rb`
    pub fn linear(a: &SolverBody, b: &SolverBody, ra: Vector3, rb: Vector3, axis: Vector3) -> Self {
        Self::build(a, b, -axis, -ra.cross(&axis), axis, rb.cross(&axis))
    }

    /// Relative angular velocity about `axis`
    pub fn angular(a: &SolverBody, b: &SolverBody, axis: Vector3) -> Self {
        Self::build(a, b, Vector3::zero(), -axis, Vector3::zero(), axis)
    }

    /// Sets the target velocity
    pub fn with_rhs(mut self, rhs: f32) -> Self {
        self.rhs = rhs;
        self
    }

    /// Sets the impulse bounds
    pub fn with_bounds(mut self, lower: f32, upper: f32) -> Self {
        self.lower = lower;
        self.upper = upper;
        self
    }

    /// Current relative velocity along the row
    pub fn velocity(&self, a: &SolverBody, b: &SolverBody) -> f32 {
        self.linear_a.dot(&a.linear_velocity)
            + self.angular_a.dot(&a.angular_velocity)
            + self.linear_b.dot(&b.linear_velocity)
            + self.angular_b.dot(&b.angular_velocity)
    }

    /// One projected Gauss-Seidel iteration; returns the impulse applied
    pub fn solve(&mut self, a: &mut SolverBody, b: &mut SolverBody) -> f32 {
        if self.effective_mass == 0.0 {
            return 0.0;
        }
        let delta = (self.rhs - self.velocity(a, b)) * self.effective_mass;
        let previous = self.accumulated;
        self.accumulated = (previous + delta).clamp(self.lower, self.upper);
        let applied = self.accumulated - previous;
        a.apply_impulse(self.linear_a * applied, self.angular_a * applied);
        b.apply_impulse(self.linear_b * applied, self.angular_b * applied);
        applied
    }
}

/// World-space pivots and lever arms of a two-body joint
#[derive(Debug, Clone, Copy)]
pub struct JointAnchors {
    /// Pivot of A in world space
    pub world_a: Vector3,

    /// Pivot of B in world space
    pub world_b: Vector3,

    /// Lever arm from A's center of mass
    pub ra: Vector3,

    /// Lever arm from B's center of mass
    pub rb: Vector3,
}

impl JointAnchors {
    /// Places the local pivots of both bodies in world space
    pub fn new(a: &SolverBody, b: &SolverBody, pivot_a: Vector3, pivot_b: Vector3) -> Self {
        let ra = a.rotation.rotate_vector(pivot_a);
        let rb = b.rotation.rotate_vector(pivot_b);
        Self {
            world_a: a.position + ra,
            world_b: b.position + rb,
            ra,
            rb,
        }
    }

    /// Separation of the pivots, from A to B
    pub fn error(&self) -> Vector3 {
        self.world_b - self.world_a
    }
}

/// Pushes three rows that pin two pivots together
pub(crate) fn point_rows(rows: &mut Vec<JacobianRow>, a: &SolverBody, b: &SolverBody, anchors: &JointAnchors, dt: f32) {
    let error = anchors.error();
    for axis in [Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()] {
        rows.push(JacobianRow::linear(a, b, anchors.ra, anchors.rb, axis).with_rhs(-JOINT_ERP / dt * error.dot(&axis)));
    }
}

/// Pushes two rows that keep `axis_b` aligned with `axis_a` (both world space)
pub(crate) fn align_rows(rows: &mut Vec<JacobianRow>, a: &SolverBody, b: &SolverBody, axis_a: Vector3, axis_b: Vector3, dt: f32) {
    let p = axis_a.any_perpendicular();
    let q = axis_a.cross(&p);
    let error = axis_a.cross(&axis_b);
    rows.push(JacobianRow::angular(a, b, p).with_rhs(-JOINT_ERP / dt * error.dot(&p)));
    rows.push(JacobianRow::angular(a, b, q).with_rhs(-JOINT_ERP / dt * error.dot(&q)));
}

/// Builds a limit row for a coordinate `value` constrained to `[lower, upper]`.
///
/// `row` must measure the coordinate's rate of change. Returns `None` while
/// the coordinate is inside its range or the limit is disabled (`lower > upper`).
pub(crate) fn limit_row(row: JacobianRow, value: f32, lower: f32, upper: f32, bias: f32, dt: f32) -> Option<JacobianRow> {
    if lower > upper {
        return None;
    }
    if (upper - lower).abs() < math::EPSILON {
        return Some(row.with_rhs(bias / dt * (lower - value)));
    }
    if value < lower {
        Some(row.with_rhs(bias / dt * (lower - value)).with_bounds(0.0, f32::INFINITY))
    } else if value > upper {
        Some(row.with_rhs(bias / dt * (upper - value)).with_bounds(f32::NEG_INFINITY, 0.0))
    } else {
        None
    }
}

/// Orthonormal frame whose first axis is `axis`
pub(crate) fn frame_axes(axis: Vector3) -> [Vector3; 3] {
    let x = axis.normalize();
    let y = x.any_perpendicular();
    let z = x.cross(&y);
    [x, y, z]
}

/// Signed angle from `from` to `to` about `axis`
pub(crate) fn signed_angle(from: Vector3, to: Vector3, axis: Vector3) -> f32 {
    from.cross(&to).dot(&axis).atan2(from.dot(&to))
}

/// State every joint carries
#[derive(Debug, Clone)]
pub struct ConstraintCore {
    /// First body
    pub body_a: BodyHandle,

    /// Second body; `None` pins A to the world
    pub body_b: Option<BodyHandle>,

    /// Disabled joints are skipped by the solver
    pub enabled: bool,

    /// The joint breaks once its applied impulse exceeds this
    pub breaking_impulse_threshold: f32,

    /// Magnitude of the impulse applied in the last step
    pub applied_impulse: f32,
}

impl ConstraintCore {
    /// Creates an enabled, unbreakable core
    pub fn new(body_a: BodyHandle, body_b: Option<BodyHandle>) -> Self {
        Self {
            body_a,
            body_b,
            enabled: true,
            breaking_impulse_threshold: f32::INFINITY,
            applied_impulse: 0.0,
        }
    }

    /// Records the step's rows and breaks the joint if they pushed too hard
    pub fn finish_step(&mut self, rows: &[JacobianRow]) {
        self.applied_impulse = rows.iter().map(|r| r.accumulated * r.accumulated).sum::<f32>().sqrt();
        if self.applied_impulse > self.breaking_impulse_threshold {
            self.enabled = false;
        }
    }
}

/// Base trait for joints
pub trait Constraint: Send + Sync + Debug + 'static {
    /// Returns the joint family
    fn kind(&self) -> ConstraintKind;

    /// Returns the shared state
    fn core(&self) -> &ConstraintCore;

    /// Returns the shared state mutably
    fn core_mut(&mut self) -> &mut ConstraintCore;

    /// Returns the bodies involved in the constraint
    fn bodies(&self) -> (BodyHandle, Option<BodyHandle>) {
        (self.core().body_a, self.core().body_b)
    }

    /// Checks if the constraint involves a specific body
    fn involves_body(&self, body: BodyHandle) -> bool {
        let (a, b) = self.bodies();
        a == body || b == Some(body)
    }

    /// Pivot in A's frame
    fn pivot_a(&self) -> Vector3;

    /// Builds this step's rows from the current body state
    fn prepare(&mut self, a: &SolverBody, b: &SolverBody, dt: f32);

    /// One solver iteration over the prepared rows
    fn solve_velocity(&mut self, a: &mut SolverBody, b: &mut SolverBody);

    /// Records applied impulses after the last iteration
    fn finish(&mut self);

    /// Magnitude of the impulse applied in the last step
    fn applied_impulse(&self) -> f32 {
        self.core().applied_impulse
    }

    /// Returns a dynamic reference to any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Returns a dynamic mutable reference to any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
