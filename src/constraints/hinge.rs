use crate::constraints::{
    align_rows, limit_row, point_rows, signed_angle, Constraint, ConstraintCore, JacobianRow, JointAnchors, SolverBody,
};
use crate::core::BodyHandle;
use crate::math::Vector3;
use crate::protocol::ConstraintKind;
use std::any::Any;

/// A hinge (revolute) constraint that allows rotation around a single axis
#[derive(Debug)]
pub struct HingeConstraint {
    core: ConstraintCore,

    /// The pivot point on the first body (in local space)
    pivot_a: Vector3,

    /// The pivot point on the second body (in local space, or world space without one)
    pivot_b: Vector3,

    /// The axis of rotation on the first body (in local space)
    axis_a: Vector3,

    /// Zero-angle reference perpendicular to the axis, in A's space
    reference_a: Vector3,

    /// Axis and reference in B's space, fixed on the first step
    frame_b: Option<(Vector3, Vector3)>,

    /// The lower limit of the angle (in radians)
    lower_limit: f32,

    /// The upper limit of the angle (in radians)
    upper_limit: f32,

    /// How fast limit violations are corrected
    bias_factor: f32,

    /// Stored limit relaxation
    relaxation_factor: f32,

    /// The current angle (calculated during prepare)
    current_angle: f32,

    /// Whether the motor is enabled
    motor_enabled: bool,

    /// The target velocity of the motor (in radians per second)
    motor_target_velocity: f32,

    /// The maximum impulse the motor applies per step
    max_motor_impulse: f32,

    rows: Vec<JacobianRow>,
}

impl HingeConstraint {
    /// Creates a new hinge constraint about `axis` (A's space)
    pub fn new(body_a: BodyHandle, body_b: Option<BodyHandle>, pivot_a: Vector3, pivot_b: Vector3, axis: Vector3) -> Self {
        let axis_a = axis.normalize();
        Self {
            core: ConstraintCore::new(body_a, body_b),
            pivot_a,
            pivot_b,
            axis_a,
            reference_a: axis_a.any_perpendicular(),
            frame_b: None,
            lower_limit: 1.0,
            upper_limit: -1.0,
            bias_factor: 0.3,
            relaxation_factor: 1.0,
            current_angle: 0.0,
            motor_enabled: false,
            motor_target_velocity: 0.0,
            max_motor_impulse: 0.0,
            rows: Vec::with_capacity(7),
        }
    }

    /// Sets the angular limits; `low > high` frees the hinge
    pub fn set_limits(&mut self, low: f32, high: f32, bias_factor: f32, relaxation_factor: f32) {
        self.lower_limit = low;
        self.upper_limit = high;
        self.bias_factor = bias_factor.clamp(0.0, 1.0);
        self.relaxation_factor = relaxation_factor;
    }

    /// Returns the angular limits
    pub fn get_limits(&self) -> (f32, f32) {
        (self.lower_limit, self.upper_limit)
    }

    /// Returns the limit relaxation factor
    pub fn get_relaxation_factor(&self) -> f32 {
        self.relaxation_factor
    }

    /// Drives the hinge at `target_velocity` using at most `max_impulse` per step
    pub fn enable_angular_motor(&mut self, target_velocity: f32, max_impulse: f32) {
        self.motor_enabled = true;
        self.motor_target_velocity = target_velocity;
        self.max_motor_impulse = max_impulse.abs();
    }

    /// Turns the motor off
    pub fn disable_motor(&mut self) {
        self.motor_enabled = false;
    }

    /// Whether the motor is on
    pub fn is_motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    /// Hinge angle as of the last step
    pub fn get_hinge_angle(&self) -> f32 {
        self.current_angle
    }
}

impl Constraint for HingeConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Hinge
    }

    fn core(&self) -> &ConstraintCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ConstraintCore {
        &mut self.core
    }

    fn pivot_a(&self) -> Vector3 {
        self.pivot_a
    }

    fn prepare(&mut self, a: &SolverBody, b: &SolverBody, dt: f32) {
        self.rows.clear();

        let axis_world = a.rotation.rotate_vector(self.axis_a);
        let reference_world = a.rotation.rotate_vector(self.reference_a);
        let (axis_b, reference_b) = *self.frame_b.get_or_insert_with(|| {
            let inverse = b.rotation.inverse();
            (inverse.rotate_vector(axis_world), inverse.rotate_vector(reference_world))
        });
        let axis_b_world = b.rotation.rotate_vector(axis_b);
        let reference_b_world = b.rotation.rotate_vector(reference_b);

        let anchors = JointAnchors::new(a, b, self.pivot_a, self.pivot_b);
        point_rows(&mut self.rows, a, b, &anchors, dt);
        align_rows(&mut self.rows, a, b, axis_world, axis_b_world, dt);

        self.current_angle = signed_angle(reference_world, reference_b_world, axis_world);
        let limit = limit_row(
            JacobianRow::angular(a, b, axis_world),
            self.current_angle,
            self.lower_limit,
            self.upper_limit,
            self.bias_factor,
            dt,
        );
        if let Some(row) = limit {
            self.rows.push(row);
        }

        if self.motor_enabled {
            self.rows.push(
                JacobianRow::angular(a, b, axis_world)
                    .with_rhs(self.motor_target_velocity)
                    .with_bounds(-self.max_motor_impulse, self.max_motor_impulse),
            );
        }
    }

    fn solve_velocity(&mut self, a: &mut SolverBody, b: &mut SolverBody) {
        for row in &mut self.rows {
            row.solve(a, b);
        }
    }

    fn finish(&mut self) {
        self.core.finish_step(&self.rows);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
