use crate::constraints::{
    align_rows, limit_row, signed_angle, Constraint, ConstraintCore, JacobianRow, JointAnchors, SolverBody, JOINT_ERP,
};
use crate::core::BodyHandle;
use crate::math::Vector3;
use crate::protocol::ConstraintKind;
use std::any::Any;

/// Motor settings for one slider degree of freedom
#[derive(Debug, Clone, Copy, Default)]
struct SliderMotor {
    enabled: bool,
    target_velocity: f32,
    max_force: f32,
}

/// A prismatic joint: translation along and rotation about one axis
#[derive(Debug)]
pub struct SliderConstraint {
    core: ConstraintCore,
    pivot_a: Vector3,
    pivot_b: Vector3,

    /// Slide axis in A's space
    axis_a: Vector3,
    reference_a: Vector3,
    frame_b: Option<(Vector3, Vector3)>,

    lower_linear_limit: f32,
    upper_linear_limit: f32,
    lower_angular_limit: f32,
    upper_angular_limit: f32,
    linear_restitution: f32,
    angular_restitution: f32,

    linear_motor: SliderMotor,
    angular_motor: SliderMotor,

    linear_position: f32,
    angular_position: f32,
    rows: Vec<JacobianRow>,
}

impl SliderConstraint {
    /// Creates a slider along `axis` (A's space). Translation starts free
    /// and rotation about the axis starts locked.
    pub fn new(body_a: BodyHandle, body_b: Option<BodyHandle>, pivot_a: Vector3, pivot_b: Vector3, axis: Vector3) -> Self {
        let axis_a = axis.normalize();
        Self {
            core: ConstraintCore::new(body_a, body_b),
            pivot_a,
            pivot_b,
            axis_a,
            reference_a: axis_a.any_perpendicular(),
            frame_b: None,
            lower_linear_limit: 1.0,
            upper_linear_limit: -1.0,
            lower_angular_limit: 0.0,
            upper_angular_limit: 0.0,
            linear_restitution: 0.0,
            angular_restitution: 0.0,
            linear_motor: SliderMotor::default(),
            angular_motor: SliderMotor::default(),
            linear_position: 0.0,
            angular_position: 0.0,
            rows: Vec::with_capacity(8),
        }
    }

    /// Sets translation and rotation limits; `lower > upper` frees that degree
    pub fn set_limits(&mut self, linear_lower: f32, linear_upper: f32, angular_lower: f32, angular_upper: f32) {
        self.lower_linear_limit = linear_lower;
        self.upper_linear_limit = linear_upper;
        self.lower_angular_limit = angular_lower;
        self.upper_angular_limit = angular_upper;
    }

    /// Returns `(linear_lower, linear_upper, angular_lower, angular_upper)`
    pub fn get_limits(&self) -> (f32, f32, f32, f32) {
        (
            self.lower_linear_limit,
            self.upper_linear_limit,
            self.lower_angular_limit,
            self.upper_angular_limit,
        )
    }

    /// Sets how much velocity bounces back off the limits
    pub fn set_restitution(&mut self, linear: f32, angular: f32) {
        self.linear_restitution = linear.clamp(0.0, 1.0);
        self.angular_restitution = angular.clamp(0.0, 1.0);
    }

    /// Returns `(linear, angular)` limit restitution
    pub fn get_restitution(&self) -> (f32, f32) {
        (self.linear_restitution, self.angular_restitution)
    }

    /// Drives translation at `velocity` with at most `max_force`
    pub fn enable_linear_motor(&mut self, velocity: f32, max_force: f32) {
        self.linear_motor = SliderMotor {
            enabled: true,
            target_velocity: velocity,
            max_force: max_force.abs(),
        };
    }

    /// Turns the linear motor off
    pub fn disable_linear_motor(&mut self) {
        self.linear_motor.enabled = false;
    }

    /// Drives rotation at `velocity` with at most `max_force`
    pub fn enable_angular_motor(&mut self, velocity: f32, max_force: f32) {
        self.angular_motor = SliderMotor {
            enabled: true,
            target_velocity: velocity,
            max_force: max_force.abs(),
        };
    }

    /// Turns the angular motor off
    pub fn disable_angular_motor(&mut self) {
        self.angular_motor.enabled = false;
    }

    /// Whether the `(linear, angular)` motors are on
    pub fn motors_enabled(&self) -> (bool, bool) {
        (self.linear_motor.enabled, self.angular_motor.enabled)
    }

    /// Offset along the axis as of the last step
    pub fn get_linear_position(&self) -> f32 {
        self.linear_position
    }

    /// Rotation about the axis as of the last step
    pub fn get_angular_position(&self) -> f32 {
        self.angular_position
    }
}

fn bounce(row: JacobianRow, a: &SolverBody, b: &SolverBody, restitution: f32) -> JacobianRow {
    if restitution <= 0.0 {
        return row;
    }
    let rebound = -restitution * row.velocity(a, b);
    let rhs = if row.lower >= 0.0 { row.rhs.max(rebound) } else { row.rhs.min(rebound) };
    row.with_rhs(rhs)
}

impl Constraint for SliderConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Slider
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

        let axis = a.rotation.rotate_vector(self.axis_a);
        let reference = a.rotation.rotate_vector(self.reference_a);
        let (axis_b, reference_b) = *self.frame_b.get_or_insert_with(|| {
            let inverse = b.rotation.inverse();
            (inverse.rotate_vector(axis), inverse.rotate_vector(reference))
        });
        let axis_b_world = b.rotation.rotate_vector(axis_b);
        let reference_b_world = b.rotation.rotate_vector(reference_b);

        let anchors = JointAnchors::new(a, b, self.pivot_a, self.pivot_b);
        let error = anchors.error();
        let p = axis.any_perpendicular();
        let q = axis.cross(&p);
        for direction in [p, q] {
            self.rows.push(
                JacobianRow::linear(a, b, anchors.ra, anchors.rb, direction)
                    .with_rhs(-JOINT_ERP / dt * error.dot(&direction)),
            );
        }
        align_rows(&mut self.rows, a, b, axis, axis_b_world, dt);

        self.linear_position = error.dot(&axis);
        self.angular_position = signed_angle(reference, reference_b_world, axis);

        let linear_limit = limit_row(
            JacobianRow::linear(a, b, anchors.ra, anchors.rb, axis),
            self.linear_position,
            self.lower_linear_limit,
            self.upper_linear_limit,
            JOINT_ERP,
            dt,
        );
        if let Some(row) = linear_limit {
            self.rows.push(bounce(row, a, b, self.linear_restitution));
        }

        let angular_limit = limit_row(
            JacobianRow::angular(a, b, axis),
            self.angular_position,
            self.lower_angular_limit,
            self.upper_angular_limit,
            JOINT_ERP,
            dt,
        );
        if let Some(row) = angular_limit {
            self.rows.push(bounce(row, a, b, self.angular_restitution));
        }

        if self.linear_motor.enabled {
            let max_impulse = self.linear_motor.max_force * dt;
            self.rows.push(
                JacobianRow::linear(a, b, anchors.ra, anchors.rb, axis)
                    .with_rhs(self.linear_motor.target_velocity)
                    .with_bounds(-max_impulse, max_impulse),
            );
        }
        if self.angular_motor.enabled {
            let max_impulse = self.angular_motor.max_force * dt;
            self.rows.push(
                JacobianRow::angular(a, b, axis)
                    .with_rhs(self.angular_motor.target_velocity)
                    .with_bounds(-max_impulse, max_impulse),
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
