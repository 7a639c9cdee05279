use crate::constraints::{
    limit_row, point_rows, signed_angle, Constraint, ConstraintCore, JacobianRow, JointAnchors, SolverBody, JOINT_ERP,
};
use crate::core::BodyHandle;
use crate::math::{self, Vector3, Quaternion};
use crate::protocol::ConstraintKind;
use std::any::Any;

/// B's twist axis, twist reference and starting rotation relative to A
#[derive(Debug, Clone, Copy)]
struct FrameB {
    axis: Vector3,
    reference: Vector3,
    rest: Quaternion,
}

/// A ball joint whose second body swings inside a cone and twists within a range
#[derive(Debug)]
pub struct ConeTwistConstraint {
    core: ConstraintCore,
    pivot_a: Vector3,
    pivot_b: Vector3,

    /// Twist axis in A's space
    axis_a: Vector3,
    reference_a: Vector3,
    frame_b: Option<FrameB>,

    swing_span1: f32,
    swing_span2: f32,
    twist_span: f32,

    angular_only: bool,

    motor_enabled: bool,
    motor_target: Quaternion,
    max_motor_impulse: f32,

    swing_angle: f32,
    twist_angle: f32,
    rows: Vec<JacobianRow>,
}

impl ConeTwistConstraint {
    /// Creates a cone-twist joint; limits start open
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, pivot_a: Vector3, pivot_b: Vector3, axis: Vector3) -> Self {
        let axis_a = axis.normalize();
        Self {
            core: ConstraintCore::new(body_a, Some(body_b)),
            pivot_a,
            pivot_b,
            axis_a,
            reference_a: axis_a.any_perpendicular(),
            frame_b: None,
            swing_span1: f32::INFINITY,
            swing_span2: f32::INFINITY,
            twist_span: f32::INFINITY,
            angular_only: false,
            motor_enabled: false,
            motor_target: Quaternion::identity(),
            max_motor_impulse: -1.0,
            swing_angle: 0.0,
            twist_angle: 0.0,
            rows: Vec::with_capacity(8),
        }
    }

    /// Sets the two swing half-angles and the twist half-angle
    pub fn set_limit(&mut self, swing_span1: f32, swing_span2: f32, twist_span: f32) {
        self.swing_span1 = swing_span1.abs();
        self.swing_span2 = swing_span2.abs();
        self.twist_span = twist_span.abs();
    }

    /// Returns `(swing_span1, swing_span2, twist_span)`
    pub fn get_limit(&self) -> (f32, f32, f32) {
        (self.swing_span1, self.swing_span2, self.twist_span)
    }

    /// Drops the point rows so only rotation is constrained
    pub fn set_angular_only(&mut self, angular_only: bool) {
        self.angular_only = angular_only;
    }

    /// Whether only rotation is constrained
    pub fn is_angular_only(&self) -> bool {
        self.angular_only
    }

    /// Turns the motor on
    pub fn enable_motor(&mut self) {
        self.motor_enabled = true;
    }

    /// Turns the motor off
    pub fn disable_motor(&mut self) {
        self.motor_enabled = false;
    }

    /// Whether the motor is on
    pub fn is_motor_enabled(&self) -> bool {
        self.motor_enabled
    }

    /// Caps the motor impulse per step; non-positive means unbounded
    pub fn set_max_motor_impulse(&mut self, impulse: f32) {
        self.max_motor_impulse = impulse;
    }

    /// Returns the motor impulse cap
    pub fn get_max_motor_impulse(&self) -> f32 {
        self.max_motor_impulse
    }

    /// Rotation of B relative to A the motor drives toward
    pub fn set_motor_target(&mut self, target: Quaternion) {
        self.motor_target = target.normalize();
    }

    /// Returns the motor target
    pub fn get_motor_target(&self) -> Quaternion {
        self.motor_target
    }

    /// Swing angle as of the last step
    pub fn get_swing_angle(&self) -> f32 {
        self.swing_angle
    }

    /// Twist angle as of the last step
    pub fn get_twist_angle(&self) -> f32 {
        self.twist_angle
    }

    fn swing_span(&self, swing_axis: Vector3, y: Vector3, z: Vector3) -> f32 {
        if !self.swing_span1.is_finite() || !self.swing_span2.is_finite() {
            return self.swing_span1.min(self.swing_span2);
        }
        let cy = swing_axis.dot(&y);
        let cz = swing_axis.dot(&z);
        let s1 = self.swing_span1.max(math::EPSILON);
        let s2 = self.swing_span2.max(math::EPSILON);
        let denominator = (cy * cy) / (s1 * s1) + (cz * cz) / (s2 * s2);
        if denominator > math::EPSILON {
            1.0 / denominator.sqrt()
        } else {
            s1.min(s2)
        }
    }
}

impl Constraint for ConeTwistConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::ConeTwist
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
        let frame = *self.frame_b.get_or_insert_with(|| {
            let inverse = b.rotation.inverse();
            FrameB {
                axis: inverse.rotate_vector(axis),
                reference: inverse.rotate_vector(reference),
                rest: a.rotation.inverse() * b.rotation,
            }
        });
        let axis_b = b.rotation.rotate_vector(frame.axis);
        let reference_b = b.rotation.rotate_vector(frame.reference);

        if !self.angular_only {
            let anchors = JointAnchors::new(a, b, self.pivot_a, self.pivot_b);
            point_rows(&mut self.rows, a, b, &anchors, dt);
        }

        self.swing_angle = axis.dot(&axis_b).clamp(-1.0, 1.0).acos();
        let swing_axis = axis.cross(&axis_b).normalize();
        if !swing_axis.is_zero() {
            let span = self.swing_span(swing_axis, reference, axis.cross(&reference));
            if self.swing_angle > span {
                self.rows.push(
                    JacobianRow::angular(a, b, swing_axis)
                        .with_rhs(JOINT_ERP / dt * (span - self.swing_angle))
                        .with_bounds(f32::NEG_INFINITY, 0.0),
                );
            }
        }

        let twisted = reference_b - axis * reference_b.dot(&axis);
        self.twist_angle = signed_angle(reference, twisted, axis);
        if self.twist_span.is_finite() {
            let limit = limit_row(
                JacobianRow::angular(a, b, axis),
                self.twist_angle,
                -self.twist_span,
                self.twist_span,
                JOINT_ERP,
                dt,
            );
            if let Some(row) = limit {
                self.rows.push(row);
            }
        }

        if self.motor_enabled {
            let relative = a.rotation.inverse() * b.rotation * frame.rest.inverse();
            let error = a.rotation.rotate_vector((self.motor_target * relative.inverse()).scaled_axis());
            let bound = if self.max_motor_impulse > 0.0 { self.max_motor_impulse } else { f32::INFINITY };
            for direction in [Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()] {
                self.rows.push(
                    JacobianRow::angular(a, b, direction)
                        .with_rhs(JOINT_ERP / dt * error.dot(&direction))
                        .with_bounds(-bound, bound),
                );
            }
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
