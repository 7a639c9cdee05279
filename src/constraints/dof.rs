use crate::constraints::{
    frame_axes, limit_row, Constraint, ConstraintCore, JacobianRow, JointAnchors, SolverBody, JOINT_ERP,
};
use crate::core::BodyHandle;
use crate::math::{Vector3, Quaternion};
use crate::protocol::ConstraintKind;
use std::any::Any;

/// Motor on one rotational axis of a 6-DOF joint
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AngularMotor {
    /// Whether the motor drives the axis
    pub enabled: bool,

    /// Target angular velocity
    pub target_velocity: f32,

    /// Maximum force the motor applies
    pub max_force: f32,
}

/// A generic joint with per-axis limits on all six degrees of freedom.
///
/// Each axis is locked when `lower == upper`, limited when `lower < upper`
/// and free when `lower > upper`. Axes are the joint frame: X is the
/// description axis, Y and Z complete it.
#[derive(Debug)]
pub struct DofConstraint {
    core: ConstraintCore,
    pivot_a: Vector3,
    pivot_b: Vector3,
    axes: [Vector3; 3],
    rest: Option<Quaternion>,

    linear_lower: Vector3,
    linear_upper: Vector3,
    angular_lower: Vector3,
    angular_upper: Vector3,
    motors: [AngularMotor; 3],

    rows: Vec<JacobianRow>,
}

impl DofConstraint {
    /// Creates a fully locked 6-DOF joint
    pub fn new(body_a: BodyHandle, body_b: Option<BodyHandle>, pivot_a: Vector3, pivot_b: Vector3, axis: Vector3) -> Self {
        Self {
            core: ConstraintCore::new(body_a, body_b),
            pivot_a,
            pivot_b,
            axes: frame_axes(axis),
            rest: None,
            linear_lower: Vector3::zero(),
            linear_upper: Vector3::zero(),
            angular_lower: Vector3::zero(),
            angular_upper: Vector3::zero(),
            motors: [AngularMotor::default(); 3],
            rows: Vec::with_capacity(9),
        }
    }

    /// Sets the lower translation limits
    pub fn set_linear_lower_limit(&mut self, limit: Vector3) {
        self.linear_lower = limit;
    }

    /// Sets the upper translation limits
    pub fn set_linear_upper_limit(&mut self, limit: Vector3) {
        self.linear_upper = limit;
    }

    /// Sets the lower rotation limits
    pub fn set_angular_lower_limit(&mut self, limit: Vector3) {
        self.angular_lower = limit;
    }

    /// Sets the upper rotation limits
    pub fn set_angular_upper_limit(&mut self, limit: Vector3) {
        self.angular_upper = limit;
    }

    /// Returns `(lower, upper)` translation limits
    pub fn get_linear_limits(&self) -> (Vector3, Vector3) {
        (self.linear_lower, self.linear_upper)
    }

    /// Returns `(lower, upper)` rotation limits
    pub fn get_angular_limits(&self) -> (Vector3, Vector3) {
        (self.angular_lower, self.angular_upper)
    }

    fn motor_mut(&mut self, axis: usize) -> Option<&mut AngularMotor> {
        self.motors.get_mut(axis)
    }

    /// Turns on the motor of rotational axis `axis` (0..3); false if out of range
    pub fn enable_angular_motor(&mut self, axis: usize) -> bool {
        self.motor_mut(axis).map(|m| m.enabled = true).is_some()
    }

    /// Turns off the motor of rotational axis `axis`; false if out of range
    pub fn disable_angular_motor(&mut self, axis: usize) -> bool {
        self.motor_mut(axis).map(|m| m.enabled = false).is_some()
    }

    /// Sets the limits, target velocity and force of one rotational axis
    pub fn configure_angular_motor(&mut self, axis: usize, low_angle: f32, high_angle: f32, velocity: f32, max_force: f32) -> bool {
        if axis >= 3 {
            return false;
        }
        set_axis(&mut self.angular_lower, axis, low_angle);
        set_axis(&mut self.angular_upper, axis, high_angle);
        self.motors[axis].target_velocity = velocity;
        self.motors[axis].max_force = max_force.abs();
        true
    }

    /// Returns the motor of one rotational axis
    pub fn get_angular_motor(&self, axis: usize) -> Option<&AngularMotor> {
        self.motors.get(axis)
    }
}

fn set_axis(v: &mut Vector3, axis: usize, value: f32) {
    match axis {
        0 => v.x = value,
        1 => v.y = value,
        _ => v.z = value,
    }
}

impl Constraint for DofConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Dof
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

        let rest = *self.rest.get_or_insert_with(|| a.rotation.inverse() * b.rotation);
        let anchors = JointAnchors::new(a, b, self.pivot_a, self.pivot_b);
        let error = anchors.error();
        let relative = (a.rotation.inverse() * b.rotation * rest.inverse()).scaled_axis();

        for (i, local_axis) in self.axes.iter().enumerate() {
            let axis = a.rotation.rotate_vector(*local_axis);

            let linear = limit_row(
                JacobianRow::linear(a, b, anchors.ra, anchors.rb, axis),
                error.dot(&axis),
                self.linear_lower.axis(i),
                self.linear_upper.axis(i),
                JOINT_ERP,
                dt,
            );
            if let Some(row) = linear {
                self.rows.push(row);
            }

            let angular = limit_row(
                JacobianRow::angular(a, b, axis),
                relative.dot(local_axis),
                self.angular_lower.axis(i),
                self.angular_upper.axis(i),
                JOINT_ERP,
                dt,
            );
            if let Some(row) = angular {
                self.rows.push(row);
            }

            let motor = self.motors[i];
            if motor.enabled {
                let max_impulse = motor.max_force * dt;
                self.rows.push(
                    JacobianRow::angular(a, b, axis)
                        .with_rhs(motor.target_velocity)
                        .with_bounds(-max_impulse, max_impulse),
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
