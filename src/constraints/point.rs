use crate::constraints::{Constraint, ConstraintCore, JacobianRow, JointAnchors, SolverBody, point_rows};
use crate::core::BodyHandle;
use crate::math::Vector3;
use crate::protocol::ConstraintKind;
use std::any::Any;

/// A ball-and-socket joint keeping two pivots together
#[derive(Debug)]
pub struct PointConstraint {
    core: ConstraintCore,

    /// Pivot on the first body (local space)
    pivot_a: Vector3,

    /// Pivot on the second body (local space), or in world space without one
    pivot_b: Vector3,

    rows: Vec<JacobianRow>,
}

impl PointConstraint {
    /// Creates a point joint; without `body_b`, `pivot_b` is a world point
    pub fn new(body_a: BodyHandle, body_b: Option<BodyHandle>, pivot_a: Vector3, pivot_b: Vector3) -> Self {
        Self {
            core: ConstraintCore::new(body_a, body_b),
            pivot_a,
            pivot_b,
            rows: Vec::with_capacity(3),
        }
    }

    /// Returns the pivot on the second body
    pub fn get_pivot_b(&self) -> Vector3 {
        self.pivot_b
    }
}

impl Constraint for PointConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::Point
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
        let anchors = JointAnchors::new(a, b, self.pivot_a, self.pivot_b);
        point_rows(&mut self.rows, a, b, &anchors, dt);
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
