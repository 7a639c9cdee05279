mod constraint;
mod point;
mod hinge;
mod slider;
mod cone_twist;
mod dof;

pub use self::constraint::{
    Constraint, ConstraintCore, JacobianRow, JointAnchors, SolverBodies, SolverBody, JOINT_ERP,
};
pub(crate) use self::constraint::{align_rows, frame_axes, limit_row, point_rows, signed_angle};
pub use self::point::PointConstraint;
pub use self::hinge::HingeConstraint;
pub use self::slider::SliderConstraint;
pub use self::cone_twist::ConeTwistConstraint;
pub use self::dof::{DofConstraint, AngularMotor};
