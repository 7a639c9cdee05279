use crate::bodies::RigidBody;
use crate::core::IntegratorKind;
use crate::integration::{EulerIntegrator, SymplecticEulerIntegrator};
use crate::math::Vector3;

/// Velocities of a body captured before forces and the solver ran
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StartVelocities {
    /// Linear velocity at the start of the step
    pub linear: Vector3,

    /// Angular velocity at the start of the step
    pub angular: Vector3,
}

impl StartVelocities {
    /// Captures a body's current velocities
    pub fn of(body: &RigidBody) -> Self {
        Self {
            linear: body.get_linear_velocity(),
            angular: body.get_angular_velocity(),
        }
    }
}

/// Trait for numerical integration algorithms
pub trait Integrator: Send + Sync {
    /// Advances a body's transform over a time step
    fn integrate(&self, body: &mut RigidBody, start: StartVelocities, dt: f32);

    /// Returns the name of the integrator
    fn name(&self) -> &str;
}

/// Builds the integrator selected in the world configuration
pub fn create_integrator(kind: IntegratorKind) -> Box<dyn Integrator> {
    match kind {
        IntegratorKind::SymplecticEuler => Box::new(SymplecticEulerIntegrator::new()),
        IntegratorKind::Euler => Box::new(EulerIntegrator::new()),
    }
}
