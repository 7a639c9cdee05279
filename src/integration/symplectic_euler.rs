use crate::bodies::RigidBody;
use crate::integration::{Integrator, StartVelocities};

/// Symplectic Euler integrator (semi-implicit Euler).
/// Positions advance with the freshly solved velocity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymplecticEulerIntegrator;

impl SymplecticEulerIntegrator {
    /// Creates a new Symplectic Euler integrator
    pub fn new() -> Self {
        Self
    }
}

impl Integrator for SymplecticEulerIntegrator {
    fn integrate(&self, body: &mut RigidBody, _start: StartVelocities, dt: f32) {
        let linear = body.get_linear_velocity();
        let angular = body.get_angular_velocity();
        body.integrate_transform(linear, angular, dt);
    }

    fn name(&self) -> &str {
        "SymplecticEuler"
    }
}
