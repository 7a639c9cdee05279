use crate::bodies::RigidBody;
use crate::integration::{Integrator, StartVelocities};

/// Forward Euler: positions advance with the velocity the step started with
#[derive(Debug, Default, Clone, Copy)]
pub struct EulerIntegrator;

impl EulerIntegrator {
    /// Creates a new Euler integrator
    pub fn new() -> Self {
        Self
    }
}

impl Integrator for EulerIntegrator {
    fn integrate(&self, body: &mut RigidBody, start: StartVelocities, dt: f32) {
        body.integrate_transform(start.linear, start.angular, dt);
    }

    fn name(&self) -> &str {
        "Euler"
    }
}
