mod integrator;
mod euler;
mod symplectic_euler;

pub use self::integrator::{create_integrator, Integrator, StartVelocities};
pub use self::euler::EulerIntegrator;
pub use self::symplectic_euler::SymplecticEulerIntegrator;
