/// How a rigid body takes part in the simulation, derived from its mass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Positive mass: moved by forces, contacts and joints
    Dynamic,

    /// Zero mass: never moves, infinite inertia
    Static,
}

impl RigidBodyType {
    /// Picks the body type for a mass; zero (or negative) mass is static
    pub fn from_mass(mass: f32) -> Self {
        if mass > 0.0 {
            Self::Dynamic
        } else {
            Self::Static
        }
    }
}
