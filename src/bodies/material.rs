/// Surface properties used when two bodies touch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Coefficient of restitution (bounciness), 0-1
    pub restitution: f32,

    /// Coefficient of friction
    pub friction: f32,
}

impl Material {
    /// Creates a new material with the specified properties
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self { restitution, friction }
    }

    /// Friction of a contact between two materials
    pub fn combined_friction(&self, other: &Self) -> f32 {
        (self.friction * other.friction).min(10.0)
    }

    /// Restitution of a contact between two materials
    pub fn combined_restitution(&self, other: &Self) -> f32 {
        self.restitution * other.restitution
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
        }
    }
}
