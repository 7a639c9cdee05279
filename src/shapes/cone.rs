use crate::shapes::Shape;
use crate::math::{Vector3, Aabb};
use std::any::Any;

/// A cone aligned with the local Y axis, apex up, centered on half its height
#[derive(Debug, Clone)]
pub struct Cone {
    radius: f32,
    height: f32,
}

impl Cone {
    /// Creates a cone from its base radius and height
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius: radius.max(0.0),
            height: height.max(0.0),
        }
    }
}

impl Shape for Cone {
    fn shape_type(&self) -> &'static str {
        "cone"
    }

    fn get_volume(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius * self.height / 3.0
    }

    fn get_local_inertia(&self, mass: f32) -> Vector3 {
        let r2 = self.radius * self.radius;
        let h2 = self.height * self.height;
        let side = mass * (3.0 / 20.0 * r2 + 3.0 / 80.0 * h2);
        Vector3::new(side, 0.3 * mass * r2, side)
    }

    fn get_local_bounds(&self) -> Aabb {
        let extent = Vector3::new(self.radius, self.height * 0.5, self.radius);
        Aabb::new(-extent, extent)
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        let half = self.height * 0.5;
        let apex = Vector3::new(0.0, half, 0.0);
        let radial = Vector3::new(direction.x, 0.0, direction.z).normalize() * self.radius;
        let rim = Vector3::new(radial.x, -half, radial.z);
        if apex.dot(&direction) >= rim.dot(&direction) { apex } else { rim }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
