use crate::shapes::Shape;
use crate::math::{Vector3, Aabb};
use std::any::Any;

/// A cylinder aligned with the local Y axis
#[derive(Debug, Clone)]
pub struct Cylinder {
    radius: f32,
    half_height: f32,
}

impl Cylinder {
    /// Creates a cylinder from its radius and full height
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius: radius.max(0.0),
            half_height: (height * 0.5).max(0.0),
        }
    }

    /// Returns the radius
    pub fn get_radius(&self) -> f32 {
        self.radius
    }

    /// Returns half the height
    pub fn get_half_height(&self) -> f32 {
        self.half_height
    }
}

impl Shape for Cylinder {
    fn shape_type(&self) -> &'static str {
        "cylinder"
    }

    fn get_volume(&self) -> f32 {
        std::f32::consts::PI * self.radius * self.radius * 2.0 * self.half_height
    }

    fn get_local_inertia(&self, mass: f32) -> Vector3 {
        let r2 = self.radius * self.radius;
        let h = 2.0 * self.half_height;
        let side = mass * (3.0 * r2 + h * h) / 12.0;
        Vector3::new(side, 0.5 * mass * r2, side)
    }

    fn get_local_bounds(&self) -> Aabb {
        let extent = Vector3::new(self.radius, self.half_height, self.radius);
        Aabb::new(-extent, extent)
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        let radial = Vector3::new(direction.x, 0.0, direction.z).normalize() * self.radius;
        let cap = if direction.y >= 0.0 { self.half_height } else { -self.half_height };
        Vector3::new(radial.x, cap, radial.z)
    }

    fn project_point(&self, point: Vector3) -> Option<(Vector3, Vector3)> {
        let radial = Vector3::new(point.x, 0.0, point.z);
        let radial_distance = radial.length();
        let side_gap = self.radius - radial_distance;
        let cap_gap = self.half_height - point.y.abs();
        if side_gap <= 0.0 || cap_gap <= 0.0 {
            return None;
        }
        if cap_gap < side_gap {
            let normal = Vector3::new(0.0, point.y.signum(), 0.0);
            Some((Vector3::new(point.x, self.half_height * normal.y, point.z), normal))
        } else {
            let normal = if radial_distance > crate::math::EPSILON { radial / radial_distance } else { Vector3::unit_x() };
            Some((normal * self.radius + Vector3::new(0.0, point.y, 0.0), normal))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
