use crate::shapes::{Shape, shape::box_inertia};
use crate::math::{Vector3, Aabb};
use std::any::Any;

/// A capsule aligned with the local Y axis
#[derive(Debug, Clone)]
pub struct Capsule {
    /// Radius of the hemispherical caps
    radius: f32,

    /// Half the length of the cylindrical section
    half_height: f32,
}

impl Capsule {
    /// Creates a capsule; `height` is the length of the cylindrical section
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius: radius.max(0.0),
            half_height: (height * 0.5).max(0.0),
        }
    }

    /// Returns the radius of the caps
    pub fn get_radius(&self) -> f32 {
        self.radius
    }

    /// Returns half the length of the cylindrical section
    pub fn get_half_height(&self) -> f32 {
        self.half_height
    }

    fn segment_point(&self, point: Vector3) -> Vector3 {
        Vector3::new(0.0, point.y.clamp(-self.half_height, self.half_height), 0.0)
    }
}

impl Shape for Capsule {
    fn shape_type(&self) -> &'static str {
        "capsule"
    }

    fn get_volume(&self) -> f32 {
        let r2 = self.radius * self.radius;
        std::f32::consts::PI * r2 * (2.0 * self.half_height) + (4.0 / 3.0) * std::f32::consts::PI * r2 * self.radius
    }

    fn get_local_inertia(&self, mass: f32) -> Vector3 {
        box_inertia(mass, Vector3::new(self.radius, self.radius + self.half_height, self.radius))
    }

    fn get_local_bounds(&self) -> Aabb {
        let extent = Vector3::new(self.radius, self.radius + self.half_height, self.radius);
        Aabb::new(-extent, extent)
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        let cap = if direction.y >= 0.0 { self.half_height } else { -self.half_height };
        Vector3::new(0.0, cap, 0.0) + direction.normalize() * self.radius
    }

    fn project_point(&self, point: Vector3) -> Option<(Vector3, Vector3)> {
        let axis_point = self.segment_point(point);
        let offset = point - axis_point;
        let distance = offset.length();
        if distance >= self.radius {
            return None;
        }
        let normal = if distance > crate::math::EPSILON { offset / distance } else { Vector3::unit_x() };
        Some((axis_point + normal * self.radius, normal))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
