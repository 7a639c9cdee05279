use crate::shapes::{Shape, RayHit};
use crate::math::{Vector3, Aabb, Ray, Transform};
use std::any::Any;

/// A spherical collision shape
#[derive(Debug, Clone)]
pub struct Sphere {
    /// The radius of the sphere
    radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given radius
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.max(0.0),
        }
    }

    /// Returns the radius of the sphere
    pub fn get_radius(&self) -> f32 {
        self.radius
    }
}

impl Shape for Sphere {
    fn shape_type(&self) -> &'static str {
        "sphere"
    }

    fn get_volume(&self) -> f32 {
        (4.0 / 3.0) * std::f32::consts::PI * self.radius.powi(3)
    }

    fn get_local_inertia(&self, mass: f32) -> Vector3 {
        let inertia = 0.4 * mass * self.radius * self.radius;
        Vector3::new(inertia, inertia, inertia)
    }

    fn get_local_bounds(&self) -> Aabb {
        let half_size = Vector3::new(self.radius, self.radius, self.radius);
        Aabb::new(-half_size, half_size)
    }

    fn get_world_bounds(&self, transform: &Transform) -> Aabb {
        // Rotation-invariant
        Aabb::from_center_half_extents(
            transform.position,
            Vector3::new(self.radius, self.radius, self.radius),
        )
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        direction.normalize() * self.radius
    }

    fn project_point(&self, point: Vector3) -> Option<(Vector3, Vector3)> {
        let distance = point.length();
        if distance >= self.radius {
            return None;
        }
        let normal = if distance > crate::math::EPSILON { point / distance } else { Vector3::unit_y() };
        Some((normal * self.radius, normal))
    }

    fn intersects_ray(&self, ray: &Ray, transform: &Transform, max_distance: f32) -> Option<RayHit> {
        let to_origin = ray.origin - transform.position;
        let b = to_origin.dot(&ray.direction);
        let c = to_origin.length_squared() - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let t = if -b - root >= 0.0 { -b - root } else { -b + root };
        if t < 0.0 || t > max_distance {
            return None;
        }
        Some(RayHit {
            distance: t,
            normal: (ray.point_at(t) - transform.position).normalize(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
