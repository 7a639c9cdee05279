use crate::shapes::{Shape, RayHit};
use crate::math::{Vector3, Aabb, Ray, Transform};
use std::any::Any;

/// Half-size of the bounds reported for an infinite plane
const PLANE_EXTENT: f32 = 1.0e5;

/// An infinite static plane defined by a normal and distance from origin
#[derive(Debug, Clone)]
pub struct Plane {
    /// The normal vector of the plane (normalized)
    normal: Vector3,

    /// The distance from the origin to the plane along the normal
    distance: f32,
}

impl Plane {
    /// Creates a new plane with the given normal and distance
    pub fn new(normal: Vector3, distance: f32) -> Self {
        let normal = normal.normalize();
        Self {
            normal: if normal.is_zero() { Vector3::unit_y() } else { normal },
            distance,
        }
    }

    /// Returns the normal of the plane
    pub fn get_normal(&self) -> Vector3 {
        self.normal
    }

    /// Returns the distance of the plane from the origin
    pub fn get_distance(&self) -> f32 {
        self.distance
    }

    /// Returns the signed distance from a local point to the plane
    pub fn signed_distance_to(&self, point: Vector3) -> f32 {
        self.normal.dot(&point) - self.distance
    }
}

impl Shape for Plane {
    fn shape_type(&self) -> &'static str {
        "plane"
    }

    fn get_volume(&self) -> f32 {
        0.0
    }

    fn get_local_inertia(&self, _mass: f32) -> Vector3 {
        Vector3::zero()
    }

    fn get_local_bounds(&self) -> Aabb {
        let extent = Vector3::new(PLANE_EXTENT, PLANE_EXTENT, PLANE_EXTENT);
        let mut bounds = Aabb::new(-extent, extent);
        // Axis-aligned planes get a flat box so the broad phase stays useful
        let on_plane = self.normal * self.distance;
        if self.normal.x.abs() > 0.999 {
            bounds.min.x = on_plane.x - PLANE_EXTENT;
            bounds.max.x = on_plane.x;
            if self.normal.x < 0.0 {
                bounds.min.x = on_plane.x;
                bounds.max.x = on_plane.x + PLANE_EXTENT;
            }
        } else if self.normal.y.abs() > 0.999 {
            bounds.min.y = on_plane.y - PLANE_EXTENT;
            bounds.max.y = on_plane.y;
            if self.normal.y < 0.0 {
                bounds.min.y = on_plane.y;
                bounds.max.y = on_plane.y + PLANE_EXTENT;
            }
        } else if self.normal.z.abs() > 0.999 {
            bounds.min.z = on_plane.z - PLANE_EXTENT;
            bounds.max.z = on_plane.z;
            if self.normal.z < 0.0 {
                bounds.min.z = on_plane.z;
                bounds.max.z = on_plane.z + PLANE_EXTENT;
            }
        }
        bounds
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        // Only meaningful along the normal; the plane is handled specially in the narrow phase
        let tangent = direction - self.normal * direction.dot(&self.normal);
        self.normal * self.distance + tangent.normalize() * PLANE_EXTENT
    }

    fn is_convex(&self) -> bool {
        false
    }

    fn project_point(&self, point: Vector3) -> Option<(Vector3, Vector3)> {
        let depth = self.signed_distance_to(point);
        if depth >= 0.0 {
            return None;
        }
        Some((point - self.normal * depth, self.normal))
    }

    fn intersects_ray(&self, ray: &Ray, transform: &Transform, max_distance: f32) -> Option<RayHit> {
        let normal = transform.transform_direction(self.normal);
        let point = transform.transform_point(self.normal * self.distance);
        let denom = normal.dot(&ray.direction);
        if denom.abs() < crate::math::EPSILON {
            return None;
        }
        let t = (point - ray.origin).dot(&normal) / denom;
        if t < 0.0 || t > max_distance {
            return None;
        }
        Some(RayHit {
            distance: t,
            normal: if denom < 0.0 { normal } else { -normal },
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
