use crate::math::{Vector3, Aabb, Ray, Transform};
use std::any::Any;
use std::fmt::Debug;

/// Result of a ray query against a shape, in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the ray
    pub distance: f32,

    /// Surface normal at the hit point
    pub normal: Vector3,
}

/// Base trait for collision shapes
pub trait Shape: Send + Sync + Debug + 'static {
    /// Returns the type name of the shape
    fn shape_type(&self) -> &'static str;

    /// Returns the volume of the shape
    fn get_volume(&self) -> f32;

    /// Returns the principal moments of inertia for the given mass
    fn get_local_inertia(&self, mass: f32) -> Vector3;

    /// Returns the axis-aligned bounding box of the shape in local space
    fn get_local_bounds(&self) -> Aabb;

    /// Returns the axis-aligned bounding box of the shape in world space
    fn get_world_bounds(&self, transform: &Transform) -> Aabb {
        let corners = self.get_local_bounds().corners();
        let mut bounds = Aabb::new(transform.transform_point(corners[0]), transform.transform_point(corners[0]));
        for corner in &corners[1..] {
            bounds.expand_to_include_point(transform.transform_point(*corner));
        }
        bounds
    }

    /// Returns the support point of the shape in the given direction, in local space
    fn get_support_point(&self, direction: Vector3) -> Vector3;

    /// Returns the support point of the shape in the given direction in world space
    fn get_world_support_point(&self, direction: Vector3, transform: &Transform) -> Vector3 {
        let local_dir = transform.inverse_transform_direction(direction);
        transform.transform_point(self.get_support_point(local_dir))
    }

    /// Whether the shape is convex; concave shapes expose triangles instead
    fn is_convex(&self) -> bool {
        true
    }

    /// Polyhedral vertices in local space, used to build multi-point contacts
    fn get_vertices(&self) -> Vec<Vector3> {
        Vec::new()
    }

    /// Local-space triangles overlapping `bounds` (concave shapes only)
    fn get_triangles(&self, _bounds: &Aabb) -> Vec<[Vector3; 3]> {
        Vec::new()
    }

    /// If the local point lies inside the shape, returns the nearest surface
    /// point and the outward normal there
    fn project_point(&self, _point: Vector3) -> Option<(Vector3, Vector3)> {
        None
    }

    /// Casts a ray against the shape in world space.
    /// The default treats the shape as its local bounding box.
    fn intersects_ray(&self, ray: &Ray, transform: &Transform, max_distance: f32) -> Option<RayHit> {
        let local = ray.to_local(transform);
        let bounds = self.get_local_bounds();
        let (t, _) = bounds.intersects_ray(&local, 0.0, max_distance)?;
        let point = local.point_at(t) - bounds.center();
        let half = bounds.half_extents();
        let mut axis = 0;
        let mut best = f32::MIN;
        for i in 0..3 {
            let h = half.axis(i).max(crate::math::EPSILON);
            let ratio = (point.axis(i) / h).abs();
            if ratio > best {
                best = ratio;
                axis = i;
            }
        }
        let mut normal = Vector3::zero();
        match axis {
            0 => normal.x = point.x.signum(),
            1 => normal.y = point.y.signum(),
            _ => normal.z = point.z.signum(),
        }
        Some(RayHit {
            distance: t,
            normal: transform.transform_direction(normal),
        })
    }

    /// Returns a dynamic reference to any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Möller–Trumbore ray/triangle test in a shape's local frame
pub(crate) fn ray_triangle(ray: &Ray, triangle: &[Vector3; 3], max_distance: f32) -> Option<(f32, Vector3)> {
    let edge1 = triangle[1] - triangle[0];
    let edge2 = triangle[2] - triangle[0];
    let p = ray.direction.cross(&edge2);
    let det = edge1.dot(&p);
    if det.abs() < crate::math::EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - triangle[0];
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = ray.direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(&q) * inv_det;
    if t < 0.0 || t > max_distance {
        return None;
    }
    let mut normal = edge1.cross(&edge2).normalize();
    if normal.dot(&ray.direction) > 0.0 {
        normal = -normal;
    }
    Some((t, normal))
}

/// Inertia of a solid box with the given half extents
pub(crate) fn box_inertia(mass: f32, half_extents: Vector3) -> Vector3 {
    let size = half_extents * 2.0;
    let (x2, y2, z2) = (size.x * size.x, size.y * size.y, size.z * size.z);
    Vector3::new(
        mass / 12.0 * (y2 + z2),
        mass / 12.0 * (x2 + z2),
        mass / 12.0 * (x2 + y2),
    )
}
