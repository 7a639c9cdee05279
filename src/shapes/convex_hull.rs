use crate::shapes::{Shape, shape::box_inertia};
use crate::math::{Vector3, Aabb};
use std::any::Any;

/// A convex shape defined by a point cloud; the hull is implicit in the support mapping
#[derive(Debug, Clone)]
pub struct ConvexHull {
    points: Vec<Vector3>,
    bounds: Aabb,
}

impl ConvexHull {
    /// Creates a hull from its points; returns `None` for an empty cloud
    pub fn new(points: Vec<Vector3>) -> Option<Self> {
        let bounds = Aabb::from_points(&points)?;
        Some(Self { points, bounds })
    }

    /// Returns the hull points
    pub fn get_points(&self) -> &[Vector3] {
        &self.points
    }
}

impl Shape for ConvexHull {
    fn shape_type(&self) -> &'static str {
        "convex"
    }

    fn get_volume(&self) -> f32 {
        let size = self.bounds.half_extents() * 2.0;
        size.x * size.y * size.z
    }

    fn get_local_inertia(&self, mass: f32) -> Vector3 {
        box_inertia(mass, self.bounds.half_extents())
    }

    fn get_local_bounds(&self) -> Aabb {
        self.bounds
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        let mut best = self.points[0];
        let mut best_dot = best.dot(&direction);
        for point in &self.points[1..] {
            let d = point.dot(&direction);
            if d > best_dot {
                best_dot = d;
                best = *point;
            }
        }
        best
    }

    fn get_vertices(&self) -> Vec<Vector3> {
        self.points.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A single triangle; used by the narrow phase against concave shapes
#[derive(Debug, Clone)]
pub struct Triangle {
    vertices: [Vector3; 3],
}

impl Triangle {
    /// Creates a triangle from its vertices
    pub fn new(vertices: [Vector3; 3]) -> Self {
        Self { vertices }
    }

    /// Returns the unit face normal
    pub fn normal(&self) -> Vector3 {
        (self.vertices[1] - self.vertices[0])
            .cross(&(self.vertices[2] - self.vertices[0]))
            .normalize()
    }
}

impl Shape for Triangle {
    fn shape_type(&self) -> &'static str {
        "triangle"
    }

    fn get_volume(&self) -> f32 {
        0.0
    }

    fn get_local_inertia(&self, _mass: f32) -> Vector3 {
        Vector3::zero()
    }

    fn get_local_bounds(&self) -> Aabb {
        let mut bounds = Aabb::new(self.vertices[0], self.vertices[0]);
        bounds.expand_to_include_point(self.vertices[1]);
        bounds.expand_to_include_point(self.vertices[2]);
        bounds
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        let mut best = self.vertices[0];
        for vertex in &self.vertices[1..] {
            if vertex.dot(&direction) > best.dot(&direction) {
                best = *vertex;
            }
        }
        best
    }

    fn get_vertices(&self) -> Vec<Vector3> {
        self.vertices.to_vec()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
