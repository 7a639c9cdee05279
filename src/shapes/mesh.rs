use crate::shapes::{Shape, RayHit, shape::{box_inertia, ray_triangle}};
use crate::math::{Vector3, Aabb, Ray, Transform};
use std::any::Any;

/// A concave triangle mesh, intended for static geometry
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    vertices: Vec<Vector3>,
    indices: Vec<[u32; 3]>,
    bounds: Aabb,
}

impl TriangleMesh {
    /// Creates a mesh; returns `None` when empty or when an index is out of range
    pub fn new(vertices: Vec<Vector3>, indices: Vec<[u32; 3]>) -> Option<Self> {
        if indices.is_empty() {
            return None;
        }
        let count = vertices.len() as u32;
        if indices.iter().flatten().any(|&i| i >= count) {
            return None;
        }
        let bounds = Aabb::from_points(&vertices)?;
        Some(Self { vertices, indices, bounds })
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    fn triangle(&self, index: &[u32; 3]) -> [Vector3; 3] {
        [
            self.vertices[index[0] as usize],
            self.vertices[index[1] as usize],
            self.vertices[index[2] as usize],
        ]
    }
}

impl Shape for TriangleMesh {
    fn shape_type(&self) -> &'static str {
        "concave"
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
        let mut best = self.vertices[0];
        for vertex in &self.vertices[1..] {
            if vertex.dot(&direction) > best.dot(&direction) {
                best = *vertex;
            }
        }
        best
    }

    fn is_convex(&self) -> bool {
        false
    }

    fn get_triangles(&self, bounds: &Aabb) -> Vec<[Vector3; 3]> {
        self.indices
            .iter()
            .map(|index| self.triangle(index))
            .filter(|tri| {
                let mut tri_bounds = Aabb::new(tri[0], tri[0]);
                tri_bounds.expand_to_include_point(tri[1]);
                tri_bounds.expand_to_include_point(tri[2]);
                tri_bounds.intersects(bounds)
            })
            .collect()
    }

    fn intersects_ray(&self, ray: &Ray, transform: &Transform, max_distance: f32) -> Option<RayHit> {
        let local = ray.to_local(transform);
        self.indices
            .iter()
            .filter_map(|index| ray_triangle(&local, &self.triangle(index), max_distance))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(distance, normal)| RayHit {
                distance,
                normal: transform.transform_direction(normal),
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
