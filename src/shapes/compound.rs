use crate::shapes::{Shape, RayHit, shape::box_inertia};
use crate::math::{Vector3, Aabb, Ray, Transform};
use std::any::Any;
use std::sync::Arc;

/// A child of a compound shape
#[derive(Debug, Clone)]
pub struct CompoundChild {
    /// Placement of the child in the compound's frame
    pub transform: Transform,

    /// The child's shape
    pub shape: Arc<dyn Shape>,
}

/// A compound collision shape composed of multiple shapes
#[derive(Debug, Clone)]
pub struct Compound {
    children: Vec<CompoundChild>,
    bounds: Aabb,
}

impl Compound {
    /// Creates a compound shape; returns `None` without children
    pub fn new(children: Vec<CompoundChild>) -> Option<Self> {
        let mut bounds: Option<Aabb> = None;
        for child in &children {
            let child_bounds = child.shape.get_world_bounds(&child.transform);
            bounds = Some(match bounds {
                Some(b) => b.merge(&child_bounds),
                None => child_bounds,
            });
        }
        Some(Self { children, bounds: bounds? })
    }

    /// Returns the children of the compound shape
    pub fn get_children(&self) -> &[CompoundChild] {
        &self.children
    }
}

impl Shape for Compound {
    fn shape_type(&self) -> &'static str {
        "compound"
    }

    fn get_volume(&self) -> f32 {
        self.children.iter().map(|child| child.shape.get_volume()).sum()
    }

    fn get_local_inertia(&self, mass: f32) -> Vector3 {
        box_inertia(mass, self.bounds.half_extents())
    }

    fn get_local_bounds(&self) -> Aabb {
        self.bounds
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        let mut best = Vector3::zero();
        let mut best_dot = f32::MIN;
        for child in &self.children {
            let point = child.shape.get_world_support_point(direction, &child.transform);
            let d = point.dot(&direction);
            if d > best_dot {
                best_dot = d;
                best = point;
            }
        }
        best
    }

    fn is_convex(&self) -> bool {
        false
    }

    fn project_point(&self, point: Vector3) -> Option<(Vector3, Vector3)> {
        self.children.iter().find_map(|child| {
            let local = child.transform.inverse_transform_point(point);
            child.shape.project_point(local).map(|(surface, normal)| {
                (child.transform.transform_point(surface), child.transform.transform_direction(normal))
            })
        })
    }

    fn intersects_ray(&self, ray: &Ray, transform: &Transform, max_distance: f32) -> Option<RayHit> {
        self.children
            .iter()
            .filter_map(|child| {
                let child_transform = transform.combine(&child.transform);
                child.shape.intersects_ray(ray, &child_transform, max_distance)
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
