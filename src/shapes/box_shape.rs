use crate::shapes::{Shape, shape::box_inertia};
use crate::math::{Vector3, Aabb};
use std::any::Any;

/// A box collision shape
#[derive(Debug, Clone)]
pub struct BoxShape {
    /// Half the size of the box along each local axis
    half_extents: Vector3,
}

impl BoxShape {
    /// Creates a box from its half extents
    pub fn new(half_extents: Vector3) -> Self {
        Self {
            half_extents: half_extents.abs(),
        }
    }

    /// Creates a box from full width, height and depth
    pub fn new_with_dimensions(width: f32, height: f32, depth: f32) -> Self {
        Self::new(Vector3::new(width * 0.5, height * 0.5, depth * 0.5))
    }

    /// Returns the half extents
    pub fn get_half_extents(&self) -> Vector3 {
        self.half_extents
    }
}

impl Shape for BoxShape {
    fn shape_type(&self) -> &'static str {
        "box"
    }

    fn get_volume(&self) -> f32 {
        8.0 * self.half_extents.x * self.half_extents.y * self.half_extents.z
    }

    fn get_local_inertia(&self, mass: f32) -> Vector3 {
        box_inertia(mass, self.half_extents)
    }

    fn get_local_bounds(&self) -> Aabb {
        Aabb::new(-self.half_extents, self.half_extents)
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        let h = self.half_extents;
        Vector3::new(
            if direction.x >= 0.0 { h.x } else { -h.x },
            if direction.y >= 0.0 { h.y } else { -h.y },
            if direction.z >= 0.0 { h.z } else { -h.z },
        )
    }

    fn get_vertices(&self) -> Vec<Vector3> {
        self.get_local_bounds().corners().to_vec()
    }

    fn project_point(&self, point: Vector3) -> Option<(Vector3, Vector3)> {
        let h = self.half_extents;
        let gap = h - point.abs();
        if gap.x <= 0.0 || gap.y <= 0.0 || gap.z <= 0.0 {
            return None;
        }
        // Leave through the nearest face
        let axis = if gap.x <= gap.y && gap.x <= gap.z {
            0
        } else if gap.y <= gap.z {
            1
        } else {
            2
        };
        let mut surface = point;
        let mut normal = Vector3::zero();
        match axis {
            0 => {
                normal.x = if point.x >= 0.0 { 1.0 } else { -1.0 };
                surface.x = h.x * normal.x;
            }
            1 => {
                normal.y = if point.y >= 0.0 { 1.0 } else { -1.0 };
                surface.y = h.y * normal.y;
            }
            _ => {
                normal.z = if point.z >= 0.0 { 1.0 } else { -1.0 };
                surface.z = h.z * normal.z;
            }
        }
        Some((surface, normal))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
