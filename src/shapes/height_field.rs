use crate::shapes::{Shape, RayHit, shape::{box_inertia, ray_triangle}};
use crate::math::{Vector3, Aabb, Ray, Transform};
use std::any::Any;

/// A height field collision shape (terrain).
///
/// Heights are stored row-major (`z` rows of `x` columns). The grid is centered
/// on the local origin horizontally and vertically on the middle of its height range.
#[derive(Debug, Clone)]
pub struct HeightField {
    heights: Vec<f32>,
    columns: usize,
    rows: usize,
    cell_x: f32,
    cell_z: f32,
    half_x: f32,
    half_z: f32,
    mid_height: f32,
    half_range: f32,
}

impl HeightField {
    /// Creates a height field; returns `None` if the grid is degenerate or the
    /// height count doesn't match `columns * rows`
    pub fn new(heights: Vec<f32>, columns: usize, rows: usize, size_x: f32, size_z: f32) -> Option<Self> {
        if columns < 2 || rows < 2 || heights.len() != columns * rows {
            return None;
        }
        let min_height = heights.iter().copied().fold(f32::MAX, f32::min);
        let max_height = heights.iter().copied().fold(f32::MIN, f32::max);
        Some(Self {
            heights,
            columns,
            rows,
            cell_x: size_x / (columns - 1) as f32,
            cell_z: size_z / (rows - 1) as f32,
            half_x: size_x * 0.5,
            half_z: size_z * 0.5,
            mid_height: (min_height + max_height) * 0.5,
            half_range: (max_height - min_height) * 0.5,
        })
    }

    fn vertex(&self, column: usize, row: usize) -> Vector3 {
        Vector3::new(
            column as f32 * self.cell_x - self.half_x,
            self.heights[row * self.columns + column] - self.mid_height,
            row as f32 * self.cell_z - self.half_z,
        )
    }

    fn cell_triangles(&self, column: usize, row: usize, out: &mut Vec<[Vector3; 3]>) {
        let a = self.vertex(column, row);
        let b = self.vertex(column + 1, row);
        let c = self.vertex(column, row + 1);
        let d = self.vertex(column + 1, row + 1);
        out.push([a, c, b]);
        out.push([b, c, d]);
    }

    fn cell_range(&self, lo: f32, hi: f32, half: f32, cell: f32, count: usize) -> (usize, usize) {
        let max_cell = count.saturating_sub(2) as f32;
        let first = ((lo + half) / cell).floor().clamp(0.0, max_cell) as usize;
        let last = ((hi + half) / cell).floor().clamp(0.0, max_cell) as usize;
        (first, last)
    }
}

impl Shape for HeightField {
    fn shape_type(&self) -> &'static str {
        "heightfield"
    }

    fn get_volume(&self) -> f32 {
        let bounds = self.get_local_bounds().half_extents() * 2.0;
        bounds.x * bounds.y.max(crate::math::EPSILON) * bounds.z
    }

    fn get_local_inertia(&self, mass: f32) -> Vector3 {
        box_inertia(mass, self.get_local_bounds().half_extents())
    }

    fn get_local_bounds(&self) -> Aabb {
        let extent = Vector3::new(self.half_x, self.half_range, self.half_z);
        Aabb::new(-extent, extent)
    }

    fn get_support_point(&self, direction: Vector3) -> Vector3 {
        let bounds = self.get_local_bounds();
        Vector3::new(
            if direction.x >= 0.0 { bounds.max.x } else { bounds.min.x },
            if direction.y >= 0.0 { bounds.max.y } else { bounds.min.y },
            if direction.z >= 0.0 { bounds.max.z } else { bounds.min.z },
        )
    }

    fn is_convex(&self) -> bool {
        false
    }

    fn get_triangles(&self, bounds: &Aabb) -> Vec<[Vector3; 3]> {
        let local = self.get_local_bounds();
        if !local.intersects(bounds) {
            return Vec::new();
        }
        let (c0, c1) = self.cell_range(bounds.min.x, bounds.max.x, self.half_x, self.cell_x, self.columns);
        let (r0, r1) = self.cell_range(bounds.min.z, bounds.max.z, self.half_z, self.cell_z, self.rows);
        let mut triangles = Vec::new();
        for row in r0..=r1 {
            for column in c0..=c1 {
                self.cell_triangles(column, row, &mut triangles);
            }
        }
        triangles
    }

    fn project_point(&self, point: Vector3) -> Option<(Vector3, Vector3)> {
        let probe = Aabb::new(point, point);
        self.get_triangles(&probe).into_iter().find_map(|tri| {
            let normal = (tri[1] - tri[0]).cross(&(tri[2] - tri[0])).normalize();
            let normal = if normal.y < 0.0 { -normal } else { normal };
            let depth = (point - tri[0]).dot(&normal);
            if depth < 0.0 {
                Some((point - normal * depth, normal))
            } else {
                None
            }
        })
    }

    fn intersects_ray(&self, ray: &Ray, transform: &Transform, max_distance: f32) -> Option<RayHit> {
        let local = ray.to_local(transform);
        let (t0, t1) = self.get_local_bounds().intersects_ray(&local, 0.0, max_distance)?;
        let mut span = Aabb::new(local.point_at(t0), local.point_at(t0));
        span.expand_to_include_point(local.point_at(t1));
        self.get_triangles(&span)
            .iter()
            .filter_map(|tri| ray_triangle(&local, tri, max_distance))
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
