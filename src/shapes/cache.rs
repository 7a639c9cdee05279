//! Shape construction from descriptions, with sharing of primitive shapes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PhysicsError;
use crate::math::Transform;
use crate::protocol::ShapeDescription;
use crate::shapes::{
    BoxShape, Capsule, Compound, CompoundChild, Cone, ConvexHull, Cylinder, HeightField, Plane, Shape, Sphere,
    TriangleMesh,
};
use crate::Result;

/// A shape produced for one body, tagged by who owns it
#[derive(Debug, Clone)]
pub enum BuiltShape {
    /// Shared through the cache; never released per body
    Cached(Arc<dyn Shape>),

    /// Built for this body only (convex, concave, heightfield)
    Owned(Arc<dyn Shape>),

    /// A compound assembled for this body
    Compound(Arc<dyn Shape>),
}

impl BuiltShape {
    /// The underlying shape
    pub fn shape(&self) -> Arc<dyn Shape> {
        match self {
            Self::Cached(shape) | Self::Owned(shape) | Self::Compound(shape) => Arc::clone(shape),
        }
    }

    /// Whether the shape is shared through the cache
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Primitive shapes keyed by their parameters
#[derive(Debug, Default)]
pub struct ShapeCache {
    shapes: HashMap<String, Arc<dyn Shape>>,
}

impl ShapeCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct cached shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    fn get_or_insert(&mut self, key: String, make: impl FnOnce() -> Arc<dyn Shape>) -> Arc<dyn Shape> {
        Arc::clone(self.shapes.entry(key).or_insert_with(make))
    }
}

fn check_positive(name: &str, value: f32) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidParameter(format!("{name} must be positive, got {value}")))
    }
}

/// Builds the collision shape for a rigid body description.
///
/// Primitive shapes go through `cache`; convex, concave and heightfield
/// shapes are built per body. Soft shape descriptions are rejected here, they
/// are turned into soft bodies by the dynamics world instead.
pub fn build_shape(description: &ShapeDescription, cache: &mut ShapeCache) -> Result<BuiltShape> {
    let built = match description {
        ShapeDescription::Plane { normal, distance } => {
            if normal.is_zero() {
                return Err(PhysicsError::InvalidParameter("plane normal is zero".into()));
            }
            let key = format!("plane_{}_{}_{}_{}", normal.x, normal.y, normal.z, distance);
            let (normal, distance) = (*normal, *distance);
            BuiltShape::Cached(cache.get_or_insert(key, || Arc::new(Plane::new(normal, distance))))
        }
        ShapeDescription::Box { width, height, depth } => {
            check_positive("box width", *width)?;
            check_positive("box height", *height)?;
            check_positive("box depth", *depth)?;
            let key = format!("box_{width}_{height}_{depth}");
            let (w, h, d) = (*width, *height, *depth);
            BuiltShape::Cached(cache.get_or_insert(key, || Arc::new(BoxShape::new_with_dimensions(w, h, d))))
        }
        ShapeDescription::Sphere { radius } => {
            check_positive("sphere radius", *radius)?;
            let r = *radius;
            BuiltShape::Cached(cache.get_or_insert(format!("sphere_{r}"), || Arc::new(Sphere::new(r))))
        }
        ShapeDescription::Cylinder { radius, height } => {
            check_positive("cylinder radius", *radius)?;
            check_positive("cylinder height", *height)?;
            let (r, h) = (*radius, *height);
            BuiltShape::Cached(cache.get_or_insert(format!("cylinder_{r}_{h}"), || Arc::new(Cylinder::new(r, h))))
        }
        ShapeDescription::Capsule { radius, height } => {
            check_positive("capsule radius", *radius)?;
            let (r, h) = (*radius, height.max(0.0));
            BuiltShape::Cached(cache.get_or_insert(format!("capsule_{r}_{h}"), || Arc::new(Capsule::new(r, h))))
        }
        ShapeDescription::Cone { radius, height } => {
            check_positive("cone radius", *radius)?;
            check_positive("cone height", *height)?;
            let (r, h) = (*radius, *height);
            BuiltShape::Cached(cache.get_or_insert(format!("cone_{r}_{h}"), || Arc::new(Cone::new(r, h))))
        }
        ShapeDescription::Convex { points } => {
            let hull = ConvexHull::new(points.clone())
                .ok_or_else(|| PhysicsError::InvalidParameter("convex shape has no points".into()))?;
            BuiltShape::Owned(Arc::new(hull))
        }
        ShapeDescription::Concave { vertices, indices } => {
            let mesh = TriangleMesh::new(vertices.clone(), indices.clone())
                .ok_or_else(|| PhysicsError::InvalidParameter("concave mesh is empty or has bad indices".into()))?;
            BuiltShape::Owned(Arc::new(mesh))
        }
        ShapeDescription::Heightfield { columns, rows, size_x, size_z, heights } => {
            let field = HeightField::new(heights.clone(), *columns, *rows, *size_x, *size_z).ok_or_else(|| {
                PhysicsError::InvalidParameter(format!(
                    "heightfield expects {} heights for a {columns}x{rows} grid, got {}",
                    columns * rows,
                    heights.len()
                ))
            })?;
            BuiltShape::Owned(Arc::new(field))
        }
        ShapeDescription::Compound { children } => {
            let mut parts = Vec::with_capacity(children.len());
            for child in children {
                let shape = build_shape(&child.shape, cache)?.shape();
                parts.push(CompoundChild {
                    transform: Transform::new(child.position, child.rotation.normalize()),
                    shape,
                });
            }
            let compound = Compound::new(parts)
                .ok_or_else(|| PhysicsError::InvalidParameter("compound shape has no children".into()))?;
            BuiltShape::Compound(Arc::new(compound))
        }
        ShapeDescription::SoftRopeMesh { .. }
        | ShapeDescription::SoftClothMesh { .. }
        | ShapeDescription::SoftTrimesh { .. } => {
            return Err(PhysicsError::InvalidParameter(format!(
                "{} describes a soft body, not a collision shape",
                description.type_name()
            )));
        }
        ShapeDescription::Unrecognized => {
            return Err(PhysicsError::UnknownShape(description.type_name().to_string()));
        }
    };
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use crate::protocol::ChildDescription;

    #[test]
    fn primitives_are_shared() {
        let mut cache = ShapeCache::new();
        let a = build_shape(&ShapeDescription::Sphere { radius: 1.0 }, &mut cache).unwrap();
        let b = build_shape(&ShapeDescription::Sphere { radius: 1.0 }, &mut cache).unwrap();
        assert!(a.is_cached());
        assert!(Arc::ptr_eq(&a.shape(), &b.shape()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn meshes_are_not_cached() {
        let mut cache = ShapeCache::new();
        let points = vec![Vector3::zero(), Vector3::unit_x(), Vector3::unit_y()];
        let built = build_shape(&ShapeDescription::Convex { points }, &mut cache).unwrap();
        assert!(matches!(built, BuiltShape::Owned(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn compound_children_use_the_cache() {
        let mut cache = ShapeCache::new();
        let description = ShapeDescription::Compound {
            children: vec![
                ChildDescription::new(ShapeDescription::Box { width: 1.0, height: 1.0, depth: 1.0 }, Vector3::zero()),
                ChildDescription::new(ShapeDescription::Box { width: 1.0, height: 1.0, depth: 1.0 }, Vector3::unit_y()),
            ],
        };
        let built = build_shape(&description, &mut cache).unwrap();
        assert!(matches!(built, BuiltShape::Compound(_)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_and_soft_shapes_are_rejected() {
        let mut cache = ShapeCache::new();
        assert!(matches!(
            build_shape(&ShapeDescription::Unrecognized, &mut cache),
            Err(PhysicsError::UnknownShape(_))
        ));
        let rope = ShapeDescription::SoftRopeMesh { start: Vector3::zero(), end: Vector3::unit_x(), segments: 4 };
        assert!(build_shape(&rope, &mut cache).is_err());
    }
}
