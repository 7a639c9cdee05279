use crate::math::{Vector3, Transform};

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Ray representation for intersection tests
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Ray {
    /// Origin of the ray
    pub origin: Vector3,

    /// Direction of the ray (normalized by the constructor)
    pub direction: Vector3,
}

impl Ray {
    /// Creates a new ray, normalizing the direction
    #[inline]
    pub fn new(origin: Vector3, direction: Vector3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Returns the point at a given distance along the ray
    #[inline]
    pub fn point_at(&self, t: f32) -> Vector3 {
        self.origin + self.direction * t
    }

    /// Expresses the ray in the local frame of `transform`
    #[inline]
    pub fn to_local(&self, transform: &Transform) -> Self {
        Self {
            origin: transform.inverse_transform_point(self.origin),
            direction: transform.inverse_transform_direction(self.direction),
        }
    }
}
