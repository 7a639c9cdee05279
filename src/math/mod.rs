mod vector;
mod transform;
mod rotation;
mod aabb;
mod ray;

pub use vector::Vector3;
pub use transform::Transform;
pub use rotation::Quaternion;
pub use aabb::Aabb;
pub use ray::Ray;

/// 3x3 matrix used for inertia tensors
pub type Matrix3 = nalgebra::Matrix3<f32>;

/// Constant for a very small number, used for comparisons
pub const EPSILON: f32 = 1.0e-6;

/// Returns true if the two floating point values are approximately equal
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Returns true if the value is approximately zero
#[inline]
pub fn approx_zero(a: f32) -> bool {
    a.abs() < EPSILON
}

/// Multiplies a vector by a 3x3 matrix
#[inline]
pub fn mul_matrix_vector(matrix: &Matrix3, v: Vector3) -> Vector3 {
    Vector3::from_nalgebra(&(matrix * v.to_nalgebra()))
}

/// Builds a diagonal matrix from a vector
#[inline]
pub fn diagonal(v: Vector3) -> Matrix3 {
    Matrix3::from_diagonal(&v.to_nalgebra())
}
