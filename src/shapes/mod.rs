mod shape;
mod sphere;
mod box_shape;
mod plane;
mod capsule;
mod cylinder;
mod cone;
mod convex_hull;
mod mesh;
mod height_field;
mod compound;
mod cache;

pub use self::shape::{Shape, RayHit};
pub use self::sphere::Sphere;
pub use self::box_shape::BoxShape;
pub use self::plane::Plane;
pub use self::capsule::Capsule;
pub use self::cylinder::Cylinder;
pub use self::cone::Cone;
pub use self::convex_hull::{ConvexHull, Triangle};
pub use self::mesh::TriangleMesh;
pub use self::height_field::HeightField;
pub use self::compound::{Compound, CompoundChild};
pub use self::cache::{ShapeCache, BuiltShape, build_shape};
