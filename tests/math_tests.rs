use phys_bridge::math::{Vector3, Quaternion, Aabb, Ray, Transform};
use std::f32::consts::PI;
use approx::assert_relative_eq;

#[test]
fn test_vector3_operations() {
    let v1 = Vector3::new(1.0, 2.0, 3.0);
    let v2 = Vector3::new(4.0, 5.0, 6.0);

    let sum = v1 + v2;
    assert_eq!(sum, Vector3::new(5.0, 7.0, 9.0));

    let diff = v2 - v1;
    assert_eq!(diff, Vector3::new(3.0, 3.0, 3.0));

    let scaled = v1 * 2.0;
    assert_eq!(scaled, Vector3::new(2.0, 4.0, 6.0));

    assert_eq!(v1.dot(&v2), 1.0 * 4.0 + 2.0 * 5.0 + 3.0 * 6.0);

    let cross = v1.cross(&v2);
    assert_eq!(cross.x, v1.y * v2.z - v1.z * v2.y);
    assert_eq!(cross.y, v1.z * v2.x - v1.x * v2.z);
    assert_eq!(cross.z, v1.x * v2.y - v1.y * v2.x);

    let length = v1.length();
    assert_relative_eq!(length, 14.0f32.sqrt());

    let normalized = v1.normalize();
    assert_relative_eq!(normalized.length(), 1.0);
    assert_relative_eq!(normalized.x, v1.x / length);

    // Zero stays zero instead of turning into NaN
    assert!(Vector3::zero().normalize().is_finite());
}

#[test]
fn test_vector3_wire_layout() {
    let mut out = [0.0f32; 5];
    Vector3::new(1.0, 2.0, 3.0).write_to(&mut out[1..4]);
    assert_eq!(out, [0.0, 1.0, 2.0, 3.0, 0.0]);
    assert_eq!(Vector3::from_slice(&out[1..4]), Vector3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_quaternion_operations() {
    let q = Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), PI / 2.0);
    assert_relative_eq!(q.normalize().length(), 1.0);

    // 90 degrees about Y takes +X to -Z
    let rotated = q.rotate_vector(Vector3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(rotated.y, 0.0, epsilon = 1e-5);
    assert_relative_eq!(rotated.z, -1.0, epsilon = 1e-5);

    let q_conj = q.conjugate();
    assert_eq!(q_conj.w, q.w);
    assert_eq!(q_conj.x, -q.x);
    assert_eq!(q_conj.y, -q.y);
    assert_eq!(q_conj.z, -q.z);

    let q1 = Quaternion::from_axis_angle(Vector3::new(1.0, 0.0, 0.0), PI / 4.0);
    let q2 = Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), PI / 4.0);
    let v = Vector3::new(0.0, 0.0, 1.0);
    let composed = (q2 * q1).rotate_vector(v);
    let sequential = q2.rotate_vector(q1.rotate_vector(v));
    assert_relative_eq!(composed.x, sequential.x, epsilon = 1e-5);
    assert_relative_eq!(composed.y, sequential.y, epsilon = 1e-5);
    assert_relative_eq!(composed.z, sequential.z, epsilon = 1e-5);
}

#[test]
fn test_quaternion_wire_order() {
    let q = Quaternion::new(0.5, 0.1, 0.2, 0.3);
    let mut out = [0.0f32; 4];
    q.write_to(&mut out);

    // x, y, z, w on the wire
    assert_eq!(out, [0.1, 0.2, 0.3, 0.5]);
    assert_eq!(Quaternion::from_slice(&out), q);
    assert_eq!(Quaternion::from_xyzw(0.1, 0.2, 0.3, 0.5), q);
}

#[test]
fn test_transform_operations() {
    let position = Vector3::new(1.0, 2.0, 3.0);
    let rotation = Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), PI / 2.0);
    let transform = Transform::new(position, rotation);

    // Rotate (1, 0, 0) to (0, 0, -1), then translate
    let point = Vector3::new(1.0, 0.0, 0.0);
    let transformed = transform.transform_point(point);
    assert_relative_eq!(transformed.x, 1.0, epsilon = 1e-5);
    assert_relative_eq!(transformed.y, 2.0, epsilon = 1e-5);
    assert_relative_eq!(transformed.z, 2.0, epsilon = 1e-5);

    let original = transform.inverse().transform_point(transformed);
    assert_relative_eq!(original.x, point.x, epsilon = 1e-5);
    assert_relative_eq!(original.y, point.y, epsilon = 1e-5);
    assert_relative_eq!(original.z, point.z, epsilon = 1e-5);

    let back = transform.inverse_transform_point(transformed);
    assert_relative_eq!(back.x, point.x, epsilon = 1e-5);
    assert_relative_eq!(back.z, point.z, epsilon = 1e-5);
}

#[test]
fn test_aabb_operations() {
    let aabb = Aabb::new(Vector3::new(-1.0, -2.0, -3.0), Vector3::new(1.0, 2.0, 3.0));

    assert_eq!(aabb.center(), Vector3::zero());
    assert_eq!(aabb.half_extents(), Vector3::new(1.0, 2.0, 3.0));

    assert!(aabb.contains_point(Vector3::zero()));
    assert!(aabb.contains_point(Vector3::new(0.5, 1.0, 1.5)));
    assert!(!aabb.contains_point(Vector3::new(2.0, 0.0, 0.0)));

    let aabb2 = Aabb::new(Vector3::new(0.5, 0.5, 0.5), Vector3::new(2.0, 3.0, 4.0));
    assert!(aabb.intersects(&aabb2));

    let aabb3 = Aabb::new(Vector3::new(2.0, 3.0, 4.0), Vector3::new(3.0, 4.0, 5.0));
    assert!(!aabb.intersects(&aabb3));

    let merged = aabb.merge(&aabb2);
    assert_eq!(merged.min, Vector3::new(-1.0, -2.0, -3.0));
    assert_eq!(merged.max, Vector3::new(2.0, 3.0, 4.0));
}

#[test]
fn test_ray_operations() {
    let ray = Ray::new(Vector3::zero(), Vector3::new(1.0, 0.0, 0.0));
    assert_eq!(ray.point_at(2.0), Vector3::new(2.0, 0.0, 0.0));

    let aabb = Aabb::new(Vector3::new(2.0, -1.0, -1.0), Vector3::new(4.0, 1.0, 1.0));
    let (enter, exit) = aabb.intersects_ray(&ray, 0.0, f32::MAX).unwrap();
    assert_relative_eq!(enter, 2.0, epsilon = 1e-5);
    assert_relative_eq!(exit, 4.0, epsilon = 1e-5);
}
