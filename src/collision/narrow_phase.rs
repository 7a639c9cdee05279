use crate::bodies::RigidBody;
use crate::collision::{
    collision_pair::CollisionPair,
    contact_manifold::{ContactManifold, MAX_CONTACT_POINTS},
};
use crate::core::ContactPoint;
use crate::math::{self, Aabb, Transform, Vector3};
use crate::shapes::{BoxShape, Compound, Plane, Shape, Sphere, Triangle};

/// Shapes closer than this still produce (separated) contacts
pub const CONTACT_MARGIN: f32 = 0.02;

/// Trait for narrow-phase collision detection algorithms
pub trait NarrowPhase: Send {
    /// Builds the manifold of a pair whose bounds overlap.
    /// The manifold is returned even when the shapes do not touch.
    fn generate_contacts(&self, pair: CollisionPair, body_a: &RigidBody, body_b: &RigidBody) -> ContactManifold;
}

/// Separating-axis narrow phase over support functions, with dedicated
/// sphere, box and plane paths and recursion into compound and concave shapes
#[derive(Debug, Default, Clone, Copy)]
pub struct SatNarrowPhase;

impl SatNarrowPhase {
    /// Creates a new narrow phase
    pub fn new() -> Self {
        Self
    }
}

impl NarrowPhase for SatNarrowPhase {
    fn generate_contacts(&self, pair: CollisionPair, body_a: &RigidBody, body_b: &RigidBody) -> ContactManifold {
        let mut manifold = ContactManifold::new(pair);
        let mut contacts = Vec::new();
        collide(
            body_a.get_shape().as_ref(),
            &body_a.get_transform(),
            body_b.get_shape().as_ref(),
            &body_b.get_transform(),
            &mut contacts,
        );

        contacts.sort_by(|x, y| y.penetration.total_cmp(&x.penetration));
        for contact in contacts {
            manifold.add_contact(contact);
        }

        let (material_a, material_b) = (body_a.get_material(), body_b.get_material());
        manifold.set_material_properties(
            material_a.combined_restitution(material_b),
            material_a.combined_friction(material_b),
        );
        manifold
    }
}

/// Collects contacts between two placed shapes; normals point from `a` to `b`
pub fn collide(a: &dyn Shape, ta: &Transform, b: &dyn Shape, tb: &Transform, out: &mut Vec<ContactPoint>) {
    if let Some(compound) = a.as_any().downcast_ref::<Compound>() {
        for child in compound.get_children() {
            collide(child.shape.as_ref(), &ta.combine(&child.transform), b, tb, out);
        }
        return;
    }
    if let Some(compound) = b.as_any().downcast_ref::<Compound>() {
        for child in compound.get_children() {
            collide(a, ta, child.shape.as_ref(), &tb.combine(&child.transform), out);
        }
        return;
    }

    match (a.as_any().downcast_ref::<Plane>(), b.as_any().downcast_ref::<Plane>()) {
        (Some(_), Some(_)) => return,
        (Some(plane), None) => {
            if b.is_convex() {
                plane_contacts(plane, ta, b, tb, false, out);
            }
            return;
        }
        (None, Some(plane)) => {
            if a.is_convex() {
                plane_contacts(plane, tb, a, ta, true, out);
            }
            return;
        }
        (None, None) => {}
    }

    match (a.is_convex(), b.is_convex()) {
        (true, true) => convex_contacts(a, ta, b, tb, false, out),
        (false, true) => mesh_contacts(a, ta, b, tb, false, out),
        (true, false) => mesh_contacts(b, tb, a, ta, true, out),
        (false, false) => {}
    }
}

fn push(out: &mut Vec<ContactPoint>, position: Vector3, normal: Vector3, penetration: f32, flip: bool) {
    out.push(ContactPoint {
        position,
        normal: if flip { -normal } else { normal },
        penetration,
    });
}

fn axis_vector(axis: usize, value: f32) -> Vector3 {
    match axis {
        0 => Vector3::new(value, 0.0, 0.0),
        1 => Vector3::new(0.0, value, 0.0),
        _ => Vector3::new(0.0, 0.0, value),
    }
}

fn plane_contacts(plane: &Plane, tp: &Transform, other: &dyn Shape, to: &Transform, flip: bool, out: &mut Vec<ContactPoint>) {
    let normal = tp.transform_direction(plane.get_normal());
    let origin = tp.transform_point(plane.get_normal() * plane.get_distance());

    let mut vertices: Vec<Vector3> = other.get_vertices().into_iter().map(|v| to.transform_point(v)).collect();
    if vertices.is_empty() {
        vertices.push(other.get_world_support_point(-normal, to));
    }

    let mut below: Vec<(Vector3, f32)> = vertices
        .into_iter()
        .filter_map(|v| {
            let distance = (v - origin).dot(&normal);
            (distance < CONTACT_MARGIN).then_some((v, -distance))
        })
        .collect();
    below.sort_by(|x, y| y.1.total_cmp(&x.1));
    below.truncate(MAX_CONTACT_POINTS);

    for (point, penetration) in below {
        push(out, point, normal, penetration, flip);
    }
}

fn mesh_contacts(mesh: &dyn Shape, tm: &Transform, other: &dyn Shape, to: &Transform, flip: bool, out: &mut Vec<ContactPoint>) {
    let corners = other.get_world_bounds(to).expand(CONTACT_MARGIN).corners();
    let local_corners = corners.map(|c| tm.inverse_transform_point(c));
    let Some(local_bounds) = Aabb::from_points(&local_corners) else {
        return;
    };

    for vertices in mesh.get_triangles(&local_bounds) {
        let triangle = Triangle::new(vertices);
        convex_contacts(&triangle, tm, other, to, flip, out);
    }
}

fn convex_contacts(a: &dyn Shape, ta: &Transform, b: &dyn Shape, tb: &Transform, flip: bool, out: &mut Vec<ContactPoint>) {
    let sphere_a = a.as_any().downcast_ref::<Sphere>();
    let sphere_b = b.as_any().downcast_ref::<Sphere>();

    if let (Some(sa), Some(sb)) = (sphere_a, sphere_b) {
        sphere_sphere(sa.get_radius(), ta.position, sb.get_radius(), tb.position, flip, out);
        return;
    }
    if let (Some(sphere), Some(shape)) = (sphere_a, b.as_any().downcast_ref::<BoxShape>()) {
        sphere_box(sphere.get_radius(), ta.position, shape, tb, !flip, out);
        return;
    }
    if let (Some(shape), Some(sphere)) = (a.as_any().downcast_ref::<BoxShape>(), sphere_b) {
        sphere_box(sphere.get_radius(), tb.position, shape, ta, flip, out);
        return;
    }

    sat_contacts(a, ta, b, tb, flip, out);
}

fn sphere_sphere(radius_a: f32, center_a: Vector3, radius_b: f32, center_b: Vector3, flip: bool, out: &mut Vec<ContactPoint>) {
    let delta = center_b - center_a;
    let distance = delta.length();
    let penetration = radius_a + radius_b - distance;
    if penetration < -CONTACT_MARGIN {
        return;
    }

    // Coincident centers have no meaningful direction
    let normal = if distance > math::EPSILON { delta / distance } else { Vector3::unit_y() };
    let position = center_a + normal * (radius_a - penetration * 0.5);
    push(out, position, normal, penetration, flip);
}

/// Normal points from the box to the sphere
fn sphere_box(radius: f32, center: Vector3, shape: &BoxShape, transform: &Transform, flip: bool, out: &mut Vec<ContactPoint>) {
    let half = shape.get_half_extents();
    let local = transform.inverse_transform_point(center);
    let clamped = Vector3::new(
        local.x.clamp(-half.x, half.x),
        local.y.clamp(-half.y, half.y),
        local.z.clamp(-half.z, half.z),
    );
    let delta = local - clamped;
    let distance = delta.length();

    let (normal, penetration, surface) = if distance > math::EPSILON {
        if distance > radius + CONTACT_MARGIN {
            return;
        }
        (delta / distance, radius - distance, clamped)
    } else {
        // Center inside the box: leave through the nearest face
        let (axis, gap) = (0..3)
            .map(|i| (i, half.axis(i) - local.axis(i).abs()))
            .fold((0, f32::MAX), |best, candidate| if candidate.1 < best.1 { candidate } else { best });
        let sign = if local.axis(axis) < 0.0 { -1.0 } else { 1.0 };
        let offset = axis_vector(axis, sign * half.axis(axis) - local.axis(axis));
        (axis_vector(axis, sign), radius + gap, local + offset)
    };

    push(
        out,
        transform.transform_point(surface),
        transform.transform_direction(normal),
        penetration,
        flip,
    );
}

/// Extent of a placed shape along a unit axis
fn project(shape: &dyn Shape, transform: &Transform, axis: Vector3) -> (f32, f32) {
    let max = shape.get_world_support_point(axis, transform).dot(&axis);
    let min = shape.get_world_support_point(-axis, transform).dot(&axis);
    (min, max)
}

fn candidate_axes(a: &dyn Shape, ta: &Transform, b: &dyn Shape, tb: &Transform) -> Vec<Vector3> {
    let basis = [Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()];
    let axes_a = basis.map(|e| ta.transform_direction(e));
    let axes_b = basis.map(|e| tb.transform_direction(e));

    let mut axes = Vec::with_capacity(20);
    axes.extend(basis);
    axes.extend(axes_a);
    axes.extend(axes_b);
    axes.push(tb.position - ta.position);
    for ea in &axes_a {
        for eb in &axes_b {
            axes.push(ea.cross(eb));
        }
    }
    if let Some(triangle) = a.as_any().downcast_ref::<Triangle>() {
        axes.push(ta.transform_direction(triangle.normal()));
    }
    if let Some(triangle) = b.as_any().downcast_ref::<Triangle>() {
        axes.push(tb.transform_direction(triangle.normal()));
    }
    axes
}

fn sat_contacts(a: &dyn Shape, ta: &Transform, b: &dyn Shape, tb: &Transform, flip: bool, out: &mut Vec<ContactPoint>) {
    let mut best: Option<(f32, Vector3)> = None;
    for axis in candidate_axes(a, ta, b, tb) {
        let length = axis.length();
        if length < 1.0e-4 {
            continue;
        }
        let n = axis / length;
        let (min_a, max_a) = project(a, ta, n);
        let (min_b, max_b) = project(b, tb, n);

        let forward = max_a - min_b;
        let backward = max_b - min_a;
        let (overlap, normal) = if forward < backward { (forward, n) } else { (backward, -n) };
        if overlap < -CONTACT_MARGIN {
            return;
        }
        if best.map_or(true, |(depth, _)| overlap < depth) {
            best = Some((overlap, normal));
        }
    }

    let Some((depth, normal)) = best else {
        return;
    };

    let support_a = a.get_world_support_point(normal, ta);
    let support_b = b.get_world_support_point(-normal, tb);

    let mut points = feature_points(b, tb, a, ta, normal, support_a.dot(&normal), depth, 1.0);
    points.extend(feature_points(a, ta, b, tb, normal, support_b.dot(&normal), depth, -1.0));

    if points.is_empty() {
        push(out, (support_a + support_b) * 0.5, normal, depth, flip);
        return;
    }

    points.sort_by(|x, y| y.1.total_cmp(&x.1));
    points.truncate(MAX_CONTACT_POINTS);
    for (position, penetration) in points {
        push(out, position, normal, penetration, flip);
    }
}

/// Vertices of `shape` that sink past the `face` level of `other` along
/// `normal` and lie within `other`'s extent across it. `side` is +1 when
/// `shape` is the body the normal points toward.
#[allow(clippy::too_many_arguments)]
fn feature_points(
    shape: &dyn Shape,
    transform: &Transform,
    other: &dyn Shape,
    other_transform: &Transform,
    normal: Vector3,
    face: f32,
    depth: f32,
    side: f32,
) -> Vec<(Vector3, f32)> {
    let vertices = shape.get_vertices();
    if vertices.is_empty() {
        return Vec::new();
    }

    let tangent = normal.any_perpendicular();
    let bitangent = normal.cross(&tangent);
    let (min_t, max_t) = project(other, other_transform, tangent);
    let (min_bt, max_bt) = project(other, other_transform, bitangent);

    vertices
        .into_iter()
        .filter_map(|v| {
            let world = transform.transform_point(v);
            let penetration = side * (face - world.dot(&normal));
            if penetration < -CONTACT_MARGIN || penetration > depth + CONTACT_MARGIN {
                return None;
            }
            let t = world.dot(&tangent);
            let bt = world.dot(&bitangent);
            let inside = t >= min_t - CONTACT_MARGIN
                && t <= max_t + CONTACT_MARGIN
                && bt >= min_bt - CONTACT_MARGIN
                && bt <= max_bt + CONTACT_MARGIN;
            inside.then_some((world + normal * (side * penetration * 0.5), penetration))
        })
        .collect()
}
