use crate::bodies::RigidBody;
use crate::collision::contact_manifold::ContactManifold;
use crate::constraints::{JacobianRow, SolverBodies};
use crate::core::{BodyHandle, HandleStorage};

/// Trait for contact constraint solvers
pub trait ContactSolver: Send {
    /// Builds the velocity rows for this step's manifolds
    fn prepare(&mut self, manifolds: &[ContactManifold], bodies: &SolverBodies, dt: f32);

    /// One velocity iteration over the prepared rows
    fn solve_velocity(&mut self, bodies: &mut SolverBodies);

    /// Pushes still-penetrating bodies apart after integration
    fn solve_position(&mut self, manifolds: &[ContactManifold], bodies: &mut HandleStorage<BodyHandle, RigidBody>);
}

#[derive(Debug)]
struct ContactRows {
    normal: JacobianRow,
    friction: [JacobianRow; 2],
}

#[derive(Debug)]
struct PreparedManifold {
    a: usize,
    b: usize,
    friction: f32,
    contacts: Vec<ContactRows>,
}

/// Sequential impulse contact solver with restitution, two-axis friction and
/// split position correction
#[derive(Debug)]
pub struct SequentialImpulseSolver {
    /// Fraction of the remaining penetration removed per step
    bias_factor: f32,

    /// Penetration tolerated without correction
    slop: f32,

    /// Approach speed below which contacts do not bounce
    restitution_threshold: f32,

    prepared: Vec<PreparedManifold>,
}

impl SequentialImpulseSolver {
    /// Creates a new sequential impulse solver
    pub fn new(bias_factor: f32, slop: f32, restitution_threshold: f32) -> Self {
        Self {
            bias_factor,
            slop,
            restitution_threshold,
            prepared: Vec::new(),
        }
    }
}

impl ContactSolver for SequentialImpulseSolver {
    fn prepare(&mut self, manifolds: &[ContactManifold], bodies: &SolverBodies, dt: f32) {
        self.prepared.clear();

        for manifold in manifolds.iter().filter(|m| !m.is_empty()) {
            let a = bodies.index_of(Some(manifold.pair.body_a));
            let b = bodies.index_of(Some(manifold.pair.body_b));
            let (body_a, body_b) = (bodies.get(a), bodies.get(b));
            if !body_a.is_movable() && !body_b.is_movable() {
                continue;
            }

            let contacts = manifold
                .contacts
                .iter()
                .map(|contact| {
                    let ra = contact.position - body_a.position;
                    let rb = contact.position - body_b.position;
                    let normal = JacobianRow::linear(body_a, body_b, ra, rb, contact.normal);

                    // Separated contacts may close the gap this step, no more
                    let mut target = if contact.penetration < 0.0 { contact.penetration / dt } else { 0.0 };
                    let approach = normal.velocity(body_a, body_b);
                    if -approach > self.restitution_threshold {
                        target = target.max(-manifold.restitution * approach);
                    }

                    let tangent = contact.normal.any_perpendicular();
                    let bitangent = contact.normal.cross(&tangent);
                    ContactRows {
                        normal: normal.with_rhs(target).with_bounds(0.0, f32::INFINITY),
                        friction: [
                            JacobianRow::linear(body_a, body_b, ra, rb, tangent),
                            JacobianRow::linear(body_a, body_b, ra, rb, bitangent),
                        ],
                    }
                })
                .collect();

            self.prepared.push(PreparedManifold {
                a,
                b,
                friction: manifold.friction,
                contacts,
            });
        }
    }

    fn solve_velocity(&mut self, bodies: &mut SolverBodies) {
        for manifold in &mut self.prepared {
            let Some((a, b)) = bodies.pair_mut(manifold.a, manifold.b) else {
                continue;
            };
            for rows in &mut manifold.contacts {
                rows.normal.solve(a, b);

                let limit = manifold.friction * rows.normal.accumulated;
                for row in &mut rows.friction {
                    row.lower = -limit;
                    row.upper = limit;
                    row.solve(a, b);
                }
            }
        }
    }

    fn solve_position(&mut self, manifolds: &[ContactManifold], bodies: &mut HandleStorage<BodyHandle, RigidBody>) {
        for manifold in manifolds {
            let inverse_mass = |handle: BodyHandle, bodies: &HandleStorage<BodyHandle, RigidBody>| {
                bodies
                    .get(handle)
                    .filter(|body| body.is_dynamic() && !body.is_sleeping())
                    .map_or(0.0, |body| body.get_inverse_mass())
            };
            let inv_a = inverse_mass(manifold.pair.body_a, bodies);
            let inv_b = inverse_mass(manifold.pair.body_b, bodies);
            let total = inv_a + inv_b;
            if total <= 0.0 || manifold.is_empty() {
                continue;
            }

            let share = self.bias_factor / (total * manifold.contacts.len() as f32);
            for contact in &manifold.contacts {
                let depth = contact.penetration - self.slop;
                if depth <= 0.0 {
                    continue;
                }
                let correction = contact.normal * (depth * share);
                if let Some(body) = bodies.get_mut(manifold.pair.body_a) {
                    if inv_a > 0.0 {
                        body.set_position(body.get_position() - correction * inv_a);
                    }
                }
                if let Some(body) = bodies.get_mut(manifold.pair.body_b) {
                    if inv_b > 0.0 {
                        body.set_position(body.get_position() + correction * inv_b);
                    }
                }
            }
        }
    }
}
