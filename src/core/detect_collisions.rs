use crate::bodies::RigidBody;
use crate::collision::{BroadPhase, BroadPhaseProxy, CollisionPair, ContactManifold, NarrowPhase};
use crate::core::{BodyHandle, HandleStorage};

use std::collections::HashMap;

fn is_active(body: &RigidBody) -> bool {
    body.is_dynamic() && !body.is_sleeping()
}

/// Builds this step's contact manifolds.
///
/// Every pair whose bounds overlap gets a manifold, even one without
/// contacts. Pairs where neither body is awake keep last step's manifold
/// instead of being re-tested.
pub fn detect_collisions(
    bodies: &HandleStorage<BodyHandle, RigidBody>,
    previous: Vec<ContactManifold>,
    broad_phase: &mut dyn BroadPhase,
    narrow_phase: &dyn NarrowPhase,
) -> Vec<ContactManifold> {
    let proxies: Vec<BroadPhaseProxy> = bodies
        .iter()
        .map(|(handle, body)| BroadPhaseProxy {
            handle,
            bounds: body.get_world_bounds(),
            group: body.get_collision_group(),
            mask: body.get_collision_mask(),
            is_static: body.is_static(),
        })
        .collect();
    broad_phase.update(&proxies);

    let mut previous: HashMap<CollisionPair, ContactManifold> =
        previous.into_iter().map(|manifold| (manifold.pair, manifold)).collect();

    let mut manifolds = Vec::new();
    for pair in broad_phase.get_collision_pairs() {
        let (Some(body_a), Some(body_b)) = (bodies.get(pair.body_a), bodies.get(pair.body_b)) else {
            continue;
        };

        if !is_active(body_a) && !is_active(body_b) {
            if let Some(manifold) = previous.remove(&pair) {
                manifolds.push(manifold);
            }
            continue;
        }

        manifolds.push(narrow_phase.generate_contacts(pair, body_a, body_b));
    }

    log::trace!("{} manifolds from {} bodies", manifolds.len(), proxies.len());
    manifolds
}

/// Wakes sleeping bodies touched by awake dynamic bodies moving faster
/// than the sleep thresholds
pub fn wake_touched_bodies(
    bodies: &mut HandleStorage<BodyHandle, RigidBody>,
    manifolds: &[ContactManifold],
    linear_threshold: f32,
    angular_threshold: f32,
) {
    let is_moving = |body: &RigidBody| {
        is_active(body)
            && (body.get_linear_velocity().length() > linear_threshold
                || body.get_angular_velocity().length() > angular_threshold)
    };

    let mut to_wake = Vec::new();
    for manifold in manifolds.iter().filter(|m| !m.is_empty()) {
        let (Some(a), Some(b)) = (bodies.get(manifold.pair.body_a), bodies.get(manifold.pair.body_b)) else {
            continue;
        };
        if is_moving(a) && b.is_sleeping() {
            to_wake.push(manifold.pair.body_b);
        }
        if is_moving(b) && a.is_sleeping() {
            to_wake.push(manifold.pair.body_a);
        }
    }

    for handle in to_wake {
        if let Some(body) = bodies.get_mut(handle) {
            body.wake_up();
        }
    }
}
