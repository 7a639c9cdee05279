//! Touch bookkeeping driven by the collision report.
//!
//! Every report is a complete list of the pairs touching after the step.
//! Each tick the adjacency is rebuilt from scratch and diffed against the
//! touch sets held by the shadow objects: peers that dropped out are removed
//! silently and peers that appeared raise one collision event each.

use std::collections::{BTreeMap, HashMap};

use crate::core::{BodyId, CollisionEvent};
use crate::math::Vector3;
use crate::protocol::report::read_collisions;
use crate::scene::object::SceneObject;
use crate::Result;

/// Which side of the reported pair an adjacency entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalOwner {
    /// The entry's body was `body_a` in the record
    BodyA,

    /// The entry's body was `body_b` in the record
    BodyB,
}

/// One peer of a body in this tick's collision report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjacency {
    /// The other body
    pub peer: BodyId,

    /// Normal as reported, pointing from `body_a` to `body_b`
    pub normal: Vector3,

    /// Which side of the record the owning body was on
    pub owner: NormalOwner,
}

impl Adjacency {
    /// The contact normal as seen from the owning body
    pub fn owner_normal(&self) -> Vector3 {
        match self.owner {
            NormalOwner::BodyA => -self.normal,
            NormalOwner::BodyB => self.normal,
        }
    }
}

/// Builds the two-way adjacency of a collision report.
///
/// A pair reported twice keeps its first normal.
pub fn build_adjacency(data: &[f32]) -> Result<HashMap<BodyId, Vec<Adjacency>>> {
    let mut adjacency: HashMap<BodyId, Vec<Adjacency>> = HashMap::new();

    for record in read_collisions(data)? {
        if record.body_a == record.body_b {
            continue;
        }
        let sides = [
            (record.body_a, record.body_b, NormalOwner::BodyA),
            (record.body_b, record.body_a, NormalOwner::BodyB),
        ];
        for (body, peer, owner) in sides {
            let peers = adjacency.entry(body).or_default();
            if peers.iter().all(|entry| entry.peer != peer) {
                peers.push(Adjacency {
                    peer,
                    normal: record.normal,
                    owner,
                });
            }
        }
    }

    Ok(adjacency)
}

/// Reconciles every shadow object's touches with a collision report and
/// returns the collision-begin events, in object id order.
///
/// With `legacy_angular` set, the relative angular velocity repeats the
/// linear difference instead of subtracting angular velocities.
pub fn reconcile(
    objects: &mut BTreeMap<BodyId, SceneObject>,
    data: &[f32],
    legacy_angular: bool,
) -> Result<Vec<CollisionEvent>> {
    let adjacency = build_adjacency(data)?;

    // Velocities of this tick, read before any touch set changes.
    let velocities: HashMap<BodyId, (Vector3, Vector3)> = objects
        .iter()
        .map(|(id, object)| (*id, (object.get_linear_velocity(), object.get_angular_velocity())))
        .collect();

    let mut events = Vec::new();
    for (id, object) in objects.iter_mut() {
        let Some(peers) = adjacency.get(id) else {
            object.touches_mut().clear();
            continue;
        };

        let touches = object.touches_mut();
        touches.retain(|touch| peers.iter().any(|entry| entry.peer == *touch));

        let (linear, angular) = velocities[id];
        for entry in peers {
            if touches.contains(&entry.peer) {
                continue;
            }
            let Some(&(peer_linear, peer_angular)) = velocities.get(&entry.peer) else {
                continue;
            };

            let relative_linear_velocity = linear - peer_linear;
            let relative_angular_velocity = if legacy_angular {
                relative_linear_velocity
            } else {
                angular - peer_angular
            };
            events.push(CollisionEvent {
                body: *id,
                other: entry.peer,
                relative_linear_velocity,
                relative_angular_velocity,
                normal: entry.owner_normal(),
            });
            touches.push(entry.peer);
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::report::ReportWriter;
    use crate::protocol::report::CollisionRecord;
    use crate::protocol::{ObjectDescription, ReportKind, ShapeDescription};

    fn scene(ids: &[u32]) -> BTreeMap<BodyId, SceneObject> {
        ids.iter()
            .map(|id| {
                let description = ObjectDescription::new(ShapeDescription::Sphere { radius: 1.0 }).with_id(BodyId(*id));
                (BodyId(*id), SceneObject::new(&description))
            })
            .collect()
    }

    fn report(pairs: &[(u32, u32)]) -> Vec<f32> {
        let mut buffer = Vec::new();
        let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Collision, pairs.len(), 100);
        for (a, b) in pairs {
            writer.push_collision(&CollisionRecord {
                body_a: BodyId(*a),
                body_b: BodyId(*b),
                normal: Vector3::unit_y(),
            });
        }
        writer.finish();
        buffer
    }

    #[test]
    fn test_normal_owner() {
        let adjacency = build_adjacency(&report(&[(1, 2)])).unwrap();
        assert_eq!(adjacency[&BodyId(1)][0].owner_normal(), -Vector3::unit_y());
        assert_eq!(adjacency[&BodyId(2)][0].owner_normal(), Vector3::unit_y());
    }

    #[test]
    fn test_duplicate_pairs_collapse() {
        let adjacency = build_adjacency(&report(&[(1, 2), (2, 1), (1, 2)])).unwrap();
        assert_eq!(adjacency[&BodyId(1)].len(), 1);
        assert_eq!(adjacency[&BodyId(2)].len(), 1);
    }

    #[test]
    fn test_unknown_peer_is_skipped() {
        let mut objects = scene(&[1]);
        let events = reconcile(&mut objects, &report(&[(1, 9)]), true).unwrap();
        assert!(events.is_empty());
        assert!(objects[&BodyId(1)].get_touches().is_empty());
    }
}
