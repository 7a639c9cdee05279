//! Applying worker reports to the main-thread shadows.

use std::collections::{BTreeMap, HashMap};

use crate::core::{BodyId, ConstraintId, VehicleId};
use crate::math::Transform;
use crate::protocol::report::{read_constraints, read_soft, read_wheels, read_world};
use crate::protocol::SoftLayout;
use crate::scene::object::{SceneConstraint, SceneObject, SceneVehicle};
use crate::Result;

/// Copies simulated state into the shadow objects and returns how many were
/// updated.
///
/// Position and rotation are only written when the user has not edited them
/// since the last simulate; velocities are always written. Records for ids
/// the scene no longer knows are skipped.
pub fn apply_world_report(objects: &mut BTreeMap<BodyId, SceneObject>, data: &[f32]) -> Result<usize> {
    let mut applied = 0;
    for record in read_world(data)? {
        let Some(object) = objects.get_mut(&record.id) else {
            log::trace!("world report names removed body {}", record.id);
            continue;
        };
        object.apply_simulated(record.position, record.rotation);
        object.set_velocities(record.linear_velocity, record.angular_velocity);
        applied += 1;
    }
    Ok(applied)
}

/// Applies a soft report and returns the index just past the last record read.
///
/// `layouts` must still hold the layouts of removed bodies so that their
/// records can be stepped over.
pub fn apply_soft_report(
    objects: &mut BTreeMap<BodyId, SceneObject>,
    layouts: &HashMap<BodyId, SoftLayout>,
    data: &[f32],
) -> Result<usize> {
    let (records, cursor) = read_soft(data, |id| layouts.get(&id).copied())?;
    for record in records {
        match objects.get_mut(&record.id) {
            Some(object) => object.apply_soft(record.elements, record.data),
            None => log::trace!("soft report names removed body {}", record.id),
        }
    }
    Ok(cursor)
}

/// Updates wheel transforms and returns how many were applied
pub fn apply_vehicle_report(vehicles: &mut BTreeMap<VehicleId, SceneVehicle>, data: &[f32]) -> Result<usize> {
    let mut applied = 0;
    for record in read_wheels(data)? {
        if let Some(vehicle) = vehicles.get_mut(&record.vehicle) {
            vehicle.set_wheel_transform(record.wheel, Transform::new(record.position, record.rotation));
            applied += 1;
        }
    }
    Ok(applied)
}

/// Updates joint anchors and impulses and returns how many were applied.
///
/// The report carries the pivot in body A's frame; it is moved to world
/// space with body A's current shadow transform.
pub fn apply_constraint_report(
    constraints: &mut BTreeMap<ConstraintId, SceneConstraint>,
    objects: &BTreeMap<BodyId, SceneObject>,
    data: &[f32],
) -> Result<usize> {
    let mut applied = 0;
    for record in read_constraints(data)? {
        let (Some(constraint), Some(body)) = (constraints.get_mut(&record.constraint), objects.get(&record.body)) else {
            continue;
        };
        let anchor = body.get_position() + body.get_rotation().rotate_vector(record.anchor);
        constraint.update(anchor, record.applied_impulse);
        applied += 1;
    }
    Ok(applied)
}
