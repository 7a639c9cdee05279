//! Report encoding on the worker.

use crate::bodies::SoftBody;
use crate::error::PhysicsError;
use crate::protocol::report::{CollisionRecord, ConstraintRecord, ReportWriter, WheelRecord, WorldRecord};
use crate::protocol::{ReportKind, SoftLayout, WorkerMessage};
use crate::worker::registry::{BodyRecord, NativeBody};
use crate::worker::SimulationWorld;
use crate::Result;

/// One reusable buffer per report kind
#[derive(Debug, Default)]
pub(crate) struct ReportBuffers {
    world: Vec<f32>,
    collision: Vec<f32>,
    vehicle: Vec<f32>,
    constraint: Vec<f32>,
    soft: Vec<f32>,
}

impl ReportBuffers {
    pub(crate) fn get(&self, kind: ReportKind) -> &[f32] {
        match kind {
            ReportKind::World => &self.world,
            ReportKind::Collision => &self.collision,
            ReportKind::Vehicle => &self.vehicle,
            ReportKind::Constraint => &self.constraint,
            ReportKind::Soft => &self.soft,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: ReportKind) -> &mut Vec<f32> {
        match kind {
            ReportKind::World => &mut self.world,
            ReportKind::Collision => &mut self.collision,
            ReportKind::Vehicle => &mut self.vehicle,
            ReportKind::Constraint => &mut self.constraint,
            ReportKind::Soft => &mut self.soft,
        }
    }
}

fn write_soft_payload(soft: &SoftBody, layout: SoftLayout, out: &mut [f32]) {
    let nodes = soft.get_nodes();
    match layout {
        SoftLayout::Rope => {
            for (node, out) in nodes.iter().zip(out.chunks_exact_mut(3)) {
                node.position.write_to(out);
            }
        }
        SoftLayout::Cloth => {
            for (node, out) in nodes.iter().zip(out.chunks_exact_mut(6)) {
                node.position.write_to(&mut out[0..3]);
                node.normal.write_to(&mut out[3..6]);
            }
        }
        SoftLayout::Trimesh => {
            for (face, out) in soft.get_faces().iter().zip(out.chunks_exact_mut(18)) {
                for (corner, out) in face.iter().zip(out.chunks_exact_mut(6)) {
                    let node = &nodes[*corner];
                    node.position.write_to(&mut out[0..3]);
                    node.normal.write_to(&mut out[3..6]);
                }
            }
        }
    }
}

impl SimulationWorld {
    /// Queues the reports for the step that just ran: vehicles (if any),
    /// collisions, constraints (if any), the world and soft bodies (if
    /// enabled)
    pub(crate) fn send_reports(&mut self) -> Result<()> {
        if self.vehicles.live_count() > 0 {
            self.report_vehicles()?;
        }
        self.report_collisions()?;
        if self.joints.live_count() > 0 {
            self.report_constraints()?;
        }
        self.report_world()?;
        if self.get_world()?.get_config().soft_bodies {
            self.report_soft_bodies()?;
        }
        Ok(())
    }

    fn post_report(&mut self, kind: ReportKind) {
        let buffer = self.transfer.hand_off(self.buffers.get_mut(kind));
        self.outbox.push(WorkerMessage::Report(buffer));
    }

    fn report_world(&mut self) -> Result<()> {
        let world = self.world.as_ref().ok_or(PhysicsError::NotInitialized("world"))?;
        let mut writer = ReportWriter::begin(self.buffers.get_mut(ReportKind::World), ReportKind::World, self.rigid_count, self.chunk);

        for (_, record) in self.bodies.iter_rev() {
            let NativeBody::Rigid(handle) = record.native else {
                continue;
            };
            let Ok(body) = world.get_body(handle) else {
                continue;
            };
            let motion = body.get_motion_state();
            writer.push_world(&WorldRecord {
                id: record.id,
                position: motion.position,
                rotation: motion.rotation,
                linear_velocity: body.get_linear_velocity(),
                angular_velocity: body.get_angular_velocity(),
            });
        }

        let count = writer.finish();
        log::trace!("world report: {} bodies", count);
        self.post_report(ReportKind::World);
        Ok(())
    }

    fn report_collisions(&mut self) -> Result<()> {
        let world = self.world.as_ref().ok_or(PhysicsError::NotInitialized("world"))?;
        let manifolds = world.get_manifolds();
        let mut writer =
            ReportWriter::begin(self.buffers.get_mut(ReportKind::Collision), ReportKind::Collision, manifolds.len(), self.chunk);

        for manifold in manifolds {
            let Some(contact) = manifold.first_contact() else {
                continue;
            };
            let (Some(&body_a), Some(&body_b)) = (
                self.ids_by_handle.get(&manifold.pair.body_a),
                self.ids_by_handle.get(&manifold.pair.body_b),
            ) else {
                continue;
            };
            writer.push_collision(&CollisionRecord {
                body_a,
                body_b,
                normal: contact.normal,
            });
        }

        let count = writer.finish();
        log::trace!("collision report: {} pairs", count);
        self.post_report(ReportKind::Collision);
        Ok(())
    }

    fn report_vehicles(&mut self) -> Result<()> {
        let world = self.world.as_ref().ok_or(PhysicsError::NotInitialized("world"))?;
        let mut writer =
            ReportWriter::begin(self.buffers.get_mut(ReportKind::Vehicle), ReportKind::Vehicle, self.wheel_count, self.chunk);

        for (_, record) in self.vehicles.iter_rev() {
            let Ok(vehicle) = world.get_vehicle(record.handle) else {
                continue;
            };
            for wheel in 0..vehicle.get_num_wheels() {
                let Some(transform) = vehicle.get_wheel_transform(wheel) else {
                    continue;
                };
                writer.push_wheel(&WheelRecord {
                    vehicle: record.id,
                    wheel,
                    position: transform.position,
                    rotation: transform.rotation,
                });
            }
        }

        let count = writer.finish();
        log::trace!("vehicle report: {} wheels", count);
        self.post_report(ReportKind::Vehicle);
        Ok(())
    }

    fn report_constraints(&mut self) -> Result<()> {
        let world = self.world.as_ref().ok_or(PhysicsError::NotInitialized("world"))?;
        let mut writer = ReportWriter::begin(
            self.buffers.get_mut(ReportKind::Constraint),
            ReportKind::Constraint,
            self.joint_count,
            self.chunk,
        );

        for (_, record) in self.joints.iter_rev() {
            let Ok(joint) = world.get_joint(record.handle) else {
                continue;
            };
            writer.push_constraint(&ConstraintRecord {
                constraint: record.id,
                body: record.body_a,
                anchor: joint.pivot_a(),
                applied_impulse: joint.applied_impulse(),
            });
        }

        let count = writer.finish();
        log::trace!("constraint report: {} joints", count);
        self.post_report(ReportKind::Constraint);
        Ok(())
    }

    fn report_soft_bodies(&mut self) -> Result<()> {
        let world = self.world.as_ref().ok_or(PhysicsError::NotInitialized("world"))?;

        let live: Vec<(&BodyRecord, &SoftBody, SoftLayout)> = self
            .bodies
            .iter_rev()
            .filter_map(|(_, record)| {
                let NativeBody::Soft(handle) = record.native else {
                    return None;
                };
                let soft = world.get_soft_body(handle).ok()?;
                Some((record, soft, record.soft_layout?))
            })
            .collect();
        let floats: usize = live.iter().map(|(_, soft, layout)| layout.record_len(soft.element_count())).sum();

        let mut writer = ReportWriter::begin(self.buffers.get_mut(ReportKind::Soft), ReportKind::Soft, floats, self.chunk);
        for (record, soft, layout) in &live {
            writer.push_soft(record.id, *layout, soft.element_count(), |out| write_soft_payload(soft, *layout, out));
        }

        let count = writer.finish();
        log::trace!("soft report: {} bodies, {} floats", count, floats);
        self.post_report(ReportKind::Soft);
        Ok(())
    }
}
