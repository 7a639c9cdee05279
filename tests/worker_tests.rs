use phys_bridge::{
    core::{BodyId, ConstraintId, TransportConfig, VehicleId, WorldConfig, MAX_WIRE_ID},
    bodies::VehicleTuning,
    error::PhysicsError,
    math::{Quaternion, Vector3},
    protocol::{
        report::{read_collisions, read_constraints, read_wheels, read_world},
        BodyRef, Command, ConstraintDescription, ConstraintKind, ControlMessage, ObjectDescription, ReportKind,
        ShapeDescription, SimulateParams, TransformUpdate, VehicleDescription, WheelDescription, WorkerMessage,
    },
    transport::TransferMode,
    worker::SimulationWorld,
};
use approx::assert_relative_eq;

fn ready_world(config: WorldConfig) -> SimulationWorld {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut world = SimulationWorld::new();
    world.handle(Command::Init(TransportConfig { transferables: false })).unwrap();
    world.handle(Command::MakeWorld(config)).unwrap();
    world.take_messages();
    world
}

fn sphere(id: u32, position: Vector3, mass: f32) -> Command {
    let description = ObjectDescription::new(ShapeDescription::Sphere { radius: 1.0 })
        .with_id(BodyId(id))
        .with_position(position)
        .with_mass(mass);
    Command::AddObject(Box::new(description))
}

fn step(world: &mut SimulationWorld, time_step: f32) -> Vec<Vec<f32>> {
    world
        .handle(Command::Simulate(SimulateParams {
            time_step: Some(time_step),
            max_sub_steps: None,
        }))
        .unwrap();
    world
        .take_messages()
        .into_iter()
        .filter_map(|message| match message {
            WorkerMessage::Report(buffer) => Some(buffer),
            _ => None,
        })
        .collect()
}

fn report_of(reports: &[Vec<f32>], kind: ReportKind) -> &[f32] {
    reports
        .iter()
        .find(|report| report[0] == kind.tag())
        .map(|report| report.as_slice())
        .unwrap()
}

#[test]
fn test_handshake() {
    let mut world = SimulationWorld::new();
    assert!(!world.is_ready());

    world.handle(Command::Init(TransportConfig { transferables: true })).unwrap();
    let messages = world.take_messages();
    assert!(matches!(messages[0], WorkerMessage::Probe(_)));
    assert!(matches!(messages[1], WorkerMessage::Control(ControlMessage::EngineLoaded)));
    assert_eq!(world.get_transfer_mode(), TransferMode::Transfer);

    world.handle(Command::MakeWorld(WorldConfig::default())).unwrap();
    let messages = world.take_messages();
    assert!(matches!(messages[..], [WorkerMessage::Control(ControlMessage::WorldReady)]));
    assert!(world.is_ready());

    // The world is built once
    assert!(matches!(
        world.handle(Command::MakeWorld(WorldConfig::default())),
        Err(PhysicsError::InvalidParameter(_))
    ));
}

#[test]
fn test_commands_before_world() {
    let mut world = SimulationWorld::new();
    let result = world.handle(sphere(1, Vector3::zero(), 1.0));
    assert!(matches!(result, Err(PhysicsError::NotInitialized(_))));
}

#[test]
fn test_body_falls_under_gravity() {
    let mut world = ready_world(WorldConfig {
        gravity: Vector3::new(0.0, -100.0, 0.0),
        ..WorldConfig::default()
    });
    world.handle(sphere(1, Vector3::new(0.0, 5.0, 0.0), 1.0)).unwrap();

    let messages = world.take_messages();
    assert!(matches!(messages[..], [WorkerMessage::Control(ControlMessage::ObjectReady(BodyId(1)))]));

    let reports = step(&mut world, 0.1);
    let records: Vec<_> = read_world(report_of(&reports, ReportKind::World)).unwrap().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, BodyId(1));
    assert!(records[0].position.y < 5.0);
    assert!(records[0].linear_velocity.y < 0.0);
}

#[test]
fn test_static_body_echoes_its_transform() {
    let mut world = ready_world(WorldConfig::default());
    let rotation = Quaternion::from_axis_angle(Vector3::unit_y(), 0.5);
    let description = ObjectDescription::new(ShapeDescription::Box { width: 2.0, height: 1.0, depth: 2.0 })
        .with_id(BodyId(3))
        .with_position(Vector3::new(1.0, 2.0, 3.0))
        .with_rotation(rotation);
    world.handle(Command::AddObject(Box::new(description))).unwrap();

    let reports = step(&mut world, 1.0 / 60.0);
    let record = read_world(report_of(&reports, ReportKind::World)).unwrap().next().unwrap();
    assert_eq!(record.position, Vector3::new(1.0, 2.0, 3.0));
    assert_relative_eq!(record.rotation, rotation, epsilon = 1e-6);
}

#[test]
fn test_report_order() {
    let mut world = ready_world(WorldConfig::default());
    world.handle(sphere(1, Vector3::zero(), 1.0)).unwrap();
    world.handle(sphere(2, Vector3::new(5.0, 0.0, 0.0), 1.0)).unwrap();

    let reports = step(&mut world, 1.0 / 60.0);
    let tags: Vec<f32> = reports.iter().map(|report| report[0]).collect();
    assert_eq!(tags, vec![ReportKind::Collision.tag(), ReportKind::World.tag()]);

    let mut constraint = ConstraintDescription::new(ConstraintKind::Point, BodyId(1), Some(BodyId(2)));
    constraint.id = ConstraintId(1);
    world.handle(Command::AddConstraint(constraint)).unwrap();
    world.handle(Command::AddVehicle(VehicleDescription {
        id: VehicleId(1),
        chassis: BodyId(1),
        tuning: VehicleTuning::default(),
    }))
    .unwrap();

    let reports = step(&mut world, 1.0 / 60.0);
    let tags: Vec<f32> = reports.iter().map(|report| report[0]).collect();
    assert_eq!(
        tags,
        vec![
            ReportKind::Vehicle.tag(),
            ReportKind::Collision.tag(),
            ReportKind::Constraint.tag(),
            ReportKind::World.tag(),
        ]
    );
}

#[test]
fn test_overlapping_spheres_collide() {
    let mut world = ready_world(WorldConfig::default());
    world.handle(sphere(1, Vector3::zero(), 1.0)).unwrap();
    world.handle(sphere(2, Vector3::zero(), 1.0)).unwrap();

    let reports = step(&mut world, 1.0 / 60.0);
    let records: Vec<_> = read_collisions(report_of(&reports, ReportKind::Collision)).unwrap().collect();
    assert_eq!(records.len(), 1);

    let mut pair = [records[0].body_a.0, records[0].body_b.0];
    pair.sort();
    assert_eq!(pair, [1, 2]);
    assert_relative_eq!(records[0].normal.length(), 1.0, epsilon = 1e-4);
}

#[test]
fn test_vehicle_buffer_grows_in_chunks() {
    let mut world = ready_world(WorldConfig::default());
    let chassis = ObjectDescription::new(ShapeDescription::Box { width: 2.0, height: 1.0, depth: 4.0 })
        .with_id(BodyId(1))
        .with_position(Vector3::new(0.0, 2.0, 0.0))
        .with_mass(800.0);
    world.handle(Command::AddObject(Box::new(chassis))).unwrap();
    world.handle(Command::AddVehicle(VehicleDescription {
        id: VehicleId(1),
        chassis: BodyId(1),
        tuning: VehicleTuning::default(),
    }))
    .unwrap();

    for (x, z, front) in [(1.0, 1.5, true), (-1.0, 1.5, true), (1.0, -1.5, false), (-1.0, -1.5, false)] {
        let wheel = WheelDescription::new(VehicleId(1), Vector3::new(x, -0.3, z), 0.6, 0.4, front);
        world.handle(Command::AddWheel(wheel)).unwrap();
    }

    assert_eq!(world.wheel_count(), 4);
    assert_eq!(world.report_buffer(ReportKind::Vehicle).len(), 901);

    let reports = step(&mut world, 1.0 / 60.0);
    let wheels: Vec<_> = read_wheels(report_of(&reports, ReportKind::Vehicle)).unwrap().collect();
    assert_eq!(wheels.len(), 4);
    assert!(wheels.iter().all(|wheel| wheel.vehicle == VehicleId(1)));

    let mut indices: Vec<usize> = wheels.iter().map(|wheel| wheel.wheel).collect();
    indices.sort();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn test_constraint_report() {
    let mut world = ready_world(WorldConfig::default());
    world.handle(sphere(1, Vector3::new(0.0, 10.0, 0.0), 0.0)).unwrap();
    world.handle(sphere(2, Vector3::new(0.0, 7.0, 0.0), 1.0)).unwrap();

    let mut constraint = ConstraintDescription::new(ConstraintKind::Point, BodyId(1), Some(BodyId(2)))
        .with_pivots(Vector3::new(0.0, -1.5, 0.0), Vector3::new(0.0, 1.5, 0.0));
    constraint.id = ConstraintId(7);
    world.handle(Command::AddConstraint(constraint)).unwrap();
    assert_eq!(world.constraint_count(), 1);

    let reports = step(&mut world, 1.0 / 60.0);
    let records: Vec<_> = read_constraints(report_of(&reports, ReportKind::Constraint)).unwrap().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].constraint, ConstraintId(7));
    assert_eq!(records[0].body, BodyId(1));
    assert_relative_eq!(records[0].anchor.y, -1.5, epsilon = 1e-5);

    // Removing a body takes its joints with it
    world.handle(Command::RemoveObject(BodyRef { id: BodyId(2) })).unwrap();
    assert_eq!(world.constraint_count(), 0);
    assert!(world.get_constraint(ConstraintId(7)).is_err());
}

#[test]
fn test_remove_object() {
    let mut world = ready_world(WorldConfig::default());
    world.handle(sphere(1, Vector3::zero(), 1.0)).unwrap();
    world.handle(sphere(2, Vector3::new(5.0, 0.0, 0.0), 1.0)).unwrap();
    assert_eq!(world.rigid_count(), 2);

    world.handle(Command::RemoveObject(BodyRef { id: BodyId(1) })).unwrap();
    assert_eq!(world.rigid_count(), 1);
    assert!(world.is_body_removed(BodyId(1)));
    assert!(world.get_rigid_body(BodyId(1)).is_err());

    let reports = step(&mut world, 1.0 / 60.0);
    let ids: Vec<BodyId> = read_world(report_of(&reports, ReportKind::World)).unwrap().map(|r| r.id).collect();
    assert_eq!(ids, vec![BodyId(2)]);

    let result = world.handle(Command::RemoveObject(BodyRef { id: BodyId(1) }));
    assert!(matches!(result, Err(PhysicsError::ResourceNotFound(_))));
}

#[test]
fn test_world_report_lists_newest_body_first() {
    let mut world = ready_world(WorldConfig {
        gravity: Vector3::zero(),
        ..WorldConfig::default()
    });
    for id in 1..=4 {
        world.handle(sphere(id, Vector3::new(id as f32 * 5.0, 0.0, 0.0), 1.0)).unwrap();
    }
    world.handle(Command::RemoveObject(BodyRef { id: BodyId(3) })).unwrap();

    let reports = step(&mut world, 1.0 / 60.0);
    let records: Vec<_> = read_world(report_of(&reports, ReportKind::World)).unwrap().collect();
    let ids: Vec<BodyId> = records.iter().map(|record| record.id).collect();
    assert_eq!(ids, vec![BodyId(4), BodyId(2), BodyId(1)]);
    assert_eq!(records[0].position, Vector3::new(20.0, 0.0, 0.0));
}

#[test]
fn test_ids_beyond_float_precision_are_rejected() {
    let mut world = ready_world(WorldConfig::default());

    // 2^24 + 1 would read back as 2^24
    assert_eq!((MAX_WIRE_ID + 1) as f32 as u32, MAX_WIRE_ID);
    assert!(matches!(
        world.handle(sphere(MAX_WIRE_ID + 1, Vector3::zero(), 1.0)),
        Err(PhysicsError::InvalidParameter(_))
    ));
    assert_eq!(world.rigid_count(), 0);

    world.handle(sphere(1, Vector3::zero(), 1.0)).unwrap();
    let mut constraint = ConstraintDescription::new(ConstraintKind::Point, BodyId(1), None);
    constraint.id = ConstraintId(u32::MAX);
    assert!(matches!(
        world.handle(Command::AddConstraint(constraint)),
        Err(PhysicsError::InvalidParameter(_))
    ));
}

#[test]
fn test_rejected_step_still_reports() {
    let mut world = ready_world(WorldConfig::default());
    world.handle(sphere(1, Vector3::new(0.0, 5.0, 0.0), 1.0)).unwrap();
    world.take_messages();

    let result = world.handle(Command::Simulate(SimulateParams {
        time_step: Some(f32::NAN),
        max_sub_steps: None,
    }));
    assert!(matches!(result, Err(PhysicsError::SimulationError(_))));

    // The world did not move, but the main thread still hears back
    let messages = world.take_messages();
    let world_report = messages
        .iter()
        .find_map(|message| match message {
            WorkerMessage::Report(buffer) if buffer[0] == ReportKind::World.tag() => Some(buffer),
            _ => None,
        })
        .unwrap();
    let record = read_world(world_report).unwrap().next().unwrap();
    assert_eq!(record.position, Vector3::new(0.0, 5.0, 0.0));
    assert!(!messages
        .iter()
        .any(|message| matches!(message, WorkerMessage::Control(ControlMessage::StepFailed(_)))));

    // Later steps run normally
    let reports = step(&mut world, 1.0 / 60.0);
    assert!(read_world(report_of(&reports, ReportKind::World)).unwrap().next().unwrap().position.y < 5.0);
}

#[test]
fn test_rejected_objects() {
    let mut world = ready_world(WorldConfig::default());

    // Id zero is reserved for the zeroed report tail
    assert!(matches!(
        world.handle(sphere(0, Vector3::zero(), 1.0)),
        Err(PhysicsError::InvalidParameter(_))
    ));

    world.handle(sphere(1, Vector3::zero(), 1.0)).unwrap();
    assert!(matches!(
        world.handle(sphere(1, Vector3::zero(), 1.0)),
        Err(PhysicsError::InvalidParameter(_))
    ));

    let unknown = ObjectDescription::new(ShapeDescription::Unrecognized).with_id(BodyId(2));
    assert!(matches!(
        world.handle(Command::AddObject(Box::new(unknown))),
        Err(PhysicsError::UnknownShape(_))
    ));

    let rope = ObjectDescription::new(ShapeDescription::SoftRopeMesh {
        start: Vector3::zero(),
        end: Vector3::new(0.0, 5.0, 0.0),
        segments: 4,
    })
    .with_id(BodyId(3));
    assert!(world.handle(Command::AddObject(Box::new(rope))).is_err());
    assert_eq!(world.rigid_count(), 1);
    assert_eq!(world.soft_count(), 0);

    assert!(matches!(
        world.handle(Command::Unknown("explode".into())),
        Err(PhysicsError::UnknownCommand(_))
    ));
}

#[test]
fn test_soft_report() {
    let mut world = ready_world(WorldConfig {
        soft_bodies: true,
        ..WorldConfig::default()
    });
    let rope = ObjectDescription::new(ShapeDescription::SoftRopeMesh {
        start: Vector3::new(0.0, 5.0, 0.0),
        end: Vector3::new(4.0, 5.0, 0.0),
        segments: 4,
    })
    .with_id(BodyId(1))
    .with_mass(1.0);
    world.handle(Command::AddObject(Box::new(rope))).unwrap();
    world.handle(sphere(2, Vector3::new(0.0, -5.0, 0.0), 0.0)).unwrap();
    assert_eq!(world.soft_count(), 1);

    let nodes = world.get_soft_body(BodyId(1)).unwrap().element_count();
    assert_eq!(nodes, 5);

    let reports = step(&mut world, 1.0 / 60.0);
    let soft = report_of(&reports, ReportKind::Soft);
    assert_eq!(soft.len(), 1 + 2 + 3 * nodes);
    assert_eq!(soft[1], 1.0);
    assert_eq!(soft[2], nodes as f32);

    // The world report only carries rigid bodies
    let world_report = report_of(&reports, ReportKind::World);
    assert_eq!(world_report[1], 1.0);
}

#[test]
fn test_update_transform() {
    let mut world = ready_world(WorldConfig {
        gravity: Vector3::zero(),
        ..WorldConfig::default()
    });
    world.handle(sphere(1, Vector3::zero(), 1.0)).unwrap();
    world
        .handle(Command::UpdateTransform(TransformUpdate {
            id: BodyId(1),
            pos: Some(Vector3::new(3.0, 4.0, 5.0)),
            quat: None,
        }))
        .unwrap();

    let body = world.get_rigid_body(BodyId(1)).unwrap();
    assert_eq!(body.get_position(), Vector3::new(3.0, 4.0, 5.0));
    assert_eq!(body.get_motion_state().position, Vector3::new(3.0, 4.0, 5.0));
    assert_eq!(body.get_rotation(), Quaternion::identity());
}

#[test]
fn test_sub_steps() {
    let mut world = ready_world(WorldConfig::default());

    // Three fixed steps cover 0.05s
    step(&mut world, 0.05);
    assert_relative_eq!(world.get_world().unwrap().get_time(), 0.05, epsilon = 1e-4);

    // A step shorter than the fixed step still advances one fixed step
    step(&mut world, 0.001);
    assert_relative_eq!(world.get_world().unwrap().get_time(), 0.05 + 1.0 / 60.0, epsilon = 1e-4);
}

#[test]
fn test_transfer_hands_buffers_off() {
    let mut world = SimulationWorld::new();
    world.handle(Command::Init(TransportConfig { transferables: true })).unwrap();
    world.handle(Command::MakeWorld(WorldConfig::default())).unwrap();
    world.handle(sphere(1, Vector3::zero(), 1.0)).unwrap();
    world.take_messages();

    let reports = step(&mut world, 1.0 / 60.0);
    assert!(world.report_buffer(ReportKind::World).is_empty());

    let returned = reports.into_iter().find(|report| report[0] == ReportKind::World.tag()).unwrap();
    let len = returned.len();
    world.reclaim(returned);
    assert_eq!(world.report_buffer(ReportKind::World).len(), len);
}

#[test]
fn test_copy_keeps_buffers() {
    let mut world = ready_world(WorldConfig::default());
    world.handle(sphere(1, Vector3::zero(), 1.0)).unwrap();

    let reports = step(&mut world, 1.0 / 60.0);
    let sent = report_of(&reports, ReportKind::World);
    assert_eq!(world.report_buffer(ReportKind::World), sent);
}
