use phys_bridge::{
    core::{BodyId, SceneConfig, SceneEvent, TransportConfig, WorldConfig},
    bodies::VehicleTuning,
    error::PhysicsError,
    math::{Quaternion, Vector3},
    protocol::{
        report::{CollisionRecord, ReportWriter, WorldRecord},
        Command, ConstraintDescription, ConstraintKind, ControlMessage, MainMessage, ObjectDescription, ReportKind,
        ShapeDescription, SoftLayout, WheelDescription, WorkerMessage,
    },
    scene::PhysicsScene,
    transport::{channel_pair, Port},
};
use approx::assert_relative_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type FakeWorker = Port<WorkerMessage, MainMessage>;

fn manual_scene(transferables: bool) -> (PhysicsScene, FakeWorker) {
    let _ = env_logger::builder().is_test(true).try_init();

    let (main, worker) = channel_pair();
    let config = SceneConfig {
        transport: TransportConfig { transferables },
        ..SceneConfig::default()
    };
    let scene = PhysicsScene::connect(config, main).unwrap();
    (scene, worker)
}

fn loaded_scene(transferables: bool) -> (PhysicsScene, FakeWorker) {
    let (mut scene, worker) = manual_scene(transferables);
    worker.post(ControlMessage::WorldReady).unwrap();
    scene.poll().unwrap();
    drain(&worker);
    scene.drain_events();
    (scene, worker)
}

fn drain(worker: &FakeWorker) -> Vec<MainMessage> {
    let mut messages = Vec::new();
    while let Ok(Some(message)) = worker.try_recv() {
        messages.push(message);
    }
    messages
}

fn commands(messages: &[MainMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|message| match message {
            MainMessage::Command(command) => Some(command.name().to_owned()),
            _ => None,
        })
        .collect()
}

fn sphere_at(position: Vector3) -> ObjectDescription {
    ObjectDescription::new(ShapeDescription::Sphere { radius: 1.0 })
        .with_position(position)
        .with_mass(1.0)
}

fn world_report(records: &[WorldRecord]) -> Vec<f32> {
    let mut buffer = Vec::new();
    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::World, records.len(), 100);
    for record in records {
        writer.push_world(record);
    }
    writer.finish();
    buffer
}

fn collision_report(pairs: &[(u32, u32, Vector3)]) -> Vec<f32> {
    let mut buffer = Vec::new();
    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Collision, pairs.len(), 100);
    for (a, b, normal) in pairs {
        writer.push_collision(&CollisionRecord {
            body_a: BodyId(*a),
            body_b: BodyId(*b),
            normal: *normal,
        });
    }
    writer.finish();
    buffer
}

#[test]
fn test_handshake_and_defer_queue() {
    let (mut scene, worker) = manual_scene(false);

    let messages = drain(&worker);
    assert!(matches!(messages[0], MainMessage::Probe(_)));
    assert_eq!(commands(&messages), vec!["init"]);

    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    scene.defer(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let id = scene.add_object(sphere_at(Vector3::zero()));
    assert_eq!(id, BodyId(1));
    assert_eq!(scene.deferred_count(), 2);
    assert!(drain(&worker).is_empty());

    worker.post(ControlMessage::EngineLoaded).unwrap();
    scene.poll().unwrap();
    assert_eq!(commands(&drain(&worker)), vec!["makeWorld"]);
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    worker.post(ControlMessage::WorldReady).unwrap();
    scene.poll().unwrap();
    assert!(scene.is_loaded());
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(scene.deferred_count(), 0);
    assert_eq!(commands(&drain(&worker)), vec!["addObject"]);
    assert_eq!(scene.next_event(), Some(SceneEvent::Ready));

    // Once ready, commands go out immediately
    scene.add_object(sphere_at(Vector3::zero()));
    assert_eq!(commands(&drain(&worker)), vec!["addObject"]);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_simulate_gate() {
    let (mut scene, worker) = manual_scene(false);
    assert!(!scene.simulate(None, None).unwrap());

    worker.post(ControlMessage::WorldReady).unwrap();
    scene.poll().unwrap();
    drain(&worker);

    assert!(scene.simulate(Some(1.0 / 60.0), None).unwrap());
    assert!(scene.is_simulating());
    assert!(!scene.simulate(Some(1.0 / 60.0), None).unwrap());
    assert_eq!(commands(&drain(&worker)), vec!["simulate"]);

    scene.handle_message(WorkerMessage::Report(world_report(&[]))).unwrap();
    assert!(!scene.is_simulating());
    assert!(scene.simulate(None, None).unwrap());
}

#[test]
fn test_failed_step_does_not_block_simulate() {
    let (mut scene, worker) = loaded_scene(false);

    // Refused locally, the gate stays open
    assert!(matches!(
        scene.simulate(Some(f32::NAN), None),
        Err(PhysicsError::InvalidParameter(_))
    ));
    assert!(matches!(
        scene.simulate(Some(f32::INFINITY), None),
        Err(PhysicsError::InvalidParameter(_))
    ));
    assert!(!scene.is_simulating());
    assert!(drain(&worker).is_empty());

    // A step the worker could not report reopens it
    assert!(scene.simulate(Some(1.0 / 60.0), None).unwrap());
    drain(&worker);
    worker.post(ControlMessage::StepFailed("no world".into())).unwrap();
    scene.poll().unwrap();
    assert!(!scene.is_simulating());
    assert!(scene.simulate(Some(1.0 / 60.0), None).unwrap());
    assert_eq!(commands(&drain(&worker)), vec!["simulate"]);
}

#[test]
fn test_dirty_transform_survives_report() {
    let (mut scene, worker) = loaded_scene(false);
    let id = scene.add_object(sphere_at(Vector3::zero()));
    drain(&worker);

    scene.simulate(None, None).unwrap();
    drain(&worker);
    scene.set_position(id, Vector3::new(7.0, 8.0, 9.0)).unwrap();

    let rotation = Quaternion::from_axis_angle(Vector3::unit_x(), 0.3);
    let report = world_report(&[WorldRecord {
        id,
        position: Vector3::new(0.0, -1.0, 0.0),
        rotation,
        linear_velocity: Vector3::new(0.0, -2.0, 0.0),
        angular_velocity: Vector3::new(0.1, 0.0, 0.0),
    }]);
    scene.handle_message(WorkerMessage::Report(report)).unwrap();

    let object = scene.get_object(id).unwrap();
    assert_eq!(object.get_position(), Vector3::new(7.0, 8.0, 9.0));
    assert_eq!(object.get_rotation(), rotation);
    assert_eq!(object.get_linear_velocity(), Vector3::new(0.0, -2.0, 0.0));
    assert_eq!(object.get_angular_velocity(), Vector3::new(0.1, 0.0, 0.0));
    assert!(object.is_position_dirty());
    assert_eq!(scene.next_event(), Some(SceneEvent::Update));

    // The edit goes out ahead of the next step and clears the flag
    scene.simulate(None, None).unwrap();
    let messages = drain(&worker);
    assert_eq!(commands(&messages), vec!["updateTransform", "simulate"]);
    match &messages[0] {
        MainMessage::Command(Command::UpdateTransform(update)) => {
            assert_eq!(update.id, id);
            assert_eq!(update.pos, Some(Vector3::new(7.0, 8.0, 9.0)));
            assert_eq!(update.quat, None);
        }
        other => panic!("unexpected message {:?}", other),
    }
    assert!(!scene.get_object(id).unwrap().is_position_dirty());
}

#[test]
fn test_collision_events_are_edge_triggered() {
    let (mut scene, _worker) = loaded_scene(false);
    let a = scene.add_object(sphere_at(Vector3::zero()));
    let b = scene.add_object(sphere_at(Vector3::zero()));
    let c = scene.add_object(sphere_at(Vector3::new(10.0, 0.0, 0.0)));

    let velocities = world_report(&[
        WorldRecord {
            id: a,
            position: Vector3::zero(),
            rotation: Quaternion::identity(),
            linear_velocity: Vector3::new(0.0, -3.0, 0.0),
            angular_velocity: Vector3::new(1.0, 0.0, 0.0),
        },
        WorldRecord {
            id: b,
            position: Vector3::zero(),
            rotation: Quaternion::identity(),
            linear_velocity: Vector3::new(0.0, 1.0, 0.0),
            angular_velocity: Vector3::zero(),
        },
    ]);
    scene.handle_message(WorkerMessage::Report(velocities)).unwrap();
    scene.drain_events();

    let report = collision_report(&[(a.0, b.0, Vector3::unit_y())]);
    scene.handle_message(WorkerMessage::Report(report.clone())).unwrap();

    let events: Vec<_> = scene
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            SceneEvent::Collision(collision) => Some(collision),
            _ => None,
        })
        .collect();
    assert_eq!(events.len(), 2);

    let for_a = events.iter().find(|event| event.body == a).unwrap();
    assert_eq!(for_a.other, b);
    assert_eq!(for_a.normal, -Vector3::unit_y());
    assert_eq!(for_a.relative_linear_velocity, Vector3::new(0.0, -4.0, 0.0));
    assert_eq!(for_a.relative_angular_velocity, for_a.relative_linear_velocity);

    let for_b = events.iter().find(|event| event.body == b).unwrap();
    assert_eq!(for_b.normal, Vector3::unit_y());
    assert_eq!(for_b.relative_linear_velocity, Vector3::new(0.0, 4.0, 0.0));

    assert!(scene.get_object(a).unwrap().is_touching(b));
    assert!(scene.get_object(b).unwrap().is_touching(a));
    assert!(scene.get_object(c).unwrap().get_touches().is_empty());

    // Still touching: no new events
    scene.handle_message(WorkerMessage::Report(report)).unwrap();
    assert!(scene.drain_events().is_empty());

    // Separated: touches clear silently
    scene.handle_message(WorkerMessage::Report(collision_report(&[]))).unwrap();
    assert!(scene.drain_events().is_empty());
    assert!(scene.get_object(a).unwrap().get_touches().is_empty());
    assert!(scene.get_object(b).unwrap().get_touches().is_empty());
}

#[test]
fn test_relative_angular_velocity_without_legacy() {
    let (main, worker) = channel_pair();
    let config = SceneConfig {
        legacy_relative_angular_velocity: false,
        ..SceneConfig::default()
    };
    let mut scene = PhysicsScene::connect(config, main).unwrap();
    worker.post(ControlMessage::WorldReady).unwrap();
    scene.poll().unwrap();

    let a = scene.add_object(sphere_at(Vector3::zero()));
    let b = scene.add_object(sphere_at(Vector3::zero()));
    let velocities = world_report(&[WorldRecord {
        id: a,
        position: Vector3::zero(),
        rotation: Quaternion::identity(),
        linear_velocity: Vector3::new(0.0, -3.0, 0.0),
        angular_velocity: Vector3::new(2.0, 0.0, 0.0),
    }]);
    scene.handle_message(WorkerMessage::Report(velocities)).unwrap();
    scene.drain_events();

    scene
        .handle_message(WorkerMessage::Report(collision_report(&[(a.0, b.0, Vector3::unit_x())])))
        .unwrap();
    let event = scene.get_events().collisions_for(a)[0].clone();
    assert_eq!(event.relative_linear_velocity, Vector3::new(0.0, -3.0, 0.0));
    assert_eq!(event.relative_angular_velocity, Vector3::new(2.0, 0.0, 0.0));
}

#[test]
fn test_stale_soft_record_is_skipped() {
    let (mut scene, _worker) = loaded_scene(false);
    let rope = scene.add_object(ObjectDescription::new(ShapeDescription::SoftRopeMesh {
        start: Vector3::zero(),
        end: Vector3::new(2.0, 0.0, 0.0),
        segments: 2,
    }));
    let cloth = scene.add_object(
        ObjectDescription::new(ShapeDescription::SoftClothMesh {
            corners: [
                Vector3::zero(),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(1.0, 0.0, 1.0),
            ],
            segments_x: 1,
            segments_z: 1,
        })
        .with_position(Vector3::new(4.0, 4.0, 4.0)),
    );
    scene.remove_object(rope).unwrap();

    // Written before the worker saw the removal
    let mut buffer = Vec::new();
    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Soft, 9 + 24, 100);
    writer.push_soft(rope, SoftLayout::Rope, 3, |out| out.fill(1.0));
    writer.push_soft(cloth, SoftLayout::Cloth, 4, |out| out.fill(2.0));
    writer.finish();
    scene.handle_message(WorkerMessage::Report(buffer)).unwrap();

    assert!(scene.get_object(rope).is_none());
    let object = scene.get_object(cloth).unwrap();
    assert!(object.is_soft_initialized());
    assert_eq!(object.get_soft_element_count(), 4);
    assert_eq!(object.get_soft_data(), &[2.0; 24][..]);
    assert_eq!(object.get_position(), Vector3::zero());
}

#[test]
fn test_stale_world_record_is_skipped() {
    let (mut scene, _worker) = loaded_scene(false);
    let gone = scene.add_object(sphere_at(Vector3::zero()));
    let kept = scene.add_object(sphere_at(Vector3::zero()));
    scene.simulate(None, None).unwrap();
    scene.remove_object(gone).unwrap();

    // Written before the worker saw the removal
    let report = world_report(&[
        WorldRecord {
            id: kept,
            position: Vector3::new(0.0, 2.0, 0.0),
            rotation: Quaternion::identity(),
            linear_velocity: Vector3::new(0.0, -1.0, 0.0),
            angular_velocity: Vector3::zero(),
        },
        WorldRecord {
            id: gone,
            position: Vector3::new(0.0, 3.0, 0.0),
            rotation: Quaternion::identity(),
            linear_velocity: Vector3::zero(),
            angular_velocity: Vector3::zero(),
        },
    ]);
    scene.handle_message(WorkerMessage::Report(report)).unwrap();

    assert!(scene.get_object(gone).is_none());
    assert_eq!(scene.object_count(), 1);
    let object = scene.get_object(kept).unwrap();
    assert_eq!(object.get_position(), Vector3::new(0.0, 2.0, 0.0));
    assert_eq!(object.get_linear_velocity(), Vector3::new(0.0, -1.0, 0.0));
    assert!(!scene.is_simulating());
    assert_eq!(scene.next_event(), Some(SceneEvent::Update));
}

#[test]
fn test_empty_soft_report_returns_in_transfer_mode() {
    let (mut scene, worker) = loaded_scene(true);
    scene.handle_message(WorkerMessage::Report(vec![ReportKind::Soft.tag()])).unwrap();
    let messages = drain(&worker);
    assert!(matches!(messages[..], [MainMessage::Buffer(ref buffer)] if buffer[..] == [ReportKind::Soft.tag()]));
}

#[test]
fn test_buffers_return_in_transfer_mode() {
    let (mut scene, worker) = loaded_scene(true);
    scene.handle_message(WorkerMessage::Report(world_report(&[]))).unwrap();
    let messages = drain(&worker);
    assert!(matches!(messages[..], [MainMessage::Buffer(ref buffer)] if buffer[0] == ReportKind::World.tag()));

    let (mut scene, worker) = loaded_scene(false);
    scene.handle_message(WorkerMessage::Report(world_report(&[]))).unwrap();
    assert!(drain(&worker).is_empty());
}

#[test]
fn test_bad_reports_are_dropped() {
    let (mut scene, _worker) = loaded_scene(false);
    scene.simulate(None, None).unwrap();

    // Untagged
    scene.handle_message(WorkerMessage::Report(Vec::new())).unwrap();
    assert!(scene.is_simulating());

    // Unknown tag
    scene.handle_message(WorkerMessage::Report(vec![9.0, 1.0, 2.0])).unwrap();

    // A world report claiming more records than it holds still ends the step
    scene.handle_message(WorkerMessage::Report(vec![0.0, 5.0, 1.0])).unwrap();
    assert!(!scene.is_simulating());
    assert!(scene.drain_events().is_empty());
}

#[test]
fn test_remove_object_cleans_up() {
    let (mut scene, worker) = loaded_scene(false);
    let a = scene.add_object(sphere_at(Vector3::zero()));
    let b = scene.add_object(sphere_at(Vector3::zero()));
    let joint = scene
        .add_constraint(ConstraintDescription::new(ConstraintKind::Point, a, Some(b)))
        .unwrap();
    scene
        .handle_message(WorkerMessage::Report(collision_report(&[(a.0, b.0, Vector3::unit_y())])))
        .unwrap();
    drain(&worker);

    scene.remove_object(b).unwrap();
    assert!(scene.get_constraint(joint).is_none());
    assert!(scene.get_object(a).unwrap().get_touches().is_empty());
    assert_eq!(commands(&drain(&worker)), vec!["removeObject"]);

    assert!(scene.remove_object(b).is_err());
    assert!(scene.set_position(b, Vector3::zero()).is_err());
    assert!(scene.apply_central_impulse(b, Vector3::unit_y()).is_err());
    assert!(scene.add_constraint(ConstraintDescription::new(ConstraintKind::Hinge, b, None)).is_err());
}

#[test]
fn test_threaded_fall() {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = SceneConfig {
        world: WorldConfig {
            gravity: Vector3::new(0.0, -100.0, 0.0),
            ..WorldConfig::default()
        },
        ..SceneConfig::default()
    };
    let mut scene = PhysicsScene::new(config).unwrap();
    let id = scene.add_object(sphere_at(Vector3::new(0.0, 5.0, 0.0)));
    scene.wait_until_ready().unwrap();

    assert!(scene.simulate(Some(0.1), None).unwrap());
    scene.wait_for_update().unwrap();

    let object = scene.get_object(id).unwrap();
    assert!(object.get_position().y < 5.0);
    assert!(object.get_linear_velocity().y < 0.0);

    let events = scene.drain_events();
    assert_eq!(events[0], SceneEvent::Ready);
    assert!(events.contains(&SceneEvent::ObjectReady(id)));
    assert!(events.contains(&SceneEvent::Update));

    scene.shutdown().unwrap();
}

#[test]
fn test_threaded_collision() {
    let config = SceneConfig {
        world: WorldConfig {
            gravity: Vector3::zero(),
            ..WorldConfig::default()
        },
        ..SceneConfig::default()
    };
    let mut scene = PhysicsScene::new(config).unwrap();
    scene.wait_until_ready().unwrap();
    let a = scene.add_object(sphere_at(Vector3::zero()));
    let b = scene.add_object(sphere_at(Vector3::zero()));

    scene.simulate(Some(1.0 / 60.0), None).unwrap();
    scene.wait_for_update().unwrap();

    assert!(scene.get_object(a).unwrap().is_touching(b));
    assert!(scene.get_object(b).unwrap().is_touching(a));
    assert_eq!(scene.get_events().collisions_for(a).len(), 1);
    assert_eq!(scene.get_events().collisions_for(b).len(), 1);

    scene.shutdown().unwrap();
}

#[test]
fn test_threaded_vehicle_and_constraint() {
    let mut scene = PhysicsScene::new(SceneConfig::default()).unwrap();
    scene.wait_until_ready().unwrap();

    let chassis = scene.add_object(
        ObjectDescription::new(ShapeDescription::Box { width: 2.0, height: 1.0, depth: 4.0 })
            .with_position(Vector3::new(0.0, 2.0, 0.0))
            .with_mass(800.0),
    );
    let vehicle = scene.add_vehicle(chassis, VehicleTuning::default()).unwrap();
    for (x, z, front) in [(1.0, 1.5, true), (-1.0, 1.5, true), (1.0, -1.5, false), (-1.0, -1.5, false)] {
        let wheel = WheelDescription::new(vehicle, Vector3::new(x, -0.3, z), 0.6, 0.4, front);
        scene.add_wheel(wheel).unwrap();
    }
    scene.apply_engine_force(vehicle, 2, 100.0).unwrap();

    let anchor = scene.add_object(
        ObjectDescription::new(ShapeDescription::Sphere { radius: 0.5 }).with_position(Vector3::new(20.0, 10.0, 0.0)),
    );
    let bob = scene.add_object(sphere_at(Vector3::new(20.0, 7.0, 0.0)));
    let joint = scene
        .add_constraint(
            ConstraintDescription::new(ConstraintKind::Point, anchor, Some(bob))
                .with_pivots(Vector3::new(0.0, -1.5, 0.0), Vector3::new(0.0, 1.5, 0.0)),
        )
        .unwrap();

    scene.simulate(Some(1.0 / 60.0), None).unwrap();
    scene.wait_for_update().unwrap();

    let vehicle = scene.get_vehicle(vehicle).unwrap();
    assert_eq!(vehicle.get_num_wheels(), 4);
    let wheel = vehicle.get_wheel_transform(0).unwrap();
    assert!(wheel.position.y < 2.0);
    assert!(wheel.position.x > 0.0);

    let constraint = scene.get_constraint(joint).unwrap();
    let world_anchor = constraint.get_world_anchor();
    assert_relative_eq!(world_anchor.x, 20.0, epsilon = 1e-4);
    assert_relative_eq!(world_anchor.y, 8.5, epsilon = 1e-4);

    scene.shutdown().unwrap();
}
