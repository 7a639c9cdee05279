use phys_bridge::{
    core::{BodyId, ConstraintId, VehicleId},
    error::PhysicsError,
    math::{Quaternion, Vector3},
    protocol::{
        report::{
            chunked_len, read_constraints, read_soft, read_wheels, read_world, report_kind, ConstraintRecord,
            ReportWriter, WheelRecord, WorldRecord,
        },
        Command, ReportKind, SoftLayout, REPORT_CHUNK_SIZE, WORLD_HEADER, WORLD_STRIDE,
    },
};

fn world_record(id: u32) -> WorldRecord {
    WorldRecord {
        id: BodyId(id),
        position: Vector3::new(id as f32, 0.0, 0.0),
        rotation: Quaternion::identity(),
        linear_velocity: Vector3::zero(),
        angular_velocity: Vector3::zero(),
    }
}

fn wheel_record(wheel: usize) -> WheelRecord {
    WheelRecord {
        vehicle: VehicleId(1),
        wheel,
        position: Vector3::new(0.0, wheel as f32, 0.0),
        rotation: Quaternion::identity(),
    }
}

#[test]
fn test_world_report_grows_by_whole_chunks() {
    let mut buffer = Vec::new();
    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::World, 100, REPORT_CHUNK_SIZE);
    for id in 1..=100 {
        writer.push_world(&world_record(id));
    }
    assert_eq!(writer.finish(), 100);
    assert_eq!(buffer.len(), WORLD_HEADER + 100 * WORLD_STRIDE);

    // One more body than announced grows the buffer by a full chunk
    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::World, 100, REPORT_CHUNK_SIZE);
    for id in 1..=101 {
        writer.push_world(&world_record(id));
    }
    assert_eq!(writer.finish(), 101);
    assert_eq!(buffer.len(), chunked_len(WORLD_HEADER, 101, WORLD_STRIDE, REPORT_CHUNK_SIZE));
    assert_eq!(buffer.len(), WORLD_HEADER + 200 * WORLD_STRIDE);

    // Buffers never shrink, the count bounds what is read
    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::World, 1, REPORT_CHUNK_SIZE);
    writer.push_world(&world_record(42));
    writer.finish();
    assert_eq!(buffer.len(), WORLD_HEADER + 200 * WORLD_STRIDE);

    let records: Vec<_> = read_world(&buffer).unwrap().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, BodyId(42));
    assert_eq!(records[0].position, Vector3::new(42.0, 0.0, 0.0));
}

#[test]
fn test_vehicle_report_stops_at_zeroed_tail() {
    let mut buffer = Vec::new();
    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Vehicle, 3, REPORT_CHUNK_SIZE);
    for wheel in 0..3 {
        writer.push_wheel(&wheel_record(wheel));
    }
    writer.finish();
    assert_eq!(read_wheels(&buffer).unwrap().count(), 3);

    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Vehicle, 1, REPORT_CHUNK_SIZE);
    writer.push_wheel(&wheel_record(0));
    writer.finish();

    let wheels: Vec<_> = read_wheels(&buffer).unwrap().collect();
    assert_eq!(wheels.len(), 1);
    assert_eq!(wheels[0].vehicle, VehicleId(1));
    assert_eq!(wheels[0].wheel, 0);
}

#[test]
fn test_constraint_report_layout() {
    let mut buffer = Vec::new();
    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Constraint, 1, REPORT_CHUNK_SIZE);
    writer.push_constraint(&ConstraintRecord {
        constraint: ConstraintId(4),
        body: BodyId(2),
        anchor: Vector3::new(1.0, 2.0, 3.0),
        applied_impulse: 0.5,
    });
    writer.finish();

    assert_eq!(&buffer[..7], &[3.0, 4.0, 2.0, 1.0, 2.0, 3.0, 0.5]);
    let records: Vec<_> = read_constraints(&buffer).unwrap().collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].applied_impulse, 0.5);
}

#[test]
fn test_soft_report_advances_by_actual_length() {
    let mut buffer = Vec::new();
    let rope = SoftLayout::Rope.record_len(4);
    let trimesh = SoftLayout::Trimesh.record_len(2);
    assert_eq!(rope, 2 + 12);
    assert_eq!(trimesh, 2 + 36);

    let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Soft, rope + trimesh, REPORT_CHUNK_SIZE);
    writer.push_soft(BodyId(1), SoftLayout::Rope, 4, |out| out.fill(1.0));
    writer.push_soft(BodyId(2), SoftLayout::Trimesh, 2, |out| out.fill(2.0));
    assert_eq!(writer.finish(), 2);
    assert_eq!(buffer.len(), 1 + rope + trimesh);

    let layouts = |id: BodyId| match id.0 {
        1 => Some(SoftLayout::Rope),
        2 => Some(SoftLayout::Trimesh),
        _ => None,
    };
    let (records, cursor) = read_soft(&buffer, layouts).unwrap();
    assert_eq!(cursor, buffer.len());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].data.len(), 12);
    assert_eq!(records[1].elements, 2);
    assert!(records[1].data.iter().all(|value| *value == 2.0));

    // Without a layout the record cannot be stepped over
    let result = read_soft(&buffer, |id: BodyId| (id.0 == 2).then_some(SoftLayout::Trimesh));
    assert!(matches!(result, Err(PhysicsError::MalformedReport(_))));
}

#[test]
fn test_report_tags() {
    for kind in ReportKind::ALL {
        assert_eq!(report_kind(&[kind.tag(), 0.0]), Some(kind));
    }
    assert_eq!(report_kind(&[]), None);
    assert_eq!(report_kind(&[5.0]), None);
    assert_eq!(report_kind(&[0.5]), None);
}

#[test]
fn test_command_names() {
    assert_eq!(Command::OnSimulationResume.name(), "onSimulationResume");
    assert_eq!(Command::SetFixedTimeStep(0.01).name(), "setFixedTimeStep");
    assert_eq!(Command::Unknown("teleport".into()).name(), "teleport");
    assert!(Command::MakeWorld(Default::default()).is_handshake());
    assert!(!Command::SetGravity(Vector3::zero()).is_handshake());
}
