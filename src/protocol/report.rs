//! Report buffer layouts.
//!
//! Every report is a flat `Vec<f32>`:
//!
//! | Kind       | Header          | Record                                              |
//! |------------|-----------------|-----------------------------------------------------|
//! | world      | `[0, count]`    | `id, pos xyz, quat xyzw, linvel xyz, angvel xyz`    |
//! | collision  | `[1, count]`    | `idA, idB, normal xyz`                              |
//! | vehicle    | `[2]`           | `vehicleId, wheel, pos xyz, quat xyzw`              |
//! | constraint | `[3]`           | `constraintId, bodyId, anchor xyz, impulse`         |
//! | soft       | `[4]`           | `id, elements, payload`                             |
//!
//! Reports without a count end at the first record whose id is zero or at the
//! end of the buffer. Buffers grow in whole chunks of records and never
//! shrink, so a buffer may be longer than the data it carries.

use crate::core::{BodyId, ConstraintId, VehicleId};
use crate::error::PhysicsError;
use crate::math::{Quaternion, Vector3};
use crate::protocol::{
    ReportKind, SoftLayout, COLLISION_HEADER, COLLISION_STRIDE, CONSTRAINT_HEADER, CONSTRAINT_STRIDE, SOFT_HEADER,
    SOFT_ITEM_HEADER, VEHICLE_HEADER, VEHICLE_STRIDE, WORLD_HEADER, WORLD_STRIDE,
};
use crate::Result;

/// Length of a buffer holding `items` records, rounded up to whole chunks
pub fn chunked_len(header: usize, items: usize, stride: usize, chunk: usize) -> usize {
    let chunk = chunk.max(1);
    header + items.div_ceil(chunk) * chunk * stride
}

/// Grows `buffer` with zeros to at least `len` floats. Returns whether it grew.
pub fn ensure_len(buffer: &mut Vec<f32>, len: usize) -> bool {
    if buffer.len() < len {
        buffer.resize(len, 0.0);
        true
    } else {
        false
    }
}

/// The kind of a report buffer, if it carries a known tag
pub fn report_kind(data: &[f32]) -> Option<ReportKind> {
    data.first().copied().and_then(ReportKind::from_tag)
}

/// One body in the world report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRecord {
    pub id: BodyId,
    pub position: Vector3,
    pub rotation: Quaternion,
    pub linear_velocity: Vector3,
    pub angular_velocity: Vector3,
}

impl WorldRecord {
    fn write(&self, out: &mut [f32]) {
        out[0] = self.id.to_f32();
        self.position.write_to(&mut out[1..4]);
        self.rotation.write_to(&mut out[4..8]);
        self.linear_velocity.write_to(&mut out[8..11]);
        self.angular_velocity.write_to(&mut out[11..14]);
    }

    fn read(data: &[f32]) -> Option<Self> {
        Some(Self {
            id: BodyId::from_f32(data[0])?,
            position: Vector3::from_slice(&data[1..4]),
            rotation: Quaternion::from_slice(&data[4..8]),
            linear_velocity: Vector3::from_slice(&data[8..11]),
            angular_velocity: Vector3::from_slice(&data[11..14]),
        })
    }
}

/// One touching pair in the collision report; `normal` points from A to B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRecord {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub normal: Vector3,
}

impl CollisionRecord {
    fn write(&self, out: &mut [f32]) {
        out[0] = self.body_a.to_f32();
        out[1] = self.body_b.to_f32();
        self.normal.write_to(&mut out[2..5]);
    }

    fn read(data: &[f32]) -> Option<Self> {
        Some(Self {
            body_a: BodyId::from_f32(data[0])?,
            body_b: BodyId::from_f32(data[1])?,
            normal: Vector3::from_slice(&data[2..5]),
        })
    }
}

/// One wheel in the vehicle report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelRecord {
    pub vehicle: VehicleId,
    pub wheel: usize,
    pub position: Vector3,
    pub rotation: Quaternion,
}

impl WheelRecord {
    fn write(&self, out: &mut [f32]) {
        out[0] = self.vehicle.to_f32();
        out[1] = self.wheel as f32;
        self.position.write_to(&mut out[2..5]);
        self.rotation.write_to(&mut out[5..9]);
    }

    fn read(data: &[f32]) -> Option<Self> {
        Some(Self {
            vehicle: VehicleId::from_f32(data[0])?,
            wheel: data[1].max(0.0) as usize,
            position: Vector3::from_slice(&data[2..5]),
            rotation: Quaternion::from_slice(&data[5..9]),
        })
    }
}

/// One joint in the constraint report.
///
/// `anchor` is the pivot in the local frame of `body`; the main thread turns
/// it into a world point with that body's transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintRecord {
    pub constraint: ConstraintId,
    pub body: BodyId,
    pub anchor: Vector3,
    pub applied_impulse: f32,
}

impl ConstraintRecord {
    fn write(&self, out: &mut [f32]) {
        out[0] = self.constraint.to_f32();
        out[1] = self.body.to_f32();
        self.anchor.write_to(&mut out[2..5]);
        out[5] = self.applied_impulse;
    }

    fn read(data: &[f32]) -> Option<Self> {
        Some(Self {
            constraint: ConstraintId::from_f32(data[0])?,
            body: BodyId::from_f32(data[1])?,
            anchor: Vector3::from_slice(&data[2..5]),
            applied_impulse: data[5],
        })
    }
}

/// One soft body in the soft report; `data` is the payload after the
/// per-body header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftRecord<'a> {
    pub id: BodyId,
    pub elements: usize,
    pub layout: SoftLayout,
    pub data: &'a [f32],
}

/// Writes one report into a reusable buffer
#[derive(Debug)]
pub struct ReportWriter<'a> {
    buffer: &'a mut Vec<f32>,
    kind: ReportKind,
    chunk: usize,
    cursor: usize,
    count: usize,
}

impl<'a> ReportWriter<'a> {
    /// Starts a report, sizing the buffer for `expected` records (or, for the
    /// soft report, `expected` payload floats)
    pub fn begin(buffer: &'a mut Vec<f32>, kind: ReportKind, expected: usize, chunk: usize) -> Self {
        let header = kind.header_len();
        let len = match kind.stride() {
            Some(stride) => chunked_len(header, expected, stride, chunk),
            None => header + expected,
        };
        ensure_len(buffer, len);
        buffer[0] = kind.tag();

        Self {
            buffer,
            kind,
            chunk,
            cursor: header,
            count: 0,
        }
    }

    fn reserve(&mut self, len: usize) -> &mut [f32] {
        let end = self.cursor + len;
        if end > self.buffer.len() {
            let grown = match self.kind.stride() {
                Some(stride) => chunked_len(self.kind.header_len(), self.count + 1, stride, self.chunk),
                None => end,
            };
            ensure_len(self.buffer, grown.max(end));
        }
        let start = self.cursor;
        self.cursor = end;
        self.count += 1;
        &mut self.buffer[start..end]
    }

    /// Appends a world record
    pub fn push_world(&mut self, record: &WorldRecord) {
        debug_assert_eq!(self.kind, ReportKind::World);
        record.write(self.reserve(WORLD_STRIDE));
    }

    /// Appends a collision record
    pub fn push_collision(&mut self, record: &CollisionRecord) {
        debug_assert_eq!(self.kind, ReportKind::Collision);
        record.write(self.reserve(COLLISION_STRIDE));
    }

    /// Appends a wheel record
    pub fn push_wheel(&mut self, record: &WheelRecord) {
        debug_assert_eq!(self.kind, ReportKind::Vehicle);
        record.write(self.reserve(VEHICLE_STRIDE));
    }

    /// Appends a constraint record
    pub fn push_constraint(&mut self, record: &ConstraintRecord) {
        debug_assert_eq!(self.kind, ReportKind::Constraint);
        record.write(self.reserve(CONSTRAINT_STRIDE));
    }

    /// Appends a soft body; `fill` writes the payload, which is exactly
    /// `layout.floats_per_element() * elements` floats
    pub fn push_soft(&mut self, id: BodyId, layout: SoftLayout, elements: usize, fill: impl FnOnce(&mut [f32])) {
        debug_assert_eq!(self.kind, ReportKind::Soft);
        let out = self.reserve(layout.record_len(elements));
        out[0] = id.to_f32();
        out[1] = elements as f32;
        fill(&mut out[SOFT_ITEM_HEADER..]);
    }

    /// Finishes the report and returns the number of records written.
    ///
    /// Count-less reports get the rest of the buffer zeroed, so stale
    /// records from an earlier, longer report are not read back.
    pub fn finish(self) -> usize {
        if self.kind.has_count() {
            self.buffer[1] = self.count as f32;
        } else {
            self.buffer[self.cursor..].fill(0.0);
        }
        self.count
    }
}

fn check_kind(data: &[f32], expected: ReportKind) -> Result<()> {
    match report_kind(data) {
        Some(kind) if kind == expected => Ok(()),
        _ => Err(PhysicsError::MalformedReport(format!(
            "expected a {:?} report, found tag {:?}",
            expected,
            data.first()
        ))),
    }
}

fn counted_records(data: &[f32], kind: ReportKind, header: usize, stride: usize) -> Result<&[f32]> {
    check_kind(data, kind)?;
    let count = data.get(1).copied().unwrap_or(0.0);
    if count < 0.0 || count.fract() != 0.0 {
        return Err(PhysicsError::MalformedReport(format!("bad {:?} item count {}", kind, count)));
    }
    let end = header + count as usize * stride;
    data.get(header..end).ok_or_else(|| {
        PhysicsError::MalformedReport(format!(
            "{:?} report claims {} items but holds {} floats",
            kind,
            count,
            data.len()
        ))
    })
}

/// The records of a world report
pub fn read_world(data: &[f32]) -> Result<impl Iterator<Item = WorldRecord> + '_> {
    let records = counted_records(data, ReportKind::World, WORLD_HEADER, WORLD_STRIDE)?;
    Ok(records.chunks_exact(WORLD_STRIDE).filter_map(WorldRecord::read))
}

/// The records of a collision report
pub fn read_collisions(data: &[f32]) -> Result<impl Iterator<Item = CollisionRecord> + '_> {
    let records = counted_records(data, ReportKind::Collision, COLLISION_HEADER, COLLISION_STRIDE)?;
    Ok(records.chunks_exact(COLLISION_STRIDE).filter_map(CollisionRecord::read))
}

/// The records of a vehicle report, up to the zeroed tail
pub fn read_wheels(data: &[f32]) -> Result<impl Iterator<Item = WheelRecord> + '_> {
    check_kind(data, ReportKind::Vehicle)?;
    Ok(data[VEHICLE_HEADER..]
        .chunks_exact(VEHICLE_STRIDE)
        .map_while(WheelRecord::read))
}

/// The records of a constraint report, up to the zeroed tail
pub fn read_constraints(data: &[f32]) -> Result<impl Iterator<Item = ConstraintRecord> + '_> {
    check_kind(data, ReportKind::Constraint)?;
    Ok(data[CONSTRAINT_HEADER..]
        .chunks_exact(CONSTRAINT_STRIDE)
        .map_while(ConstraintRecord::read))
}

/// The records of a soft report and the index just past the last one.
///
/// The soft report does not say how long each payload is; `layout_of`
/// supplies the layout each body was registered with.
pub fn read_soft(
    data: &[f32],
    layout_of: impl Fn(BodyId) -> Option<SoftLayout>,
) -> Result<(Vec<SoftRecord<'_>>, usize)> {
    check_kind(data, ReportKind::Soft)?;

    let mut records = Vec::new();
    let mut cursor = SOFT_HEADER;
    while cursor + SOFT_ITEM_HEADER <= data.len() {
        let Some(id) = BodyId::from_f32(data[cursor]) else {
            break;
        };
        let layout = layout_of(id)
            .ok_or_else(|| PhysicsError::MalformedReport(format!("soft report names unknown body {}", id)))?;
        let elements = data[cursor + 1].max(0.0) as usize;
        let start = cursor + SOFT_ITEM_HEADER;
        let end = cursor + layout.record_len(elements);
        let payload = data.get(start..end).ok_or_else(|| {
            PhysicsError::MalformedReport(format!(
                "soft body {} needs {} floats past offset {}, report has {}",
                id,
                end - start,
                start,
                data.len()
            ))
        })?;

        records.push(SoftRecord {
            id,
            elements,
            layout,
            data: payload,
        });
        cursor = end;
    }

    Ok((records, cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::REPORT_CHUNK_SIZE;

    #[test]
    fn test_stride_constants() {
        assert_eq!(WORLD_STRIDE, 1 + 3 + 4 + 3 + 3);
        assert_eq!(COLLISION_STRIDE, 2 + 3);
        assert_eq!(VEHICLE_STRIDE, 2 + 3 + 4);
        assert_eq!(CONSTRAINT_STRIDE, 2 + 3 + 1);
        assert_eq!(SoftLayout::Rope.floats_per_element(), 3);
        assert_eq!(SoftLayout::Cloth.floats_per_element(), 6);
        assert_eq!(SoftLayout::Trimesh.floats_per_element(), 3 * 6);
    }

    #[test]
    fn test_headers() {
        assert_eq!(ReportKind::World.header_len(), 2);
        assert_eq!(ReportKind::Collision.header_len(), 2);
        assert_eq!(ReportKind::Vehicle.header_len(), 1);
        assert_eq!(ReportKind::Constraint.header_len(), 1);
        assert_eq!(ReportKind::Soft.header_len(), 1);
        assert!(ReportKind::World.has_count());
        assert!(!ReportKind::Vehicle.has_count());
    }

    #[test]
    fn test_tags() {
        for (tag, kind) in ReportKind::ALL.iter().enumerate() {
            assert_eq!(kind.tag(), tag as f32);
            assert_eq!(ReportKind::from_tag(tag as f32), Some(*kind));
        }
        assert_eq!(ReportKind::from_tag(5.0), None);
        assert_eq!(ReportKind::from_tag(0.5), None);
    }

    #[test]
    fn test_chunked_len() {
        assert_eq!(chunked_len(VEHICLE_HEADER, 4, VEHICLE_STRIDE, REPORT_CHUNK_SIZE), 901);
        assert_eq!(chunked_len(WORLD_HEADER, 0, WORLD_STRIDE, REPORT_CHUNK_SIZE), 2);
        assert_eq!(chunked_len(WORLD_HEADER, 100, WORLD_STRIDE, REPORT_CHUNK_SIZE), 2 + 1400);
        assert_eq!(chunked_len(WORLD_HEADER, 101, WORLD_STRIDE, REPORT_CHUNK_SIZE), 2 + 2800);
    }

    #[test]
    fn test_writer_grows_past_expected() {
        let mut buffer = Vec::new();
        let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Collision, 0, 2);
        for i in 1..=3 {
            writer.push_collision(&CollisionRecord {
                body_a: BodyId(i),
                body_b: BodyId(i + 10),
                normal: Vector3::unit_y(),
            });
        }
        assert_eq!(writer.finish(), 3);
        assert_eq!(buffer.len(), COLLISION_HEADER + 4 * COLLISION_STRIDE);
        assert_eq!(buffer[1], 3.0);
    }

    #[test]
    fn test_count_less_tail_is_zeroed() {
        let mut buffer = vec![7.0; 20];
        let mut writer = ReportWriter::begin(&mut buffer, ReportKind::Vehicle, 1, 1);
        writer.push_wheel(&WheelRecord {
            vehicle: VehicleId(3),
            wheel: 0,
            position: Vector3::zero(),
            rotation: Quaternion::identity(),
        });
        writer.finish();

        assert_eq!(buffer.len(), 20);
        assert!(buffer[VEHICLE_HEADER + VEHICLE_STRIDE..].iter().all(|v| *v == 0.0));
        assert_eq!(read_wheels(&buffer).map(|r| r.count()).ok(), Some(1));
    }

    #[test]
    fn test_truncated_world_report_is_rejected() {
        let data = [0.0, 2.0, 1.0, 0.0, 0.0];
        assert!(matches!(read_world(&data), Err(PhysicsError::MalformedReport(_))));
    }

    #[test]
    fn test_wrong_tag_is_rejected() {
        let data = [1.0, 0.0];
        assert!(read_world(&data).is_err());
    }
}
