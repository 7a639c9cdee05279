use crate::core::{BodyId, ConstraintId, VehicleId};

/// Largest id that survives the `f32` report encoding exactly
pub const MAX_WIRE_ID: u32 = 1 << 24;

/// Issues ids for bodies, vehicles and constraints.
///
/// Only the main thread allocates; the worker consumes the ids it is given.
/// Ids start at 1 and are never reused, so `0` can mark an empty report slot.
#[derive(Debug)]
pub struct IdAllocator {
    next_id: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Creates an allocator whose first id is 1
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Returns the next raw id
    pub fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Allocates a body id
    pub fn next_body(&mut self) -> BodyId {
        BodyId(self.next())
    }

    /// Allocates a vehicle id
    pub fn next_vehicle(&mut self) -> VehicleId {
        VehicleId(self.next())
    }

    /// Allocates a constraint id
    pub fn next_constraint(&mut self) -> ConstraintId {
        ConstraintId(self.next())
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u32 {
        self.next_id - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_and_increasing() {
        let mut ids = IdAllocator::new();
        let body = ids.next_body();
        let vehicle = ids.next_vehicle();
        let constraint = ids.next_constraint();
        assert_eq!((body.0, vehicle.0, constraint.0), (1, 2, 3));

        let issued: Vec<u32> = (0..1000).map(|_| ids.next()).collect();
        assert!(issued.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(issued[0], 4);
        assert_eq!(ids.issued(), 1003);
    }
}
