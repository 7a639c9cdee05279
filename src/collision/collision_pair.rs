use crate::core::BodyHandle;

/// Two bodies whose bounds overlap, stored with the lower handle first so a
/// pair compares equal regardless of discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
}

impl CollisionPair {
    pub fn new(first: BodyHandle, second: BodyHandle) -> Self {
        let (body_a, body_b) = if first <= second { (first, second) } else { (second, first) };
        Self { body_a, body_b }
    }

    /// Whether either side of the pair is `body`
    pub fn contains(&self, body: BodyHandle) -> bool {
        body == self.body_a || body == self.body_b
    }
}
