use crate::core::BodyHandle;
use crate::math::Aabb;
use crate::collision::collision_pair::CollisionPair;
use crate::collision::collision_filter::should_collide;

/// A body as seen by the broad phase
#[derive(Debug, Clone, Copy)]
pub struct BroadPhaseProxy {
    /// The body
    pub handle: BodyHandle,

    /// World bounds
    pub bounds: Aabb,

    /// Collision group bits
    pub group: u32,

    /// Collision mask bits
    pub mask: u32,

    /// Whether the body is static
    pub is_static: bool,
}

/// Trait for broad-phase collision detection algorithms
pub trait BroadPhase: Send {
    /// Updates the broad-phase with the current body states
    fn update(&mut self, proxies: &[BroadPhaseProxy]);

    /// Gets all potential collision pairs
    fn get_collision_pairs(&self) -> Vec<CollisionPair>;
}

/// Simple brute-force broad-phase algorithm
#[derive(Debug, Default)]
pub struct BruteForceBroadPhase {
    pairs: Vec<CollisionPair>,
}

impl BruteForceBroadPhase {
    /// Creates a new brute-force broad-phase
    pub fn new() -> Self {
        Self::default()
    }
}

impl BroadPhase for BruteForceBroadPhase {
    fn update(&mut self, proxies: &[BroadPhaseProxy]) {
        self.pairs.clear();

        for (i, a) in proxies.iter().enumerate() {
            for b in &proxies[i + 1..] {
                if a.is_static && b.is_static {
                    continue;
                }
                if !should_collide(a.group, a.mask, b.group, b.mask) {
                    continue;
                }
                if a.bounds.intersects(&b.bounds) {
                    self.pairs.push(CollisionPair::new(a.handle, b.handle));
                }
            }
        }

        // Sort the pairs for deterministic behavior
        self.pairs.sort();
    }

    fn get_collision_pairs(&self) -> Vec<CollisionPair> {
        self.pairs.clone()
    }
}
