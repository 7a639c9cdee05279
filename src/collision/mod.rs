mod collision_pair;
mod broad_phase;
mod narrow_phase;
mod contact_solver;
mod collision_filter;
mod contact_manifold;

pub use self::collision_pair::CollisionPair;
pub use self::broad_phase::{BroadPhase, BroadPhaseProxy, BruteForceBroadPhase};
pub use self::narrow_phase::{collide, NarrowPhase, SatNarrowPhase, CONTACT_MARGIN};
pub use self::contact_solver::{ContactSolver, SequentialImpulseSolver};
pub use self::collision_filter::{should_collide, CollisionGroup};
pub use self::contact_manifold::{ContactManifold, MAX_CONTACT_POINTS};
