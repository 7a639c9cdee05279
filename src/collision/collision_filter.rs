use bitflags::bitflags;

bitflags! {
    /// Collision group bits; a body belongs to `group` and collides with `mask`
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionGroup: u32 {
        /// Default group
        const DEFAULT    = 0x0000_0001;

        /// Static world objects
        const STATIC     = 0x0000_0002;

        /// Dynamic objects
        const DYNAMIC    = 0x0000_0004;

        /// Character objects
        const CHARACTER  = 0x0000_0008;

        /// Projectile objects
        const PROJECTILE = 0x0000_0010;

        /// Debris objects
        const DEBRIS     = 0x0000_0020;

        /// Every group
        const ALL        = 0xFFFF_FFFF;
    }
}

/// Whether two bodies with the given group/mask pairs should collide.
/// Both sides must accept the other.
pub fn should_collide(group_a: u32, mask_a: u32, group_b: u32, mask_b: u32) -> bool {
    let a = CollisionGroup::from_bits_retain(group_a);
    let b = CollisionGroup::from_bits_retain(group_b);
    b.intersects(CollisionGroup::from_bits_retain(mask_a)) && a.intersects(CollisionGroup::from_bits_retain(mask_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sides_must_accept() {
        let all = CollisionGroup::ALL.bits();
        assert!(should_collide(1, all, 1, all));
        assert!(!should_collide(1, 2, 1, all));
        assert!(!should_collide(1, all, 2, 2));
        assert!(should_collide(
            CollisionGroup::DYNAMIC.bits(),
            CollisionGroup::STATIC.bits(),
            CollisionGroup::STATIC.bits(),
            CollisionGroup::DYNAMIC.bits(),
        ));
    }
}
