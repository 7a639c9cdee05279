use crate::core::ContactPoint;
use crate::collision::collision_pair::CollisionPair;

/// Maximum number of contact points to store in a manifold
pub const MAX_CONTACT_POINTS: usize = 4;

/// Contact points between two bodies whose bounds overlap.
///
/// A manifold exists for every overlapping pair, touching or not; an empty
/// manifold means the bounds overlap but the shapes do not.
#[derive(Debug, Clone)]
pub struct ContactManifold {
    /// The collision pair this manifold belongs to
    pub pair: CollisionPair,

    /// The contact points; normals point from `pair.body_a` to `pair.body_b`
    pub contacts: Vec<ContactPoint>,

    /// The restitution coefficient for this collision
    pub restitution: f32,

    /// The friction coefficient for this collision
    pub friction: f32,
}

impl ContactManifold {
    /// Creates a new contact manifold for the given collision pair
    pub fn new(pair: CollisionPair) -> Self {
        Self {
            pair,
            contacts: Vec::with_capacity(MAX_CONTACT_POINTS),
            restitution: 0.0,
            friction: 0.0,
        }
    }

    /// Adds a contact point, keeping the deepest ones once full
    pub fn add_contact(&mut self, contact: ContactPoint) {
        if self.contacts.len() < MAX_CONTACT_POINTS {
            self.contacts.push(contact);
            return;
        }

        let shallowest = self
            .contacts
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.penetration.total_cmp(&b.penetration))
            .map(|(index, c)| (index, c.penetration));

        if let Some((index, penetration)) = shallowest {
            if contact.penetration > penetration {
                self.contacts[index] = contact;
            }
        }
    }

    /// The first contact point, the one reported to the main thread
    pub fn first_contact(&self) -> Option<&ContactPoint> {
        self.contacts.first()
    }

    /// Clears all contacts from the manifold
    pub fn clear(&mut self) {
        self.contacts.clear();
    }

    /// Returns whether the manifold is empty
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Sets the material properties for this collision
    pub fn set_material_properties(&mut self, restitution: f32, friction: f32) {
        self.restitution = restitution;
        self.friction = friction;
    }
}
