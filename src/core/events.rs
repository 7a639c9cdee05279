use crate::core::BodyId;
use crate::math::Vector3;
use std::collections::VecDeque;

/// A collision-begin notification delivered to one body of a touching pair
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// The body receiving the notification
    pub body: BodyId,

    /// The body it started touching
    pub other: BodyId,

    /// Linear velocity of `body` minus that of `other`
    pub relative_linear_velocity: Vector3,

    /// Relative angular velocity of the pair
    pub relative_angular_velocity: Vector3,

    /// Contact normal as seen from `body`
    pub normal: Vector3,
}

/// Events produced by the main-thread scene
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// The worker finished building its world
    Ready,

    /// The worker registered a body
    ObjectReady(BodyId),

    /// A world report was applied
    Update,

    /// Two bodies started touching
    Collision(CollisionEvent),
}

/// A FIFO queue of scene events
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<SceneEvent>,
}

impl EventQueue {
    /// Creates a new empty event queue
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }

    /// Adds an event to the queue
    pub fn push(&mut self, event: SceneEvent) {
        self.events.push_back(event);
    }

    /// Gets the next event from the queue
    pub fn next_event(&mut self) -> Option<SceneEvent> {
        self.events.pop_front()
    }

    /// Removes and returns every queued event
    pub fn drain(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    /// Returns the number of queued events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clears all events from the queue
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Gets all queued collision events involving a specific body
    pub fn collisions_for(&self, body: BodyId) -> Vec<&CollisionEvent> {
        self.events
            .iter()
            .filter_map(|event| match event {
                SceneEvent::Collision(collision) if collision.body == body => Some(collision),
                _ => None,
            })
            .collect()
    }

    /// Counts queued events matching a predicate
    pub fn count_where(&self, predicate: impl Fn(&SceneEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}
