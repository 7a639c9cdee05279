use crate::math::Vector3;
use std::time::Duration;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// Which integrator advances body positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum IntegratorKind {
    /// Semi-implicit Euler: positions use the freshly solved velocity
    #[default]
    SymplecticEuler,

    /// Explicit Euler: positions use the velocity from the start of the step
    Euler,
}

/// Configuration of the worker's dynamics world, sent with `makeWorld`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// The fixed sub-step length in seconds
    pub fixed_time_step: f32,

    /// World gravity
    pub gravity: Vector3,

    /// Whether soft bodies are simulated and reported
    pub soft_bodies: bool,

    /// Solver iterations for contacts and joints
    pub solver_iterations: u32,

    /// Report buffers grow in multiples of this many items
    pub report_chunk_size: usize,

    /// Whether resting bodies may go to sleep
    pub allow_sleeping: bool,

    /// The linear velocity threshold below which bodies can sleep
    pub linear_sleep_threshold: f32,

    /// The angular velocity threshold below which bodies can sleep
    pub angular_sleep_threshold: f32,

    /// The time a body must be inactive before sleeping
    pub sleep_time_threshold: f32,

    /// Baumgarte factor used to push penetrating bodies apart
    pub contact_bias_factor: f32,

    /// Penetration tolerated before positional correction kicks in
    pub contact_slop: f32,

    /// The collision restitution velocity threshold
    pub restitution_velocity_threshold: f32,

    /// Position integrator
    pub integrator: IntegratorKind,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: 1.0 / 60.0,
            gravity: Vector3::new(0.0, -9.81, 0.0),
            soft_bodies: false,
            solver_iterations: 10,
            report_chunk_size: 100,
            allow_sleeping: true,
            linear_sleep_threshold: 0.8,
            angular_sleep_threshold: 1.0,
            sleep_time_threshold: 2.0,
            contact_bias_factor: 0.2,
            contact_slop: 0.01,
            restitution_velocity_threshold: 0.5,
            integrator: IntegratorKind::default(),
        }
    }
}

/// Capabilities of the message transport
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TransportConfig {
    /// Whether buffers can be moved across the channel instead of copied
    pub transferables: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { transferables: true }
    }
}

/// Configuration of the main-thread scene
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SceneConfig {
    /// World configuration forwarded to the worker
    pub world: WorldConfig,

    /// Transport capabilities
    pub transport: TransportConfig,

    /// Compute the relative angular velocity of collision events from the
    /// linear velocities, as older releases did
    pub legacy_relative_angular_velocity: bool,

    /// How long the blocking helpers wait for the worker
    pub ready_timeout: Duration,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            transport: TransportConfig::default(),
            legacy_relative_angular_velocity: true,
            ready_timeout: Duration::from_secs(5),
        }
    }
}
