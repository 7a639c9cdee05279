pub mod math;
pub mod core;
pub mod bodies;
pub mod shapes;
pub mod collision;
pub mod constraints;
pub mod integration;
pub mod protocol;
pub mod transport;
pub mod worker;
pub mod scene;

/// Re-export common types for easier usage
pub use crate::core::{BodyId, ConstraintId, VehicleId, DynamicsWorld, WorldConfig, SceneConfig, SceneEvent, CollisionEvent};
pub use crate::protocol::{Command, ObjectDescription, ShapeDescription, ReportKind};
pub use crate::scene::{PhysicsScene, SceneObject};
pub use crate::worker::{PhysicsWorker, SimulationWorld};
pub use crate::math::{Vector3, Quaternion};

/// Error types for the physics bridge
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum PhysicsError {
        #[error("Invalid parameter: {0}")]
        InvalidParameter(String),

        #[error("Resource not found: {0}")]
        ResourceNotFound(String),

        #[error("Simulation stability error: {0}")]
        SimulationError(String),

        #[error("Internal error: {0}")]
        InternalError(String),

        #[error("Unknown shape type: {0}")]
        UnknownShape(String),

        #[error("Unknown command: {0}")]
        UnknownCommand(String),

        #[error("Not initialized: {0} does not exist yet")]
        NotInitialized(&'static str),

        #[error("Timed out waiting for the {0}")]
        Timeout(&'static str),

        #[error("Channel closed: the other side hung up")]
        ChannelClosed,

        #[error("Malformed report: {0}")]
        MalformedReport(String),

        #[error("Type mismatch: {0}")]
        TypeMismatch(String),
    }
}

/// Result type for physics bridge operations
pub type Result<T> = std::result::Result<T, error::PhysicsError>;

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
