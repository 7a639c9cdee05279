use crate::core::BodyId;
use crate::protocol::Command;

/// Control messages from the worker
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// The worker answered `init`
    EngineLoaded,

    /// The worker built its world
    WorldReady,

    /// A body was registered
    ObjectReady(BodyId),

    /// A `simulate` produced no world report
    StepFailed(String),

    /// Free-form diagnostics
    Debug(String),
}

/// Anything the worker sends to the main thread
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// A report buffer, tagged by its first float
    Report(Vec<f32>),

    /// A control message
    Control(ControlMessage),

    /// The transport capability probe; receivers ignore it
    Probe(Vec<u8>),
}

/// Anything the main thread sends to the worker
#[derive(Debug, Clone, PartialEq)]
pub enum MainMessage {
    /// A command
    Command(Command),

    /// A report buffer handed back for reuse
    Buffer(Vec<f32>),

    /// The transport capability probe; receivers ignore it
    Probe(Vec<u8>),
}

impl From<Command> for MainMessage {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl From<ControlMessage> for WorkerMessage {
    fn from(control: ControlMessage) -> Self {
        Self::Control(control)
    }
}
