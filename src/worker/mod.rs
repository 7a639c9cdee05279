//! The worker side: registry, step driver and report encoder, plus the
//! thread that runs them.

mod registry;
mod reports;

pub use self::registry::{BodyRecord, JointRecord, NativeBody, SimulationWorld, VehicleRecord};

use std::thread::{self, JoinHandle};

use crate::error::PhysicsError;
use crate::protocol::{ControlMessage, MainMessage, WorkerMessage};
use crate::transport::{self, Port};
use crate::Result;

/// Port type held by the worker
pub type WorkerPort = Port<WorkerMessage, MainMessage>;

/// Runs a worker on the calling thread until the main thread hangs up.
///
/// Rejected commands are logged and reported back as debug messages.
pub fn run(port: WorkerPort) {
    let mut world = SimulationWorld::new();

    while let Ok(message) = port.recv() {
        match message {
            MainMessage::Command(command) => {
                let name = command.name().to_owned();
                if let Err(err) = world.handle(command) {
                    log::warn!("command {} rejected: {}", name, err);
                    if port.post(ControlMessage::Debug(format!("{} rejected: {}", name, err))).is_err() {
                        log::debug!("main thread is gone, stopping worker");
                        return;
                    }
                }
            }
            MainMessage::Buffer(buffer) => world.reclaim(buffer),
            MainMessage::Probe(bytes) => {
                if !transport::is_probe(&bytes) {
                    log::warn!("ignoring {}-byte probe of unexpected size", bytes.len());
                }
            }
        }

        for outgoing in world.take_messages() {
            if port.post(outgoing).is_err() {
                log::debug!("main thread is gone, stopping worker");
                return;
            }
        }
    }

    log::debug!("physics worker stopped");
}

/// A worker running on its own thread
#[derive(Debug)]
pub struct PhysicsWorker {
    handle: JoinHandle<()>,
}

impl PhysicsWorker {
    /// Starts a worker thread serving `port`
    pub fn spawn(port: WorkerPort) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("physics-worker".into())
            .spawn(move || run(port))
            .map_err(|err| PhysicsError::InternalError(format!("failed to start worker thread: {err}")))?;
        Ok(Self { handle })
    }

    /// Waits for the worker to stop; it stops once its port is disconnected
    pub fn join(self) -> Result<()> {
        self.handle
            .join()
            .map_err(|_| PhysicsError::InternalError("worker thread panicked".into()))
    }

    /// Whether the thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
