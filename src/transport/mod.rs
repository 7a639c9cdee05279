//! Message transport between the main thread and the worker.
//!
//! Each side owns a [`Port`]: an unbounded crossbeam sender for what it
//! posts and a receiver for what it is sent. Report buffers cross the channel
//! as `Vec<f32>`; a [`TransferMode`] chosen once at startup decides whether a
//! buffer is moved (the sender is left holding an empty one) or copied.

use std::mem;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::PhysicsError;
use crate::Result;

/// Length of the capability probe buffer
pub const PROBE_LEN: usize = 1;

/// How buffers are handed to the other side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Ownership moves; the sender keeps an empty buffer until one comes back
    Transfer,

    /// The receiver gets a copy; the sender keeps and reuses its buffer
    Copy,
}

impl TransferMode {
    /// Hands `buffer` off for sending
    pub fn hand_off<T: Clone>(self, buffer: &mut Vec<T>) -> Vec<T> {
        match self {
            Self::Transfer => mem::take(buffer),
            Self::Copy => buffer.clone(),
        }
    }

    /// Whether buffers move and are expected back
    pub fn is_transfer(self) -> bool {
        self == Self::Transfer
    }

    /// The mode observed after sending a probe: if the local probe is empty,
    /// its bytes moved
    pub fn detect(probe_after_send: &[u8]) -> Self {
        if probe_after_send.is_empty() {
            Self::Transfer
        } else {
            Self::Copy
        }
    }
}

/// Sends a probe through `post` using the transfer the environment offers,
/// and returns the mode the probe revealed
pub fn probe<F>(transferables: bool, post: F) -> Result<TransferMode>
where
    F: FnOnce(Vec<u8>) -> Result<()>,
{
    let attempt = if transferables {
        TransferMode::Transfer
    } else {
        TransferMode::Copy
    };
    let mut probe = vec![0u8; PROBE_LEN];
    post(attempt.hand_off(&mut probe))?;

    let mode = TransferMode::detect(&probe);
    log::debug!("transport probe: {:?}", mode);
    Ok(mode)
}

/// Whether a received byte buffer is a probe rather than data
pub fn is_probe(bytes: &[u8]) -> bool {
    bytes.len() == PROBE_LEN
}

/// One end of a bidirectional channel
#[derive(Debug)]
pub struct Port<Out, In> {
    sender: Sender<Out>,
    receiver: Receiver<In>,
}

impl<Out, In> Port<Out, In> {
    /// Posts a message; fails only once the other end is gone
    pub fn post(&self, message: impl Into<Out>) -> Result<()> {
        self.sender.send(message.into()).map_err(|_| PhysicsError::ChannelClosed)
    }

    /// Takes a pending message without blocking
    pub fn try_recv(&self) -> Result<Option<In>> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PhysicsError::ChannelClosed),
        }
    }

    /// Waits up to `timeout` for a message
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<In>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PhysicsError::ChannelClosed),
        }
    }

    /// Waits for the next message
    pub fn recv(&self) -> Result<In> {
        self.receiver.recv().map_err(|_| PhysicsError::ChannelClosed)
    }

    /// Number of messages waiting
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// Creates two connected ports
pub fn channel_pair<A, B>() -> (Port<A, B>, Port<B, A>) {
    let (a_to_b, from_a) = unbounded();
    let (b_to_a, from_b) = unbounded();
    (
        Port {
            sender: a_to_b,
            receiver: from_b,
        },
        Port {
            sender: b_to_a,
            receiver: from_a,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_off() {
        let mut buffer = vec![1.0f32, 2.0];
        let sent = TransferMode::Copy.hand_off(&mut buffer);
        assert_eq!(sent, buffer);

        let sent = TransferMode::Transfer.hand_off(&mut buffer);
        assert_eq!(sent, vec![1.0, 2.0]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_probe() {
        let (a, b) = channel_pair::<Vec<u8>, Vec<u8>>();
        assert_eq!(probe(true, |bytes| a.post(bytes)).ok(), Some(TransferMode::Transfer));
        assert_eq!(probe(false, |bytes| a.post(bytes)).ok(), Some(TransferMode::Copy));

        assert!(matches!(b.try_recv(), Ok(Some(bytes)) if is_probe(&bytes)));
        assert!(matches!(b.try_recv(), Ok(Some(bytes)) if is_probe(&bytes)));
        assert!(matches!(b.try_recv(), Ok(None)));
    }

    #[test]
    fn test_closed_channel() {
        let (a, b) = channel_pair::<u32, u32>();
        drop(b);
        assert!(matches!(a.post(1u32), Err(PhysicsError::ChannelClosed)));
        assert!(matches!(a.try_recv(), Err(PhysicsError::ChannelClosed)));
    }
}
