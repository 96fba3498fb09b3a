//! Channels that carry envelopes to the companion process.
//!
//! A [`Connection`] knows one thing: write an envelope and block until the
//! correlated reply arrives. Framing, timeouts and reconnection belong to the
//! implementation. [`TcpConnection`] is the default, speaking newline-delimited
//! JSON to a companion listening on the local host.

mod frame;
mod tcp;

use std::sync::{Arc, Mutex, TryLockError};

use crate::error::ConnectionError;
use crate::messages::ApiMessage;

pub use frame::{decode_frame, encode_frame};
pub use tcp::{ConnectionConfig, TcpConnection};

/// A synchronous request/response channel to one companion process.
pub trait Connection {
    /// Send `message` and return the single reply correlated with it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Initialization`] when the channel cannot be
    /// established, and a transport-class variant for any other failure.
    fn write_and_read(&mut self, message: &ApiMessage) -> Result<ApiMessage, ConnectionError>;

    /// Whether an earlier failure left this channel unusable.
    ///
    /// Resolvers that cache connections re-establish broken ones instead of
    /// handing them out again.
    fn is_broken(&self) -> bool {
        false
    }
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn write_and_read(&mut self, message: &ApiMessage) -> Result<ApiMessage, ConnectionError> {
        (**self).write_and_read(message)
    }

    fn is_broken(&self) -> bool {
        (**self).is_broken()
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn write_and_read(&mut self, message: &ApiMessage) -> Result<ApiMessage, ConnectionError> {
        (**self).write_and_read(message)
    }

    fn is_broken(&self) -> bool {
        (**self).is_broken()
    }
}

/// A cloneable handle serialising access to one underlying connection.
///
/// Each call holds the lock for exactly one round trip, so sequential callers
/// can share a cached connection without interleaving frames.
#[derive(Debug)]
pub struct SharedConnection<C> {
    inner: Arc<Mutex<C>>,
}

impl<C> SharedConnection<C> {
    /// Wrap `connection` for sharing.
    #[must_use]
    pub fn new(connection: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(connection)),
        }
    }
}

impl<C> Clone for SharedConnection<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Connection> Connection for SharedConnection<C> {
    fn write_and_read(&mut self, message: &ApiMessage) -> Result<ApiMessage, ConnectionError> {
        let mut connection = self.inner.lock().map_err(|_| ConnectionError::Poisoned)?;
        connection.write_and_read(message)
    }

    /// A handle busy in another caller's exchange counts as healthy; a
    /// poisoned one does not.
    fn is_broken(&self) -> bool {
        match self.inner.try_lock() {
            Ok(connection) => connection.is_broken(),
            Err(TryLockError::WouldBlock) => false,
            Err(TryLockError::Poisoned(_)) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{AllStepsRequest, AllStepsResponse, Payload};
    use crate::test_support::ScriptedConnection;

    #[test]
    fn shared_handles_drive_the_same_connection() {
        let scripted = ScriptedConnection::new()
            .reply(AllStepsResponse::default())
            .reply(AllStepsResponse::default());
        let log = scripted.log();
        let mut first = SharedConnection::new(scripted);
        let mut second = first.clone();

        let request = ApiMessage::new(1, AllStepsRequest::default());
        assert!(first.write_and_read(&request).is_ok());
        assert!(second.write_and_read(&request).is_ok());
        assert_eq!(log.messages().len(), 2);
    }

    #[test]
    fn shared_handle_reports_poisoned_lock_as_broken() {
        let shared = SharedConnection::new(ScriptedConnection::new());
        assert!(!shared.is_broken());

        let poisoner = shared.clone();
        let outcome = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock();
            panic!("caller panicked mid-exchange");
        })
        .join();
        assert!(outcome.is_err());
        assert!(shared.is_broken());
    }

    #[test]
    fn boxed_connection_forwards_calls() {
        let mut boxed: Box<dyn Connection> =
            Box::new(ScriptedConnection::new().reply(AllStepsResponse::default()));
        let Ok(reply) = boxed.write_and_read(&ApiMessage::new(5, AllStepsRequest::default()))
        else {
            panic!("scripted reply should be returned");
        };
        assert_eq!(
            reply.payload,
            Payload::GetAllStepsResponse(AllStepsResponse::default())
        );
        assert_eq!(reply.message_id, 5);
    }
}
