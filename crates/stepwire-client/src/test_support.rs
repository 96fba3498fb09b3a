//! Shared test support utilities for stepwire-client tests.
//!
//! This module provides doubles for both unit and integration tests:
//! - [`ScriptedConnection`], answering from a queue of canned payloads
//! - [`ScriptedResolver`], handing out a scripted connection or failing as
//!   if the companion had not started
//! - [`FakeCompanion`], a loopback TCP server speaking the real framing

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::connection::{Connection, decode_frame, encode_frame};
use crate::error::ConnectionError;
use crate::messages::{ApiMessage, Payload};
use crate::resolver::ConnectionResolver;

/// Record of envelopes a double has received.
#[derive(Debug, Clone, Default)]
pub struct SentLog(Arc<Mutex<Vec<ApiMessage>>>);

impl SentLog {
    /// Snapshot of the recorded envelopes in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<ApiMessage> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, message: ApiMessage) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

/// A connection answering from a queue of scripted outcomes.
///
/// Replies echo the request's message id. An exhausted script answers with
/// [`ConnectionError::Closed`].
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    replies: VecDeque<Result<Payload, ConnectionError>>,
    log: SentLog,
}

impl ScriptedConnection {
    /// Create a connection with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    #[must_use]
    pub fn reply(mut self, payload: impl Into<Payload>) -> Self {
        self.replies.push_back(Ok(payload.into()));
        self
    }

    /// Queue a failed exchange.
    #[must_use]
    pub fn fail(mut self, error: ConnectionError) -> Self {
        self.replies.push_back(Err(error));
        self
    }

    /// Handle on the envelopes this connection has been sent.
    #[must_use]
    pub fn log(&self) -> SentLog {
        self.log.clone()
    }
}

impl Connection for ScriptedConnection {
    fn write_and_read(&mut self, message: &ApiMessage) -> Result<ApiMessage, ConnectionError> {
        self.log.record(message.clone());
        let payload = self
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(ConnectionError::Closed))?;
        Ok(ApiMessage {
            message_id: message.message_id,
            payload,
        })
    }
}

/// A resolver that either hands out one scripted connection or reports the
/// companion as not started.
#[derive(Debug)]
pub struct ScriptedResolver {
    connection: Mutex<Option<ScriptedConnection>>,
}

impl ScriptedResolver {
    /// Resolve every context to `connection` (once).
    #[must_use]
    pub fn ready(connection: ScriptedConnection) -> Self {
        Self {
            connection: Mutex::new(Some(connection)),
        }
    }

    /// Fail every resolution with an initialization error.
    #[must_use]
    pub fn not_ready() -> Self {
        Self {
            connection: Mutex::new(None),
        }
    }
}

impl ConnectionResolver for ScriptedResolver {
    type Context = str;
    type Connection = ScriptedConnection;

    fn resolve(&self, context: &str) -> Result<ScriptedConnection, ConnectionError> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| ConnectionError::NotRegistered(context.to_owned()))
    }
}

/// Return a loopback port that nothing is listening on.
///
/// # Errors
///
/// Returns an I/O error if no ephemeral port can be bound.
pub fn unused_port() -> io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

/// An in-process companion serving connections on a loopback port.
///
/// Connections are served one after another. Each received envelope is
/// recorded and passed to the handler. `Some` payloads are sent back under
/// the request's id; `None` hangs up.
#[derive(Debug)]
pub struct FakeCompanion {
    port: u16,
    received: SentLog,
    handle: Option<JoinHandle<()>>,
}

impl FakeCompanion {
    /// Bind a loopback port and serve the first connection made to it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound.
    pub fn spawn<F>(handler: F) -> io::Result<Self>
    where
        F: Fn(&ApiMessage) -> Option<Payload> + Send + 'static,
    {
        Self::serve(1, handler)
    }

    /// Bind a loopback port and serve `connections` connections in turn,
    /// closing the listener after the last one.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener cannot be bound.
    pub fn serve<F>(connections: usize, handler: F) -> io::Result<Self>
    where
        F: Fn(&ApiMessage) -> Option<Payload> + Send + 'static,
    {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let port = listener.local_addr()?.port();
        let received = SentLog::default();
        let log = received.clone();
        let handle = thread::spawn(move || {
            for stream in listener.incoming().take(connections) {
                let Ok(stream) = stream else {
                    return;
                };
                serve_connection(stream, &log, &handler);
            }
        });
        Ok(Self {
            port,
            received,
            handle: Some(handle),
        })
    }

    /// Port the companion listens on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Envelopes received so far.
    #[must_use]
    pub fn received(&self) -> Vec<ApiMessage> {
        self.received.messages()
    }

    /// Wait for the companion to finish serving its connections.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve_connection<F>(stream: TcpStream, log: &SentLog, handler: &F)
where
    F: Fn(&ApiMessage) -> Option<Payload>,
{
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let Ok(request) = decode_frame(&line) else {
            return;
        };
        log.record(request.clone());
        let Some(payload) = handler(&request) else {
            return;
        };
        let reply = ApiMessage {
            message_id: request.message_id,
            payload,
        };
        let Ok(frame) = encode_frame(&reply) else {
            return;
        };
        if writer.write_all(&frame).and_then(|()| writer.flush()).is_err() {
            return;
        }
    }
}
