//! Default connection over a local TCP socket.

use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

use super::Connection;
use super::frame::{decode_frame, encode_frame};
use crate::error::ConnectionError;
use crate::messages::ApiMessage;

/// Default time allowed for the companion to accept a connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Default time allowed for a single read or write.
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Socket settings for [`TcpConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Time allowed for the companion to accept the connection.
    pub connect_timeout: Duration,
    /// Per-operation read and write timeout; `None` blocks indefinitely.
    pub io_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
        }
    }
}

/// A connection to a companion listening on `127.0.0.1:<port>`.
///
/// A failed exchange leaves the stream at an unknown frame boundary: a reply
/// that missed its read timeout may still arrive. The connection then marks
/// itself broken and refuses further exchanges.
#[derive(Debug)]
pub struct TcpConnection {
    port: u16,
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    broken: bool,
}

impl TcpConnection {
    /// Connect to the companion on `port` of the local host.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Initialization`] if nothing accepts the
    /// connection in time, and [`ConnectionError::Io`] if the socket cannot
    /// be configured afterwards.
    pub fn connect(port: u16, config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        let address = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let stream = TcpStream::connect_timeout(&address, config.connect_timeout)
            .map_err(|source| ConnectionError::Initialization { port, source })?;
        debug!(port, "connected to companion process");
        Self::from_stream(port, stream, config)
    }

    fn from_stream(
        port: u16,
        stream: TcpStream,
        config: &ConnectionConfig,
    ) -> Result<Self, ConnectionError> {
        stream.set_read_timeout(config.io_timeout)?;
        stream.set_write_timeout(config.io_timeout)?;
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;
        Ok(Self {
            port,
            reader: BufReader::new(stream),
            writer,
            broken: false,
        })
    }

    /// Port of the companion this connection talks to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    fn round_trip(&mut self, message: &ApiMessage) -> Result<ApiMessage, ConnectionError> {
        let frame = encode_frame(message)?;
        self.writer.write_all(&frame)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(ConnectionError::Closed);
        }
        decode_frame(&line)
    }
}

impl Connection for TcpConnection {
    fn write_and_read(&mut self, message: &ApiMessage) -> Result<ApiMessage, ConnectionError> {
        if self.broken {
            return Err(ConnectionError::Broken);
        }
        let result = self.round_trip(message);
        if let Err(err) = &result {
            self.broken = true;
            debug!(port = self.port, error = %err, "abandoning companion connection");
        }
        result
    }

    fn is_broken(&self) -> bool {
        self.broken
    }
}
