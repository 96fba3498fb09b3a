//! Mapping host contexts (such as IDE projects) to companion connections.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::connection::{Connection, ConnectionConfig, SharedConnection, TcpConnection};
use crate::error::ConnectionError;

/// Yields the connection serving a host context.
///
/// Implementations decide whether connections are cached and reused or
/// re-established on every call.
pub trait ConnectionResolver {
    /// Host-side handle identifying whose companion to talk to.
    type Context: ?Sized;
    /// Connection type handed out.
    type Connection: Connection;

    /// Obtain a connection for `context`.
    ///
    /// # Errors
    ///
    /// Returns an initialization-class [`ConnectionError`] when the companion
    /// for `context` is unknown or not accepting connections yet.
    fn resolve(&self, context: &Self::Context) -> Result<Self::Connection, ConnectionError>;
}

/// Resolver mapping project names to companion ports on the local host.
///
/// The first successful resolution for a project opens a [`TcpConnection`];
/// later resolutions reuse it until [`PortRegistry::forget`] drops it or a
/// failed exchange breaks it, in which case the next resolution reconnects.
#[derive(Debug, Default)]
pub struct PortRegistry {
    config: ConnectionConfig,
    ports: HashMap<String, u16>,
    connections: Mutex<HashMap<String, SharedConnection<TcpConnection>>>,
}

impl PortRegistry {
    /// Create an empty registry whose connections use `config`.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            ports: HashMap::new(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Record that `project`'s companion listens on `port`.
    ///
    /// Any connection cached for the project is dropped. Returns the port
    /// previously registered, if any.
    pub fn register(&mut self, project: impl Into<String>, port: u16) -> Option<u16> {
        let project = project.into();
        self.connections
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&project);
        self.ports.insert(project, port)
    }

    /// Port registered for `project`.
    #[must_use]
    pub fn port_for(&self, project: &str) -> Option<u16> {
        self.ports.get(project).copied()
    }

    /// Drop the cached connection for `project` so the next resolution
    /// reconnects. Returns whether a connection was cached.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Poisoned`] if the cache lock is poisoned.
    pub fn forget(&self, project: &str) -> Result<bool, ConnectionError> {
        Ok(self.lock_connections()?.remove(project).is_some())
    }

    fn lock_connections(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, SharedConnection<TcpConnection>>>, ConnectionError>
    {
        self.connections
            .lock()
            .map_err(|_| ConnectionError::Poisoned)
    }

    /// Healthy cached connection for `project`, evicting a broken one.
    fn cached(
        &self,
        project: &str,
    ) -> Result<Option<SharedConnection<TcpConnection>>, ConnectionError> {
        let mut connections = self.lock_connections()?;
        match connections.get(project) {
            Some(existing) if !existing.is_broken() => return Ok(Some(existing.clone())),
            Some(_) => {
                connections.remove(project);
                debug!(project, "evicted broken companion connection");
            }
            None => {}
        }
        Ok(None)
    }
}

impl ConnectionResolver for PortRegistry {
    type Context = str;
    type Connection = SharedConnection<TcpConnection>;

    fn resolve(&self, project: &str) -> Result<Self::Connection, ConnectionError> {
        let port = self
            .port_for(project)
            .ok_or_else(|| ConnectionError::NotRegistered(project.to_owned()))?;

        if let Some(existing) = self.cached(project)? {
            return Ok(existing);
        }

        // Connect outside the cache lock.
        let connection = SharedConnection::new(TcpConnection::connect(port, &self.config)?);

        let mut connections = self.lock_connections()?;
        if let Some(raced) = connections.get(project).filter(|c| !c.is_broken()) {
            return Ok(raced.clone());
        }
        connections.insert(project.to_owned(), connection.clone());
        debug!(project, port, "cached companion connection");
        Ok(connection)
    }
}
