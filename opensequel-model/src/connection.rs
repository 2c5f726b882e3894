//! Write-once binding between models and a transport.

use crate::{
    config::ConnectionConfig,
    error::{ModelError, Result},
    transport::{OpenSearchTransport, Transport},
};
use opensequel_log::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Shared handle every [`Model`](crate::Model) sends its requests through.
///
/// A connection starts unbound. It is bound exactly once, either from a
/// [`ConnectionConfig`] or to a custom [`Transport`]; binding again fails
/// with [`ModelError::AlreadyConfigured`] and keeps the first binding.
#[derive(Default)]
pub struct Connection {
    transport: OnceCell<Arc<dyn Transport>>,
}

impl Connection {
    /// Create an unbound connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connection already bound to the engine described by `config`.
    pub fn open(config: &ConnectionConfig) -> Result<Arc<Self>> {
        let connection = Arc::new(Self::new());
        connection.connect(config)?;
        Ok(connection)
    }

    /// Bind to the engine described by `config`.
    pub fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        if self.is_connected() {
            return Err(ModelError::AlreadyConfigured);
        }
        let transport = OpenSearchTransport::new(config)?;
        self.bind(Arc::new(transport))?;
        info!("Connected to {}", config.url);
        Ok(())
    }

    /// Bind to a custom transport.
    pub fn bind(&self, transport: Arc<dyn Transport>) -> Result<()> {
        self.transport
            .set(transport)
            .map_err(|_| ModelError::AlreadyConfigured)
    }

    /// Whether a transport is bound.
    pub fn is_connected(&self) -> bool {
        self.transport.initialized()
    }

    /// The bound transport.
    pub fn transport(&self) -> Result<&Arc<dyn Transport>> {
        self.transport.get().ok_or(ModelError::NotConnected)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .finish()
    }
}
