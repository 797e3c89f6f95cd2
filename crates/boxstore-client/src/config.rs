//! Client configuration.

use std::time::Duration;

use boxstore_proto::framing::MAX_MESSAGE_SIZE;

/// Default TCP address of a BoxStore server.
pub const DEFAULT_ADDRESS: &str = "tcp://127.0.0.1:50051";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address (e.g., "tcp://127.0.0.1:50051" or "ipc:///tmp/boxstore.sock").
    pub address: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum message size in bytes.
    pub max_message_size: usize,
}

impl ClientConfig {
    /// Create a new client configuration with the specified address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Create a configuration for connecting to localhost on the default port.
    pub fn localhost() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum message size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::localhost()
    }
}
