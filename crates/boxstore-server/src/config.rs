//! Server host configuration: defaults, builder, and command line.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use boxstore_core::storage::StoreConfig;
use boxstore_proto::framing::MAX_MESSAGE_SIZE;
use clap::Parser;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 50051;

/// Default store location.
pub const DEFAULT_DATA_PATH: &str = boxstore_core::storage::DEFAULT_DATA_PATH;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default page cache size in megabytes.
pub const DEFAULT_CACHE_MB: u64 = 256;

/// Default background flush interval in milliseconds.
pub const DEFAULT_FLUSH_MS: u64 = 500;

/// One worker per available core.
fn auto_workers() -> usize {
    thread::available_parallelism().map_or(4, NonZeroUsize::get)
}

/// TCP listen address for a host and port.
pub fn tcp_address(host: &str, port: u16) -> String {
    format!("tcp://{host}:{port}")
}

/// Everything the server host needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `tcp://host:port` to listen on; `None` serves IPC only.
    pub tcp_address: Option<String>,

    /// Extra `ipc://path` to listen on.
    pub ipc_address: Option<String>,

    /// Where and how the box store is opened.
    pub store: StoreConfig,

    /// Calls running longer than this are logged with a warning.
    pub request_timeout: Duration,

    /// Largest request frame accepted, in bytes.
    pub max_message_size: usize,

    /// Size of the transport worker pool.
    pub transport_workers: usize,
}

impl ServerConfig {
    /// Defaults for everything except the store location.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            tcp_address: Some(tcp_address(DEFAULT_HOST, DEFAULT_PORT)),
            ipc_address: None,
            store: StoreConfig::new(data_path),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_message_size: MAX_MESSAGE_SIZE,
            transport_workers: auto_workers(),
        }
    }

    pub fn with_tcp_address(self, address: impl Into<String>) -> Self {
        Self {
            tcp_address: Some(address.into()),
            ..self
        }
    }

    /// Serve over IPC only.
    pub fn without_tcp(self) -> Self {
        Self {
            tcp_address: None,
            ..self
        }
    }

    pub fn with_ipc_address(self, address: impl Into<String>) -> Self {
        Self {
            ipc_address: Some(address.into()),
            ..self
        }
    }

    pub fn with_store(self, store: StoreConfig) -> Self {
        Self { store, ..self }
    }

    pub fn with_request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    pub fn with_max_message_size(self, max_message_size: usize) -> Self {
        Self {
            max_message_size,
            ..self
        }
    }

    /// Set the worker pool size. Zero is raised to one.
    pub fn with_transport_workers(self, workers: usize) -> Self {
        Self {
            transport_workers: workers.max(1),
            ..self
        }
    }

    /// Whether any listen address is set.
    pub fn has_transport(&self) -> bool {
        self.tcp_address.is_some() || self.ipc_address.is_some()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

/// Server command line. Every flag also reads from the environment, which
/// a `.env` file may populate.
#[derive(Parser, Debug)]
#[command(name = "boxstore-server")]
#[command(version, about = "BoxStore record service", long_about = None)]
pub struct Args {
    /// Host to listen on.
    #[arg(long, env = "APP_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "APP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Additional IPC address, e.g. ipc:///tmp/boxstore.sock.
    #[arg(long, env = "APP_IPC")]
    pub ipc: Option<String>,

    /// Do not listen on TCP; needs --ipc.
    #[arg(long)]
    pub no_tcp: bool,

    /// Store directory.
    #[arg(short, long, env = "DB_PATH", default_value = DEFAULT_DATA_PATH)]
    pub data_path: PathBuf,

    /// Store page cache in megabytes.
    #[arg(long, env = "DB_CACHE_MB", default_value_t = DEFAULT_CACHE_MB)]
    pub cache_mb: u64,

    /// Background flush interval in milliseconds; 0 flushes only at shutdown.
    #[arg(long, env = "DB_FLUSH_MS", default_value_t = DEFAULT_FLUSH_MS)]
    pub flush_ms: u64,

    /// Seconds after which a slow call is logged.
    #[arg(long, env = "APP_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Worker threads; 0 picks one per core.
    #[arg(long, env = "APP_WORKERS", default_value_t = 0)]
    pub workers: usize,
}

impl Args {
    pub fn into_config(self) -> ServerConfig {
        let store = StoreConfig::new(self.data_path)
            .with_cache_capacity(self.cache_mb * 1024 * 1024)
            .with_flush_every_ms((self.flush_ms > 0).then_some(self.flush_ms));
        let workers = match self.workers {
            0 => auto_workers(),
            n => n,
        };

        ServerConfig {
            tcp_address: (!self.no_tcp).then(|| tcp_address(&self.host, self.port)),
            ipc_address: self.ipc,
            store,
            request_timeout: Duration::from_secs(self.timeout),
            max_message_size: MAX_MESSAGE_SIZE,
            transport_workers: workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(
            config.tcp_address,
            Some("tcp://127.0.0.1:50051".to_string())
        );
        assert!(config.ipc_address.is_none());
        assert_eq!(config.store.path, PathBuf::from("./data"));
        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert!(config.has_transport());
    }

    #[test]
    fn test_config_builder() {
        let config = ServerConfig::new("/var/lib/boxstore")
            .with_tcp_address("tcp://0.0.0.0:8080")
            .with_ipc_address("ipc:///tmp/boxstore.sock")
            .with_request_timeout(Duration::from_secs(60))
            .with_transport_workers(0);

        assert_eq!(config.tcp_address, Some("tcp://0.0.0.0:8080".to_string()));
        assert_eq!(
            config.ipc_address,
            Some("ipc:///tmp/boxstore.sock".to_string())
        );
        assert_eq!(config.store.path, PathBuf::from("/var/lib/boxstore"));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.transport_workers, 1);
    }

    #[test]
    fn test_no_transport() {
        let config = ServerConfig::new("./data").without_tcp();
        assert!(!config.has_transport());
    }

    #[test]
    fn test_args_into_config() {
        let args = Args::try_parse_from([
            "boxstore-server",
            "--host",
            "0.0.0.0",
            "--port",
            "6000",
            "--data-path",
            "/tmp/boxes",
            "--cache-mb",
            "8",
            "--flush-ms",
            "0",
            "--workers",
            "3",
        ])
        .unwrap();
        let config = args.into_config();

        assert_eq!(config.tcp_address, Some("tcp://0.0.0.0:6000".to_string()));
        assert_eq!(config.store.path, PathBuf::from("/tmp/boxes"));
        assert_eq!(config.store.cache_capacity, 8 * 1024 * 1024);
        assert_eq!(config.store.flush_every_ms, None);
        assert_eq!(config.transport_workers, 3);
    }

    #[test]
    fn test_args_without_tcp() {
        let args = Args::try_parse_from([
            "boxstore-server",
            "--no-tcp",
            "--ipc",
            "ipc:///tmp/boxstore.sock",
        ])
        .unwrap();
        let config = args.into_config();

        assert!(config.tcp_address.is_none());
        assert!(config.has_transport());
    }
}
