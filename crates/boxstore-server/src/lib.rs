//! BoxStore Server library.
//!
//! This crate hosts the record service: it opens the box collection,
//! dispatches decoded requests to [`BoxService`], and serves them over NNG.

pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod service;
pub mod transport;

pub use config::{Args, ServerConfig};
pub use database::open_boxes;
pub use error::Error;
pub use handler::RequestHandler;
pub use service::BoxService;
pub use transport::{create_transport, MetricsSnapshot, Transport, TransportMetrics};
