//! BoxStore Client - async client for the BoxStore record service.
//!
//! # Quick Start
//!
//! ```ignore
//! use boxstore_client::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect(ClientConfig::localhost()).await?;
//!     client.ping().await?;
//!
//!     let reply = client.get_boxes_in_category("A").await?;
//!     println!("{} boxes in A", reply.records.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;

pub use client::Client;
pub use config::ClientConfig;
pub use connection::{Connection, ConnectionState};
pub use error::Error;

/// Re-export protocol types.
pub use boxstore_proto as proto;
