//! BoxStore client API.
//!
//! Every record operation returns the typed reply for that operation. A reply
//! with an ERROR status is a normal result, not an [`Error`]: callers branch
//! on `reply.status`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use boxstore_proto::{
    BoxRecord, BoxReply, BoxesReply, Request, Response, ResponsePayload, Status, StatusReply,
};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::Error;

/// A client for the BoxStore record service.
///
/// # Example
///
/// ```ignore
/// use boxstore_client::{Client, ClientConfig};
/// use boxstore_client::proto::BoxRecord;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::connect(ClientConfig::localhost()).await?;
///
///     let reply = client.create_box(BoxRecord::new(1, "Box1")).await?;
///     if reply.status.is_error() {
///         eprintln!("create failed: {:?}", reply.status);
///     }
///
///     let boxes = client.get_boxes().await?;
///     println!("{} boxes", boxes.records.len());
///
///     client.close().await;
///     Ok(())
/// }
/// ```
pub struct Client {
    connection: Arc<Mutex<Connection>>,
    next_request_id: AtomicU64,
}

impl Client {
    /// Connect to a BoxStore server.
    pub async fn connect(config: ClientConfig) -> Result<Self, Error> {
        let connection = Connection::establish(config).await?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            next_request_id: AtomicU64::new(1),
        })
    }

    /// Connect to a server at the given address.
    pub async fn connect_to(address: impl Into<String>) -> Result<Self, Error> {
        Self::connect(ClientConfig::new(address)).await
    }

    /// Connect to localhost on the default port.
    pub async fn connect_localhost() -> Result<Self, Error> {
        Self::connect(ClientConfig::localhost()).await
    }

    /// Fetch one box by id.
    pub async fn get_box(&self, id: i64) -> Result<BoxReply, Error> {
        let request = Request::get_box(self.next_request_id(), id);
        Ok(BoxReply::try_from(self.send_request(&request).await?)?)
    }

    /// Fetch every box.
    pub async fn get_boxes(&self) -> Result<BoxesReply, Error> {
        let request = Request::get_boxes(self.next_request_id());
        Ok(BoxesReply::try_from(self.send_request(&request).await?)?)
    }

    /// Create a box. The server stamps `created_at` when it is unset.
    pub async fn create_box(&self, record: BoxRecord) -> Result<StatusReply, Error> {
        let request = Request::create_box(self.next_request_id(), record);
        Ok(StatusReply::try_from(self.send_request(&request).await?)?)
    }

    /// Replace a box's fields (all but `id` and `created_at`).
    pub async fn update_box(&self, record: BoxRecord) -> Result<StatusReply, Error> {
        let request = Request::update_box(self.next_request_id(), record);
        Ok(StatusReply::try_from(self.send_request(&request).await?)?)
    }

    /// Delete a box by id.
    pub async fn delete_box(&self, id: i64) -> Result<StatusReply, Error> {
        let request = Request::delete_box(self.next_request_id(), id);
        Ok(StatusReply::try_from(self.send_request(&request).await?)?)
    }

    /// Boxes in a category. `""` selects boxes without a category.
    pub async fn get_boxes_in_category(
        &self,
        category: impl Into<String>,
    ) -> Result<BoxesReply, Error> {
        let request = Request::get_boxes_in_category(self.next_request_id(), category);
        Ok(BoxesReply::try_from(self.send_request(&request).await?)?)
    }

    /// Boxes created within `[start_time, end_time]` (microseconds since epoch).
    pub async fn get_boxes_in_time_range(
        &self,
        start_time: i64,
        end_time: i64,
    ) -> Result<BoxesReply, Error> {
        let request =
            Request::get_boxes_in_time_range(self.next_request_id(), start_time, end_time);
        Ok(BoxesReply::try_from(self.send_request(&request).await?)?)
    }

    /// Ping the server to check connectivity.
    pub async fn ping(&self) -> Result<(), Error> {
        let request = Request::ping(self.next_request_id());
        let response = self.send_request(&request).await?;

        match (response.status, response.payload) {
            (Status::Ok, ResponsePayload::Pong) => Ok(()),
            (Status::Error { code, message }, _) => Err(Error::Server { code, message }),
            (Status::Ok, other) => Err(Error::Protocol(
                boxstore_proto::Error::UnexpectedPayload {
                    operation: "ping",
                    payload: other.kind(),
                },
            )),
        }
    }

    /// Close the connection.
    pub async fn close(&self) {
        let mut conn = self.connection.lock().await;
        conn.close();
    }

    /// Check if the client is connected.
    pub async fn is_connected(&self) -> bool {
        let conn = self.connection.lock().await;
        conn.is_connected()
    }

    fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn send_request(&self, request: &Request) -> Result<Response, Error> {
        let conn = self.connection.lock().await;
        conn.send_request(request).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("next_request_id", &self.next_request_id.load(Ordering::SeqCst))
            .finish()
    }
}
