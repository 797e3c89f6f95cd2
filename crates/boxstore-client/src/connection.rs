//! A single REQ socket to a BoxStore server.

use std::time::Duration;

use async_nng::AsyncContext;
use nng::options::{Options, RecvMaxSize, RecvTimeout, SendTimeout};
use nng::{Message, Protocol, Socket};

use boxstore_proto::framing::{decode_response, encode_request, frame_limit};
use boxstore_proto::{Request, Response};

use crate::config::ClientConfig;
use crate::error::Error;

/// Whether a [`Connection`] still accepts requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Closed,
}

/// A connection to a BoxStore server over an NNG REQ socket.
///
/// The first dial is synchronous; after that nng reconnects on its own.
pub struct Connection {
    socket: Socket,
    state: ConnectionState,
    config: ClientConfig,
}

impl Connection {
    /// Open a REQ socket and dial `config.address`.
    pub async fn establish(config: ClientConfig) -> Result<Self, Error> {
        let socket = open_socket(&config)?;
        socket
            .dial(&config.address)
            .map_err(|e| Error::Connection(format!("dial {}: {}", config.address, e)))?;

        Ok(Self {
            socket,
            state: ConnectionState::Connected,
            config,
        })
    }

    /// Send `request` and wait for the matching response.
    pub async fn send_request(&self, request: &Request) -> Result<Response, Error> {
        if let ConnectionState::Closed = self.state {
            return Err(Error::Connection(format!(
                "connection to {} is closed",
                self.config.address
            )));
        }

        let frame = encode_request(request)?;
        let limit = frame_limit(self.config.max_message_size);
        if frame.len() > limit {
            return Err(protocol_error(format!(
                "request {} is {} bytes, limit is {}",
                request.id,
                frame.len(),
                limit
            )));
        }

        let reply = self.exchange(Message::from(frame.as_slice())).await?;
        let response = decode_response(reply.as_slice())?;

        match response.id {
            id if id == request.id => Ok(response),
            id => Err(protocol_error(format!(
                "answer to request {} carried id {}",
                request.id, id
            ))),
        }
    }

    /// One send/receive round trip on a fresh context.
    async fn exchange(&self, message: Message) -> Result<Message, Error> {
        let timeout = Some(self.config.timeout);
        let mut ctx = AsyncContext::try_from(&self.socket)
            .map_err(|e| nng_error("open context", e))?;

        ctx.send(message, timeout)
            .await
            .map_err(|(_, e)| nng_error("send", e))?;
        ctx.receive(timeout)
            .await
            .map_err(|e| nng_error("receive", e))
    }

    /// Stop accepting requests. The socket closes when the connection drops.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.config.address)
            .field("state", &self.state)
            .finish()
    }
}

fn open_socket(config: &ClientConfig) -> Result<Socket, Error> {
    let socket = Socket::new(Protocol::Req0).map_err(|e| nng_error("create socket", e))?;
    let timeout: Option<Duration> = Some(config.timeout);

    socket
        .set_opt::<RecvMaxSize>(frame_limit(config.max_message_size))
        .map_err(|e| nng_error("set receive limit", e))?;
    socket
        .set_opt::<SendTimeout>(timeout)
        .map_err(|e| nng_error("set send timeout", e))?;
    socket
        .set_opt::<RecvTimeout>(timeout)
        .map_err(|e| nng_error("set receive timeout", e))?;

    Ok(socket)
}

fn nng_error(action: &str, e: nng::Error) -> Error {
    match e {
        nng::Error::TimedOut => Error::Timeout,
        other => Error::Connection(format!("{action}: {other}")),
    }
}

fn protocol_error(message: String) -> Error {
    Error::Protocol(boxstore_proto::Error::InvalidMessage(message))
}
