//! NNG REP transport for the record service.
//!
//! A fixed pool of OS threads shares one REP socket. Each thread runs a
//! current-thread tokio runtime driving its own [`AsyncContext`], so blocking
//! store calls never land on the main runtime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use async_nng::AsyncContext;
use nng::options::{Options, RecvMaxSize};
use nng::{Message, Protocol, Socket};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use boxstore_proto::framing::{decode_request, encode_response, frame_limit};
use boxstore_proto::{error_codes, Response};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::handler::RequestHandler;

/// Longest a worker blocks in receive before it looks at the stop flag.
const STOP_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Request and byte counters shared by all workers.
#[derive(Debug)]
pub struct TransportMetrics {
    served: AtomicU64,
    ok: AtomicU64,
    failed: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    since: Instant,
}

/// Point-in-time copy of [`TransportMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    /// Answered with status OK.
    pub succeeded: u64,
    /// Answered with status ERROR, or not answered at all.
    pub failed: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub uptime: Duration,
}

impl TransportMetrics {
    pub fn new() -> Self {
        Self {
            served: AtomicU64::new(0),
            ok: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            since: Instant::now(),
        }
    }

    fn record(&self, ok: bool, bytes_in: usize, bytes_out: usize) {
        self.served.fetch_add(1, Ordering::Relaxed);
        let outcome = if ok { &self.ok } else { &self.failed };
        outcome.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(bytes_in as u64, Ordering::Relaxed);
        self.bytes_out.fetch_add(bytes_out as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.served.load(Ordering::Relaxed),
            succeeded: self.ok.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_received: self.bytes_in.load(Ordering::Relaxed),
            bytes_sent: self.bytes_out.load(Ordering::Relaxed),
            uptime: self.since.elapsed(),
        }
    }
}

impl Default for TransportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound REP socket plus the worker pool that serves it.
pub struct Transport {
    socket: Socket,
    worker: TransportWorker,
    metrics: Arc<TransportMetrics>,
    request_timeout: Duration,
    workers: usize,
}

impl Transport {
    /// Bind a REP socket to every configured address.
    pub fn new(config: &ServerConfig, handler: Arc<RequestHandler>) -> Result<Self, Error> {
        let socket = Socket::new(Protocol::Rep0)
            .map_err(|e| Error::Transport(format!("create REP socket: {}", e)))?;
        socket
            .set_opt::<RecvMaxSize>(frame_limit(config.max_message_size))
            .map_err(|e| Error::Transport(format!("set receive limit: {}", e)))?;

        let addresses = config.tcp_address.iter().chain(config.ipc_address.iter());
        for address in addresses {
            socket
                .listen(address)
                .map_err(|e| Error::Transport(format!("listen on {}: {}", address, e)))?;
            info!(%address, "listening");
        }

        Ok(Self {
            socket,
            worker: TransportWorker::new(handler, config.max_message_size),
            metrics: Arc::new(TransportMetrics::new()),
            request_timeout: config.request_timeout,
            workers: config.transport_workers.max(1),
        })
    }

    pub fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }

    /// Serve until `shutdown` fires, then stop and join every worker.
    ///
    /// A worker finishes the request it is handling before it exits. If every
    /// sender of `shutdown` is dropped the transport keeps serving; dropping
    /// the returned future stops the workers.
    pub async fn run_until_shutdown(
        &self,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<(), Error> {
        let stop = Arc::new(AtomicBool::new(false));
        let _guard = StopGuard(stop.clone());
        let mut threads = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            match self.spawn(worker_id, stop.clone()) {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    stop.store(true, Ordering::SeqCst);
                    join_all(threads).await;
                    return Err(e);
                }
            }
        }
        info!(workers = self.workers, "transport ready");

        if let Err(RecvError::Closed) = shutdown.recv().await {
            warn!("shutdown channel closed; serving until the process exits");
            std::future::pending::<()>().await;
        }
        info!("stopping transport");
        stop.store(true, Ordering::SeqCst);
        join_all(threads).await;

        let m = self.metrics.snapshot();
        info!(
            requests = m.requests,
            succeeded = m.succeeded,
            failed = m.failed,
            bytes_received = m.bytes_received,
            bytes_sent = m.bytes_sent,
            uptime_secs = m.uptime.as_secs(),
            "transport stopped"
        );
        Ok(())
    }

    fn spawn(&self, worker_id: usize, stop: Arc<AtomicBool>) -> Result<JoinHandle<()>, Error> {
        let socket = self.socket.clone();
        let worker = self.worker.clone();
        let metrics = self.metrics.clone();
        let request_timeout = self.request_timeout;

        thread::Builder::new()
            .name(format!("boxstore-worker-{worker_id}"))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!(worker_id, error = %e, "cannot start worker runtime");
                        return;
                    }
                };
                let context = WorkerContext {
                    worker_id,
                    metrics,
                    request_timeout,
                    stop,
                };
                runtime.block_on(worker.serve(&socket, context));
            })
            .map_err(|e| Error::Transport(format!("spawn worker {worker_id}: {e}")))
    }
}

/// Raises the stop flag when dropped.
struct StopGuard(Arc<AtomicBool>);

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

async fn join_all(threads: Vec<JoinHandle<()>>) {
    let joined = tokio::task::spawn_blocking(move || {
        for handle in threads {
            if handle.join().is_err() {
                error!("transport worker panicked");
            }
        }
    })
    .await;
    if let Err(e) = joined {
        error!(error = %e, "failed to join transport workers");
    }
}

/// Per-thread state of a running worker.
struct WorkerContext {
    worker_id: usize,
    metrics: Arc<TransportMetrics>,
    request_timeout: Duration,
    stop: Arc<AtomicBool>,
}

/// Turns request frames into response frames.
#[derive(Clone)]
struct TransportWorker {
    handler: Arc<RequestHandler>,
    max_message_size: usize,
}

impl TransportWorker {
    fn new(handler: Arc<RequestHandler>, max_message_size: usize) -> Self {
        Self {
            handler,
            max_message_size,
        }
    }

    async fn serve(self, socket: &Socket, cx: WorkerContext) {
        let worker_id = cx.worker_id;
        let mut ctx = match AsyncContext::try_from(socket) {
            Ok(ctx) => ctx,
            Err(e) => {
                error!(worker_id, error = %e, "cannot open async context");
                return;
            }
        };

        while !cx.stop.load(Ordering::SeqCst) {
            let request = match ctx.receive(Some(STOP_CHECK_INTERVAL)).await {
                Ok(request) => request,
                Err(nng::Error::TimedOut) => continue,
                Err(e) => {
                    error!(worker_id, error = %e, "receive failed");
                    continue;
                }
            };

            let started = Instant::now();
            let (reply, ok) = self.process_message_with_status(request.as_slice());
            let elapsed = started.elapsed();

            let reply_len = reply.len();
            match ctx.send(Message::from(reply.as_slice()), None).await {
                Ok(()) => cx.metrics.record(ok, request.len(), reply_len),
                Err((_, e)) => {
                    error!(worker_id, error = %e, "send failed");
                    cx.metrics.record(false, request.len(), 0);
                }
            }

            if elapsed > cx.request_timeout {
                warn!(
                    worker_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    timeout_ms = cx.request_timeout.as_millis() as u64,
                    "request exceeded timeout"
                );
            }
        }
        debug!(worker_id, "worker stopped");
    }

    /// Handle one frame. Returns the encoded response and whether its
    /// status is OK.
    fn process_message_with_status(&self, frame: &[u8]) -> (Vec<u8>, bool) {
        let response = self.decode_and_handle(frame).unwrap_or_else(|e| {
            warn!(error = %e, "rejecting undecodable request");
            // The request id is unknown when decoding fails.
            Response::error(0, error_codes::INVALID_REQUEST, e.to_string())
        });
        let ok = response.status.is_ok();

        match encode_response(&response) {
            Ok(bytes) => (bytes, ok),
            Err(e) => {
                error!(request_id = response.id, error = %e, "cannot encode response");
                let fallback = Response::error(response.id, error_codes::INTERNAL, e.to_string());
                (encode_response(&fallback).unwrap_or_default(), false)
            }
        }
    }

    fn decode_and_handle(&self, frame: &[u8]) -> Result<Response, Error> {
        let limit = frame_limit(self.max_message_size);
        if frame.len() > limit {
            return Err(Error::Protocol(boxstore_proto::Error::InvalidMessage(format!(
                "frame of {} bytes exceeds limit of {}",
                frame.len(),
                limit
            ))));
        }
        let request = decode_request(frame)?;
        Ok(self.handler.handle(&request))
    }
}

/// Create a transport that listens on the configured addresses.
pub fn create_transport(
    config: &ServerConfig,
    handler: Arc<RequestHandler>,
) -> Result<Transport, Error> {
    if !config.has_transport() {
        return Err(Error::Config(
            "no listen address: set a TCP or IPC address".to_string(),
        ));
    }
    Transport::new(config, handler)
}
