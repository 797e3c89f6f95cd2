//! BoxStore Server - record service host.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boxstore_server::{create_transport, open_boxes, Args, RequestHandler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; variables may come from the environment.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxstore_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = &dotenv {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        protocol_version = boxstore_proto::PROTOCOL_VERSION,
        "starting BoxStore server"
    );

    let args = Args::parse();
    let config = args.into_config();

    tracing::info!(
        data_path = %config.store.path.display(),
        tcp_address = ?config.tcp_address,
        ipc_address = ?config.ipc_address,
        workers = config.transport_workers,
        "configuration loaded"
    );

    // The service cannot start without its store.
    let boxes = match open_boxes(&config.store) {
        Ok(boxes) => boxes,
        Err(e) => {
            tracing::error!(error = %e, "failed to open store");
            return Err(e.into());
        }
    };

    let handler = Arc::new(RequestHandler::new(boxes.clone()));
    let transport = create_transport(&config, handler)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            // Holding the sender keeps the transport serving.
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    tracing::info!("server ready, accepting connections");
    let result = transport.run_until_shutdown(shutdown_rx).await;

    if let Err(e) = boxes.flush() {
        tracing::error!(error = %e, "failed to flush store");
    }

    match result {
        Ok(()) => {
            tracing::info!("server shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "server error");
            Err(e.into())
        }
    }
}
