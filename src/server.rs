use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use crate::codec::ProtocolError;
use crate::commands::executable::Executable;
use crate::commands::Command;
use crate::config::Config;
use crate::connection::Connection;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Binds the configured address and serves clients until the process receives Ctrl-C.
pub async fn run(config: Config) -> Result<(), Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind((config.bind.as_str(), config.port)).await?;

    serve(listener, config, shutdown_signal()).await
}

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// Every connection runs on its own task against a store shared by all of them. On shutdown the
/// accept loop stops, open connections are cancelled and awaited.
pub async fn serve(
    listener: TcpListener,
    config: Config,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Error> {
    let store = Store::with_shards(config.shards);
    let config = Arc::new(config);
    let token = CancellationToken::new();
    let mut connections = JoinSet::new();

    info!("Kache server listening on {}", listener.local_addr()?);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, client_address) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                info!("Accepted connection from {}", client_address);

                let store = store.clone();
                let config = config.clone();
                let token = token.clone();

                connections.spawn(async move {
                    tokio::select! {
                        res = handle_connection(socket, client_address, store, config) => {
                            if let Err(e) = res {
                                error!("Connection from {} failed: {}", client_address, e);
                            }
                        }
                        _ = token.cancelled() => {
                            debug!("Connection from {} cancelled by shutdown", client_address);
                        }
                    }
                });
            }
            // Reap finished connections so the set only holds live ones.
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = &mut shutdown => break,
        }
    }

    info!("Shutting down, closing {} connection(s)", connections.len());
    token.cancel();
    while connections.join_next().await.is_some() {}
    info!("Server stopped with {} key(s) in store", store.len());

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[instrument(
    name = "connection",
    skip(stream, store, config),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    store: Store,
    config: Arc<Config>,
) -> Result<(), Error> {
    let mut conn = Connection::new(stream, &config);

    tracing::Span::current()
        .record("connection_id", conn.id.to_string())
        .record("client_address", client_address.to_string());

    loop {
        let request = match conn.read_request().await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(ProtocolError::Io(e)) => return Err(e.into()),
            Err(e) => {
                warn!("Closing connection after protocol error: {}", e);
                let reply = Frame::Error(format!("ERR Protocol error: {}", e));
                if let Err(e) = conn.write_frame(reply).await {
                    debug!("Failed to report protocol error: {}", e);
                }
                return Ok(());
            }
        };
        debug!("Received request from client: {}", request);

        let res = match Command::try_from(request) {
            Ok(cmd) => cmd.exec(&store),
            Err(e) => {
                debug!("Rejected command: {}", e);
                Frame::from(e)
            }
        };
        debug!("Sending response to client: {}", res);

        conn.write_frame(res).await?;
    }

    info!("Connection closed");
    Ok(())
}
