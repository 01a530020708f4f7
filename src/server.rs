//! TCP listener and the per-connection request pipeline.
//!
//! The accept loop hands each connection to its own spawned task, which
//! runs read → decode → authorize → dispatch → respond exactly once and
//! closes. Connections share nothing but the immutable configuration, so
//! no locking is involved. Accept and per-connection failures are logged
//! and never take the listener down.

use std::net::Ipv4Addr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::auth;
use crate::config::Config;
use crate::dispatch;
use crate::transport::{self, decode_request, Response};

/// Bind the listener and serve connections until the process is killed.
///
/// The `shutdown` action ends only its own request's processing; there is
/// no client-triggered path that stops this loop.
pub async fn serve(config: Config) -> Result<()> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    info!(port = config.port, base_dir = %config.base_dir().display(), "server started");

    let config = Arc::new(config);
    loop {
        match listener.accept().await {
            Ok((mut stream, peer)) => {
                debug!(%peer, "accepted connection");
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(&mut stream, &config).await {
                        warn!(%peer, error = %format!("{e:#}"), "connection failed");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
            }
        }
    }
}

/// Run one request/response cycle on an accepted connection.
///
/// Generic over the stream so tests can drive it with an in-memory duplex.
pub async fn handle_connection<S>(stream: &mut S, config: &Config) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let raw = transport::recv_frame(stream)
        .await
        .context("failed to read request frame")?;

    match process_request(&raw, config).await {
        Some(response) => {
            let body = serde_json::to_vec(&response).context("failed to serialize response")?;
            transport::send_frame(stream, &body)
                .await
                .context("failed to write response frame")?;
        }
        // shutdown: close with nothing written back.
        None => debug!("closing connection without response"),
    }

    stream.shutdown().await.ok();
    Ok(())
}

/// Decode, authorize, and dispatch one raw request payload.
///
/// Every request-scoped failure is converted into a JSON error response
/// here; `None` means the connection should close silently.
pub async fn process_request(raw: &[u8], config: &Config) -> Option<Response> {
    let request = match decode_request(raw) {
        Ok(request) => request,
        Err(e) => return Some(Response::error(&e)),
    };

    if let Err(e) = auth::authorize(&config.secret_key, request.secretkey.as_deref()) {
        return Some(Response::error(&e));
    }

    match dispatch::dispatch(&request, config.base_dir()).await {
        Ok(reply) => reply,
        Err(e) => Some(Response::error(&e)),
    }
}
