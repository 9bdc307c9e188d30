//! Accept loop for a single Primer server.

use super::router::route_request;
use crate::dispatcher::Dispatcher;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// An HTTP/1 server bound to one address and serving one [`Dispatcher`].
///
/// Servers share nothing but what they are given, so several can run in one
/// process on different ports.
pub struct PrimerServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
}

impl PrimerServer {
    /// Bind the listener. Port 0 picks an ephemeral port; see [`local_addr`](Self::local_addr).
    pub async fn bind(addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process exits.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` completes. Connections already accepted finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()>,
    {
        info!("Primer listening on http://{}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, remote)) => {
                            let dispatcher = Arc::clone(&self.dispatcher);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let dispatcher = Arc::clone(&dispatcher);
                                    async move { route_request(req, dispatcher).await }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!("Connection error from {}: {}", remote, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on {}: {}", self.local_addr, e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Primer on {} shutting down", self.local_addr);
                    break;
                }
            }
        }
        Ok(())
    }
}
