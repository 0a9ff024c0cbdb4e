//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::service::GuardService;
use crate::error::{GuardError, Result};

/// HTTP server for the guard service.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The guard service instance
    service: Arc<GuardService>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, service: Arc<GuardService>) -> Self {
        Self { addr, service }
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind HTTP listener");
            GuardError::Io(e)
        })?;

        info!(
            addr = %self.addr,
            "Starting HTTP server for guard service"
        );

        axum::serve(listener, self.service.router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                GuardError::Io(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{PolicyTable, RateLimiter};

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8787".parse().unwrap();
        let service = Arc::new(GuardService::new(
            Arc::new(RateLimiter::new()),
            PolicyTable::default(),
        ));
        let _server = HttpServer::new(addr, service);
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let service = Arc::new(GuardService::new(
            Arc::new(RateLimiter::new()),
            PolicyTable::default(),
        ));

        let result = HttpServer::new(addr, service)
            .serve_with_shutdown(async {})
            .await;
        assert!(result.is_ok());
    }
}
