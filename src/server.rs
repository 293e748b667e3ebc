//! HTTP server for the matrix API

use crate::error::Result;
use crate::handler::MatrixHandler;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Bound API server
pub struct MatrixServer {
    listener: TcpListener,
    handler: Arc<MatrixHandler>,
}

impl MatrixServer {
    /// Bind the server to `addr`
    ///
    /// Port 0 picks a free port; see [`MatrixServer::local_addr`].
    pub async fn bind(addr: SocketAddr, handler: Arc<MatrixHandler>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, handler })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections until the process is terminated
    pub async fn run(self) -> Result<()> {
        info!("Matrix API listening on http://{}", self.local_addr()?);

        loop {
            let (stream, peer_addr) = self.listener.accept().await?;
            let io = TokioIo::new(stream);
            let handler = Arc::clone(&self.handler);

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let handler = Arc::clone(&handler);
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Connection error from {}: {}", peer_addr, err);
                }
            });
        }
    }
}
