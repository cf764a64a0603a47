//! hyper service wrapping the [`BeaconHandler`] for one connection.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::service::Service;

use crate::handler::{BeaconBody, BeaconHandler};

/// Per-connection service. Carries the peer address so the handler can
/// record it.
#[derive(Debug, Clone)]
pub struct BeaconService {
    handler: Arc<BeaconHandler>,
    remote_addr: SocketAddr,
}

impl BeaconService {
    /// Create a service for a connection from `remote_addr`.
    #[must_use]
    pub fn new(handler: Arc<BeaconHandler>, remote_addr: SocketAddr) -> Self {
        Self {
            handler,
            remote_addr,
        }
    }
}

impl Service<http::Request<Incoming>> for BeaconService {
    type Response = http::Response<BeaconBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let remote_addr = self.remote_addr;
        Box::pin(async move {
            // The beacon ignores request bodies.
            let (parts, _body) = req.into_parts();
            Ok(handler.handle(&parts, remote_addr).await)
        })
    }
}
