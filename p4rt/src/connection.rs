//! Connection lifecycle.
//!
//! A [`Connection`] owns the service handle and the outermost cancellation
//! scope of a session. The stream channel derives its own scope from it, so
//! cancelling the connection always cancels the stream as well.

use {
    crate::{
        config::{P4rtConfig, Target},
        error::{P4rtError, Result},
        service::{GrpcP4RuntimeService, P4RuntimeService},
    },
    log::{debug, info},
    std::sync::Arc,
    tokio_util::sync::CancellationToken,
    tonic::transport::Endpoint,
};

pub struct Connection {
    service: Arc<dyn P4RuntimeService>,
    cancel: CancellationToken,
}

impl Connection {
    /// Connect to `target`.
    ///
    /// Fails with [`P4rtError::Connect`] when the transport cannot be
    /// established; the caller must not go on to open a stream.
    pub async fn connect(target: &Target, config: &P4rtConfig) -> Result<Self> {
        let uri = target.uri();
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| P4rtError::InvalidTarget {
                address: target.address.clone(),
                reason: e.to_string(),
            })?
            .connect_timeout(config.connect_timeout());

        debug!("connecting to P4Runtime server at {}", uri);
        let channel = endpoint
            .connect()
            .await
            .map_err(|source| P4rtError::Connect {
                address: target.address.clone(),
                source,
            })?;
        info!("connected to P4Runtime server at {}", uri);

        Ok(Self::with_service(Arc::new(GrpcP4RuntimeService::new(channel))))
    }

    /// Wrap an already established service.
    pub fn with_service(service: Arc<dyn P4RuntimeService>) -> Self {
        Self {
            service,
            cancel: CancellationToken::new(),
        }
    }

    pub fn service(&self) -> &Arc<dyn P4RuntimeService> {
        &self.service
    }

    /// The connection scope. Child scopes end when it is cancelled.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the connection scope.
    ///
    /// Close the stream channel first: this does not half-close it, and
    /// in-flight sends on a stream cut off this way fail ungracefully.
    pub fn tear_down(&self) {
        debug!("tearing down P4Runtime connection");
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches};

    #[tokio::test]
    async fn test_invalid_target_rejected() {
        let target = Target::new("not a uri");
        let result = Connection::connect(&target, &P4rtConfig::dev_default()).await;
        assert_matches!(result.err(), Some(P4rtError::InvalidTarget { .. }));
    }

    #[tokio::test]
    async fn test_connect_refused_is_setup_error() {
        // Bind then drop a listener to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = Target::new(format!("127.0.0.1:{port}"));
        let result = Connection::connect(&target, &P4rtConfig::dev_default()).await;
        assert_matches!(result.err(), Some(P4rtError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_tear_down_cancels_child_scopes() {
        let connection = Connection::with_service(Arc::new(
            crate::loopback::LoopbackDevice::new(),
        ));
        let child = connection.cancel_token().child_token();
        assert!(!child.is_cancelled());
        connection.tear_down();
        assert!(connection.is_torn_down());
        assert!(child.is_cancelled());
    }
}
