//! Plain TCP dialing.

use std::time::Duration;

use log::trace;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::{Connection, ContextDialer, Dialer, cancellable};
use crate::error::{DialError, Error, Result};
use crate::transport::addr;

/// Dialer that connects straight to the target over TCP.
#[derive(Debug, Clone, Default)]
pub struct DirectDialer {
    connect_timeout: Option<Duration>,
}

impl DirectDialer {
    /// Create a direct dialer with no connect timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each connect attempt.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    async fn connect(&self, target: &str) -> Result<Connection> {
        if addr::parse_target(target).is_none() {
            return Err(Error::dial(target, DialError::InvalidAddress));
        }
        trace!("Dialing {} directly", target);

        let connect = TcpStream::connect(target);
        let stream = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| Error::dial(target, DialError::Timeout(timeout)))?,
            None => connect.await,
        }
        .map_err(|e| Error::dial(target, e))?;

        Ok(Box::new(stream))
    }
}

impl Dialer for DirectDialer {
    async fn dial(&self, addr: &str) -> Result<Connection> {
        self.connect(addr).await
    }
}

impl ContextDialer for DirectDialer {
    async fn dial_context(&self, cancel: &CancellationToken, addr: &str) -> Result<Connection> {
        cancellable(cancel, addr, self.connect(addr)).await
    }
}
