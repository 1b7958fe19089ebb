//! Dialing capability.
//!
//! A dialer turns a destination address into an open, bidirectional byte
//! stream. Callers depend only on [`Dialer`] / [`ContextDialer`] and are
//! parameterized by a [`Strategy`] chosen at configuration time.

mod direct;
mod strategy;

pub use direct::DirectDialer;
pub use strategy::Strategy;

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Byte stream returned by a dial.
pub trait ConnectionIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ConnectionIo for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// An open connection, independent of the strategy that produced it.
pub type Connection = Box<dyn ConnectionIo>;

/// Open a connection to an address.
pub trait Dialer: Send + Sync {
    /// Connect to `addr` (`host:port`). The port must be numeric; service
    /// names such as `db.internal:postgresql` are rejected with
    /// [`DialError::InvalidAddress`](crate::DialError::InvalidAddress).
    ///
    /// The returned future resolves once the connection is ready or the
    /// attempt has failed.
    fn dial(&self, addr: &str) -> impl Future<Output = Result<Connection>> + Send;
}

/// A [`Dialer`] that can be interrupted.
pub trait ContextDialer: Dialer {
    /// Connect to `addr`, giving up with
    /// [`Error::Cancelled`](crate::Error::Cancelled) as soon as `cancel` is
    /// cancelled. An already-cancelled token fails without dialing.
    fn dial_context(
        &self,
        cancel: &CancellationToken,
        addr: &str,
    ) -> impl Future<Output = Result<Connection>> + Send;
}

/// Race `dial` against `cancel`, preferring cancellation when both are ready.
pub(crate) async fn cancellable<F>(cancel: &CancellationToken, addr: &str, dial: F) -> Result<Connection>
where
    F: Future<Output = Result<Connection>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled {
            addr: addr.to_string(),
        }),
        result = dial => result,
    }
}
