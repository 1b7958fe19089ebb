//! Closed set of dialing strategies.

use tokio_util::sync::CancellationToken;

use super::{Connection, ContextDialer, Dialer, DirectDialer};
use crate::error::Result;
use crate::transport::SshDialer;

/// A dialing strategy picked at configuration time.
///
/// Callers written against [`Dialer`] / [`ContextDialer`] work with any
/// variant.
#[derive(Debug)]
pub enum Strategy {
    /// Connect straight to the target.
    Direct(DirectDialer),

    /// Tunnel through an SSH session.
    Ssh(SshDialer),
}

impl Strategy {
    /// Short name of the strategy, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct(_) => "direct",
            Self::Ssh(_) => "ssh",
        }
    }

    /// Release resources held by the strategy.
    pub async fn close(&self) -> Result<()> {
        match self {
            Self::Direct(_) => Ok(()),
            Self::Ssh(ssh) => ssh.close().await,
        }
    }
}

impl From<DirectDialer> for Strategy {
    fn from(dialer: DirectDialer) -> Self {
        Self::Direct(dialer)
    }
}

impl From<SshDialer> for Strategy {
    fn from(dialer: SshDialer) -> Self {
        Self::Ssh(dialer)
    }
}

impl Dialer for Strategy {
    async fn dial(&self, addr: &str) -> Result<Connection> {
        match self {
            Self::Direct(direct) => direct.dial(addr).await,
            Self::Ssh(ssh) => ssh.dial(addr).await,
        }
    }
}

impl ContextDialer for Strategy {
    async fn dial_context(&self, cancel: &CancellationToken, addr: &str) -> Result<Connection> {
        match self {
            Self::Direct(direct) => direct.dial_context(cancel, addr).await,
            Self::Ssh(ssh) => ssh.dial_context(cancel, addr).await,
        }
    }
}
