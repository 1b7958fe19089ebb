//! SSH dialer implementation using russh.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, trace, warn};
use russh::client::{self, Handle};
use russh::keys::PublicKey;
use tokio_util::sync::CancellationToken;

use super::addr;
use super::auth::{self, Credential};
use super::config::{HostKeyPolicy, SshConfig};
use crate::dialer::{Connection, ContextDialer, Dialer, cancellable};
use crate::error::{ConnectionError, DialError, Error, Result};

/// Originator reported to the server for forwarded connections.
const ORIGINATOR_ADDR: &str = "127.0.0.1";
const ORIGINATOR_PORT: u32 = 0;

/// Dialer that tunnels TCP connections through one authenticated SSH
/// session.
///
/// Every [`dial`](Dialer::dial) opens a `direct-tcpip` channel on the shared
/// session; the server makes the onward connection. The dialer is safe to
/// share between tasks (wrap it in an `Arc`).
pub struct SshDialer {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Configuration used for this connection.
    config: SshConfig,

    /// Set once `close()` has been called.
    closed: AtomicBool,
}

impl SshDialer {
    /// Parse `uri` (`[ssh://][user[:pass]@]host[:port]`) and connect.
    ///
    /// See [`SshConfig::from_uri`] for the parsing rules.
    pub async fn from_uri(
        uri: &str,
        keyfile: impl AsRef<Path>,
        host_key_policy: HostKeyPolicy,
    ) -> Result<Self> {
        Self::connect(SshConfig::from_uri(uri, keyfile, host_key_policy)?).await
    }

    /// Validate the given parameters and connect.
    ///
    /// See [`SshConfig::from_params`] for the validation rules.
    pub async fn from_params(
        user: &str,
        addr: &str,
        keyfile: impl AsRef<Path>,
        pass: &str,
        host_key_policy: HostKeyPolicy,
    ) -> Result<Self> {
        Self::connect(SshConfig::from_params(
            user,
            addr,
            keyfile,
            pass,
            host_key_policy,
        )?)
        .await
    }

    /// Connect to the SSH server and authenticate.
    ///
    /// The key file, if any, is read before the network is touched. The
    /// dialer is only returned once authentication has succeeded.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let credential = Credential::load(&config.auth).await?;

        let session = match config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, Self::establish(&config, credential))
                .await
                .map_err(|_| ConnectionError::Timeout {
                    addr: config.socket_addr(),
                    timeout,
                })??,
            None => Self::establish(&config, credential).await?,
        };

        debug!(
            "SSH session to {} established as '{}'",
            config.socket_addr(),
            config.username
        );

        Ok(Self {
            session,
            config,
            closed: AtomicBool::new(false),
        })
    }

    async fn establish(config: &SshConfig, credential: Credential) -> Result<Handle<SshHandler>> {
        let addr = config.socket_addr();
        let ssh_config = Arc::new(client::Config {
            keepalive_interval: config.keepalive_interval,
            inactivity_timeout: config.inactivity_timeout,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<ConnectionError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            addr: addr.clone(),
            host_key_policy: config.host_key_policy.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("Connecting to {}", addr);
        let mut session = client::connect(ssh_config, addr.as_str(), handler)
            .await
            .map_err(|source| {
                // Prefer the detailed host key error over russh's generic one
                let rejected = host_key_error.lock().ok().and_then(|mut slot| slot.take());
                rejected.unwrap_or(ConnectionError::Handshake {
                    addr: addr.clone(),
                    source,
                })
            })?;

        auth::authenticate(&mut session, &config.username, credential).await?;

        Ok(session)
    }

    /// Configuration used for this connection.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Address of the SSH server, always with a port.
    pub fn remote_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Whether the dialer has been closed or its session has ended.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.session.is_closed()
    }

    /// Disconnect the SSH session.
    ///
    /// Later dials fail with [`Error::SessionClosed`]. Connections already
    /// handed out are torn down with the session. Calling `close` again is
    /// a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if self.session.is_closed() {
            return Ok(());
        }

        debug!("Closing SSH session to {}", self.config.socket_addr());
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(ConnectionError::Ssh)?;
        Ok(())
    }

    /// Open a `direct-tcpip` channel to `target`.
    async fn open_channel(&self, target: &str) -> Result<Connection> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }

        let (host, port) = addr::parse_target(target)
            .ok_or_else(|| Error::dial(target, DialError::InvalidAddress))?;

        trace!(
            "Opening channel to {} via {}",
            target,
            self.config.socket_addr()
        );

        let channel = self
            .session
            .channel_open_direct_tcpip(host, u32::from(port), ORIGINATOR_ADDR, ORIGINATOR_PORT)
            .await
            .map_err(|e| {
                if self.is_closed() {
                    Error::SessionClosed
                } else {
                    Error::dial(target, e)
                }
            })?;

        Ok(Box::new(channel.into_stream()))
    }
}

impl Dialer for SshDialer {
    async fn dial(&self, addr: &str) -> Result<Connection> {
        self.open_channel(addr).await
    }
}

impl ContextDialer for SshDialer {
    /// Abandons the pending channel open when `cancel` fires. A channel the
    /// server confirms afterwards is dropped unused.
    async fn dial_context(&self, cancel: &CancellationToken, addr: &str) -> Result<Connection> {
        cancellable(cancel, addr, self.open_channel(addr)).await
    }
}

impl fmt::Debug for SshDialer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshDialer")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for SshDialer {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            warn!(
                "SSH dialer for {} dropped without close()",
                self.config.socket_addr()
            );
        }
    }
}

/// SSH client handler for russh.
struct SshHandler {
    addr: String,
    host_key_policy: HostKeyPolicy,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<ConnectionError>>>,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_policy.verify(&self.addr, server_public_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("{}", e);
                if let Ok(mut slot) = self.host_key_error.lock() {
                    *slot = Some(e);
                }
                Ok(false)
            }
        }
    }
}
