//! SSH dialer configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use russh::keys::PublicKey;
use russh::keys::ssh_key::HashAlg;
use secrecy::SecretString;
use url::Url;

use super::addr;
use crate::error::{ConnectionError, Error, Result};

/// Port used when an address does not name one.
pub const DEFAULT_PORT: u16 = 22;

/// Username used when a URI does not name one.
pub const DEFAULT_USER: &str = "root";

/// Callback deciding whether a server key is trusted.
pub type HostKeyCallback = Arc<dyn Fn(&PublicKey) -> bool + Send + Sync>;

/// How the server's host key is verified.
///
/// There is deliberately no default: callers must choose, and choosing
/// [`HostKeyPolicy::AcceptAny`] is an explicit opt-in to skipping
/// verification.
#[derive(Clone)]
pub enum HostKeyPolicy {
    /// Accept every host key. Insecure; for labs and tests.
    AcceptAny,

    /// Accept only a key whose SHA-256 fingerprint matches, in OpenSSH
    /// form (`SHA256:...`, as printed by `ssh-keygen -lf`).
    Pinned(String),

    /// Ask a caller-supplied function.
    Callback(HostKeyCallback),
}

impl HostKeyPolicy {
    /// Pin the given `SHA256:...` fingerprint.
    pub fn pinned(fingerprint: impl Into<String>) -> Self {
        Self::Pinned(fingerprint.into())
    }

    /// Verify with a caller-supplied function.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&PublicKey) -> bool + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Check `key`, presented by the server at `addr`, against this policy.
    pub(crate) fn verify(
        &self,
        addr: &str,
        key: &PublicKey,
    ) -> std::result::Result<(), ConnectionError> {
        match self {
            Self::AcceptAny => Ok(()),
            Self::Pinned(expected) => {
                let actual = fingerprint(key);
                let wanted = expected.trim().trim_start_matches("SHA256:");
                if actual.trim_start_matches("SHA256:") == wanted {
                    Ok(())
                } else {
                    Err(ConnectionError::HostKeyMismatch {
                        addr: addr.to_string(),
                        expected: expected.clone(),
                        actual,
                    })
                }
            }
            Self::Callback(cb) => {
                if cb(key) {
                    Ok(())
                } else {
                    Err(ConnectionError::HostKeyRejected {
                        addr: addr.to_string(),
                        fingerprint: fingerprint(key),
                    })
                }
            }
        }
    }
}

impl fmt::Debug for HostKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcceptAny => f.write_str("AcceptAny"),
            Self::Pinned(fp) => f.debug_tuple("Pinned").field(fp).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// OpenSSH-style SHA-256 fingerprint of a public key.
pub fn fingerprint(key: &PublicKey) -> String {
    key.fingerprint(HashAlg::Sha256).to_string()
}

/// Authentication method for the SSH session. Exactly one is used.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

impl AuthMethod {
    /// Whether this method authenticates with a key.
    pub fn is_key(&self) -> bool {
        matches!(self, Self::PrivateKey { .. })
    }
}

/// SSH dialer configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// SSH server host (hostname or IP address, no brackets).
    pub host: String,

    /// SSH server port.
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Host key verification policy.
    pub host_key_policy: HostKeyPolicy,

    /// Bound on TCP connect, handshake and authentication. `None` waits
    /// indefinitely.
    pub connect_timeout: Option<Duration>,

    /// Interval between SSH keepalives once connected.
    pub keepalive_interval: Option<Duration>,

    /// Close the session after this long without traffic.
    pub inactivity_timeout: Option<Duration>,
}

impl SshConfig {
    /// Parse a connection URI of the form `ssh://[user[:pass]@]host[:port]`.
    ///
    /// The `ssh://` prefix is optional. A missing user becomes `root` and a
    /// missing port becomes `22`. If `keyfile` is non-empty the password
    /// part of the URI is used as the key passphrase.
    pub fn from_uri(
        uri: &str,
        keyfile: impl AsRef<Path>,
        host_key_policy: HostKeyPolicy,
    ) -> Result<Self> {
        let parsed = if uri.starts_with("ssh:") {
            Url::parse(uri)?
        } else {
            Url::parse(&format!("ssh://{}", uri))?
        };

        let user = urlencoding::decode(parsed.username())
            .map_err(|_| Error::bad_parameter("user", parsed.username()))?;
        let pass = match parsed.password() {
            Some(p) => urlencoding::decode(p).map_err(|_| Error::bad_parameter("pass", ""))?,
            None => "".into(),
        };
        let host_addr = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        Self::from_params(&user, &host_addr, keyfile, &pass, host_key_policy)
    }

    /// Build a configuration from individual parameters.
    ///
    /// Fails with `BadParameter("addr")` when `addr` is empty or its port
    /// is unusable, and with `BadParameter("pass")` when neither a key file
    /// nor a password is supplied. A non-empty `keyfile` always selects key
    /// authentication; `pass` then becomes the key passphrase.
    pub fn from_params(
        user: &str,
        addr: &str,
        keyfile: impl AsRef<Path>,
        pass: &str,
        host_key_policy: HostKeyPolicy,
    ) -> Result<Self> {
        if addr.is_empty() {
            return Err(Error::bad_parameter("addr", addr));
        }
        let keyfile = keyfile.as_ref();
        if keyfile.as_os_str().is_empty() && pass.is_empty() {
            return Err(Error::bad_parameter("pass", pass));
        }

        let (host, port) = addr::with_default_port(addr, DEFAULT_PORT)
            .filter(|(host, _)| !host.is_empty())
            .ok_or_else(|| Error::bad_parameter("addr", addr))?;

        let username = if user.is_empty() { DEFAULT_USER } else { user };

        let auth = if keyfile.as_os_str().is_empty() {
            AuthMethod::Password(SecretString::from(pass.to_owned()))
        } else {
            AuthMethod::PrivateKey {
                path: keyfile.to_path_buf(),
                passphrase: (!pass.is_empty()).then(|| SecretString::from(pass.to_owned())),
            }
        };

        Ok(Self {
            host,
            port,
            username: username.to_string(),
            auth,
            host_key_policy,
            connect_timeout: None,
            keepalive_interval: None,
            inactivity_timeout: None,
        })
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        addr::join_host_port(&self.host, self.port)
    }
}
