//! Builder for SSH dialers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::addr;
use super::config::{AuthMethod, DEFAULT_PORT, DEFAULT_USER, HostKeyPolicy, SshConfig};
use super::ssh::SshDialer;
use crate::error::{Error, Result};

/// Builder for constructing SSH dialers.
///
/// # Example
///
/// ```rust,no_run
/// use sshdial::{HostKeyPolicy, SshDialerBuilder};
///
/// # async fn example() -> Result<(), sshdial::Error> {
/// let dialer = SshDialerBuilder::new("bastion.example.com")
///     .username("deploy")
///     .private_key("/home/deploy/.ssh/id_ed25519")
///     .host_key_policy(HostKeyPolicy::pinned(
///         "SHA256:WB1rQesfCQunihZDEywCvRsPnNuYNkQTpnPN0otz58Y",
///     ))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SshDialerBuilder {
    host: String,
    port: Option<u16>,
    username: Option<String>,
    auth: Option<AuthMethod>,
    host_key_policy: Option<HostKeyPolicy>,
    connect_timeout: Option<Duration>,
    keepalive_interval: Option<Duration>,
    inactivity_timeout: Option<Duration>,
}

impl SshDialerBuilder {
    /// Create a new builder for the specified host (`host` or `host:port`).
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            auth: None,
            host_key_policy: None,
            connect_timeout: None,
            keepalive_interval: None,
            inactivity_timeout: None,
        }
    }

    /// Set the SSH port, overriding one given with the host.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the username (default: `root`).
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = Some(AuthMethod::Password(SecretString::from(password.into())));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = Some(AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        });
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = Some(AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        });
        self
    }

    /// Set how the server's host key is verified. Required.
    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = Some(policy);
        self
    }

    /// Bound connect, handshake and authentication.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Send SSH keepalives at this interval.
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = Some(interval);
        self
    }

    /// Close the session after this long without traffic.
    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = Some(timeout);
        self
    }

    /// Validate the settings into an [`SshConfig`].
    pub fn build(self) -> Result<SshConfig> {
        if self.host.is_empty() {
            return Err(Error::bad_parameter("addr", self.host));
        }
        let auth = self.auth.ok_or_else(|| Error::bad_parameter("pass", ""))?;
        let host_key_policy = self
            .host_key_policy
            .ok_or_else(|| Error::bad_parameter("host_key_policy", ""))?;

        let (host, port) = addr::with_default_port(&self.host, DEFAULT_PORT)
            .filter(|(host, _)| !host.is_empty())
            .ok_or_else(|| Error::bad_parameter("addr", self.host.as_str()))?;

        let username = self
            .username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string());

        Ok(SshConfig {
            host,
            port: self.port.unwrap_or(port),
            username,
            auth,
            host_key_policy,
            connect_timeout: self.connect_timeout,
            keepalive_interval: self.keepalive_interval,
            inactivity_timeout: self.inactivity_timeout,
        })
    }

    /// Build the configuration and connect.
    pub async fn connect(self) -> Result<SshDialer> {
        SshDialer::connect(self.build()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = SshDialerBuilder::new("10.1.2.3")
            .password("pw")
            .host_key_policy(HostKeyPolicy::AcceptAny)
            .build()
            .unwrap();

        assert_eq!(config.username, "root");
        assert_eq!(config.socket_addr(), "10.1.2.3:22");
        assert!(config.connect_timeout.is_none());
        assert!(!config.auth.is_key());
    }

    #[test]
    fn test_builder_port_override() {
        let config = SshDialerBuilder::new("10.1.2.3:2200")
            .port(2222)
            .username("ops")
            .private_key_with_passphrase("/keys/id_ed25519", "hunter2")
            .host_key_policy(HostKeyPolicy::AcceptAny)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.socket_addr(), "10.1.2.3:2222");
        assert_eq!(config.username, "ops");
        assert!(config.auth.is_key());
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_builder_requires_host_key_policy() {
        let err = SshDialerBuilder::new("10.1.2.3")
            .password("pw")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::BadParameter {
                name: "host_key_policy",
                ..
            }
        ));
    }

    #[test]
    fn test_builder_requires_credentials_and_host() {
        let err = SshDialerBuilder::new("10.1.2.3")
            .host_key_policy(HostKeyPolicy::AcceptAny)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::BadParameter { name: "pass", .. }));

        let err = SshDialerBuilder::new("")
            .password("pw")
            .host_key_policy(HostKeyPolicy::AcceptAny)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::BadParameter { name: "addr", .. }));
    }
}
