//! Credential loading and session authentication.

use std::path::Path;
use std::sync::Arc;

use log::debug;
use russh::client::{Handle, Handler};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, decode_secret_key};
use secrecy::{ExposeSecret, SecretString};

use super::config::AuthMethod;
use crate::error::{ConnectionError, Error, Result};

/// Credential ready to present to the server.
pub(crate) enum Credential {
    Password(SecretString),
    Key(Arc<PrivateKey>),
}

impl Credential {
    /// Resolve an [`AuthMethod`], reading and decoding the key file if one
    /// is configured.
    pub(crate) async fn load(auth: &AuthMethod) -> Result<Self> {
        match auth {
            AuthMethod::Password(password) => Ok(Self::Password(password.clone())),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_private_key(path, passphrase.as_ref()).await?;
                Ok(Self::Key(Arc::new(key)))
            }
        }
    }
}

/// Read a private key file and decode it, decrypting with `passphrase` if
/// one is given.
pub(crate) async fn load_private_key(
    path: &Path,
    passphrase: Option<&SecretString>,
) -> Result<PrivateKey> {
    let data = tokio::fs::read(path).await.map_err(|source| Error::KeyFile {
        path: path.to_path_buf(),
        source,
    })?;

    let text = String::from_utf8_lossy(&data);
    decode_secret_key(&text, passphrase.map(|p| p.expose_secret())).map_err(|source| {
        Error::KeyParse {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Authenticate `session` as `user`.
pub(crate) async fn authenticate<H: Handler>(
    session: &mut Handle<H>,
    user: &str,
    credential: Credential,
) -> Result<()> {
    let success = match credential {
        Credential::Password(password) => {
            debug!("Authenticating as '{}' with password", user);
            session
                .authenticate_password(user, password.expose_secret())
                .await
                .map_err(ConnectionError::Ssh)?
                .success()
        }
        Credential::Key(key) => {
            debug!("Authenticating as '{}' with public key", user);

            // Get the best RSA hash algorithm supported by the server
            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .map_err(ConnectionError::Ssh)?
                .flatten();

            session
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(key, hash_alg))
                .await
                .map_err(ConnectionError::Ssh)?
                .success()
        }
    };

    if !success {
        return Err(ConnectionError::AuthenticationFailed {
            user: user.to_string(),
        }
        .into());
    }

    Ok(())
}
