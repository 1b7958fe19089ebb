//! Tests against a real SSH server.
//!
//! Ignored by default. To run them, point the environment at a server that
//! allows TCP forwarding, permits at least 50 open channels per session, and
//! can reach an echo service. Missing variables fail the tests:
//!
//! ```bash
//! SSHDIAL_TEST_URI='tester:secret@127.0.0.1:2222' \
//! SSHDIAL_TEST_ECHO='127.0.0.1:7' \
//! SSHDIAL_TEST_KEY_URI='tester@127.0.0.1:2222' \
//! SSHDIAL_TEST_KEY="$PWD/tests/fixtures/id_ed25519_encrypted" \
//! SSHDIAL_TEST_KEY_PASS='hunter2' \
//! cargo test --test live_ssh -- --ignored
//! ```

use std::env;
use std::sync::Arc;

use secrecy::SecretString;
use sshdial::{
    AuthMethod, ConnectionError, ContextDialer, Dialer, Error, HostKeyPolicy, SshConfig,
    SshDialer, Strategy,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

struct Live {
    uri: String,
    echo: String,
}

fn required(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{} must be set to run the live SSH tests", name))
}

fn live() -> Live {
    let _ = env_logger::builder().is_test(true).try_init();
    Live {
        uri: required("SSHDIAL_TEST_URI"),
        echo: required("SSHDIAL_TEST_ECHO"),
    }
}

async fn echo(conn: &mut sshdial::Connection, payload: &[u8]) -> Vec<u8> {
    conn.write_all(payload).await.unwrap();
    let mut buf = vec![0u8; payload.len()];
    conn.read_exact(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
#[ignore]
async fn test_password_dial_round_trip() {
    let live = live();

    let dialer = SshDialer::from_uri(&live.uri, "", HostKeyPolicy::AcceptAny)
        .await
        .unwrap();
    let mut conn = dialer.dial(&live.echo).await.unwrap();
    assert_eq!(echo(&mut conn, b"through the tunnel").await, b"through the tunnel");

    dialer.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_wrong_password_yields_no_dialer() {
    let live = live();

    let mut config = SshConfig::from_uri(&live.uri, "", HostKeyPolicy::AcceptAny).unwrap();
    config.auth = AuthMethod::Password(SecretString::from("definitely-wrong".to_string()));

    let err = SshDialer::connect(config).await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Connection(ConnectionError::AuthenticationFailed { .. })
        ),
        "got {:?}",
        err
    );
}

#[tokio::test]
#[ignore]
async fn test_concurrent_dials_share_session() {
    let live = live();

    let dialer = Arc::new(
        SshDialer::from_uri(&live.uri, "", HostKeyPolicy::AcceptAny)
            .await
            .unwrap(),
    );

    let mut set = JoinSet::new();
    for i in 0..50u32 {
        let dialer = dialer.clone();
        let target = live.echo.clone();
        set.spawn(async move {
            let mut conn = dialer.dial(&target).await.unwrap();
            let payload = format!("conn-{i}").into_bytes();
            echo(&mut conn, &payload).await == payload
        });
    }

    let mut matched = 0;
    while let Some(result) = set.join_next().await {
        assert!(result.unwrap(), "payload crossed connections");
        matched += 1;
    }
    assert_eq!(matched, 50);

    dialer.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_dial_context_cancellation() {
    let live = live();

    let dialer = SshDialer::from_uri(&live.uri, "", HostKeyPolicy::AcceptAny)
        .await
        .unwrap();

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = dialer
        .dial_context(&cancelled, &live.echo)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::Cancelled { .. }), "got {:?}", err);

    // The session is unaffected by an abandoned dial
    let mut conn = dialer
        .dial_context(&CancellationToken::new(), &live.echo)
        .await
        .unwrap();
    assert_eq!(echo(&mut conn, b"still here").await, b"still here");

    dialer.close().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_dial_after_close_fails_fast() {
    let live = live();

    let strategy = Strategy::from(
        SshDialer::from_uri(&live.uri, "", HostKeyPolicy::AcceptAny)
            .await
            .unwrap(),
    );
    strategy.close().await.unwrap();
    strategy.close().await.unwrap();

    let err = strategy.dial(&live.echo).await.err().unwrap();
    assert!(matches!(err, Error::SessionClosed), "got {:?}", err);
}

#[tokio::test]
#[ignore]
async fn test_encrypted_key_authentication() {
    let live = live();
    let uri = required("SSHDIAL_TEST_KEY_URI");
    let key = required("SSHDIAL_TEST_KEY");
    let pass = required("SSHDIAL_TEST_KEY_PASS");

    let mut config = SshConfig::from_uri(&uri, &key, HostKeyPolicy::AcceptAny).unwrap();
    config.auth = AuthMethod::PrivateKey {
        path: key.clone().into(),
        passphrase: Some(SecretString::from(pass)),
    };
    let dialer = SshDialer::connect(config.clone()).await.unwrap();
    let mut conn = dialer.dial(&live.echo).await.unwrap();
    assert_eq!(echo(&mut conn, b"keyed").await, b"keyed");
    dialer.close().await.unwrap();

    config.auth = AuthMethod::PrivateKey {
        path: key.into(),
        passphrase: Some(SecretString::from("wrong-passphrase".to_string())),
    };
    let err = SshDialer::connect(config).await.unwrap_err();
    assert!(matches!(err, Error::KeyParse { .. }), "got {:?}", err);
}
