//! Port forwarding example: listen locally and tunnel every accepted
//! connection to a target through an SSH session.
//!
//! # Prerequisites
//!
//! - SSH server that permits TCP forwarding
//! - Valid credentials (password in the URI, or an SSH key)
//!
//! # Usage
//!
//! With password authentication:
//! ```bash
//! cargo run --example ssh_proxy -- --uri admin:secret@bastion:22 --target db.internal:5432 --insecure
//! ```
//!
//! With SSH key authentication and a pinned host key:
//! ```bash
//! cargo run --example ssh_proxy -- --uri admin@bastion --key ~/.ssh/id_ed25519 \
//!     --fingerprint SHA256:... --target db.internal:5432
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use sshdial::{Dialer, HostKeyPolicy, SshConfig, SshDialer};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let policy = match (&args.fingerprint, args.insecure) {
        (Some(fp), _) => HostKeyPolicy::pinned(fp),
        (None, true) => HostKeyPolicy::AcceptAny,
        (None, false) => {
            eprintln!("Error: Must provide either --fingerprint or --insecure");
            std::process::exit(1);
        }
    };

    let mut config = SshConfig::from_uri(&args.uri, args.key.as_deref().unwrap_or(""), policy)?;
    config.connect_timeout = Some(Duration::from_secs(args.timeout));
    config.keepalive_interval = Some(Duration::from_secs(30));

    println!("Connecting to {}...", config.socket_addr());
    let dialer = Arc::new(SshDialer::connect(config).await?);
    println!("Connected!");

    let listener = TcpListener::bind(&args.listen).await?;
    println!(
        "Forwarding {} -> {} via {}",
        listener.local_addr()?,
        args.target,
        dialer.remote_addr()
    );

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (mut local, peer) = accepted?;
                let dialer = dialer.clone();
                let target = args.target.clone();
                tokio::spawn(async move {
                    let mut remote = match dialer.dial(&target).await {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!("{}: {}", peer, e);
                            return;
                        }
                    };
                    match tokio::io::copy_bidirectional(&mut local, &mut remote).await {
                        Ok((up, down)) => info!("{}: closed ({} bytes up, {} bytes down)", peer, up, down),
                        Err(e) => warn!("{}: {}", peer, e),
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\nClosing connection...");
    dialer.close().await?;
    println!("Done!");

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    uri: String,
    key: Option<String>,
    target: String,
    listen: String,
    fingerprint: Option<String>,
    insecure: bool,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut uri = String::new();
        let mut key = None;
        let mut target = String::new();
        let mut listen = "127.0.0.1:0".to_string();
        let mut fingerprint = None;
        let mut insecure = false;
        let mut timeout = 30u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--uri" => {
                    i += 1;
                    if i < args.len() {
                        uri = args[i].clone();
                    }
                }
                "--key" | "-k" => {
                    i += 1;
                    if i < args.len() {
                        key = Some(args[i].clone());
                    }
                }
                "--target" => {
                    i += 1;
                    if i < args.len() {
                        target = args[i].clone();
                    }
                }
                "--listen" | "-l" => {
                    i += 1;
                    if i < args.len() {
                        listen = args[i].clone();
                    }
                }
                "--fingerprint" => {
                    i += 1;
                    if i < args.len() {
                        fingerprint = Some(args[i].clone());
                    }
                }
                "--insecure" => insecure = true,
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(30);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        if uri.is_empty() || target.is_empty() {
            Self::print_help();
            std::process::exit(1);
        }

        Self {
            uri,
            key,
            target,
            listen,
            fingerprint,
            insecure,
            timeout,
        }
    }

    fn print_help() {
        println!(
            r#"sshdial ssh_proxy example

USAGE:
    cargo run --example ssh_proxy -- --uri <URI> --target <HOST:PORT> [OPTIONS]

OPTIONS:
    --uri <URI>              ssh://[user[:pass]@]host[:port] (user defaults to root, port to 22)
    --target <HOST:PORT>     Address to reach through the tunnel
    -k, --key <PATH>         Path to SSH private key (URI password becomes its passphrase)
    -l, --listen <ADDR>      Local listen address [default: 127.0.0.1:0]
    --fingerprint <FP>       Pin the server host key (SHA256:...)
    --insecure               Accept any host key
    -t, --timeout <SECS>     Connection timeout [default: 30]
    --help                   Print this help message
"#
        );
    }
}
