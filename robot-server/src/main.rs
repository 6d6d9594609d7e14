use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use robot_protocol::{drive_session, SessionConfig};

/// Concurrent TCP server that authenticates and navigates remote robot
/// clients to the origin.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 7777)]
    port: u16,

    /// Read timeout, in seconds, applied outside of a recharge episode.
    #[arg(long, default_value_t = 1)]
    default_timeout_secs: u64,

    /// Read timeout, in seconds, applied while a client is recharging.
    #[arg(long, default_value_t = 5)]
    recharge_timeout_secs: u64,

    /// Increase log verbosity; repeat for more (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(verbosity_directive(args.verbose).into())
                    .from_env()
                    .expect("invalid RUST_LOG"),
            )
            .finish(),
    )
    .expect("failed to install tracing subscriber");

    info!(?args, "starting robot navigation server");

    let listener = match TcpListener::bind((args.bind.as_str(), args.port)) {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, bind = %args.bind, port = args.port, "failed to bind listening socket");
            std::process::exit(1);
        }
    };

    let config = SessionConfig {
        default_timeout: Duration::from_secs(args.default_timeout_secs),
        recharge_timeout: Duration::from_secs(args.recharge_timeout_secs),
    };

    for incoming in listener.incoming() {
        let mut stream = match incoming {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };
        let peer = stream.peer_addr().ok();
        info!(?peer, "accepted connection");

        thread::spawn(move || {
            drive_session(&mut stream, config);
            info!(?peer, "connection closed");
        });
    }
}

fn verbosity_directive(verbose: u8) -> tracing::metadata::LevelFilter {
    match verbose {
        0 => tracing::metadata::LevelFilter::INFO,
        1 => tracing::metadata::LevelFilter::DEBUG,
        _ => tracing::metadata::LevelFilter::TRACE,
    }
}
