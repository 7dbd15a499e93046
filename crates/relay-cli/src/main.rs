//! Broker process entry point: binds a TCP listener, wires up the queue
//! dispatcher, and runs the reactor loop until interrupted.

use std::{
    net::Ipv6Addr,
    sync::{Arc, atomic::AtomicBool},
    time::Duration,
};

use clap::Parser;
use relay_broker::{Broker, default_dispatcher};
use relay_net::{Ipv6Address, TcpConnectionManager};
use signal_hook::consts::{SIGINT, SIGQUIT, SIGTERM};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// How long a single reactor tick blocks in `get_activity` before
/// re-checking the shutdown flag.
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "relay-broker")]
#[command(about = "In-process queue message broker")]
#[command(version)]
struct Args {
    /// IPv6 address to listen on.
    #[arg(long, default_value = "::1")]
    listen_address: Ipv6Addr,

    /// Port to listen on.
    #[arg(long, default_value_t = 7878)]
    port: u16,

    /// Log level (trace, debug, info, warn, error). Overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGTERM, Arc::clone(&stop))?;
    signal_hook::flag::register(SIGINT, Arc::clone(&stop))?;
    signal_hook::flag::register(SIGQUIT, Arc::clone(&stop))?;

    let manager = TcpConnectionManager::bind(Ipv6Address::from(args.listen_address), args.port)?;
    let (dispatcher, registry) = default_dispatcher();
    let mut broker = Broker::new(manager, Arc::new(dispatcher));

    tracing::info!(address = %args.listen_address, port = args.port, "relay-broker starting");
    broker.run_until(&stop, POLL_TIMEOUT)?;

    // Unblocks any pull workers still parked on a queue now that the
    // manager (dropped along with `broker`, right after this call
    // returns) has nothing left to write their reply to.
    registry.shutdown();

    Ok(())
}
