//! dlcpro CLI Client
//!
//! Command-line interface for querying, setting and monitoring controller
//! parameters.

use std::time::Duration;

use clap::{Parser, Subcommand};
use dlcpro::{CommandSession, Config, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// dlcpro CLI
#[derive(Parser, Debug)]
#[command(name = "dlcpro-cli")]
#[command(about = "CLI for DLC pro instrument controllers")]
#[command(version)]
struct Args {
    /// Controller host name or IP address
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Command interface port
    #[arg(short, long, default_value_t = dlcpro::config::DEFAULT_COMMAND_PORT)]
    port: u16,

    /// Monitoring interface port
    #[arg(long, default_value_t = dlcpro::config::DEFAULT_MONITOR_PORT)]
    monitor_port: u16,

    /// Connect and read timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a parameter
    Query {
        /// The parameter to read
        name: String,
    },

    /// Set a parameter
    Set {
        /// The parameter to set
        name: String,

        /// The value, in wire syntax (e.g. 1.5, #t, '"text"', '(1 2)')
        value: String,
    },

    /// Run a command
    Exec {
        /// The command to run
        name: String,

        /// Arguments, in wire syntax
        args: Vec<String>,
    },

    /// Print a parameter whenever it changes
    #[cfg(feature = "monitor")]
    Monitor {
        /// The parameter to monitor
        name: String,

        /// Polling interval in milliseconds
        #[arg(short, long, default_value = "500")]
        interval_ms: u64,

        /// Minimum change to report, in wire syntax
        #[arg(long)]
        threshold: Option<String>,

        /// Stop after this many samples
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,dlcpro=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> dlcpro::Result<()> {
    let config = Config::builder()
        .host(&args.host)
        .command_port(args.port)
        .monitor_port(args.monitor_port)
        .connect_timeout(Duration::from_millis(args.timeout_ms))
        .read_timeout_ms(args.timeout_ms)
        .build()?;

    match args.command {
        Commands::Query { name } => {
            let session = CommandSession::connect(&config)?;
            println!("{}", session.query(&name)?);
        }
        Commands::Set { name, value } => {
            let session = CommandSession::connect(&config)?;
            session.set(&name, parse_value(&value)?)?;
        }
        Commands::Exec { name, args } => {
            let args = args
                .iter()
                .map(|arg| parse_value(arg))
                .collect::<dlcpro::Result<Vec<_>>>()?;
            let session = CommandSession::connect(&config)?;
            if let Some(value) = session.exec(&name, &args)? {
                println!("{}", value);
            }
        }
        #[cfg(feature = "monitor")]
        Commands::Monitor {
            name,
            interval_ms,
            threshold,
            count,
        } => {
            let threshold = threshold.as_deref().map(parse_value).transpose()?;
            let monitor = dlcpro::MonitorSession::connect(&config)?;
            let subscription =
                monitor.begin_monitoring(&name, Duration::from_millis(interval_ms), threshold)?;

            for sample in subscription.stream().take(count.unwrap_or(usize::MAX)) {
                match sample {
                    Ok(value) => println!("{}", value),
                    Err(e) => tracing::warn!("{}", e),
                }
            }
            monitor.close();
        }
    }

    Ok(())
}

/// Command-line values use the wire syntax
fn parse_value(text: &str) -> dlcpro::Result<Value> {
    dlcpro::protocol::decode(text.as_bytes())
}
