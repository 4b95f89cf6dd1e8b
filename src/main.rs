use anyhow::Result;
use clap::{Parser, Subcommand};
use netready::{
    install_signal_handlers, DockerProbe, NetreadyConfig, NetworkReadinessOrchestrator,
    ProbeClient, WaitOutcome,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const EXIT_READY: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_TIMED_OUT: i32 = 2;
const EXIT_STARTUP: i32 = 3;
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "netready")]
#[command(about = "Wait for a containerised blockchain network to become ready")]
#[command(version)]
#[command(long_about = "Blocks until the container engine answers, or until every node's \
client, privacy manager and signer containers have settled. Streams the logs of dead or \
unhealthy containers to stderr and reports the result through the exit code.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "netready.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level, the default)
    #[arg(short, long, help = "Enable verbose info level logging (default)")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without waiting")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Print the loaded configuration and exit
    #[arg(long, help = "Print the effective configuration, environment overrides included, and exit")]
    show_config: bool,

    /// Print the outcome as a JSON document on stdout
    #[arg(long, help = "Print the wait outcome as JSON on stdout")]
    summary_json: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Mode {
    /// Wait for the container engine to answer
    Dependency,
    /// Wait for every configured node to settle
    Network,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config();
        return;
    }

    if let Err(e) = init_logging(&args) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(EXIT_STARTUP);
    }

    let exit_code = match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            eprintln!("✗ {:#}", e);
            EXIT_STARTUP
        }
    };

    info!("netready exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

async fn run(args: &Args) -> Result<i32> {
    info!("Starting netready v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = NetreadyConfig::load_from_file(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
        }
        return Err(e.into());
    }

    if args.show_config {
        print!("{}", config.to_toml()?);
        return Ok(EXIT_READY);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(EXIT_READY);
    }

    let Some(mode) = args.mode else {
        anyhow::bail!("no wait mode given, expected `dependency` or `network`");
    };

    if config.wait.disable {
        info!("Template network, no need to wait");
        let outcome = WaitOutcome::Ready;
        print_summary(args, &outcome)?;
        return Ok(exit_code(&outcome));
    }

    let cancel = CancellationToken::new();
    install_signal_handlers(cancel.clone());

    let probe = DockerProbe::connect(&config.docker).map_err(|e| {
        error!("Failed to create Docker client: {}", e);
        e
    })?;

    let outcome = match mode {
        Mode::Dependency => {
            let outcome = netready::wait_for_single_dependency(
                &probe,
                config.dependency_settings(),
                cancel,
            )
            .await;
            print_summary(args, &outcome)?;
            outcome
        }
        Mode::Network => {
            let topology = config.topology()?;
            let grace_period = config.consensus_grace_period();
            info!(
                "Waiting for {} nodes (consensus: {}, grace period: {:?})",
                topology.nodes().len(),
                config.network.consensus.as_deref().unwrap_or("unspecified"),
                grace_period
            );

            let probe: Arc<dyn ProbeClient> = Arc::new(probe);
            let mut orchestrator = NetworkReadinessOrchestrator::new(
                probe,
                Arc::new(topology),
                config.network_settings(),
                grace_period,
            )
            .with_cancellation(cancel);

            let report = orchestrator.run().await;
            info!(
                "Network wait finished after {} rounds: {}",
                report.rounds_polled, report.outcome
            );
            print_summary(args, &report)?;
            report.outcome
        }
    };

    match &outcome {
        WaitOutcome::Ready | WaitOutcome::ReadyAfterGrace => info!("Wait finished: {}", outcome),
        _ => error!("Wait finished: {}", outcome),
    }

    Ok(exit_code(&outcome))
}

fn exit_code(outcome: &WaitOutcome) -> i32 {
    match outcome {
        WaitOutcome::Ready | WaitOutcome::ReadyAfterGrace => EXIT_READY,
        WaitOutcome::Failed { .. } => EXIT_FAILED,
        WaitOutcome::TimedOut => EXIT_TIMED_OUT,
        WaitOutcome::Cancelled => EXIT_CANCELLED,
    }
}

fn print_summary<T: serde::Serialize>(args: &Args, summary: &T) -> Result<()> {
    if args.summary_json {
        println!("{}", serde_json::to_string(summary)?);
    }
    Ok(())
}

/// Default level when `RUST_LOG` is unset. The per-round trail is logged at info.
fn log_level(args: &Args) -> &'static str {
    if args.debug {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "info"
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("netready={}", log_level(args))));

    // Logs go to stderr so stdout stays free for --summary-json
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() {
    println!("# netready configuration file");
    println!("# Every key can be overridden from the environment, e.g. NETREADY_NETWORK__MAX_ROUNDS=5");
    println!();

    let default_config = r#"[docker]
# Engine endpoint (unix://, npipe:// or tcp://); local defaults when unset
# host = "unix:///var/run/docker.sock"
# Request timeout in seconds
timeout_seconds = 120

[wait]
# Skip waiting entirely (template networks that are never started)
disable = false

[dependency]
# Delay between reachability checks in seconds
retry_delay_seconds = 5
# Overall bound in seconds
timeout_seconds = 300
# Optional cap on attempts
# max_retries = 60

[network]
# Maximum number of polling rounds
max_rounds = 10
# Delay between rounds in seconds
round_delay_seconds = 60
# Consensus mechanism in use (raft, istanbul, qbft, clique, ...)
# consensus = "raft"
# Grace period applied when the network settles after the first round, in seconds
consensus_grace_period_seconds = 30

# Per-consensus grace period overrides in seconds
[network.grace_periods]
# istanbul = 45

# One table per node with its container ids; signer is optional
# [network.nodes.node1]
# client = "quorum-node1"
# privacy_manager = "tessera-node1"
# signer = "ethsigner-node1"
"#;

    println!("{}", default_config);
}
