//! Hosted Target CLI
//!
//! Entry point for the `hosted-target` command-line tool.

use clap::{Parser, Subcommand};
use chrono::{DateTime, Utc};
use hosted_target::auth::generate_api_key;
use hosted_target::{
    HttpTransport, LogLevel, LogOptions, PollTimeout, RunState, ServiceKind, Target, TargetConfig,
    TargetError,
};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "hosted-target")]
#[command(about = "Client for a hosted application deployment", version)]
struct Cli {
    /// Path to target config file (default: ~/.config/hosted-target/target.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Print debug output on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URL of a service
    Status {
        /// Service name: deploy, query or document
        #[arg(long, default_value = "deploy")]
        service: String,

        /// Container cluster; may be omitted when there is only one
        #[arg(long, default_value = "")]
        cluster: String,

        /// Seconds to wait for the service (0 = check once)
        #[arg(long, default_value_t = 0)]
        wait: u64,

        /// Deployment run to wait for before discovering endpoints
        #[arg(long, default_value_t = 0)]
        run: i64,
    },

    /// Wait for a deployment run to finish, printing its log
    WaitRun {
        /// Run ID
        id: i64,

        /// Seconds to wait (0 = check once)
        #[arg(long, default_value_t = 0)]
        wait: u64,

        /// Log level: error, warning, info or debug (default: from config)
        #[arg(long)]
        level: Option<LogLevel>,
    },

    /// Discover and print the deployment's endpoints
    Endpoints {
        /// Seconds to wait for endpoints (0 = check once)
        #[arg(long, default_value_t = 0)]
        wait: u64,
    },

    /// Print the deployment's log
    Log {
        /// Only entries after this time (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Only entries before this time (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// Keep printing new entries
        #[arg(long, short = 'f')]
        follow: bool,

        /// Log level: error, warning, info or debug (default: from config)
        #[arg(long)]
        level: Option<LogLevel>,

        /// Expand escaped newlines and tabs in messages
        #[arg(long)]
        nldequote: bool,
    },

    /// Check that a client version is still supported
    CheckVersion {
        /// Semantic version of the client
        version: semver::Version,
    },

    /// Generate a new API key
    ApiKey {
        /// Write the key to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::ApiKey { output } => run_api_key(output),
        command => load_config(cli.config).and_then(|config| run_target_command(&config, command)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<TargetConfig, TargetError> {
    let config = match path {
        Some(path) => TargetConfig::load(&path)?,
        None => TargetConfig::load_default()?,
    };
    Ok(config)
}

fn run_target_command(config: &TargetConfig, command: Commands) -> Result<(), TargetError> {
    let mut target = config.build_target(Arc::new(HttpTransport::new()))?;

    match command {
        Commands::Status {
            service,
            cluster,
            wait,
            run,
        } => run_status(&mut target, &service, &cluster, wait, run),
        Commands::WaitRun { id, wait, level } => {
            let mut printer = config.run_log_printer(Box::new(io::stdout()));
            if let Some(level) = level {
                printer = printer.with_level(level);
            }
            run_wait_run(target.with_run_log(printer), id, wait)
        }
        Commands::Endpoints { wait } => run_endpoints(&mut target, wait),
        Commands::Log {
            from,
            to,
            follow,
            level,
            nldequote,
        } => {
            let options = LogOptions {
                from,
                to,
                follow,
                level: level.unwrap_or_else(|| config.log_level()),
                dequote: nldequote,
                ..LogOptions::default()
            };
            let stdout = io::stdout();
            let mut out = stdout.lock();
            target.print_log(&options, &mut out)
        }
        Commands::CheckVersion { version } => {
            target.check_version(&version)?;
            println!("Client version {} is supported", version);
            Ok(())
        }
        Commands::ApiKey { output } => run_api_key(output),
    }
}

fn run_status(
    target: &mut Target,
    service: &str,
    cluster: &str,
    wait: u64,
    run: i64,
) -> Result<(), TargetError> {
    let kind: ServiceKind = service.parse()?;
    let service = target.service(kind, PollTimeout::from_secs(wait), run, cluster)?;
    println!("{} is ready at {}", service.kind, service.base_url);
    Ok(())
}

fn run_wait_run(mut target: Target, id: i64, wait: u64) -> Result<(), TargetError> {
    match target.wait_for_run(id, PollTimeout::from_secs(wait))? {
        RunState::Running => println!("Run {} is still running", id),
        state => println!("Run {} {}", id, state),
    }
    Ok(())
}

fn run_endpoints(target: &mut Target, wait: u64) -> Result<(), TargetError> {
    if target.endpoints().is_empty() {
        target.discover_endpoints(PollTimeout::from_secs(wait))?;
    }
    for (cluster, url) in target.endpoints().iter() {
        println!("{}\t{}", cluster, url);
    }
    Ok(())
}

fn run_api_key(output: Option<PathBuf>) -> Result<(), TargetError> {
    let key = generate_api_key();
    match output {
        Some(path) => {
            fs::write(&path, &key)?;
            eprintln!("API key written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(key.as_bytes())?;
        }
    }
    Ok(())
}
