use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pounder_config::{GatewayKind, PounderConfig};
use pounder_engine::{check_final_consistency, CancellationToken, Engine};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pounder",
    version,
    about = "Pound on a directory with random file operations and check every read"
)]
struct Cli {
    /// Directory to pound (must already exist; defaults to the working directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Use the retrying, atomic-replace filesystem binding
    #[arg(short, long)]
    robust: bool,

    /// Seed for the random source, to replay a run
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many iterations instead of waiting for Ctrl+C
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// After the run, check the model against what is actually on disk
    #[arg(long)]
    audit: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log every gateway call
    #[arg(short, long)]
    verbose: bool,
}

fn find_config() -> Option<PathBuf> {
    // 1. POUNDER_CONFIG environment variable
    if let Ok(path) = std::env::var("POUNDER_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. pounder.yaml in current directory
    let cwd_config = PathBuf::from("pounder.yaml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. ~/.config/pounder/config.yaml
    if let Some(home) = dirs_next::home_dir() {
        let home_config = home.join(".config/pounder/config.yaml");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// `RUST_LOG` decides, defaulting to info. `-v` forces debug on top of it.
fn env_filter(verbose: bool) -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    if verbose {
        filter.add_directive(LevelFilter::DEBUG.into())
    } else {
        filter
    }
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line flags win over whatever the config file says.
fn apply_overrides(config: &mut PounderConfig, cli: &Cli) {
    if let Some(root) = &cli.root {
        config.root = Some(root.to_string_lossy().into_owned());
    }
    if cli.robust {
        config.gateway = GatewayKind::Robust;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.iterations.is_some() {
        config.max_iterations = cli.iterations;
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Received SIGINT, finishing current operation..."); }
        _ = terminate => { info!("Received SIGTERM, finishing current operation..."); }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match cli.config.clone().or_else(find_config) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            PounderConfig::from_file(&path)?
        }
        None => PounderConfig::default(),
    };
    apply_overrides(&mut config, &cli);

    let cwd = std::env::current_dir()?;
    let mut engine = Engine::new(&config, &cwd)?;
    info!(
        root = %engine.root().display(),
        gateway = engine.gateway().name(),
        seed = engine.seed(),
        "pounding; press Ctrl+C to stop"
    );

    let token = CancellationToken::new();
    let loop_token = token.clone();
    let mut worker = tokio::task::spawn_blocking(move || {
        let report = engine.run(&loop_token);
        (engine, report)
    });

    let (engine, report) = tokio::select! {
        joined = &mut worker => joined?,
        _ = shutdown_signal() => {
            token.cancel();
            worker.await?
        }
    };

    let violations = cli
        .audit
        .then(|| check_final_consistency(&engine.state().shadow, engine.gateway()));

    if cli.json {
        match &violations {
            Some(violations) => {
                let output = serde_json::json!({ "report": &report, "audit": violations });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            None => println!("{}", report.to_json()?),
        }
    } else {
        println!("{}", report);
        match &violations {
            Some(violations) if violations.is_empty() => {
                println!("Audit passed: model matches disk");
            }
            Some(violations) => {
                println!("Audit found {} problems:", violations.len());
                for v in violations {
                    println!("[{}] {}", v.invariant, v.details);
                }
            }
            None => {}
        }
    }

    let clean = report.is_clean() && violations.map_or(true, |v| v.is_empty());
    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
