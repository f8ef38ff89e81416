use std::{path::Path, sync::Arc};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    patchbay_config::{Severity, validate},
    patchbay_routing::RouteTable,
    patchbay_workflow::TaskEngine,
};

/// Port written into a fresh config by `patchbay init`.
const DEFAULT_PORT: u16 = 7331;

#[derive(Parser)]
#[command(
    name = "patchbay",
    about = "Pattern-routed workflow dispatch over WebSockets"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Path to the config file (overrides discovery).
    #[arg(long, global = true, env = "PATCHBAY_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Serve,
    /// Validate the configuration and report diagnostics.
    Check,
    /// Print the compiled route table.
    Routes,
    /// Write an annotated default config file.
    Init,
}

/// Initialise tracing from `--log-level`, or `RUST_LOG` when set.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Serve) => serve(cli).await,
        Some(Commands::Check) => check(cli.config.as_deref()),
        Some(Commands::Routes) => routes(cli.config.as_deref()),
        Some(Commands::Init) => init(cli.config.as_deref(), cli.port),
    }
}

async fn serve(cli: Cli) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "patchbay starting");

    let mut config = match cli.config {
        Some(ref path) => patchbay_config::load_config(path)?,
        None => patchbay_config::discover_and_load()?,
    };

    // CLI args override config values.
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = Some(port);
    }

    info!(
        routes = config.routes.len(),
        tls = config.server.tls.configured(),
        "configuration loaded"
    );

    let engine = Arc::new(TaskEngine::new());
    patchbay_gateway::server::start_gateway(config, engine).await
}

fn check(config_path: Option<&Path>) -> anyhow::Result<()> {
    let result = validate::validate(config_path);

    if let Some(ref path) = result.config_path {
        println!("config: {}", path.display());
    }
    for d in &result.diagnostics {
        if d.path.is_empty() {
            println!("{}: {}", d.severity, d.message);
        } else {
            println!("{} [{}]: {}", d.severity, d.path, d.message);
        }
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    println!("{errors} error(s), {warnings} warning(s)");

    if result.has_errors() {
        anyhow::bail!("configuration is invalid");
    }

    // Pattern syntax is outside the validator's reach; compiling the table
    // takes the routing crate.
    if let Some(path) = result.config_path.as_deref() {
        let config = patchbay_config::load_config(path)?;
        let table = RouteTable::compile(&config.routes)?;
        println!("{} route pattern(s) compile", table.len());
    }
    Ok(())
}

fn init(config_path: Option<&Path>, port: Option<u16>) -> anyhow::Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => std::path::PathBuf::from("patchbay.toml"),
    };
    if path.exists() {
        anyhow::bail!("{} already exists; refusing to overwrite", path.display());
    }

    let template = patchbay_config::template::default_config_template(port.unwrap_or(DEFAULT_PORT));
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, template)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn routes(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => patchbay_config::load_config(path)?,
        None => patchbay_config::discover_and_load()?,
    };
    let table = RouteTable::compile(&config.routes)?;

    if table.is_empty() {
        println!("No routes configured.");
        return Ok(());
    }
    for (i, binding) in table.bindings().enumerate() {
        let delivery = match &binding.presenter {
            Some(spec) if spec.broadcast => "presents (broadcast)",
            Some(_) => "presents (unicast)",
            None => "silent",
        };
        println!(
            "  [{i}] {} -> {} task(s), {delivery}",
            binding.pattern,
            binding.workflow.tasks.len(),
        );
    }
    Ok(())
}
