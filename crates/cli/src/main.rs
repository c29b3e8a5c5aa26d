use clap::{Parser, Subcommand};
use lib::exec::ProcessRunner;

#[derive(Parser)]
#[command(name = "ffgate")]
#[command(about = "Authenticated HTTP gateway for the media tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the gateway (GET /health, POST /execute). Port and credentials come from the PHOTOVIEW_FFMPEG_* environment or the config file.
    Serve {
        /// Config file path (default: FFGATE_CONFIG_PATH or /etc/ffgate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (overrides PHOTOVIEW_FFMPEG_PORT and the config file)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Run the version probe once against the local tool; exits nonzero if the tool is unhealthy.
    Probe {
        /// Config file path (only the tool deadline is used)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("ffgate {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Probe { config }) => match run_probe(config).await {
            Ok(version) => print!("{}", version),
            Err(e) => {
                log::error!("probe failed: {:#}", e);
                std::process::exit(1);
            }
        },
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    log::debug!("configuration resolved from {} and environment", path.display());
    if let Some(p) = port {
        config.gateway.port = Some(p);
    }
    lib::gateway::run_gateway(config).await
}

async fn run_probe(config_path: Option<std::path::PathBuf>) -> anyhow::Result<String> {
    let timeout = lib::config::load_tool_timeout(config_path)?;
    let runner = ProcessRunner::media_tool(timeout);
    lib::exec::probe(&runner).await.map_err(anyhow::Error::msg)
}
