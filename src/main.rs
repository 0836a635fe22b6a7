use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foodgram::{config::Settings, filters::AppState, logging, pool};

/// foodgram - recipe sharing backend
#[derive(Parser)]
#[command(name = "foodgram")]
#[command(about = "Recipe sharing backend", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host address (overrides config file)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.clone())?;
    logging::init(&settings.log.level)?;

    if settings.ensure_secret() {
        log::warn!("No session secret configured, generated a random one; tokens will not survive a restart");
    }
    settings.validate().map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Commands::Serve { host, port } => serve_command(settings, host, port).await,
        Commands::Migrate => migrate_command(settings).await,
    }
}

async fn serve_command(
    settings: Settings,
    host_override: Option<String>,
    port_override: Option<u16>,
) -> Result<()> {
    let host = host_override.unwrap_or_else(|| settings.server.host.to_owned());
    let port = port_override.unwrap_or(settings.server.port);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("invalid host address {host}"))?;

    let db = pool::connect(&settings.database.url, settings.database.max_connections).await?;
    pool::migrate(&db).await?;

    let state = AppState::new(db, &settings)?;
    let addr = SocketAddr::new(ip, port);

    log::info!("Listening on http://{addr}");
    warp::serve(foodgram::filters::routes(state))
        .run(addr)
        .await;

    Ok(())
}

async fn migrate_command(settings: Settings) -> Result<()> {
    let db = pool::connect(&settings.database.url, settings.database.max_connections).await?;
    pool::migrate(&db).await?;

    Ok(())
}
