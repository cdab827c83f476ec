//! Pageview proxy CLI
//!
//! Runs the caching proxy, or performs a single uncached lookup against the
//! configured Plausible instance.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pageview_api::{ProxyConfig, ProxyServer};
use pageview_core::types::{PagePath, PageviewsResponse};
use pageview_upstream::PlausibleClient;

/// Caching proxy for Plausible pageview counts
#[derive(Parser)]
#[command(name = "pageview-proxy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy server (default)
    Serve {
        /// Port to listen on, overriding PORT
        #[arg(short, long)]
        port: Option<u16>,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Fetch one page's pageviews straight from upstream, bypassing the cache
    Fetch {
        /// Page path, e.g. /blog/post
        page: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "pageview=debug,access=info,tower_http=debug,info"
    } else {
        "pageview=info,access=info,tower_http=warn,warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = ProxyConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Some(Commands::Serve { port, bind }) => cmd_serve(config, port, &bind).await,
        Some(Commands::Fetch { page }) => cmd_fetch(config, &page).await,
        None => cmd_serve(config, None, "0.0.0.0").await,
    }
}

/// Run the proxy until Ctrl-C
async fn cmd_serve(mut config: ProxyConfig, port: Option<u16>, bind: &str) -> Result<()> {
    if let Some(port) = port {
        config.port = port;
    }

    let ip: std::net::IpAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {bind}"))?;
    let addr = std::net::SocketAddr::new(ip, config.port);

    info!(upstream = %config.upstream.base_url, "Starting pageview proxy");

    let server = ProxyServer::new(config).context("Failed to initialize proxy")?;
    server.run(addr).await.context("Server error")?;

    Ok(())
}

/// One uncached upstream lookup
async fn cmd_fetch(config: ProxyConfig, page: &str) -> Result<()> {
    let page = PagePath::parse(Some(page))?;
    let client = PlausibleClient::new(config.upstream)?;

    println!(
        "{} {}",
        "Querying".cyan().bold(),
        client.aggregate_url(&page)?.as_str().dimmed()
    );

    let pageviews = client
        .fetch(&page)
        .await
        .with_context(|| format!("Lookup failed for {page}"))?;

    let response = PageviewsResponse::fresh(pageviews, &page);
    println!("{}", serde_json::to_string_pretty(&response)?);
    println!("{} {} pageviews", "✓".green().bold(), pageviews.to_string().bold());

    Ok(())
}
