use std::net::{IpAddr, Ipv4Addr};

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use mealdrop_mcp_server::graphql::{DEFAULT_MENU_URL, DEFAULT_SUBSCRIPTION_URL};
use mealdrop_mcp_server::server::{Server, Transport};
use mealdrop_mcp_server::session::{Credentials, DEFAULT_IDENTITY_URL};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Clap styling
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Arguments to the MCP server
#[derive(Debug, clap::Parser)]
#[command(
    styles = STYLES,
    about = "Mealdrop MCP Server - drive a Mealdrop account from an AI agent",
)]
struct Args {
    /// The Mealdrop account email
    #[clap(long, env = "MEALDROP_EMAIL")]
    email: String,

    /// The Mealdrop account password
    #[clap(long, env = "MEALDROP_PASSWORD", hide_env_values = true)]
    password: String,

    /// The IP address to bind the Streamable HTTP server to
    ///
    /// [default: 127.0.0.1]
    #[arg(long)]
    http_address: Option<IpAddr>,

    /// Start the server using the Streamable HTTP transport on the given port
    /// instead of stdio
    ///
    /// [default: 5000]
    #[arg(long)]
    http_port: Option<u16>,

    /// The identity provider base URL
    #[clap(long, env = "MEALDROP_IDENTITY_URL", default_value = DEFAULT_IDENTITY_URL)]
    identity_url: Url,

    /// The menu service GraphQL endpoint
    #[clap(long, env = "MEALDROP_MENU_URL", default_value = DEFAULT_MENU_URL)]
    menu_url: Url,

    /// The subscription service GraphQL endpoint
    #[clap(long, env = "MEALDROP_SUBSCRIPTION_URL", default_value = DEFAULT_SUBSCRIPTION_URL)]
    subscription_url: Url,

    /// The log level for the MCP server
    #[arg(long = "log", short = 'l', global = true, default_value_t = Level::INFO)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let transport = if args.http_port.is_some() || args.http_address.is_some() {
        Transport::StreamableHttp {
            address: args.http_address.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: args.http_port.unwrap_or(5000),
        }
    } else {
        Transport::Stdio
    };

    // When using the stdio transport, send output to stderr since stdout is
    // used for MCP messages
    match transport {
        Transport::StreamableHttp { .. } => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(args.log_level.into()))
            .with_ansi(true)
            .with_target(false)
            .init(),
        Transport::Stdio => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive(args.log_level.into()))
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .init(),
    };

    info!(
        "Mealdrop MCP Server v{} // Licensed under MIT",
        std::env!("CARGO_PKG_VERSION")
    );

    Ok(Server::builder()
        .transport(transport)
        .credentials(Credentials::new(args.email, args.password))
        .identity_url(args.identity_url)
        .menu_url(args.menu_url)
        .subscription_url(args.subscription_url)
        .build()
        .start()
        .await?)
}
