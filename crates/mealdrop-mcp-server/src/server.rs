//! Transport wiring for the MCP server.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bon::bon;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::{StreamableHttpServerConfig, StreamableHttpService};
use tracing::{error, info};
use url::Url;

use crate::errors::ServerError;
use crate::graphql::Gateway;
use crate::session::{Credentials, SessionManager};
use crate::tools::MealdropServerHandler;

/// A Mealdrop MCP server
pub struct Server {
    transport: Transport,
    credentials: Credentials,
    identity_url: Url,
    menu_url: Url,
    subscription_url: Url,
}

#[derive(Clone, Debug)]
pub enum Transport {
    Stdio,
    StreamableHttp { address: IpAddr, port: u16 },
}

#[bon]
impl Server {
    #[builder]
    pub fn new(
        transport: Transport,
        credentials: Credentials,
        identity_url: Url,
        menu_url: Url,
        subscription_url: Url,
    ) -> Self {
        Self {
            transport,
            credentials,
            identity_url,
            menu_url,
            subscription_url,
        }
    }

    pub async fn start(self) -> Result<(), ServerError> {
        let session = SessionManager::new(self.credentials, self.identity_url)
            .map_err(|error| ServerError::Transport(error.to_string()))?;
        let gateway = Gateway::new(Arc::new(session), self.menu_url, self.subscription_url)
            .map_err(|error| ServerError::Transport(error.to_string()))?;
        let handler = MealdropServerHandler::new(Arc::new(gateway));

        match self.transport {
            Transport::StreamableHttp { address, port } => {
                info!(port = ?port, address = ?address, "Starting MCP server in Streamable HTTP mode");
                let listen_address = SocketAddr::new(address, port);
                let service = StreamableHttpService::new(
                    move || Ok(handler.clone()),
                    LocalSessionManager::default().into(),
                    StreamableHttpServerConfig::default(),
                );
                let router = axum::Router::new().nest_service("/mcp", service);
                let tcp_listener = tokio::net::TcpListener::bind(listen_address).await?;
                axum::serve(tcp_listener, router)
                    .with_graceful_shutdown(shutdown_signal())
                    .await?;
            }
            Transport::Stdio => {
                info!("Starting MCP server in stdio mode");
                let service = handler
                    .serve(stdio())
                    .await
                    .inspect_err(|e| {
                        error!("serving error: {:?}", e);
                    })
                    .map_err(|error| ServerError::Transport(error.to_string()))?;
                service.waiting().await.map_err(ServerError::Startup)?;
            }
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {error}");
    }
}
