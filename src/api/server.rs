//! Oracle server setup

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::config::OracleConfig;
use crate::games::vrf_process::VrfProcess;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

pub struct OracleServer {
    config: OracleConfig,
    process: Arc<VrfProcess>,
}

impl OracleServer {
    pub fn new(config: OracleConfig, process: Arc<VrfProcess>) -> Self {
        Self { config, process }
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.socket_addr()?;

        info!("Starting roulette oracle on http://{}", addr);
        info!("   Process: {}", self.process.process_id());
        info!("   Public key: {}", self.process.public_key_hex());
        info!("   CORS: {:?}", self.config.cors_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);

        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await?;
        Ok(())
    }

    /// Serve on an already bound listener until Ctrl+C or SIGTERM
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Oracle stopped gracefully");
        Ok(())
    }

    /// Router with the full middleware stack
    pub fn router(&self) -> axum::Router {
        let state = Arc::new(AppState {
            process: self.process.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });

        create_router(state)
            .layer(axum::middleware::from_fn(request_id_middleware))
            .layer(create_cors_layer(self.config.cors_origins.clone()))
            .layer(TimeoutLayer::new(self.config.request_timeout()))
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
