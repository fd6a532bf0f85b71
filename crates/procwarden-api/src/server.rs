//! HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use procwarden_config::ServerConfig;
use procwarden_daemon::DaemonManager;
use tokio::net::TcpListener;
use tracing::info;

use crate::http::routes::create_router;
use crate::state::AppState;

/// Serves the daemon API.
pub struct ApiServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ServerConfig, manager: DaemonManager) -> Self {
        Self {
            config,
            state: Arc::new(AppState::new(manager)),
        }
    }

    /// Get the server address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Bind the configured address and serve until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self.addr().parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` completes.
    pub async fn serve<F>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = create_router(self.state.clone());
        info!("API server listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procwarden_config::{ManagerConfig, SupervisorConfig};
    use procwarden_daemon::{MemoryDaemonStore, ProcessSupervisor};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn test_manager() -> DaemonManager {
        DaemonManager::open(
            Arc::new(MemoryDaemonStore::new()),
            ProcessSupervisor::new(SupervisorConfig::default()),
            ManagerConfig::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_server_addr() {
        let config = ServerConfig {
            host: "192.168.1.1".to_string(),
            port: 443,
        };
        let server = ApiServer::new(config, test_manager().await);
        assert_eq!(server.addr(), "192.168.1.1:443");
    }

    #[tokio::test]
    async fn test_run_rejects_bad_address() {
        let config = ServerConfig {
            host: "not an address".to_string(),
            port: 8080,
        };
        let server = ApiServer::new(config, test_manager().await);
        assert!(server.run_until(async {}).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_serves_until_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let server = ApiServer::new(ServerConfig::default(), test_manager().await);
        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = stopped.await;
                })
                .await
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));

        stop.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
