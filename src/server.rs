//! Server initialization and startup logic for procwarden.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use procwarden_api::ApiServer;
use procwarden_config::{Config, ConfigError, ConfigLoader, ConfigValidator};
use procwarden_daemon::{DaemonManager, ProcessSupervisor, SqliteDaemonStore};

use crate::cli::RunArgs;

/// Configuration file used when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "config/procwarden.toml";

/// Load the configuration. An explicitly named file must exist; the default
/// file is optional.
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => ConfigLoader::load(path),
        None => ConfigLoader::load_or_default(Path::new(DEFAULT_CONFIG_PATH)),
    }
}

/// Apply command-line overrides on top of file values.
pub(crate) fn apply_overrides(config: &mut Config, args: RunArgs) {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(store) = args.store {
        config.store.path = store;
    }
}

/// Validate, failing on the first error and logging warnings.
pub(crate) fn validate(config: &Config) -> Result<(), ConfigError> {
    let warnings = ConfigValidator::validate(config).into_result()?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    Ok(())
}

/// Run the server in foreground until SIGINT or SIGTERM.
pub(crate) async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting procwarden v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(SqliteDaemonStore::open(&config.store.path).await?);
    info!("Daemon store: {}", config.store.path.display());

    let supervisor = ProcessSupervisor::new(config.supervisor.clone());
    let manager = DaemonManager::open(store, supervisor, config.manager.clone()).await?;
    info!("Daemon manager ready (restart policy: {:?})", config.manager.restart_policy);

    let server = ApiServer::new(config.server.clone(), manager.clone());
    server.run_until(shutdown_signal()).await?;

    manager.shutdown().await?;
    info!("procwarden stopped");
    Ok(())
}

/// Resolve once SIGINT (Ctrl+C) or, on unix, SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(load_config(Some(missing.as_path())), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("procwarden.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = load_config(Some(path.as_path())).unwrap();
        let defaults = Config::default();

        assert_eq!(config.server.host, defaults.server.host);
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.store.path, defaults.store.path);
        assert_eq!(config.manager.restart_policy, defaults.manager.restart_policy);
        assert_eq!(
            config.manager.terminate_on_shutdown,
            defaults.manager.terminate_on_shutdown
        );
        assert_eq!(config.manager.exit_retry_initial_ms, defaults.manager.exit_retry_initial_ms);
        assert_eq!(config.manager.exit_retry_max_ms, defaults.manager.exit_retry_max_ms);
        assert_eq!(config.supervisor.use_shell, defaults.supervisor.use_shell);
        assert_eq!(config.supervisor.shell, defaults.supervisor.shell);
        assert_eq!(config.logging.level, defaults.logging.level);
        assert_eq!(config.logging.dir, defaults.logging.dir);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            RunArgs {
                host: Some("0.0.0.0".to_string()),
                port: None,
                store: Some(PathBuf::from("/tmp/pw.db")),
            },
        );

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.path, PathBuf::from("/tmp/pw.db"));
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(matches!(validate(&config), Err(ConfigError::InvalidValue { .. })));
        config.server.port = 8080;
        assert!(validate(&config).is_ok());
    }
}
