//! # raidhub
//!
//! Coordinator binary: loads settings, wires the registries to the HTTP and
//! notification surface, and serves until ctrl-c.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use raidhub_runtime::{
    HeadlessWorkerPool, MatchRegistry, MemoryPlayerRegistrar, MemoryProfileStore, PoolConfig,
    SessionOrchestrator,
};
use raidhub_server::{NotificationChannel, RaidServer, ServerConfig};
use raidhub_settings::RaidhubSettings;

/// Raid session coordinator.
#[derive(Parser, Debug)]
#[command(name = "raidhub", about = "Raid session and headless worker coordinator")]
struct Cli {
    /// Settings file (defaults to `~/.raidhub/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, `0` for any (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn settings_file(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(raidhub_settings::settings_path)
    }

    /// Flags win over every other settings layer.
    fn apply_overrides(&self, settings: &mut RaidhubSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

fn pool_config(settings: &RaidhubSettings) -> PoolConfig {
    PoolConfig {
        liveness_window: settings.headless.liveness_window(),
        assignment_timeout: settings.headless.assignment_timeout(),
    }
}

fn profile_store(settings: &RaidhubSettings) -> Result<MemoryProfileStore> {
    match &settings.profiles_path {
        Some(path) => MemoryProfileStore::load_from_path(Path::new(path))
            .with_context(|| format!("Failed to load profiles from {path}")),
        None => Ok(MemoryProfileStore::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_file = cli.settings_file();
    let mut settings = raidhub_settings::load_settings_from_path(&settings_file)
        .with_context(|| format!("Failed to load settings from {}", settings_file.display()))?;
    cli.apply_overrides(&mut settings);

    raidhub_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let metrics_handle =
        raidhub_server::metrics::install_recorder().context("Failed to install metrics recorder")?;

    let channel = Arc::new(NotificationChannel::new());
    let matches = Arc::new(MatchRegistry::new(channel.clone()));
    let pool = Arc::new(HeadlessWorkerPool::new(channel.clone(), pool_config(&settings)));
    let profiles = Arc::new(profile_store(&settings)?);
    tracing::info!(profiles = profiles.len(), "profile store ready");

    let orchestrator = Arc::new(SessionOrchestrator::new(
        matches,
        pool,
        channel.clone(),
        profiles,
        Arc::new(MemoryPlayerRegistrar::new()),
    ));

    let server = RaidServer::new(
        ServerConfig::from(&settings),
        orchestrator,
        channel.clone(),
        Some(metrics_handle),
    );
    let mut tasks = server.start_background_tasks();
    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_addr()))?;
    tracing::info!(
        "raidhub listening on http://{addr} ({} routes registered)",
        server.registry().methods().len()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    channel.close_all();
    tasks.push(handle);
    let aborted = server.shutdown().graceful_shutdown(tasks, None).await;

    tracing::info!(aborted, "Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "raidhub",
            "--host",
            "127.0.0.1",
            "--port",
            "7000",
            "--log-level",
            "debug",
        ]);
        let mut settings = RaidhubSettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn no_flags_keep_settings() {
        let cli = Cli::parse_from(["raidhub"]);
        let mut settings = RaidhubSettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings, RaidhubSettings::default());
        assert!(cli.settings_file().ends_with(".raidhub/settings.json"));
    }

    #[test]
    fn explicit_config_path() {
        let cli = Cli::parse_from(["raidhub", "--config", "/etc/raidhub.json"]);
        assert_eq!(cli.settings_file(), PathBuf::from("/etc/raidhub.json"));
    }

    #[test]
    fn pool_config_from_settings() {
        let mut settings = RaidhubSettings::default();
        settings.headless.liveness_window_secs = 15;
        let cfg = pool_config(&settings);
        assert_eq!(cfg.liveness_window, Duration::from_secs(15));
        assert_eq!(cfg.assignment_timeout, Duration::from_secs(60));
    }

    #[test]
    fn profiles_loaded_from_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"{"alice": {"nickname": "alice", "level": 12, "experience": 3400}}"#,
        )
        .unwrap();
        let settings = RaidhubSettings {
            profiles_path: Some(path.to_string_lossy().into_owned()),
            ..RaidhubSettings::default()
        };
        assert_eq!(profile_store(&settings).unwrap().len(), 1);
    }

    #[test]
    fn missing_profiles_file_is_an_error() {
        let settings = RaidhubSettings {
            profiles_path: Some("/nonexistent/profiles.json".into()),
            ..RaidhubSettings::default()
        };
        assert!(profile_store(&settings).is_err());
    }
}
