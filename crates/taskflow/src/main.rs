//! # taskflow
//!
//! Server binary: loads settings, opens the task database, and serves the
//! HTTP API until Ctrl-C.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use taskflow_server::config::ServerConfig;
use taskflow_server::server::TaskflowServer;
use taskflow_settings::TaskflowSettings;
use taskflow_tasks::{ConnectionConfig, TaskLifecycleCoordinator};

/// Taskflow server.
#[derive(Parser, Debug)]
#[command(name = "taskflow", about = "Task dependency and hierarchy engine")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (default `~/.taskflow/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Fold CLI flags over the loaded settings.
    fn apply(&self, settings: &mut TaskflowSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = &self.db_path {
            settings.database.path = path.to_string_lossy().into_owned();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

/// Relative database paths live under `~/.taskflow`.
fn resolve_db_path(raw: &str, home: &Path) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() { path } else { home.join(path) }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_file = cli
        .settings
        .clone()
        .unwrap_or_else(taskflow_settings::settings_path);
    let mut settings = taskflow_settings::load_settings_from_path(&settings_file)
        .with_context(|| format!("Failed to load settings: {}", settings_file.display()))?;
    cli.apply(&mut settings);

    taskflow_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let db_path = resolve_db_path(&settings.database.path, &taskflow_settings::taskflow_home());
    ensure_parent_dir(&db_path)?;
    let db_str = db_path.to_string_lossy();

    let pool = taskflow_tasks::new_file(&db_str, &ConnectionConfig::from(&settings.database))
        .with_context(|| format!("Failed to open database: {db_str}"))?;
    {
        let conn = pool.get().context("Failed to get DB connection")?;
        let version =
            taskflow_tasks::run_migrations(&conn).context("Failed to run task migrations")?;
        tracing::info!(path = %db_str, schema_version = version, "task database ready");
    }

    let metrics_handle = match taskflow_server::metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder unavailable, /metrics disabled");
            None
        }
    };

    tracing::info!(
        rollup_mode = ?settings.engine.rollup_mode,
        delete_policy = ?settings.engine.delete_policy,
        "task engine configured"
    );
    let coordinator = Arc::new(TaskLifecycleCoordinator::new(pool, settings.engine));

    let config = ServerConfig::from(&settings.server);
    let mut server = TaskflowServer::new(config.clone(), coordinator);
    if let Some(handle) = metrics_handle {
        server = server.with_metrics(handle);
    }
    let server = Arc::new(server);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    let shutdown = server.shutdown().clone();
    let _signal = shutdown.cancel_on_ctrl_c();

    let running = server.clone();
    let mut serve = tokio::spawn(async move { running.serve(listener).await });

    let token = shutdown.token();
    tokio::select! {
        () = token.cancelled() => {}
        result = &mut serve => {
            return result.context("Server task panicked")?.context("Server error");
        }
    }
    if let Some(result) = shutdown
        .drain(serve, Duration::from_secs(config.shutdown_timeout_secs))
        .await
    {
        result.context("Server error")?;
    }
    tracing::info!("taskflow stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::parse_from([
            "taskflow",
            "--host",
            "0.0.0.0",
            "--port",
            "9999",
            "--db-path",
            "/var/lib/taskflow.db",
            "--log-level",
            "debug",
        ]);
        let mut settings = TaskflowSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9999);
        assert_eq!(settings.database.path, "/var/lib/taskflow.db");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn absent_flags_keep_settings() {
        let cli = Cli::parse_from(["taskflow"]);
        let mut settings = TaskflowSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.port, 8420);
        assert_eq!(settings.database.path, "taskflow.db");
    }

    #[test]
    fn relative_db_path_resolves_under_home() {
        let home = Path::new("/home/u/.taskflow");
        assert_eq!(
            resolve_db_path("taskflow.db", home),
            PathBuf::from("/home/u/.taskflow/taskflow.db")
        );
        assert_eq!(resolve_db_path("/abs/t.db", home), PathBuf::from("/abs/t.db"));
    }

    #[test]
    fn ensure_parent_dir_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("deeper").join("t.db");
        ensure_parent_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
