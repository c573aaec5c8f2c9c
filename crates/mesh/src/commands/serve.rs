//! `mesh serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use mesh_config::{CacheMode, CliSettings, Config};
use mesh_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover mesh.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Response cache mode: none, memory, disk or hybrid (overrides config).
    #[arg(long, env = "MESH_CACHE_MODE")]
    cache_mode: Option<CacheMode>,

    /// Enable verbose output (debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            source_dir: self.source_dir,
            cache_mode: self.cache_mode,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Source directory: {}",
            config.paths.source_dir.display()
        ));
        match config.cache.mode {
            CacheMode::None => output.info("Cache: disabled"),
            CacheMode::Memory => output.info("Cache: memory"),
            mode => output.info(&format!(
                "Cache: {} ({})",
                if mode == CacheMode::Disk { "disk" } else { "hybrid" },
                config.paths.cache_dir.display()
            )),
        }

        let server_config = server_config_from_config(&config, version.to_owned());
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
