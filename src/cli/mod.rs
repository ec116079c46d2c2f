//! Command-line interface for hotmark.
//!
//! Runs the report server over an engine instance, with config-file,
//! environment and flag layering.

use crate::application::Application;
use crate::core::{Config, ConfigBuilder, MonitorError, Result};
use clap::Parser;
use std::path::PathBuf;

/// In-process hot-path instrumentation with a ranked cycle-cost report.
#[derive(Parser, Debug)]
#[command(name = "hotmark")]
#[command(version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// HTTP port for the report server
    #[arg(long, env = "HOTMARK_PORT")]
    pub port: Option<u16>,

    /// Maximum number of monitor points
    #[arg(long, env = "HOTMARK_MAX_POINTS")]
    pub max_points: Option<usize>,

    /// Configuration file path (default: ~/.config/hotmark/config.yaml)
    #[arg(short, long, env = "HOTMARK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Register demo points and drive load against them
    #[arg(long, env = "HOTMARK_DEMO")]
    pub demo: bool,

    /// Enable debug logging
    #[arg(short, long, env = "HOTMARK_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,

    /// Show version information
    #[arg(short = 'V', long = "show-version")]
    pub version: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            path.clone()
        } else {
            let default_path = dirs::config_dir()
                .map(|d| d.join("hotmark").join("config.yaml"))
                .unwrap_or_else(|| PathBuf::from("~/.config/hotmark/config.yaml"));

            if default_path.exists() {
                default_path
            } else {
                return self.build_config_from_args(builder);
            }
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
                tracing::info!("Loaded configuration from: {:?}", config_path);
            },
            Err(e) if self.config.is_some() => {
                return Err(MonitorError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            },
            Err(_) => {
                tracing::debug!("No config file found at {:?}, using defaults", config_path);
            },
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if let Some(port) = self.port {
            builder = builder.http_port(port);
        }
        if let Some(max_points) = self.max_points {
            builder = builder.max_points(max_points);
        }
        if self.demo {
            builder = builder.demo_points(true);
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging based on flags and environment.
    pub fn init_logging(&self, config: &Config) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let log_level = if self.debug {
            "debug"
        } else {
            config.logging.level.as_str()
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| MonitorError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the hotmark binary.
pub async fn execute(cli: Cli) -> Result<()> {
    if cli.version {
        println!("hotmark {}", env!("CARGO_PKG_VERSION"));
        println!("In-process hot-path instrumentation");
        return Ok(());
    }

    let config = cli.load_config().await?;
    cli.init_logging(&config)?;

    if cli.check_config {
        config.validate()?;
        println!("Configuration is valid!");
        println!("  HTTP port: {}", config.server.http_port);
        println!("  Max points: {}", config.registry.max_points);
        println!("  Buckets: {}", config.registry.buckets);
        println!(
            "  Workers: {}",
            if config.registry.workers == 0 {
                "auto".to_string()
            } else {
                config.registry.workers.to_string()
            }
        );
        return Ok(());
    }

    Application::new(config)?.run().await
}
