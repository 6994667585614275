//! CLI runner - executes commands

use crate::cli::commands::{parse_stream_list, Cli, Commands, OutputFormat};
use crate::config::TapConfig;
use crate::connector::{Connector, GoogleAdsTap};
use crate::engine::SyncConfig;
use crate::error::{Error, Result};
use crate::state::StateManager;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
    tap: GoogleAdsTap,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            tap: GoogleAdsTap::new(),
        }
    }

    /// Use a specific tap instance
    #[must_use]
    pub fn with_tap(mut self, tap: GoogleAdsTap) -> Self {
        self.tap = tap;
        self
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Spec => self.spec(),
            Commands::Check => self.check().await,
            Commands::Discover => self.discover().await,
            Commands::Streams => self.streams(),
            Commands::Read {
                streams,
                max_records,
            } => self.read(streams.as_deref(), *max_records).await,
        }
    }

    /// Load configuration
    fn load_config(&self) -> Result<TapConfig> {
        // Inline config takes precedence
        if let Some(json_str) = &self.cli.config_json {
            return TapConfig::from_json(json_str);
        }

        if let Some(path) = &self.cli.config {
            return TapConfig::from_file(path);
        }

        Err(Error::config("No config given (use --config or --config-json)"))
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    fn spec(&self) -> Result<()> {
        self.output_message(&self.tap.spec().to_json());
        Ok(())
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let result = self.tap.check(&config).await?;

        let (status, message) = if result.success {
            ("SUCCEEDED", "Connection successful".to_string())
        } else {
            (
                "FAILED",
                format!(
                    "Connection failed: {}",
                    result.message.unwrap_or_default()
                ),
            )
        };
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": status,
                "message": message
            }
        }));

        Ok(())
    }

    /// Print the Singer catalog
    async fn discover(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = self.tap.discover(&config).await?;
        self.output_message(&catalog.to_singer_catalog()?);
        Ok(())
    }

    /// List stream names; resolves the catalog so custom reports are included
    fn streams(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = self.tap.catalog(&config)?;

        self.output_message(&json!({
            "type": "STREAMS",
            "streams": catalog.names(),
            "connector": crate::NAME
        }));

        Ok(())
    }

    /// Read the selected streams
    async fn read(&self, streams: Option<&str>, max_records: Option<usize>) -> Result<()> {
        let started = Instant::now();
        let config = self.load_config()?;
        let state = self.load_state()?;
        let selection = parse_stream_list(streams);
        let sync = SyncConfig::new().with_max_records(max_records.unwrap_or(0));

        let mut messages = self
            .tap
            .read(&config, &selection, state.clone(), sync)
            .await?;

        let mut records = 0usize;
        while let Some(message) = messages.next().await {
            let message = message?;
            if message.is_record() {
                records += 1;
            }
            self.output_message(&message.to_json());
        }

        if let Some(path) = &self.cli.state {
            state.save_to_file(path).await?;
        }

        info!(
            records,
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Read complete"
        );
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
