use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use vellum_gateway::GatewayConfig;
use vellum_logging::LogConfig;

/// Contents of `vellum.toml`
///
/// Gateway settings live under `[gateway]` and logging under `[logging]`.
/// Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root directory of the results store
    pub store_root: Option<PathBuf>,
    /// CSV file holding the allowlist, first column is the principal
    pub allowlist: Option<PathBuf>,
    pub gateway: GatewayConfig,
    pub logging: LogConfig,
}

impl Settings {
    /// Load from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("loading {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let settings: Self = toml::from_str(content)?;
        settings.gateway.validate()?;
        Ok(settings)
    }

    /// Command-line values win over the file
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(root) = &cli.store_root {
            self.store_root = Some(root.clone());
        }
        if let Some(allowlist) = &cli.allowlist {
            self.allowlist = Some(allowlist.clone());
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    pub fn require_store_root(&self) -> anyhow::Result<&Path> {
        self.store_root
            .as_deref()
            .context("no store root configured (use --store-root or store_root in the config file)")
    }

    pub fn require_allowlist(&self) -> anyhow::Result<&Path> {
        self.allowlist
            .as_deref()
            .context("no allowlist configured (use --allowlist or allowlist in the config file)")
    }
}

#[derive(Parser)]
#[command(name = "vellum", about = "Find participant results and save edited tables as new versions")]
pub struct Cli {
    /// Path to vellum.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Root directory of the results store
    #[arg(long, global = true)]
    pub store_root: Option<PathBuf>,
    /// Allowlist CSV file
    #[arg(long, global = true)]
    pub allowlist: Option<PathBuf>,
    /// Identity of the operator making the request
    #[arg(long, global = true)]
    pub principal: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn require_principal(&self) -> anyhow::Result<&str> {
        self.principal
            .as_deref()
            .context("no principal given (use --principal)")
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the editable table and document links for a participant
    Search {
        /// Device category, e.g. ActiGraph
        category: String,
        /// Participant identifier
        participant: String,
    },
    /// Save an edited table as the next version
    Save {
        category: String,
        participant: String,
        /// File with the edited table; reads stdin when omitted
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show whether the principal is currently allowed
    CheckAccess,
    /// Print the results folder for a participant without touching the store
    Resolve {
        category: String,
        participant: String,
    },
}
