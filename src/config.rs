//! Configuration resolution for mtk-host
//!
//! Every setting resolves CLI argument > environment variable > TOML config
//! file > compiled default. The external tool commands are injected here and
//! nowhere else; handlers and the orchestrator never hard-code tool paths.

use crate::services::tools::ToolCommand;
use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_UPLOAD_ROOT: &str = "./uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 300;

/// Command-line arguments
///
/// Each argument also reads its environment variable, so CLI and ENV form
/// the top two resolution tiers.
#[derive(Debug, Default, Parser)]
#[command(name = "mtk-host", about = "HTTP host for converted CAD model bundles")]
pub struct Cli {
    /// Directory holding the `<name>_mtk` bundle folders
    #[arg(long, env = "MTK_HOST_UPLOAD_ROOT")]
    pub upload_root: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:5000
    #[arg(long, env = "MTK_HOST_BIND")]
    pub bind_addr: Option<String>,

    /// Externally reachable base URL used in generated manifests
    #[arg(long, env = "MTK_HOST_PUBLIC_URL")]
    pub public_base_url: Option<String>,

    /// Base URL of the viewer front-end, used in /analyze responses
    #[arg(long, env = "MTK_HOST_VIEWER_URL")]
    pub viewer_base_url: Option<String>,

    /// Path to the TOML config file
    #[arg(long, env = "MTK_HOST_CONFIG")]
    pub config_file: Option<PathBuf>,
}

/// External tool commands and their shared timeout
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// CAD-to-web converter; writes the bundle tree under `{target}`
    pub converter: Option<ToolCommand>,
    /// Feature recognizer; reads `{source}`, text output only
    pub feature_recognizer: Option<ToolCommand>,
    /// Design-for-manufacturing analyzer; reads `{source}`, text output only
    pub dfm_analyzer: Option<ToolCommand>,
    /// Bounded wait per stage, in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            converter: None,
            feature_recognizer: None,
            dfm_analyzer: None,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

fn default_tool_timeout() -> u64 {
    DEFAULT_TOOL_TIMEOUT_SECS
}

/// TOML config file contents (all optional, third resolution tier)
#[derive(Debug, Default, Deserialize)]
pub struct TomlConfig {
    pub upload_root: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub public_base_url: Option<String>,
    pub viewer_base_url: Option<String>,
    pub max_upload_bytes: Option<usize>,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub upload_root: PathBuf,
    pub bind_addr: String,
    pub public_base_url: String,
    pub viewer_base_url: Option<String>,
    pub max_upload_bytes: usize,
    pub tools: ToolsConfig,
}

impl Config {
    /// Resolve configuration from all tiers
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let toml_config = load_toml_config(cli.config_file.as_deref())?;

        let upload_root = cli
            .upload_root
            .clone()
            .or(toml_config.upload_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_ROOT));

        let bind_addr = cli
            .bind_addr
            .clone()
            .or(toml_config.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        // Default works for local use; deployments behind a proxy or DNS name
        // must override so manifest URLs stay dereferenceable
        let public_base_url = cli
            .public_base_url
            .clone()
            .or(toml_config.public_base_url)
            .unwrap_or_else(|| format!("http://{}", bind_addr));

        let viewer_base_url = cli.viewer_base_url.clone().or(toml_config.viewer_base_url);

        let max_upload_bytes = toml_config
            .max_upload_bytes
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            upload_root,
            bind_addr,
            public_base_url,
            viewer_base_url,
            max_upload_bytes,
            tools: toml_config.tools,
        })
    }
}

/// Read the TOML config file if one exists
///
/// Search order: explicit path (CLI/ENV), then
/// `~/.config/mtk-host/config.toml`. A missing file is not an error;
/// a malformed one is.
fn load_toml_config(explicit: Option<&std::path::Path>) -> anyhow::Result<TomlConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => dirs::config_dir().map(|d| d.join("mtk-host").join("config.toml")),
    };

    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        if explicit.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Read config failed: {}", path.display()))?;
    let config: TomlConfig = toml::from_str(&content)
        .with_context(|| format!("Parse config failed: {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}
