//! Configuration for brewbot.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (BREWBOT_TOKEN, BREWBOT_LEDGER_TOKEN, BREWBOT_MENU_URL)
//! 2. Config file (.brewbot/config.yaml)
//! 3. Defaults
//!
//! Config file discovery searches the current directory and its parents for
//! .brewbot/config.yaml.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<std::result::Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub telegram: Option<TelegramSection>,
    #[serde(default)]
    pub ledger: Option<LedgerSection>,
    #[serde(default)]
    pub menu: Option<MenuSection>,
    #[serde(default)]
    pub pricing: Option<PricingSection>,
    #[serde(default)]
    pub limits: Option<LimitsSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSection {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    pub endpoint: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub tab: Option<String>,
    pub sheet_gid: Option<i64>,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuSection {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingSection {
    pub milk_upcharge: Option<f64>,
    pub cup_discount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    pub dedup_capacity: Option<usize>,
    pub gate_capacity: Option<usize>,
    pub request_timeout_seconds: Option<u64>,
}

/// Resolved configuration with all defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Telegram bot token
    pub bot_token: String,
    /// Ledger API endpoint
    pub ledger_endpoint: String,
    /// Spreadsheet document id
    pub spreadsheet_id: String,
    /// Tab (range prefix) orders are appended to
    pub ledger_tab: String,
    /// Numeric grid id of the tab, used for row deletion
    pub sheet_gid: i64,
    /// Bearer token for the ledger API
    pub ledger_token: String,
    /// Remote menu CSV, None means built-in menu
    pub menu_url: Option<String>,
    /// Modifier price adjustments
    pub milk_upcharge: f64,
    pub cup_discount: f64,
    /// Inbound update dedup window
    pub dedup_capacity: usize,
    /// Modifier prompt gate window
    pub gate_capacity: usize,
    /// Bounded timeout for every external call
    pub request_timeout: Duration,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

const DEFAULT_LEDGER_ENDPOINT: &str = "https://sheets.googleapis.com";
const DEFAULT_LEDGER_TAB: &str = "Orders";
const DEFAULT_DEDUP_CAPACITY: usize = 1000;
const DEFAULT_GATE_CAPACITY: usize = 1000;
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_MILK_UPCHARGE: f64 = 0.50;
const DEFAULT_CUP_DISCOUNT: f64 = 0.50;

/// Find config file by searching current directory and parents, then the
/// home directory (~/.brewbot/config.yaml)
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".brewbot").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(".brewbot").join("config.yaml");
    if home_config.exists() {
        return Some(home_config);
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    let telegram = file.as_ref().and_then(|f| f.telegram.clone());
    let ledger = file.as_ref().and_then(|f| f.ledger.clone());
    let menu = file.as_ref().and_then(|f| f.menu.clone());
    let pricing = file.as_ref().and_then(|f| f.pricing.clone());
    let limits = file.as_ref().and_then(|f| f.limits.clone());

    let bot_token = std::env::var("BREWBOT_TOKEN")
        .ok()
        .or_else(|| telegram.and_then(|t| t.token))
        .unwrap_or_default();

    let ledger_token = std::env::var("BREWBOT_LEDGER_TOKEN")
        .ok()
        .or_else(|| ledger.as_ref().and_then(|l| l.api_token.clone()))
        .unwrap_or_default();

    let menu_url = std::env::var("BREWBOT_MENU_URL")
        .ok()
        .or_else(|| menu.and_then(|m| m.url));

    Ok(ResolvedConfig {
        bot_token,
        ledger_endpoint: ledger
            .as_ref()
            .and_then(|l| l.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_LEDGER_ENDPOINT.to_string()),
        spreadsheet_id: ledger
            .as_ref()
            .and_then(|l| l.spreadsheet_id.clone())
            .unwrap_or_default(),
        ledger_tab: ledger
            .as_ref()
            .and_then(|l| l.tab.clone())
            .unwrap_or_else(|| DEFAULT_LEDGER_TAB.to_string()),
        sheet_gid: ledger.as_ref().and_then(|l| l.sheet_gid).unwrap_or(0),
        ledger_token,
        menu_url,
        milk_upcharge: pricing
            .as_ref()
            .and_then(|p| p.milk_upcharge)
            .unwrap_or(DEFAULT_MILK_UPCHARGE),
        cup_discount: pricing
            .as_ref()
            .and_then(|p| p.cup_discount)
            .unwrap_or(DEFAULT_CUP_DISCOUNT),
        dedup_capacity: limits
            .as_ref()
            .and_then(|l| l.dedup_capacity)
            .unwrap_or(DEFAULT_DEDUP_CAPACITY),
        gate_capacity: limits
            .as_ref()
            .and_then(|l| l.gate_capacity)
            .unwrap_or(DEFAULT_GATE_CAPACITY),
        request_timeout: Duration::from_secs(
            limits
                .as_ref()
                .and_then(|l| l.request_timeout_seconds)
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        ),
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let brewbot_dir = temp.path().join(".brewbot");
        std::fs::create_dir_all(&brewbot_dir).unwrap();

        let config_path = brewbot_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
telegram:
  token: "BOT_TOKEN"
ledger:
  spreadsheet_id: "SHEET"
  tab: "Orders"
  sheet_gid: 42
pricing:
  milk_upcharge: 0.60
limits:
  dedup_capacity: 500
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(
            config.telegram.unwrap().token.as_deref(),
            Some("BOT_TOKEN")
        );
        let ledger = config.ledger.unwrap();
        assert_eq!(ledger.spreadsheet_id.as_deref(), Some("SHEET"));
        assert_eq!(ledger.sheet_gid, Some(42));
        assert_eq!(config.pricing.unwrap().milk_upcharge, Some(0.60));
        assert_eq!(config.limits.unwrap().dedup_capacity, Some(500));
    }

    #[test]
    fn test_defaults_without_file_sections() {
        let yaml = r#"version: "1.0""#;
        let parsed: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert!(parsed.telegram.is_none());
        assert!(parsed.ledger.is_none());
        assert!(parsed.limits.is_none());
    }
}
