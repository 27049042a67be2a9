//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Exchange rate source configuration.
    #[serde(default)]
    pub rates: RatesConfig,
    /// Approval workflow configuration.
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Exchange rate source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    /// Base URL of the rate API. The base currency code is appended as the last path segment.
    #[serde(default = "default_rates_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_rates_timeout")]
    pub timeout_secs: u64,
}

fn default_rates_base_url() -> String {
    "https://api.exchangerate-api.com/v4/latest".to_string()
}

fn default_rates_timeout() -> u64 {
    5
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: default_rates_base_url(),
            timeout_secs: default_rates_timeout(),
        }
    }
}

/// Approval workflow configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// Minimum approval percent for companies that have not set one.
    #[serde(default = "default_minimum_approval_percent")]
    pub default_minimum_approval_percent: u8,
    /// Require every approver at a sequential step to approve before advancing.
    ///
    /// Off by default: a single approval advances the step.
    #[serde(default)]
    pub step_requires_unanimous: bool,
    /// Select the approval rule by expense amount and category.
    ///
    /// When disabled, the first active rule of the company applies to every expense.
    #[serde(default = "default_scoped_rule_selection")]
    pub scoped_rule_selection: bool,
}

fn default_minimum_approval_percent() -> u8 {
    50
}

fn default_scoped_rule_selection() -> bool {
    true
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_minimum_approval_percent: default_minimum_approval_percent(),
            step_requires_unanimous: false,
            scoped_rule_selection: default_scoped_rule_selection(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "outlay=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("OUTLAY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
