use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// CORS allowed origins; empty allows every origin (dev mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub servicenow: ServiceNowConfig,
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            watch: WatchConfig::default(),
            report: ReportConfig::default(),
            smtp: SmtpConfig::default(),
            servicenow: ServiceNowConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL, e.g. `sqlite://data/auditmon.db?mode=rwc`.
    #[serde(default = "default_db_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_watch_enabled")]
    pub enabled: bool,
    /// How often the scheduler checks whether a cycle is due.
    #[serde(default = "default_watch_tick_secs")]
    pub tick_secs: u64,
    /// Minimum seconds between two slurp/audit cycles.
    #[serde(default = "default_watch_interval_secs")]
    pub interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: default_watch_enabled(),
            tick_secs: default_watch_tick_secs(),
            interval_secs: default_watch_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_enabled")]
    pub enabled: bool,
    #[serde(default = "default_report_tick_secs")]
    pub tick_secs: u64,
    /// Seconds between two report mails per account.
    #[serde(default = "default_report_interval_secs")]
    pub interval_secs: u64,
    /// Day window for the "recent" report sections.
    #[serde(default = "default_report_days")]
    pub days: i64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: default_report_enabled(),
            tick_secs: default_report_tick_secs(),
            interval_secs: default_report_interval_secs(),
            days: default_report_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_smtp_from")]
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from: default_smtp_from(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceNowConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ---- Seed file types (used by the `init-accounts` CLI subcommand) ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsSeedFile {
    #[serde(default)]
    pub accounts: Vec<SeedAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    pub name: String,
    pub identifier: String,
    #[serde(default = "default_seed_active")]
    pub active: bool,
    #[serde(default)]
    pub third_party: bool,
    #[serde(default)]
    pub notify_emails: Vec<String>,
    #[serde(default)]
    pub ignore_list: Vec<String>,
}

fn default_seed_active() -> bool {
    true
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_url() -> String {
    "sqlite://data/auditmon.db?mode=rwc".to_string()
}

fn default_watch_enabled() -> bool {
    true
}

fn default_watch_tick_secs() -> u64 {
    60
}

fn default_watch_interval_secs() -> u64 {
    3600
}

fn default_report_enabled() -> bool {
    false
}

fn default_report_tick_secs() -> u64 {
    600
}

fn default_report_interval_secs() -> u64 {
    86400
}

fn default_report_days() -> i64 {
    1
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "auditmon@localhost".to_string()
}
