use parkade_core::FeePolicy;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_unit_minutes")]
    pub unit_minutes: u32,
    #[serde(default = "default_one")]
    pub unit_price: i64,
    #[serde(default = "default_one")]
    pub minimum_charge: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Lets an admin shrink a location past occupied slots, dropping them.
    #[serde(default)]
    pub allow_destructive_shrink: bool,
    #[serde(default = "default_max_slots")]
    pub max_slots_per_location: u32,
    #[serde(default = "default_retry_attempts")]
    pub settle_retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub settle_retry_backoff_ms: u64,
}

fn default_unit_minutes() -> u32 { 30 }
fn default_one() -> i64 { 1 }
fn default_currency() -> String { "USD".to_string() }
fn default_max_slots() -> u32 { 10_000 }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_backoff_ms() -> u64 { 50 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            unit_minutes: default_unit_minutes(),
            unit_price: default_one(),
            minimum_charge: default_one(),
            currency: default_currency(),
            allow_destructive_shrink: false,
            max_slots_per_location: default_max_slots(),
            settle_retry_attempts: default_retry_attempts(),
            settle_retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl BusinessRules {
    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy {
            unit_minutes: self.unit_minutes,
            unit_price: self.unit_price,
            minimum_charge: self.minimum_charge,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding `parkingdata.json`, `bookings.json` and `payments.json`.
    pub data_dir: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `PARKADE_SERVER__PORT=8081`
            .add_source(config::Environment::with_prefix("PARKADE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
