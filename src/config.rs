use serde::Deserialize;
use std::{fs, path::Path};
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: Api,
    pub payment: Payment,
    pub metrics: Metrics,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Api {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Payment {
    /// Floor for request-to-pay amounts, in minor currency units.
    #[serde(default = "default_min_amount")]
    pub min_amount: u64,
    #[serde(default = "default_qr_expiry")]
    pub qr_expires_in_minutes: u32,
    /// Digits required before a phone search is allowed to run.
    #[serde(default = "default_phone_digits")]
    pub min_phone_digits: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metrics {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_timeout() -> u64      { 20 }
fn default_min_amount() -> u64   { 1_000 }
fn default_qr_expiry() -> u32    { 5 }
fn default_phone_digits() -> usize { 8 }
fn default_bind() -> String      { "0.0.0.0:9100".into() }

/// Read the TOML file at `p` and deserialize into `Config`.
/// *Adds context* so user errors print a friendlier message.
///
/// # Errors
/// * Returns an anyhow::Error if the file cannot be read or parsed.
pub fn load<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .with_context(|| format!("🗂️  couldn't read config file {}", p.as_ref().display()))?;
    load_from_str(&text)
}

pub fn load_from_str(text: &str) -> Result<Config> {
    toml::from_str(text).with_context(|| "📝  invalid TOML in config file".to_string())
}
