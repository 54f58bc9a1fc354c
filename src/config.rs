//! Runtime settings.
//!
//! Layered with the [`config`] crate, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `commerce-ext.toml` in the working directory, or the file named by
//!    `COMMERCE_EXT_CONFIG` (optional)
//! 3. environment variables prefixed `COMMERCE_EXT__`, nested with `__`,
//!    e.g. `COMMERCE_EXT__VAT__TTL_SECONDS=3600`

use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Errors raised while assembling [`Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid URL for `{field}`: {source}")]
    InvalidUrl {
        field: String,
        #[source]
        source: url::ParseError,
    },
}

const DEFAULT_CONFIG_FILE: &str = "commerce-ext";
const ENV_PREFIX: &str = "COMMERCE_EXT";

/// Mock VAT-rate service; point `vat.rates_endpoint` elsewhere in production.
pub const DEFAULT_RATES_ENDPOINT: &str = "https://68f9294cdeff18f212b8d32d.mockapi.io/vatrates";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub log_level: String,
    pub vat: VatSettings,
    #[serde(default)]
    pub sources: HashMap<String, SourceSettings>,
    #[serde(default)]
    pub actions: ActionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VatSettings {
    pub rates_endpoint: String,
    /// Seven days by default; rates change rarely.
    pub ttl_seconds: u64,
    pub policy_market_header: String,
    pub cache_key: String,
    pub request_timeout_secs: u64,
}

impl VatSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for VatSettings {
    fn default() -> Self {
        Self {
            rates_endpoint: DEFAULT_RATES_ENDPOINT.to_owned(),
            ttl_seconds: 604_800,
            policy_market_header: "AC-Policy-Market".to_owned(),
            cache_key: "VAT_RATES".to_owned(),
            request_timeout_secs: 10,
        }
    }
}

/// One upstream GraphQL source, e.g. `sources.Commerce.endpoint`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    pub endpoint: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Default parameters bound to every web action invocation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionSettings {
    pub slack_webhook: Option<String>,
    pub log_level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind: "127.0.0.1:8080".to_owned(),
            },
            log_level: "info".to_owned(),
            vat: VatSettings::default(),
            sources: HashMap::new(),
            actions: ActionSettings::default(),
        }
    }
}

impl Settings {
    /// Looks up a source by name, ignoring case.
    pub fn source(&self, name: &str) -> Option<&SourceSettings> {
        self.sources
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Loads settings from defaults, the optional file, and the environment.
    pub fn load() -> Result<Self, SettingsError> {
        let file = std::env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_owned());
        Self::from_builder(
            defaults()?
                .add_source(File::with_name(&file).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("__")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    /// Loads settings from defaults overlaid with a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        Self::from_builder(
            defaults()?.add_source(File::from_str(text, config::FileFormat::Toml)),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        check_url("vat.rates_endpoint", &self.vat.rates_endpoint)?;
        for (name, source) in &self.sources {
            check_url(&format!("sources.{name}.endpoint"), &source.endpoint)?;
        }
        if let Some(hook) = &self.actions.slack_webhook {
            check_url("actions.slack_webhook", hook)?;
        }
        Ok(())
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, SettingsError> {
    let d = Settings::default();
    Ok(Config::builder()
        .set_default("server.bind", d.server.bind)?
        .set_default("log_level", d.log_level)?
        .set_default("vat.rates_endpoint", d.vat.rates_endpoint)?
        .set_default("vat.ttl_seconds", d.vat.ttl_seconds)?
        .set_default("vat.policy_market_header", d.vat.policy_market_header)?
        .set_default("vat.cache_key", d.vat.cache_key)?
        .set_default("vat.request_timeout_secs", d.vat.request_timeout_secs)?)
}

fn check_url(field: &str, value: &str) -> Result<(), SettingsError> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|source| SettingsError::InvalidUrl {
            field: field.to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_sources() {
        let s = Settings::from_toml("").unwrap();
        assert_eq!(s.server.bind, "127.0.0.1:8080");
        assert_eq!(s.vat.ttl_seconds, 604_800);
        assert_eq!(s.vat.cache_key, "VAT_RATES");
        assert_eq!(s.vat.policy_market_header, "AC-Policy-Market");
        assert_eq!(s.vat.request_timeout(), Duration::from_secs(10));
        assert!(s.sources.is_empty());
        assert!(s.actions.slack_webhook.is_none());
    }

    #[test]
    fn toml_overrides_and_sources() {
        let s = Settings::from_toml(
            r#"
            log_level = "debug"

            [vat]
            ttl_seconds = 60

            [sources.Commerce]
            endpoint = "https://commerce.example.com/graphql"
            headers = { Store = "default" }

            [actions]
            slack_webhook = "https://hooks.slack.com/services/T/B/X"
            "#,
        )
        .unwrap();

        assert_eq!(s.log_level, "debug");
        assert_eq!(s.vat.ttl_seconds, 60);
        assert_eq!(s.vat.cache_key, "VAT_RATES");
        let commerce = s.source("commerce").unwrap();
        assert_eq!(commerce.endpoint, "https://commerce.example.com/graphql");
        assert_eq!(commerce.headers.values().next().map(String::as_str), Some("default"));
        assert!(s.actions.slack_webhook.is_some());
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let err = Settings::from_toml(
            r#"
            [vat]
            rates_endpoint = "not a url"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidUrl { ref field, .. } if field == "vat.rates_endpoint"));
    }
}
