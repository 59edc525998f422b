//! # Application State
//!
//! Configuration read from the environment and the shared registry handed
//! to every handler through the `State` extractor.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use itr_reconcile::{ReconcileConfig, Reconciler};
use itr_state::{FilingError, FilingRegistry, RetryPolicy, SandboxGateway, SubmissionGateway};
use itr_tax::{TableProvider, TableSet};
use rust_decimal::Decimal;
use thiserror::Error;

/// A configuration variable could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

/// Runtime configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory of statutory table YAML files. `None` uses the built-in set.
    pub tables_dir: Option<PathBuf>,
    pub reconcile: ReconcileConfig,
    pub retry: RetryPolicy,
    /// Shared secret the gateway presents on callbacks as
    /// `x-callback-token`. If `None`, callbacks are accepted unauthenticated.
    pub callback_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("tables_dir", &self.tables_dir)
            .field("reconcile", &self.reconcile)
            .field("retry", &self.retry)
            .field("callback_token", &self.callback_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            tables_dir: None,
            reconcile: ReconcileConfig::default(),
            retry: RetryPolicy::default(),
            callback_token: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`. Unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(port) = parse_var(&lookup, "PORT")? {
            config.port = port;
        }
        config.tables_dir = lookup("ITR_TABLES_DIR").filter(|d| !d.is_empty()).map(PathBuf::from);
        if let Some(v) = parse_var::<Decimal>(&lookup, "ITR_TOLERANCE_ABS")? {
            config.reconcile.absolute_tolerance = v;
        }
        if let Some(v) = parse_var::<Decimal>(&lookup, "ITR_TOLERANCE_REL")? {
            config.reconcile.relative_tolerance = v;
        }
        if let Some(v) = parse_var::<Decimal>(&lookup, "ITR_MATERIAL_THRESHOLD")? {
            config.reconcile.material_threshold = v;
        }
        if let Some(n) = parse_var(&lookup, "ITR_SUBMIT_MAX_ATTEMPTS")? {
            config.retry.max_attempts = n;
        }
        if let Some(ms) = parse_var(&lookup, "ITR_SUBMIT_BASE_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        config.callback_token = lookup("ITR_CALLBACK_TOKEN").filter(|t| !t.is_empty());
        config.reconcile.validate().map_err(|e| ConfigError {
            var: "ITR_TOLERANCE_*",
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError {
            var,
            reason: format!("{raw:?}: {e}"),
        }),
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<FilingRegistry>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Load tables and assemble a registry backed by the sandbox gateway.
    pub fn new(config: AppConfig) -> Result<Self, FilingError> {
        Self::with_gateway(config, Arc::new(SandboxGateway::new()))
    }

    pub fn with_gateway(config: AppConfig, gateway: Arc<dyn SubmissionGateway>) -> Result<Self, FilingError> {
        let tables: Arc<dyn TableProvider> = match &config.tables_dir {
            Some(dir) => Arc::new(TableSet::from_dir(dir)?),
            None => Arc::new(TableSet::builtin()?),
        };
        let reconciler = Reconciler::new(config.reconcile.clone())?;
        let registry = FilingRegistry::new(tables, reconciler, gateway)?;
        Ok(Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.tables_dir.is_none());
        assert_eq!(config.reconcile, ReconcileConfig::default());
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn overrides_from_environment() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("ITR_TOLERANCE_REL", "0.02"),
            ("ITR_SUBMIT_MAX_ATTEMPTS", "6"),
            ("ITR_SUBMIT_BASE_DELAY_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.reconcile.relative_tolerance, Decimal::new(2, 2));
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err.var, "PORT");
        let err = AppConfig::from_lookup(lookup(&[("ITR_MATERIAL_THRESHOLD", "1.5")])).unwrap_err();
        assert!(err.reason.contains("material_threshold"));
    }

    #[test]
    fn debug_redacts_callback_token() {
        let config = AppConfig::from_lookup(lookup(&[("ITR_CALLBACK_TOKEN", "s3cret")])).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
