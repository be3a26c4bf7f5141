//! Valuation configuration

use crate::error::{LedgerError, Result};
use crate::types::CurrencyId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for one valuation context
///
/// # Example
/// ```
/// use rusty_ledger::config::ValuationConfig;
///
/// let config = ValuationConfig::from_toml_str(r#"
///     base_currency = "6f1c1f7e-8a3b-4c55-9f0e-0d9a8a6e2b11"
///     result_scale = 8
/// "#).unwrap();
///
/// assert_eq!(config.result_scale, Some(8));
/// assert_eq!(config.max_chain_depth, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Currency every balance is converted into
    pub base_currency: Option<CurrencyId>,
    /// Decimal places interpolated rates are rounded to (none: full precision)
    pub result_scale: Option<u32>,
    /// Longest currency -> ref currency chain followed before giving up
    pub max_chain_depth: usize,
    /// Default number of samples for timelines and rate histories
    pub timeline_divisions: usize,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            base_currency: None,
            result_scale: None,
            max_chain_depth: 100,
            timeline_divisions: 500,
        }
    }
}

impl ValuationConfig {
    pub fn with_base_currency(base_currency: CurrencyId) -> Self {
        Self {
            base_currency: Some(base_currency),
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// The base currency, or a configuration error if none is set
    pub fn require_base_currency(&self) -> Result<CurrencyId> {
        self.base_currency
            .ok_or_else(|| LedgerError::Config("base_currency is not set".to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chain_depth == 0 {
            return Err(LedgerError::Config(
                "max_chain_depth must be at least 1".to_string(),
            ));
        }
        if self.timeline_divisions == 0 {
            return Err(LedgerError::Config(
                "timeline_divisions must be at least 1".to_string(),
            ));
        }
        if let Some(scale) = self.result_scale {
            if scale > 28 {
                return Err(LedgerError::Config(format!(
                    "result_scale must be at most 28, got {}",
                    scale
                )));
            }
        }
        Ok(())
    }
}
