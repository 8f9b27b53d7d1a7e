//! Query configuration
//!
//! Page size, translation mode and fan-out limits shared by every query
//! issued through one client.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// How the translator treats conditions the remote cannot express exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// Fail at plan finalization
    #[default]
    Strict,
    /// Resolve deterministically, evaluate the rest locally, and log it
    Permissive,
}

impl TranslationMode {
    /// Config spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationMode::Strict => "strict",
            TranslationMode::Permissive => "permissive",
        }
    }

    /// Whether inexpressible conditions are errors
    pub fn is_strict(&self) -> bool {
        matches!(self, TranslationMode::Strict)
    }
}

/// Query client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Items requested per page (default: 500)
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Translation mode (default: strict)
    #[serde(default)]
    pub mode: TranslationMode,

    /// Widest accepted fan-out (default: 64)
    #[serde(default = "default_max_fan_out")]
    pub max_fan_out: usize,
}

fn default_page_size() -> u64 {
    500
}

fn default_max_fan_out() -> usize {
    64
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            mode: TranslationMode::default(),
            max_fan_out: default_max_fan_out(),
        }
    }
}

impl QueryConfig {
    /// Default config with the given page size
    pub fn with_page_size(page_size: u64) -> Self {
        Self {
            page_size,
            ..Default::default()
        }
    }

    /// Default config in permissive mode
    pub fn permissive() -> Self {
        Self {
            mode: TranslationMode::Permissive,
            ..Default::default()
        }
    }

    /// Parses and validates a JSON config
    pub fn from_json(json: &str) -> QueryResult<Self> {
        let config: QueryConfig = serde_json::from_str(json)
            .map_err(|e| QueryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects a zero page size or fan-out limit
    pub fn validate(&self) -> QueryResult<()> {
        if self.page_size == 0 {
            return Err(QueryError::InvalidConfig(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.max_fan_out == 0 {
            return Err(QueryError::InvalidConfig(
                "max_fan_out must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
