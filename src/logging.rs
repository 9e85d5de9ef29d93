//! Tracing setup for processes embedding the confidential client or the validator chain
//!
//! Events from the workspace crates carry structured fields (`chaincode`, `enclave`,
//! `evidence_type`, `block`, ...). The JSON format keeps them as separate keys.

use crate::error::{PccError, PccResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// `[logging]` section of the client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive such as `info` or `warn,pcc_validation=debug`.
    /// `RUST_LOG` replaces it when set.
    pub level: String,

    pub format: LogFormat,

    /// Only honored by `text` and `compact`
    pub color: bool,

    pub include_target: bool,

    /// File and line of each event (`text` and `json`)
    pub include_location: bool,

    /// Log span open and close
    pub span_events: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Compact,
    /// One JSON object per event
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            color: true,
            include_target: true,
            include_location: false,
            span_events: false,
        }
    }
}

impl LogConfig {
    /// Filter built from the configured directive
    pub fn filter(&self) -> PccResult<EnvFilter> {
        EnvFilter::try_new(&self.level).map_err(|e| {
            PccError::Config(format!("invalid logging level {:?}: {}", self.level, e))
        })
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    fn output_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self.format {
            LogFormat::Text => fmt::layer()
                .with_ansi(self.color)
                .with_target(self.include_target)
                .with_file(self.include_location)
                .with_line_number(self.include_location)
                .with_span_events(self.span_events())
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_ansi(self.color)
                .with_target(self.include_target)
                .with_span_events(self.span_events())
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_target(self.include_target)
                .with_file(self.include_location)
                .with_line_number(self.include_location)
                .with_span_events(self.span_events())
                .boxed(),
        }
    }
}

/// Install the global tracing subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> PccResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config.filter()?,
    };

    tracing_subscriber::registry()
        .with(config.output_layer())
        .with(filter)
        .try_init()
        .map_err(|e| PccError::LoggingInit(e.to_string()))?;

    tracing::info!(level = %config.level, format = ?config.format, "logging initialized");
    Ok(())
}
