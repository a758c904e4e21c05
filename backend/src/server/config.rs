//! Application settings loaded via OrthoConfig and the server configuration
//! assembled from them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use siteulation::domain::generation::DEFAULT_HISTORY_DEPTH;
use siteulation::domain::generation_service::{DEFAULT_GENERATION_TIMEOUT, PROMPT_MAX};
use siteulation::domain::{GenerationLimits, ModelTier, TokenPolicy};
use siteulation::inbound::http::session_config::SessionSettings;
use siteulation::outbound::generation::ModelNames;
use siteulation::outbound::persistence::{DEFAULT_MAX_CONNECTIONS, DbPool, PoolConfig};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised while interpreting loaded settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address {value:?}: {message}")]
    BindAddr { value: String, message: String },
    #[error("invalid generation url {value:?}: {message}")]
    GenerationUrl { value: String, message: String },
}

/// Runtime settings layered from CLI flags, `SITEULATION_*` variables and
/// configuration files.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SITEULATION")]
pub struct AppSettings {
    /// Socket address to listen on.
    #[ortho_config(default = DEFAULT_BIND_ADDR.to_owned())]
    pub bind_addr: String,
    /// PostgreSQL URL; without it the server keeps state in memory.
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    /// Chat-completions endpoint; without it pages come from a local template.
    pub generation_url: Option<String>,
    pub generation_api_key: Option<String>,
    pub generation_fast_model: Option<String>,
    pub generation_quality_model: Option<String>,
    pub generation_timeout_secs: Option<u64>,
    pub fast_cost: Option<u32>,
    pub quality_cost: Option<u32>,
    pub initial_tokens: Option<u32>,
    pub refill_amount: Option<u32>,
    pub refill_period_hours: Option<u32>,
    /// Prior versions sent to the backend as context.
    pub history_depth: Option<usize>,
    /// Directory for the page mirror; mirroring is off when unset.
    pub mirror_dir: Option<PathBuf>,
}

impl AppSettings {
    /// Parsed listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.trim();
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    /// Parsed generation endpoint, if one is configured.
    pub fn generation_endpoint(&self) -> Result<Option<Url>, SettingsError> {
        self.generation_url
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                Url::parse(raw).map_err(|err| SettingsError::GenerationUrl {
                    value: raw.to_owned(),
                    message: err.to_string(),
                })
            })
            .transpose()
    }

    pub fn generation_timeout(&self) -> Duration {
        self.generation_timeout_secs
            .map_or(DEFAULT_GENERATION_TIMEOUT, Duration::from_secs)
    }

    pub fn model_names(&self) -> ModelNames {
        let defaults = ModelNames::default();
        ModelNames {
            fast: self.generation_fast_model.clone().unwrap_or(defaults.fast),
            quality: self
                .generation_quality_model
                .clone()
                .unwrap_or(defaults.quality),
        }
    }

    /// Quota rules with configured overrides applied.
    pub fn token_policy(&self) -> TokenPolicy {
        let defaults = TokenPolicy::default();
        let refill_period = self
            .refill_period_hours
            .map_or(defaults.refill_period(), |hours| {
                ChronoDuration::hours(i64::from(hours))
            });
        defaults
            .with_initial_tokens(self.initial_tokens.unwrap_or(defaults.initial_tokens()))
            .with_refill(
                self.refill_amount.unwrap_or(defaults.refill_amount()),
                refill_period,
            )
            .with_costs(
                self.fast_cost.unwrap_or(defaults.cost(ModelTier::Fast)),
                self.quality_cost
                    .unwrap_or(defaults.cost(ModelTier::Quality)),
            )
    }

    pub fn generation_limits(&self) -> GenerationLimits {
        GenerationLimits {
            prompt_max: PROMPT_MAX,
            history_depth: self.history_depth.unwrap_or(DEFAULT_HISTORY_DEPTH),
            timeout: self.generation_timeout(),
        }
    }

    /// Pool configuration when a database is configured.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                PoolConfig::new(url).with_max_size(
                    self.database_max_connections
                        .unwrap_or(DEFAULT_MAX_CONNECTIONS),
                )
            })
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) settings: AppSettings,
}

impl ServerConfig {
    /// Construct a server configuration from loaded settings.
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr, settings: AppSettings) -> Self {
        Self {
            session,
            bind_addr,
            db_pool: None,
            settings,
        }
    }

    /// Attach a database connection pool; persistence switches from memory
    /// to PostgreSQL.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}
