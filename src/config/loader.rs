use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::Parser;
use reqwest::Url;

use crate::config::settings::{
    ApiKeySet, Credentials, LogFormat, LoggingConfig, MetricsConfig, ProxySettings, ServerConfig,
    UpstreamConfig,
};
use crate::errors::ConfigurationError;
use crate::utils::constants::*;
use crate::utils::logging::LogLevel;

/// Every setting can come from the environment (or a `.env` file) or the command line.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct ProxyArgs {
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "NUSAWORK_CLIENT_ID", value_parser = NonEmptyStringValueParser::new())]
    pub client_id: String,
    #[arg(long, env = "NUSAWORK_CLIENT_SECRET", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    pub client_secret: String,
    #[arg(long, env = "NUSAWORK_GRANT_TYPE", value_parser = NonEmptyStringValueParser::new())]
    pub grant_type: String,
    #[arg(long, env = "NUSAWORK_USERNAME", value_parser = NonEmptyStringValueParser::new())]
    pub username: String,
    #[arg(long, env = "NUSAWORK_PASSWORD", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    pub password: String,
    #[arg(long, env = "NUSAWORK_PANEL_USER_API_BASE_URL", value_parser = NonEmptyStringValueParser::new())]
    pub panel_user_api_base_url: String,
    #[arg(long, env = "NUSAWORK_TOKEN_ENDPOINT_PATH", value_parser = NonEmptyStringValueParser::new())]
    pub token_endpoint_path: String,

    #[arg(long, env = "TOKEN_REFRESH_MARGIN", default_value_t = DEFAULT_REFRESH_MARGIN_SECS, allow_negative_numbers = true)]
    pub token_refresh_margin: i64,
    /// JSON array of accepted `x-api-key` values
    #[arg(long, env = "API_KEYS", hide_env_values = true, default_value = "[]", value_parser = parse_api_keys)]
    pub api_keys: ApiKeySet,
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECONDS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS)]
    pub upstream_timeout_seconds: u64,

    #[arg(long, env = "METRICS_ENABLED", default_value_t = false)]
    pub metrics_enabled: bool,
    #[arg(long, env = "METRICS_PATH", default_value = DEFAULT_METRICS_PATH)]
    pub metrics_path: String,

    #[arg(long, env = "LOG_LEVEL", value_enum)]
    pub log_level: Option<LogLevel>,
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

fn parse_api_keys(raw: &str) -> Result<ApiKeySet, String> {
    serde_json::from_str(raw).map_err(|e| format!("expected a JSON array of strings: {}", e))
}

/// Parse process arguments and environment into validated settings.
///
/// `--help` and `--version` print and exit here, like a plain `Parser::parse` would.
pub fn load() -> Result<ProxySettings, ConfigurationError> {
    let args = match ProxyArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => return Err(ConfigurationError::Arguments(e.to_string())),
    };
    ProxySettings::try_from(args)
}

impl TryFrom<ProxyArgs> for ProxySettings {
    type Error = ConfigurationError;

    fn try_from(args: ProxyArgs) -> Result<Self, Self::Error> {
        Url::parse(&args.panel_user_api_base_url).map_err(|e| ConfigurationError::Invalid {
            name: "NUSAWORK_PANEL_USER_API_BASE_URL",
            reason: e.to_string(),
        })?;
        if args.upstream_timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                name: "UPSTREAM_TIMEOUT_SECONDS",
                reason: "must be greater than zero".to_owned(),
            });
        }

        let metrics_path = if args.metrics_path.starts_with('/') {
            args.metrics_path
        } else {
            format!("/{}", args.metrics_path)
        };
        if args.metrics_enabled && TOKEN_ROUTES.contains(&metrics_path.as_str()) {
            return Err(ConfigurationError::Invalid {
                name: "METRICS_PATH",
                reason: format!("{} is already served by the token route", metrics_path),
            });
        }

        Ok(ProxySettings {
            server: ServerConfig {
                host: args.host,
                port: args.port,
            },
            upstream: UpstreamConfig {
                panel_user_api_base_url: args.panel_user_api_base_url,
                token_endpoint_path: args.token_endpoint_path,
                timeout_seconds: args.upstream_timeout_seconds,
            },
            credentials: Credentials {
                client_id: args.client_id,
                client_secret: args.client_secret,
                grant_type: args.grant_type,
                username: args.username,
                password: args.password,
            },
            refresh_margin_seconds: args.token_refresh_margin,
            api_keys: args.api_keys,
            metrics: MetricsConfig {
                path: metrics_path,
                is_enabled: args.metrics_enabled,
            },
            logging: LoggingConfig::new(
                args.log_level
                    .map(|level| level.as_str().to_owned())
                    .unwrap_or_else(|| "info".to_owned()),
                args.log_format,
            ),
        })
    }
}
