//! Environment-driven configuration.
//!
//! Settings are read once at startup. `.env` files are honoured through
//! `dotenvy` by the binary before [`AppConfig::from_env`] runs.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::ApiServerConfig;
use crate::detector::FirstSeenPolicy;
use crate::dispatcher::DispatcherConfig;
use crate::error::{Error, Result};
use crate::fetcher::{DockerHubConfig, GithubConfig};
use crate::notification::channels::{
    ChannelsConfig, DiscordConfig, GotifyConfig, NtfyConfig, SlackConfig,
};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:release-watch.db?mode=rwc";

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub dispatcher: DispatcherConfig,
    pub first_seen: FirstSeenPolicy,
    pub github: GithubConfig,
    pub docker: DockerHubConfig,
    pub channels: ChannelsConfig,
    /// Per-request timeout for every outbound call.
    pub request_timeout: Duration,
    pub api_enabled: bool,
    pub api: ApiServerConfig,
    /// Daily-rolling log files are written here when set.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let dispatcher = DispatcherConfig {
            poll_interval: Duration::from_secs(parse_or(&get, "POLL_INTERVAL_SECS", 3600u64)?),
            max_concurrent_fetches: parse_or(&get, "MAX_CONCURRENT_FETCHES", 8usize)?,
        };
        if dispatcher.poll_interval.is_zero() {
            return Err(Error::config("POLL_INTERVAL_SECS must be greater than 0"));
        }
        if dispatcher.max_concurrent_fetches == 0 {
            return Err(Error::config("MAX_CONCURRENT_FETCHES must be greater than 0"));
        }

        let first_seen = if parse_bool(&get, "NOTIFY_ON_FIRST_SEEN", true)? {
            FirstSeenPolicy::Notify
        } else {
            FirstSeenPolicy::SeedOnly
        };

        let mut github = GithubConfig {
            token: get("GITHUB_TOKEN"),
            ..Default::default()
        };
        if let Some(api_base) = get("GITHUB_API_URL") {
            github.api_base = api_base;
        }

        let mut docker = DockerHubConfig {
            username: get("DOCKER_USERNAME"),
            password: get("DOCKER_PASSWORD"),
            ..Default::default()
        };
        if let Some(api_base) = get("DOCKER_HUB_API_URL") {
            docker.api_base = api_base;
        }

        let channels = ChannelsConfig {
            ntfy: ntfy_config(&get),
            gotify: GotifyConfig {
                url: get("GOTIFY_URL").unwrap_or_default(),
                token: get("GOTIFY_TOKEN").unwrap_or_default(),
                priority: parse_or(&get, "GOTIFY_PRIORITY", GotifyConfig::default().priority)?,
            },
            discord: DiscordConfig {
                webhook_url: get("DISCORD_WEBHOOK_URL").unwrap_or_default(),
                username: get("DISCORD_USERNAME").or(DiscordConfig::default().username),
                avatar_url: get("DISCORD_AVATAR_URL"),
            },
            slack: SlackConfig {
                webhook_url: get("SLACK_WEBHOOK_URL").unwrap_or_default(),
            },
        };

        let request_timeout = Duration::from_secs(parse_or(&get, "SEND_TIMEOUT_SECS", 30u64)?);

        let mut api = ApiServerConfig::default();
        if let Some(bind_address) = get("API_BIND_ADDRESS") {
            api.bind_address = bind_address;
        }
        api.port = parse_or(&get, "API_PORT", api.port)?;

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            dispatcher,
            first_seen,
            github,
            docker,
            channels,
            request_timeout,
            api_enabled: parse_bool(&get, "API_ENABLED", true)?,
            api,
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }

    /// Startup checks that cannot be expressed per field.
    pub fn validate(&self) -> Result<()> {
        if self.channels.enabled_types().is_empty() {
            return Err(Error::config(
                "no notification channel configured; set at least one of NTFY_URL, \
                 GOTIFY_URL + GOTIFY_TOKEN, DISCORD_WEBHOOK_URL or SLACK_WEBHOOK_URL",
            ));
        }
        Ok(())
    }
}

/// `NTFY_TOKEN` wins over `NTFY_USERNAME`/`NTFY_PASSWORD`, which win over
/// `NTFY_AUTH`. `NTFY_AUTH` is either `user:password` or the already
/// base64-encoded `user:password` sent as is in a Basic header.
fn ntfy_config(get: &impl Fn(&str) -> Option<String>) -> NtfyConfig {
    let mut config = NtfyConfig {
        url: get("NTFY_URL").unwrap_or_default(),
        access_token: get("NTFY_TOKEN"),
        username: get("NTFY_USERNAME"),
        password: get("NTFY_PASSWORD"),
        ..Default::default()
    };
    if let Some(priority) = get("NTFY_PRIORITY") {
        config.priority = priority;
    }

    let explicit = config.access_token.is_some() || config.username.is_some();
    if let Some(auth) = get("NTFY_AUTH").filter(|_| !explicit) {
        match auth.split_once(':') {
            Some((user, password)) => {
                config.username = Some(user.to_string());
                config.password = Some(password.to_string());
            }
            None => config.encoded_credentials = Some(auth),
        }
    }
    config
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::config(format!("invalid {key} '{raw}': {e}"))),
        None => Ok(default),
    }
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool> {
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(Error::config(format!("invalid {key} '{other}': expected a boolean"))),
    }
}
