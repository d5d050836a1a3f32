use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

use crate::alerts::EndpointConfig;
use crate::http::join_url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Bridge base URL
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Feed poll interval in milliseconds
    #[arg(long, env = "FEED_INTERVAL_MS")]
    pub feed_interval_ms: Option<u64>,

    /// Alert poll interval in milliseconds
    #[arg(long, env = "ALERTS_POLL_MS")]
    pub alerts_poll_ms: Option<u64>,

    /// Alert cutoff state file
    #[arg(long, env = "ALERTS_STATE_PATH")]
    pub alerts_state_path: Option<String>,

    /// Log the alert status line after every poll
    #[arg(long, env = "DEBUG_STATUS")]
    pub debug_status: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub feed: FeedConfig,
    pub alerts: AlertsConfig,
    pub debug_status: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub interval_ms: u64,
    pub max_items: usize,
    pub dedupe_window_ms: i64,
    pub chat_path: String,
    pub events_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertsConfig {
    pub poll_ms: u64,
    pub queue_max: usize,
    pub dedupe_max: usize,
    pub enter_ms: u64,
    pub hold_ms: u64,
    pub exit_ms: u64,
    pub gap_ms: u64,
    pub state_path: String,
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointConfig>,
}

fn default_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig {
            url: "/api/twitch/eventsub/events".to_string(),
            optional: false,
        },
        EndpointConfig {
            url: "/api/tiktok/events".to_string(),
            optional: false,
        },
        // Route casing differs across bridge builds.
        EndpointConfig {
            url: "/api/TikTok/events".to_string(),
            optional: true,
        },
        // Optional until YouTube events are stable.
        EndpointConfig {
            url: "/api/youtube/events".to_string(),
            optional: true,
        },
    ]
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.base_url", "http://127.0.0.1:17845")?
            .set_default("feed.interval_ms", 1000)?
            .set_default("feed.max_items", 200)?
            .set_default("feed.dedupe_window_ms", 5000)?
            .set_default("feed.chat_path", "/api/chat/recent?limit=100")?
            .set_default("feed.events_path", "/api/twitch/eventsub/events")?
            .set_default("alerts.poll_ms", 450)?
            .set_default("alerts.queue_max", 25)?
            .set_default("alerts.dedupe_max", 1500)?
            .set_default("alerts.enter_ms", 320)?
            .set_default("alerts.hold_ms", 3600)?
            .set_default("alerts.exit_ms", 420)?
            .set_default("alerts.gap_ms", 260)?
            .set_default("alerts.state_path", "atc_alerts_last_ts_v1.json")?
            .set_default("debug_status", false)?;

        // 2. Config file: ./config.{yaml,toml,json} when present, then an
        // explicit --config path which must exist.
        builder = builder.add_source(File::with_name("config").required(false));
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        }

        // 3. Manual CLI overrides
        if let Some(base_url) = &cli.base_url {
            builder = builder.set_override("server.base_url", base_url.as_str())?;
        }
        if let Some(ms) = cli.feed_interval_ms {
            builder = builder.set_override("feed.interval_ms", ms)?;
        }
        if let Some(ms) = cli.alerts_poll_ms {
            builder = builder.set_override("alerts.poll_ms", ms)?;
        }
        if let Some(path) = &cli.alerts_state_path {
            builder = builder.set_override("alerts.state_path", path.as_str())?;
        }
        if let Some(debug) = cli.debug_status {
            builder = builder.set_override("debug_status", debug)?;
        }

        // 4. Manual environment overrides
        if let Ok(val) = env::var("ATC_ALERTS__STATE_PATH") {
            builder = builder.set_override("alerts.state_path", val)?;
        }
        if let Ok(val) = env::var("ATC_DEBUG_STATUS") {
            if let Ok(bool_val) = val.parse::<bool>() {
                builder = builder.set_override("debug_status", bool_val)?;
            }
        }

        // 5. Environment variables (prefixed with ATC_) for any keys not
        // explicitly overridden above. E.g. ATC_FEED__MAX_ITEMS=500.
        builder = builder.add_source(
            Environment::with_prefix("ATC")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }

    /// Chat endpoint, resolved against the bridge base URL.
    pub fn chat_url(&self) -> String {
        join_url(&self.server.base_url, &self.feed.chat_path)
    }

    /// Feed event endpoint, resolved against the bridge base URL.
    pub fn events_url(&self) -> String {
        join_url(&self.server.base_url, &self.feed.events_path)
    }

    /// Alert endpoints with relative paths resolved against the bridge
    /// base URL; absolute URLs pass through untouched.
    pub fn alert_endpoints(&self) -> Vec<EndpointConfig> {
        self.alerts
            .endpoints
            .iter()
            .map(|ep| EndpointConfig {
                url: if ep.url.starts_with('/') {
                    join_url(&self.server.base_url, &ep.url)
                } else {
                    ep.url.clone()
                },
                optional: ep.optional,
            })
            .collect()
    }
}
