use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Development fallback for the bot gateway secret.
const DEV_BOT_API_SECRET: &str = "dev-bot-secret";

/// Real-world UTC offsets span -12..=+14.
const UTC_OFFSET_HOURS_RANGE: RangeInclusive<i32> = -12..=14;
/// One hour up to thirty days.
const DISCUSSION_WINDOW_HOURS_RANGE: RangeInclusive<i64> = 1..=720;

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub db_schema_update: bool,

    /// Shared secret the chat front-end presents in `X-Bot-Secret`.
    pub bot_api_secret: String,

    // Movie catalog (metadata + imported votes)
    pub kinopoisk_api_key: Option<String>,
    pub kinopoisk_api_base: String,

    // Co-viewing room provisioning (optional)
    pub watch_together_api_key: Option<String>,
    pub watch_together_api_base: String,

    pub notify_webhook_url: Option<String>,
    pub external_timeout_secs: u64,

    // Slot policy
    pub min_participants_default: i32,
    pub schedule_utc_offset_hours: i32,
    pub discussion_window_hours: i64,
    pub completion_sweep_secs: u64,

    pub conversation_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 8080,
            database_url: "sqlite::memory:".to_string(),
            db_schema_update: false,
            bot_api_secret: DEV_BOT_API_SECRET.to_string(),
            kinopoisk_api_key: None,
            kinopoisk_api_base: "https://kinopoiskapiunofficial.tech".to_string(),
            watch_together_api_key: None,
            watch_together_api_base: "https://api.w2g.tv".to_string(),
            notify_webhook_url: None,
            external_timeout_secs: 10,
            min_participants_default: 2,
            schedule_utc_offset_hours: 3,
            discussion_window_hours: 24,
            completion_sweep_secs: 300,
            conversation_ttl_secs: 900,
        }
    }
}

impl AppConfig {
    /// Loads settings from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let bot_api_secret = env::var("BOT_API_SECRET").unwrap_or_else(|_| {
            tracing::warn!(
                "BOT_API_SECRET is not set, falling back to the development secret. Set it in production."
            );
            DEV_BOT_API_SECRET.to_string()
        });

        let kinopoisk_api_key = optional_var("KINOPOISK_API_KEY");
        if kinopoisk_api_key.is_none() {
            tracing::warn!("KINOPOISK_API_KEY is not set, movie resolution and vote import are disabled");
        }

        let watch_together_api_key = optional_var("WATCH_TOGETHER_API_KEY");
        if watch_together_api_key.is_none() {
            tracing::warn!("WATCH_TOGETHER_API_KEY is not set, room provisioning is disabled");
        }

        let min_participants_default =
            parse_var("MIN_PARTICIPANTS_DEFAULT", defaults.min_participants_default)?;
        if min_participants_default < 1 {
            return Err(ConfigError::InvalidValue("MIN_PARTICIPANTS_DEFAULT"));
        }

        Ok(Self {
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            database_url,
            db_schema_update: parse_var("DB_SCHEMA_UPDATE", defaults.db_schema_update)?,
            bot_api_secret,
            kinopoisk_api_key,
            kinopoisk_api_base: env::var("KINOPOISK_API_BASE")
                .unwrap_or(defaults.kinopoisk_api_base),
            watch_together_api_key,
            watch_together_api_base: env::var("WATCH_TOGETHER_API_BASE")
                .unwrap_or(defaults.watch_together_api_base),
            notify_webhook_url: optional_var("NOTIFY_WEBHOOK_URL"),
            external_timeout_secs: parse_var(
                "EXTERNAL_TIMEOUT_SECS",
                defaults.external_timeout_secs,
            )?,
            min_participants_default,
            schedule_utc_offset_hours: parse_var_in(
                "SCHEDULE_UTC_OFFSET_HOURS",
                defaults.schedule_utc_offset_hours,
                UTC_OFFSET_HOURS_RANGE,
            )?,
            discussion_window_hours: parse_var_in(
                "DISCUSSION_WINDOW_HOURS",
                defaults.discussion_window_hours,
                DISCUSSION_WINDOW_HOURS_RANGE,
            )?,
            completion_sweep_secs: parse_var(
                "COMPLETION_SWEEP_SECS",
                defaults.completion_sweep_secs,
            )?,
            conversation_ttl_secs: parse_var(
                "CONVERSATION_TTL_SECS",
                defaults.conversation_ttl_secs,
            )?,
        })
    }
}

/// Empty values count as unset.
fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key)),
        Err(_) => Ok(default),
    }
}

fn parse_var_in<T: FromStr + PartialOrd>(
    key: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError> {
    let value = parse_var(key, default)?;
    if !range.contains(&value) {
        return Err(ConfigError::OutOfRange(key));
    }
    Ok(value)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
    #[error("Value for {0} is out of range")]
    OutOfRange(&'static str),
}
