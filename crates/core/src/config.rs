use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::replies::DEFAULT_GAME_LINK;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub store: StoreConfig,
    pub game: GameConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
    pub delivery: DeliveryMode,
    pub poll_timeout_secs: u64,
    pub webhook_url: Option<String>,
    pub webhook_path: String,
    pub webhook_secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub project_id: String,
    pub app_id: String,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub access_token: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub link: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Polling,
    Webhook,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Webhook => "webhook",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub delivery: Option<DeliveryMode>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub store_project_id: Option<String>,
    pub store_base_url: Option<String>,
    pub game_link: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                api_base_url: "https://api.telegram.org".to_string(),
                delivery: DeliveryMode::Polling,
                poll_timeout_secs: 30,
                webhook_url: None,
                webhook_path: "/telegram/webhook".to_string(),
                webhook_secret: None,
            },
            store: StoreConfig {
                project_id: String::new(),
                app_id: "default-app-id".to_string(),
                base_url: "https://firestore.googleapis.com".to_string(),
                api_key: None,
                access_token: None,
                timeout_secs: 10,
            },
            game: GameConfig { link: DEFAULT_GAME_LINK.to_string() },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for DeliveryMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "polling" | "long_polling" => Ok(Self::Polling),
            "webhook" => Ok(Self::Webhook),
            other => Err(ConfigError::Validation(format!(
                "unsupported delivery mode `{other}` (expected polling|webhook)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl StoreConfig {
    /// Parent document of the score collection, relative to the database root.
    pub fn collection_parent(&self) -> String {
        format!("artifacts/{}/public/data", self.app_id)
    }
}

impl TelegramConfig {
    /// Full URL Telegram should deliver updates to in webhook mode.
    pub fn webhook_endpoint(&self) -> Option<String> {
        let base = self.webhook_url.as_deref()?.trim_end_matches('/');
        Some(format!("{base}{}", self.webhook_path))
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let config = Self::load_unvalidated(options)?;
        config.validate()?;
        Ok(config)
    }

    /// Layers file, env and overrides over the defaults without validating.
    /// Callers pick the checks they need, e.g. [`AppConfig::validate_store_access`].
    pub fn load_unvalidated(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("coindash.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telegram) = patch.telegram {
            if let Some(bot_token_value) = telegram.bot_token {
                self.telegram.bot_token = secret_value(bot_token_value);
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(delivery) = telegram.delivery {
                self.telegram.delivery = delivery;
            }
            if let Some(poll_timeout_secs) = telegram.poll_timeout_secs {
                self.telegram.poll_timeout_secs = poll_timeout_secs;
            }
            if let Some(webhook_url) = telegram.webhook_url {
                self.telegram.webhook_url = Some(webhook_url);
            }
            if let Some(webhook_path) = telegram.webhook_path {
                self.telegram.webhook_path = webhook_path;
            }
            if let Some(webhook_secret_value) = telegram.webhook_secret {
                self.telegram.webhook_secret = Some(secret_value(webhook_secret_value));
            }
        }

        if let Some(store) = patch.store {
            if let Some(project_id) = store.project_id {
                self.store.project_id = project_id;
            }
            if let Some(app_id) = store.app_id {
                self.store.app_id = app_id;
            }
            if let Some(base_url) = store.base_url {
                self.store.base_url = base_url;
            }
            if let Some(api_key_value) = store.api_key {
                self.store.api_key = Some(secret_value(api_key_value));
            }
            if let Some(access_token_value) = store.access_token {
                self.store.access_token = Some(secret_value(access_token_value));
            }
            if let Some(timeout_secs) = store.timeout_secs {
                self.store.timeout_secs = timeout_secs;
            }
        }

        if let Some(game) = patch.game {
            if let Some(link) = game.link {
                self.game.link = link;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let bot_token = read_env("COINDASH_TELEGRAM_BOT_TOKEN").or_else(|| read_env("BOT_TOKEN"));
        if let Some(value) = bot_token {
            self.telegram.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("COINDASH_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("COINDASH_TELEGRAM_DELIVERY") {
            self.telegram.delivery = value.parse()?;
        }
        if let Some(value) = read_env("COINDASH_TELEGRAM_POLL_TIMEOUT_SECS") {
            self.telegram.poll_timeout_secs =
                parse_u64("COINDASH_TELEGRAM_POLL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("COINDASH_TELEGRAM_WEBHOOK_URL") {
            self.telegram.webhook_url = Some(value);
        }
        if let Some(value) = read_env("COINDASH_TELEGRAM_WEBHOOK_PATH") {
            self.telegram.webhook_path = value;
        }
        if let Some(value) = read_env("COINDASH_TELEGRAM_WEBHOOK_SECRET") {
            self.telegram.webhook_secret = Some(secret_value(value));
        }

        if let Some(value) = read_env("COINDASH_STORE_PROJECT_ID") {
            self.store.project_id = value;
        }
        let app_id = read_env("COINDASH_STORE_APP_ID").or_else(|| read_env("APP_ID"));
        if let Some(value) = app_id {
            self.store.app_id = value;
        }
        if let Some(value) = read_env("COINDASH_STORE_BASE_URL") {
            self.store.base_url = value;
        }
        if let Some(value) = read_env("COINDASH_STORE_API_KEY") {
            self.store.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("COINDASH_STORE_ACCESS_TOKEN") {
            self.store.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("COINDASH_STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = parse_u64("COINDASH_STORE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COINDASH_GAME_LINK") {
            self.game.link = value;
        }

        if let Some(value) = read_env("COINDASH_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COINDASH_SERVER_PORT") {
            self.server.port = parse_u16("COINDASH_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("COINDASH_LOGGING_LEVEL").or_else(|| read_env("COINDASH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COINDASH_LOGGING_FORMAT").or_else(|| read_env("COINDASH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.telegram.bot_token = secret_value(bot_token);
        }
        if let Some(delivery) = overrides.delivery {
            self.telegram.delivery = delivery;
        }
        if let Some(webhook_url) = overrides.webhook_url {
            self.telegram.webhook_url = Some(webhook_url);
        }
        if let Some(webhook_secret) = overrides.webhook_secret {
            self.telegram.webhook_secret = Some(secret_value(webhook_secret));
        }
        if let Some(project_id) = overrides.store_project_id {
            self.store.project_id = project_id;
        }
        if let Some(base_url) = overrides.store_base_url {
            self.store.base_url = base_url;
        }
        if let Some(game_link) = overrides.game_link {
            self.game.link = game_link;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)?;
        validate_store(&self.store)?;
        validate_game(&self.game)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Checks only what a read-only leaderboard query needs.
    pub fn validate_store_access(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        validate_game(&self.game)
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("coindash.toml"), PathBuf::from("config/coindash.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let bot_token = telegram.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Get it from @BotFather with /newbot or /token"
                .to_string(),
        ));
    }
    let well_formed = bot_token.split_once(':').is_some_and(|(bot_id, secret)| {
        !bot_id.is_empty() && bot_id.bytes().all(|byte| byte.is_ascii_digit()) && !secret.is_empty()
    });
    if !well_formed {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }

    if !is_http_url(&telegram.api_base_url) {
        return Err(ConfigError::Validation(
            "telegram.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if telegram.poll_timeout_secs == 0 || telegram.poll_timeout_secs > 50 {
        return Err(ConfigError::Validation(
            "telegram.poll_timeout_secs must be in range 1..=50".to_string(),
        ));
    }

    if !telegram.webhook_path.starts_with('/') {
        return Err(ConfigError::Validation(
            "telegram.webhook_path must start with `/`".to_string(),
        ));
    }

    if telegram.delivery == DeliveryMode::Webhook {
        let url_ok =
            telegram.webhook_url.as_deref().is_some_and(|url| url.starts_with("https://"));
        if !url_ok {
            return Err(ConfigError::Validation(
                "telegram.webhook_url must be an https:// URL when delivery is webhook"
                    .to_string(),
            ));
        }

        let secret_ok = telegram.webhook_secret.as_ref().is_some_and(|secret| {
            let secret = secret.expose_secret();
            (1..=256).contains(&secret.len())
                && secret.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-')
        });
        if !secret_ok {
            return Err(ConfigError::Validation(
                "telegram.webhook_secret is required for webhook delivery (1-256 chars of A-Z, a-z, 0-9, `_`, `-`)"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if store.project_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "store.project_id is required (the Firebase project that hosts the score collection)"
                .to_string(),
        ));
    }

    let app_id = store.app_id.trim();
    if app_id.is_empty() || app_id.contains('/') {
        return Err(ConfigError::Validation(
            "store.app_id must be a non-empty path segment without `/`".to_string(),
        ));
    }

    if !is_http_url(&store.base_url) {
        return Err(ConfigError::Validation(
            "store.base_url must start with http:// or https://".to_string(),
        ));
    }

    if store.timeout_secs == 0 || store.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "store.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_game(game: &GameConfig) -> Result<(), ConfigError> {
    if !is_http_url(&game.link) {
        return Err(ConfigError::Validation(
            "game.link must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    telegram: Option<TelegramPatch>,
    store: Option<StorePatch>,
    game: Option<GamePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
    delivery: Option<DeliveryMode>,
    poll_timeout_secs: Option<u64>,
    webhook_url: Option<String>,
    webhook_path: Option<String>,
    webhook_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    project_id: Option<String>,
    app_id: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GamePatch {
    link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
