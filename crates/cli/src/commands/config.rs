use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use coindash_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config, detect_config_path().as_deref()),
        Err(error) => format!("config validation failed: {error}"),
    }
}

pub fn render(config: &AppConfig, config_file_path: Option<&Path>) -> String {
    let config_file_doc = load_config_file_doc(config_file_path);
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path)
    };

    let telegram = &config.telegram;
    let store = &config.store;
    let fields = [
        (
            "telegram.bot_token",
            redact_bot_token(telegram.bot_token.expose_secret()),
            source("telegram.bot_token", &["COINDASH_TELEGRAM_BOT_TOKEN", "BOT_TOKEN"]),
        ),
        (
            "telegram.api_base_url",
            telegram.api_base_url.clone(),
            source("telegram.api_base_url", &["COINDASH_TELEGRAM_API_BASE_URL"]),
        ),
        (
            "telegram.delivery",
            telegram.delivery.as_str().to_string(),
            source("telegram.delivery", &["COINDASH_TELEGRAM_DELIVERY"]),
        ),
        (
            "telegram.poll_timeout_secs",
            telegram.poll_timeout_secs.to_string(),
            source("telegram.poll_timeout_secs", &["COINDASH_TELEGRAM_POLL_TIMEOUT_SECS"]),
        ),
        (
            "telegram.webhook_url",
            telegram.webhook_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            source("telegram.webhook_url", &["COINDASH_TELEGRAM_WEBHOOK_URL"]),
        ),
        (
            "telegram.webhook_path",
            telegram.webhook_path.clone(),
            source("telegram.webhook_path", &["COINDASH_TELEGRAM_WEBHOOK_PATH"]),
        ),
        (
            "telegram.webhook_secret",
            optional_secret(telegram.webhook_secret.as_ref()),
            source("telegram.webhook_secret", &["COINDASH_TELEGRAM_WEBHOOK_SECRET"]),
        ),
        (
            "store.project_id",
            store.project_id.clone(),
            source("store.project_id", &["COINDASH_STORE_PROJECT_ID"]),
        ),
        (
            "store.app_id",
            store.app_id.clone(),
            source("store.app_id", &["COINDASH_STORE_APP_ID", "APP_ID"]),
        ),
        (
            "store.base_url",
            store.base_url.clone(),
            source("store.base_url", &["COINDASH_STORE_BASE_URL"]),
        ),
        (
            "store.api_key",
            optional_secret(store.api_key.as_ref()),
            source("store.api_key", &["COINDASH_STORE_API_KEY"]),
        ),
        (
            "store.access_token",
            optional_secret(store.access_token.as_ref()),
            source("store.access_token", &["COINDASH_STORE_ACCESS_TOKEN"]),
        ),
        (
            "store.timeout_secs",
            store.timeout_secs.to_string(),
            source("store.timeout_secs", &["COINDASH_STORE_TIMEOUT_SECS"]),
        ),
        ("game.link", config.game.link.clone(), source("game.link", &["COINDASH_GAME_LINK"])),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            source("server.bind_address", &["COINDASH_SERVER_BIND_ADDRESS"]),
        ),
        (
            "server.port",
            config.server.port.to_string(),
            source("server.port", &["COINDASH_SERVER_PORT"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["COINDASH_LOGGING_LEVEL", "COINDASH_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source("logging.format", &["COINDASH_LOGGING_FORMAT", "COINDASH_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.into_iter().map(|(key, value, source)| render_line(key, &value, source)));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("coindash.toml"), PathBuf::from("config/coindash.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn optional_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}

/// Keeps the public bot id, hides the secret half.
fn redact_bot_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((bot_id, _)) = trimmed.split_once(':') {
        return format!("{bot_id}:***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use coindash_core::config::AppConfig;

    use super::{redact_bot_token, render};

    #[test]
    fn bot_token_keeps_only_the_bot_id() {
        assert_eq!(redact_bot_token("123456:AA-secret"), "123456:***");
        assert_eq!(redact_bot_token("  "), "<empty>");
        assert_eq!(redact_bot_token("opaque"), "<redacted>");
    }

    #[test]
    fn render_never_prints_secrets() {
        let mut config = AppConfig::default();
        config.telegram.bot_token = "42:super-secret".to_owned().into();
        config.telegram.webhook_secret = Some("hook-secret".to_owned().into());
        config.store.api_key = Some("api-secret".to_owned().into());
        config.store.project_id = "coindash-prod".to_owned();

        let output = render(&config, None);

        assert!(output.contains("- telegram.bot_token = 42:***"));
        assert!(output.contains("- telegram.webhook_secret = <redacted>"));
        assert!(output.contains("- store.api_key = <redacted>"));
        assert!(output.contains("- store.access_token = <unset>"));
        assert!(output.contains("- store.project_id = coindash-prod"));
        assert!(output.contains("- logging.format = compact"));
        for secret in ["super-secret", "hook-secret", "api-secret"] {
            assert!(!output.contains(secret), "{secret} leaked");
        }
    }

    #[test]
    fn missing_config_file_attributes_values_to_defaults() {
        let output = render(&AppConfig::default(), Some(Path::new("does-not-exist.toml")));
        assert!(output.contains("- game.link = https://giosubress.github.io/CoinDashGIKA/"));
        assert!(output.contains("- server.port = 8080 (source:"));
    }
}
