use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use estimo_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct ConfigFile {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl ConfigFile {
    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run(options: LoadOptions) -> String {
    let explicit_path = options.config_path.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let path = detect_config_path(explicit_path);
    let file = ConfigFile { doc: load_config_file_doc(path.as_deref()), path };

    let entries: [(&str, String, &[&str]); 10] = [
        ("database.url", config.database.url.clone(), &["ESTIMO_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["ESTIMO_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["ESTIMO_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["ESTIMO_LOGGING_LEVEL", "ESTIMO_LOG_LEVEL"],
        ),
        (
            "logging.format",
            config.logging.format.as_str().to_string(),
            &["ESTIMO_LOGGING_FORMAT", "ESTIMO_LOG_FORMAT"],
        ),
        (
            "quoting.number_prefix",
            config.quoting.number_prefix.clone(),
            &["ESTIMO_QUOTING_NUMBER_PREFIX"],
        ),
        ("quoting.currency", config.quoting.currency.clone(), &["ESTIMO_QUOTING_CURRENCY"]),
        (
            "quoting.default_notes",
            config.quoting.default_notes.clone(),
            &["ESTIMO_QUOTING_DEFAULT_NOTES"],
        ),
        (
            "quoting.validity_days",
            config.quoting.validity_days.to_string(),
            &["ESTIMO_QUOTING_VALIDITY_DAYS"],
        ),
        (
            "quoting.lock_approved",
            config.quoting.lock_approved.to_string(),
            &["ESTIMO_QUOTING_LOCK_APPROVED"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        lines.push(render_line(key, &value, file.source(key, env_keys)));
    }
    lines.join("\n")
}

fn detect_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path);
    }

    [PathBuf::from("estimo.toml"), PathBuf::from("config/estimo.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
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
