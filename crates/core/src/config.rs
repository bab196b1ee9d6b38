use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::quote::DEFAULT_NOTES;
use crate::flows::FlowPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub quoting: QuotingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Business defaults applied to new quotes.
#[derive(Clone, Debug)]
pub struct QuotingConfig {
    pub number_prefix: String,
    pub currency: String,
    pub default_notes: String,
    pub validity_days: u32,
    /// When set, an approved quote can no longer be resent by its owner.
    pub lock_approved: bool,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub number_prefix: Option<String>,
    pub lock_approved: Option<bool>,
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
            database: DatabaseConfig {
                url: "sqlite://estimo.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            quoting: QuotingConfig {
                number_prefix: "ORC".to_string(),
                currency: "BRL".to_string(),
                default_notes: DEFAULT_NOTES.to_string(),
                validity_days: 15,
                lock_approved: true,
            },
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

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("estimo.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn flow_policy(&self) -> FlowPolicy {
        FlowPolicy { lock_approved: self.quoting.lock_approved }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
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

        if let Some(quoting) = patch.quoting {
            if let Some(number_prefix) = quoting.number_prefix {
                self.quoting.number_prefix = number_prefix;
            }
            if let Some(currency) = quoting.currency {
                self.quoting.currency = currency;
            }
            if let Some(default_notes) = quoting.default_notes {
                self.quoting.default_notes = default_notes;
            }
            if let Some(validity_days) = quoting.validity_days {
                self.quoting.validity_days = validity_days;
            }
            if let Some(lock_approved) = quoting.lock_approved {
                self.quoting.lock_approved = lock_approved;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ESTIMO_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ESTIMO_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ESTIMO_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ESTIMO_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ESTIMO_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let log_level = read_env("ESTIMO_LOGGING_LEVEL").or_else(|| read_env("ESTIMO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ESTIMO_LOGGING_FORMAT").or_else(|| read_env("ESTIMO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("ESTIMO_QUOTING_NUMBER_PREFIX") {
            self.quoting.number_prefix = value;
        }
        if let Some(value) = read_env("ESTIMO_QUOTING_CURRENCY") {
            self.quoting.currency = value;
        }
        if let Some(value) = read_env("ESTIMO_QUOTING_DEFAULT_NOTES") {
            self.quoting.default_notes = value;
        }
        if let Some(value) = read_env("ESTIMO_QUOTING_VALIDITY_DAYS") {
            self.quoting.validity_days = parse_u32("ESTIMO_QUOTING_VALIDITY_DAYS", &value)?;
        }
        if let Some(value) = read_env("ESTIMO_QUOTING_LOCK_APPROVED") {
            self.quoting.lock_approved = parse_bool("ESTIMO_QUOTING_LOCK_APPROVED", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(number_prefix) = overrides.number_prefix {
            self.quoting.number_prefix = number_prefix;
        }
        if let Some(lock_approved) = overrides.lock_approved {
            self.quoting.lock_approved = lock_approved;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        validate_quoting(&self.quoting)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("estimo.toml"), PathBuf::from("config/estimo.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
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

fn validate_quoting(quoting: &QuotingConfig) -> Result<(), ConfigError> {
    let prefix = quoting.number_prefix.trim();
    if prefix.is_empty() || prefix.chars().any(|ch| ch.is_ascii_digit() || ch.is_whitespace()) {
        return Err(ConfigError::Validation(
            "quoting.number_prefix must be non-empty and contain no digits or spaces (e.g. `ORC`)"
                .to_string(),
        ));
    }

    let currency = quoting.currency.as_str();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "quoting.currency must be a three-letter ISO code such as `BRL`, got `{currency}`"
        )));
    }

    if quoting.validity_days == 0 || quoting.validity_days > 365 {
        return Err(ConfigError::Validation(
            "quoting.validity_days must be in range 1..=365".to_string(),
        ));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
    quoting: Option<QuotingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotingPatch {
    number_prefix: Option<String>,
    currency: Option<String>,
    default_notes: Option<String>,
    validity_days: Option<u32>,
    lock_approved: Option<bool>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.quoting.number_prefix == "ORC", "default prefix should be ORC")?;
        ensure(config.quoting.currency == "BRL", "default currency should be BRL")?;
        ensure(config.quoting.validity_days == 15, "default validity should be 15 days")?;
        ensure(config.flow_policy().lock_approved, "approved quotes lock by default")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ESTIMO_PREFIX", "PRP");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("estimo.toml");
            fs::write(
                &path,
                r#"
[quoting]
number_prefix = "${TEST_ESTIMO_PREFIX}"
validity_days = 30
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.quoting.number_prefix == "PRP", "prefix should come from environment")?;
            ensure(config.quoting.validity_days == 30, "validity should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_ESTIMO_PREFIX"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ESTIMO_LOG_LEVEL", "warn");
        env::set_var("ESTIMO_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["ESTIMO_LOG_LEVEL", "ESTIMO_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ESTIMO_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("ESTIMO_QUOTING_LOCK_APPROVED", "false");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("estimo.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[quoting]
currency = "USD"
lock_approved = true

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.quoting.currency == "USD", "file currency should beat defaults")?;
            ensure(
                !config.flow_policy().lock_approved,
                "env lock_approved should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["ESTIMO_DATABASE_URL", "ESTIMO_QUOTING_LOCK_APPROVED"]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ESTIMO_QUOTING_VALIDITY_DAYS", "two weeks");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected override failure but load succeeded".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "ESTIMO_QUOTING_VALIDITY_DAYS"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["ESTIMO_QUOTING_VALIDITY_DAYS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ESTIMO_QUOTING_CURRENCY", "reais");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("quoting.currency")
            );
            ensure(has_message, "validation failure should mention quoting.currency")
        })();

        clear_vars(&["ESTIMO_QUOTING_CURRENCY"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("absent.toml");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "require_file should reject a missing path",
        )
    }
}
