pub mod config;
pub mod import;
pub mod list;
pub mod migrate;
pub mod profit;
pub mod report;
pub mod totals;
pub mod transition;

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use estimo_core::audit::{AuditSink, StatusAuditEvent};
use estimo_core::config::{AppConfig, LoadOptions};
use estimo_core::domain::quote::Quote;
use estimo_core::domain::record::QuoteRecord;
use estimo_core::errors::ApplicationError;
use estimo_db::{connect_with_settings, migrations, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: impl Serialize,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => {
                let payload = CommandOutcome {
                    command: command.to_string(),
                    status: "ok".to_string(),
                    error_class: None,
                    message: message.into(),
                    data: Some(data),
                };
                Self { exit_code: 0, output: serialize_payload(payload) }
            }
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Reports an application failure through the interface error layer so
    /// the message carries the user-facing text and a correlation id.
    pub(crate) fn from_application_error(
        command: &str,
        error_class: &str,
        error: ApplicationError,
        exit_code: u8,
    ) -> Self {
        let detail = error.to_string();
        let interface = error.into_interface(new_correlation_id());
        let correlation_id = interface.correlation_id().to_string();
        Self::failure(
            command,
            error_class,
            format!("{} {detail} (correlation id {correlation_id})", interface.user_message()),
            exit_code,
        )
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn new_correlation_id() -> String {
    format!("cli-{}", uuid::Uuid::new_v4())
}

pub(crate) fn load_config(command: &str, options: LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn read_record(command: &str, path: &Path) -> Result<QuoteRecord, CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            command,
            "invalid_input",
            format!("could not read `{}`: {error}", path.display()),
            2,
        )
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        CommandResult::failure(
            command,
            "invalid_input",
            format!("`{}` is not a valid quote record: {error}", path.display()),
            2,
        )
    })
}

pub(crate) fn read_quote(command: &str, path: &Path) -> Result<Quote, CommandResult> {
    record_to_quote(command, read_record(command, path)?)
}

pub(crate) fn record_to_quote(
    command: &str,
    record: QuoteRecord,
) -> Result<Quote, CommandResult> {
    record.into_quote().map_err(|error| {
        CommandResult::from_application_error(command, "invalid_input", error.into(), 2)
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Opens the configured database and brings its schema up to date.
pub(crate) async fn open_store(config: &AppConfig) -> Result<DbPool, (&'static str, String, u8)> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

/// Forwards audit events to the log.
pub(crate) struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: StatusAuditEvent) {
        tracing::info!(
            event_name = event.event_type(),
            event_id = %event.event_id,
            correlation_id = %event.correlation_id,
            quote_id = event.quote_id.as_ref().map(|id| id.0.as_str()).unwrap_or("unknown"),
            actor = %event.actor,
            flow_event = %event.event,
            from = event.from.as_str(),
            to = event.to.map(|status| status.as_str()).unwrap_or("unchanged"),
            feedback_recorded = event.feedback_recorded,
            error = event.error.as_deref().unwrap_or_default(),
            "quote status audit"
        );
    }
}
