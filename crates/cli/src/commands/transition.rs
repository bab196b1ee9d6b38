use std::fs;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::Serialize;

use estimo_core::audit::AuditContext;
use estimo_core::config::LoadOptions;
use estimo_core::domain::quote::Signature;
use estimo_core::domain::record::QuoteRecord;
use estimo_core::flows::{ClientAction, FlowEngine, QuoteEvent};

use crate::commands::{
    load_config, new_correlation_id, read_record, record_to_quote, CommandResult,
    TracingAuditSink,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransitionAction {
    /// Client accepted from the public view.
    Approve,
    /// Client declined from the public view.
    Reject,
    /// Client asked for changes; requires `--feedback`.
    RequestAdjustment,
    /// Owner marked the quote approved.
    MarkApproved,
    /// Owner collected a signature; requires `--signature`.
    Sign,
    /// Owner sent the quote again for a new decision.
    Resend,
}

#[derive(Clone, Debug)]
pub struct TransitionArgs {
    pub file: PathBuf,
    pub action: TransitionAction,
    pub feedback: Option<String>,
    pub name: Option<String>,
    pub signature: Option<String>,
    pub write: bool,
}

#[derive(Debug, Serialize)]
struct TransitionView {
    from: &'static str,
    to: &'static str,
    event: &'static str,
    record: QuoteRecord,
}

impl TransitionArgs {
    fn event(&self) -> Result<QuoteEvent, CommandResult> {
        let event = match self.action {
            TransitionAction::Approve => {
                QuoteEvent::client(ClientAction::Approve { display_name: self.name.clone() })
            }
            TransitionAction::Reject => {
                QuoteEvent::client(ClientAction::Reject { reason: self.feedback.clone() })
            }
            TransitionAction::RequestAdjustment => {
                QuoteEvent::client(ClientAction::RequestAdjustment {
                    reason: self.feedback.clone().unwrap_or_default(),
                })
            }
            TransitionAction::MarkApproved => QuoteEvent::OwnerApproved,
            TransitionAction::Sign => {
                let signature = self
                    .signature
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| {
                        CommandResult::failure(
                            "transition",
                            "invalid_input",
                            "the sign action needs --signature",
                            2,
                        )
                    })?;
                QuoteEvent::SignatureCollected { signature: Signature(signature.to_string()) }
            }
            TransitionAction::Resend => QuoteEvent::OwnerResent,
        };
        Ok(event)
    }
}

pub fn run(args: TransitionArgs, options: LoadOptions) -> CommandResult {
    let config = match load_config("transition", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let record = match read_record("transition", &args.file) {
        Ok(record) => record,
        Err(result) => return result,
    };
    let mut quote = match record_to_quote("transition", record.clone()) {
        Ok(quote) => quote,
        Err(result) => return result,
    };
    let event = match args.event() {
        Ok(event) => event,
        Err(result) => return result,
    };

    let engine = FlowEngine::with_policy(config.flow_policy());
    let audit = AuditContext::new(quote.id.clone(), new_correlation_id(), "cli");
    let outcome = match engine.apply_with_audit(&mut quote, event, &TracingAuditSink, &audit) {
        Ok(outcome) => outcome,
        Err(error) => {
            return CommandResult::from_application_error(
                "transition",
                "transition_rejected",
                error.into(),
                6,
            );
        }
    };

    let record = record.refreshed(&quote);
    if args.write {
        let written = serde_json::to_string_pretty(&record)
            .map_err(|error| error.to_string())
            .and_then(|json| fs::write(&args.file, json).map_err(|error| error.to_string()));
        if let Err(error) = written {
            return CommandResult::failure(
                "transition",
                "write_failed",
                format!("could not write `{}`: {error}", args.file.display()),
                7,
            );
        }
    }

    let view = TransitionView {
        from: outcome.from.as_str(),
        to: outcome.to.as_str(),
        event: outcome.event.name(),
        record,
    };
    CommandResult::success_with_data(
        "transition",
        format!("quote moved from {} to {}", view.from, view.to),
        view,
    )
}
