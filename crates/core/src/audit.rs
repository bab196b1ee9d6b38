//! Audit trail of status-change attempts.
//!
//! Every attempt yields one [`StatusAuditEvent`], applied or rejected, so the
//! trail shows who tried what even when the flow refused it.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::quote::{QuoteId, QuoteStatus};
use crate::flows::{FlowTransitionError, StatusEffect, TransitionOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Applied,
    Rejected,
}

/// Who is acting and under which request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub quote_id: Option<QuoteId>,
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(
        quote_id: Option<QuoteId>,
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self { quote_id, correlation_id: correlation_id.into(), actor: actor.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAuditEvent {
    pub event_id: String,
    pub quote_id: Option<QuoteId>,
    pub correlation_id: String,
    pub actor: String,
    /// Flow event name, e.g. `client_requested_adjustment`.
    pub event: String,
    pub from: QuoteStatus,
    /// Status reached; `None` when the attempt was rejected.
    pub to: Option<QuoteStatus>,
    pub outcome: AuditOutcome,
    pub feedback_recorded: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl StatusAuditEvent {
    pub fn applied(
        context: &AuditContext,
        quote_id: Option<QuoteId>,
        outcome: &TransitionOutcome,
    ) -> Self {
        let feedback_recorded = outcome
            .effects
            .iter()
            .any(|effect| matches!(effect, StatusEffect::RecordFeedback(_)));
        Self {
            to: Some(outcome.to),
            outcome: AuditOutcome::Applied,
            feedback_recorded,
            ..Self::base(context, quote_id, outcome.event.name(), outcome.from)
        }
    }

    pub fn rejected(
        context: &AuditContext,
        quote_id: Option<QuoteId>,
        from: QuoteStatus,
        event: &str,
        error: &FlowTransitionError,
    ) -> Self {
        Self { error: Some(error.to_string()), ..Self::base(context, quote_id, event, from) }
    }

    pub fn event_type(&self) -> &'static str {
        match self.outcome {
            AuditOutcome::Applied => "quote.status_changed",
            AuditOutcome::Rejected => "quote.status_rejected",
        }
    }

    fn base(
        context: &AuditContext,
        quote_id: Option<QuoteId>,
        event: &str,
        from: QuoteStatus,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            quote_id: quote_id.or_else(|| context.quote_id.clone()),
            correlation_id: context.correlation_id.clone(),
            actor: context.actor.clone(),
            event: event.to_string(),
            from,
            to: None,
            outcome: AuditOutcome::Rejected,
            feedback_recorded: false,
            error: None,
            occurred_at: Utc::now(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: StatusAuditEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<StatusAuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<StatusAuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: StatusAuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
