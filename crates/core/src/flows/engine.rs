use thiserror::Error;

use crate::audit::{AuditContext, AuditSink, StatusAuditEvent};
use crate::domain::quote::{Quote, QuoteStatus};
use crate::flows::states::{ClientAction, FlowPolicy, QuoteEvent, StatusEffect, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("quote is {status:?} and accepts no further transitions (event {event})")]
    TerminalStatus { status: QuoteStatus, event: &'static str },
    #[error("invalid transition from {from:?} using event {event}")]
    InvalidTransition { from: QuoteStatus, event: &'static str },
    #[error("an adjustment request needs feedback text")]
    MissingFeedback,
}

/// Applies status events to quotes under a [`FlowPolicy`].
#[derive(Clone, Debug, Default)]
pub struct FlowEngine {
    policy: FlowPolicy,
}

impl FlowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: FlowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FlowPolicy {
        self.policy
    }

    pub fn initial_state(&self) -> QuoteStatus {
        QuoteStatus::Pending
    }

    /// Computes the outcome without touching any quote.
    pub fn plan(
        &self,
        current: QuoteStatus,
        event: &QuoteEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition(current, event, self.policy)
    }

    pub fn apply(
        &self,
        quote: &mut Quote,
        event: QuoteEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let outcome = self.plan(quote.status(), &event)?;
        quote.apply_transition(&outcome);
        Ok(outcome)
    }

    pub fn apply_with_audit<S>(
        &self,
        quote: &mut Quote,
        event: QuoteEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink,
    {
        let from = quote.status();
        let event_name = event.name();
        let result = self.apply(quote, event);
        let audit_event = match &result {
            Ok(outcome) => StatusAuditEvent::applied(audit, quote.id.clone(), outcome),
            Err(error) => {
                StatusAuditEvent::rejected(audit, quote.id.clone(), from, event_name, error)
            }
        };
        sink.emit(audit_event);
        result
    }
}

pub fn transition(
    current: QuoteStatus,
    event: &QuoteEvent,
    policy: FlowPolicy,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use QuoteStatus::{Approved, Negotiating, Pending, Rejected};
    use StatusEffect::{ClearFeedback, ClearSignature, RecordClientName, RecordFeedback};

    if current == Approved && policy.lock_approved {
        return Err(FlowTransitionError::TerminalStatus { status: current, event: event.name() });
    }

    let (to, effects) = match (current, event) {
        (Pending, QuoteEvent::SignatureCollected { signature }) => {
            (Approved, vec![StatusEffect::RecordSignature(signature.clone()), ClearFeedback])
        }
        (Pending, QuoteEvent::OwnerApproved) => (Approved, vec![ClearFeedback]),
        (Pending, QuoteEvent::Client { action }) => match action {
            ClientAction::Approve { display_name } => {
                let mut effects = vec![ClearFeedback];
                if let Some(name) = non_blank(display_name.as_deref()) {
                    effects.push(RecordClientName(name));
                }
                (Approved, effects)
            }
            ClientAction::Reject { reason } => match non_blank(reason.as_deref()) {
                Some(reason) => (Rejected, vec![RecordFeedback(reason)]),
                None => (Rejected, vec![ClearFeedback]),
            },
            ClientAction::RequestAdjustment { reason } => {
                let reason = non_blank(Some(reason.as_str()))
                    .ok_or(FlowTransitionError::MissingFeedback)?;
                (Negotiating, vec![RecordFeedback(reason)])
            }
        },
        (Negotiating | Rejected | Approved, QuoteEvent::OwnerResent) => {
            (Pending, vec![ClearFeedback, ClearSignature])
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                from: current,
                event: event.name(),
            });
        }
    };

    Ok(TransitionOutcome { from: current, to, event: event.clone(), effects })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
