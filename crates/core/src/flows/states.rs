use serde::{Deserialize, Serialize};

use crate::domain::quote::{QuoteStatus, Signature};

/// Actions available on the public, shareable quote view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientAction {
    Approve {
        #[serde(default)]
        display_name: Option<String>,
    },
    Reject {
        #[serde(default)]
        reason: Option<String>,
    },
    RequestAdjustment {
        reason: String,
    },
}

impl ClientAction {
    pub const APPROVE: &'static str = "approve";
    pub const REJECT: &'static str = "reject";
    pub const REQUEST_ADJUSTMENT: &'static str = "requestAdjustment";

    /// Maps the wire vocabulary onto an action. `feedback` is the display
    /// name for `approve` and the reason text for the other two.
    pub fn from_wire(name: &str, feedback: Option<&str>) -> Option<Self> {
        let feedback = feedback.map(str::to_string);
        match name.trim() {
            Self::APPROVE => Some(Self::Approve { display_name: feedback }),
            Self::REJECT => Some(Self::Reject { reason: feedback }),
            Self::REQUEST_ADJUSTMENT | "request_adjustment" | "request-adjustment" => {
                Some(Self::RequestAdjustment { reason: feedback.unwrap_or_default() })
            }
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Approve { .. } => Self::APPROVE,
            Self::Reject { .. } => Self::REJECT,
            Self::RequestAdjustment { .. } => Self::REQUEST_ADJUSTMENT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuoteEvent {
    /// Owner captured the client's signature in person.
    SignatureCollected { signature: Signature },
    OwnerApproved,
    Client { action: ClientAction },
    OwnerResent,
}

impl QuoteEvent {
    pub fn client(action: ClientAction) -> Self {
        Self::Client { action }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SignatureCollected { .. } => "signature_collected",
            Self::OwnerApproved => "owner_approved",
            Self::Client { action } => match action {
                ClientAction::Approve { .. } => "client_approved",
                ClientAction::Reject { .. } => "client_rejected",
                ClientAction::RequestAdjustment { .. } => "client_requested_adjustment",
            },
            Self::OwnerResent => "owner_resent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusEffect {
    RecordSignature(Signature),
    RecordFeedback(String),
    RecordClientName(String),
    ClearFeedback,
    ClearSignature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPolicy {
    /// When set, approved quotes accept no further transitions.
    pub lock_approved: bool,
}

impl Default for FlowPolicy {
    fn default() -> Self {
        Self { lock_approved: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: QuoteStatus,
    pub to: QuoteStatus,
    pub event: QuoteEvent,
    pub effects: Vec<StatusEffect>,
}
