pub mod engine;
pub mod states;

pub use engine::{transition, FlowEngine, FlowTransitionError};
pub use states::{ClientAction, FlowPolicy, QuoteEvent, StatusEffect, TransitionOutcome};
