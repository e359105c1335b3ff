//! Transition system module - Explicit labelled state spaces and their composition

pub mod analyzer;
pub mod interleave;
pub mod system;
pub mod transition;

// Re-export key types
pub use analyzer::{
    AlternatingSequence, is_action_deterministic, is_ap_deterministic, is_execution,
    is_execution_fragment, is_initial_execution_fragment, is_maximal_execution_fragment,
};
pub use interleave::{interleave, interleave_handshaking};
pub use system::{SystemStats, TransitionSystem};
pub use transition::Transition;
