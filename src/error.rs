//! This module defines all error types used throughout the crate.

use crate::eval::EvalError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Part of a graph that still references an item whose removal was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphPart {
    InitialStates,
    LabelingFunction,
    Transitions,
}

impl fmt::Display for GraphPart {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            GraphPart::InitialStates => "initial states",
            GraphPart::LabelingFunction => "labeling function",
            GraphPart::Transitions => "transitions",
        };
        f.write_str(name)
    }
}

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A state that is not registered in the transition system
    #[error("State not found: {0}")]
    StateNotFound(String),

    /// A location that is not registered in the program graph
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// An action that is not registered in the transition system
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    /// An atomic proposition that is not registered in the transition system
    #[error("Atomic proposition not found: {0}")]
    PropositionNotFound(String),

    /// A transition referencing unregistered states, locations or actions
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// A label pairing a state with an unknown proposition
    #[error("Invalid label {proposition} on state {state}")]
    InvalidLabel { state: String, proposition: String },

    /// Removal of an item that is still referenced
    #[error("Cannot remove {item}: still referenced by the {part}")]
    DeletionOfAttached { item: String, part: GraphPart },

    /// Expression evaluation errors
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// More than one evaluator recognizes the same text
    #[error("More than one evaluator matches {0:?}")]
    AmbiguousEvaluator(String),

    /// No condition evaluator recognizes a guard
    #[error("No evaluator recognizes condition {0:?}")]
    UnsupportedCondition(String),

    /// An initialization assignment that cannot be applied
    #[error("Invalid initialization: {0}")]
    InvalidInitialization(String),

    /// Model file parsing errors
    #[error("Model parsing error in {file:?}: {message}")]
    ModelParse { file: PathBuf, message: String },

    /// Model file validation errors
    #[error("Model error: {0}")]
    Model(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),

    /// Wrapped anyhow errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a custom error with a message
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn state_not_found(state: &impl fmt::Debug) -> Self {
        Self::StateNotFound(format!("{:?}", state))
    }

    pub fn location_not_found(location: &impl fmt::Debug) -> Self {
        Self::LocationNotFound(format!("{:?}", location))
    }

    pub fn action_not_found(action: &impl fmt::Debug) -> Self {
        Self::ActionNotFound(format!("{:?}", action))
    }

    pub fn proposition_not_found(proposition: &impl fmt::Debug) -> Self {
        Self::PropositionNotFound(format!("{:?}", proposition))
    }

    pub fn invalid_transition(transition: &impl fmt::Debug) -> Self {
        Self::InvalidTransition(format!("{:?}", transition))
    }

    pub fn invalid_label(state: &impl fmt::Debug, proposition: &impl fmt::Debug) -> Self {
        Self::InvalidLabel {
            state: format!("{:?}", state),
            proposition: format!("{:?}", proposition),
        }
    }

    pub fn attached(item: &impl fmt::Debug, part: GraphPart) -> Self {
        Self::DeletionOfAttached {
            item: format!("{:?}", item),
            part,
        }
    }

    /// Check if error is a rejected deletion
    pub fn is_deletion_error(&self) -> bool {
        matches!(self, Error::DeletionOfAttached { .. })
    }

    /// Check if error names an unregistered item
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self,
            Error::StateNotFound(_)
                | Error::LocationNotFound(_)
                | Error::ActionNotFound(_)
                | Error::PropositionNotFound(_)
                | Error::InvalidTransition(_)
                | Error::InvalidLabel { .. }
        )
    }
}

// Implement From traits for common external error types

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ModelParse {
            file: PathBuf::from("unknown"),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ModelParse {
            file: PathBuf::from("unknown"),
            message: format!("JSON error: {}", err),
        }
    }
}

// Helper macros for creating errors

/// Create a custom error with formatting
#[macro_export]
macro_rules! custom_error {
    ($($arg:tt)*) => {
        $crate::error::Error::Custom(format!($($arg)*))
    };
}

/// Bail with a custom error message
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::custom_error!($($arg)*))
    };
}

/// Ensure a condition is true or return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($($arg)*);
        }
    };
}
