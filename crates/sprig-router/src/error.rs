//! Error types for route registration and variable lookup.

use std::fmt;

use thiserror::Error;

/// The kind of single-occupancy slot a route node offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Request handler.
    Handler,
    /// Websocket handler.
    WebSocket,
    /// Background task handler.
    Task,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Handler => "handler",
            Self::WebSocket => "websocket handler",
            Self::Task => "task handler",
        })
    }
}

/// Router-specific errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The pattern could not be compiled.
    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Another wildcard or catch-all already branches at the same position.
    #[error(
        "route pattern {pattern:?} conflicts with a wildcard or catch-all \
         registered at the same position"
    )]
    Conflict { pattern: String },

    /// The target node already holds a component of this kind.
    #[error("{kind} for route {pattern:?} already exists ({location})")]
    HandlerExists {
        kind: SlotKind,
        pattern: String,
        location: String,
    },

    /// The matched route declares no variable with this name.
    #[error("no path variable named {0:?}")]
    MissingVar(String),

    /// A path variable could not be parsed into the requested type.
    #[error("path variable {name:?} has unparsable value {value:?}")]
    InvalidVar { name: String, value: String },
}

impl RouterError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
