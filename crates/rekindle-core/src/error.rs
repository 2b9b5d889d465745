// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Rekindle engine.

use thiserror::Error;

/// The primary error type used across all Rekindle collaborator traits and
/// core operations.
#[derive(Debug, Error)]
pub enum RekindleError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel send errors (provider failure, message rejected, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A conversation state transition that the transition table does not allow.
    ///
    /// Rejected transitions are logged by the state machine, never silently
    /// ignored.
    #[error("invalid transition from {from} on {input}")]
    InvalidTransition { from: String, input: String },

    /// A step fired for a lead with no active conversation, or a conversation
    /// in a state that forbids the requested operation.
    #[error("inconsistent lead state for {lead_id}: {detail}")]
    InconsistentLead { lead_id: String, detail: String },

    /// Requested collaborator adapter was not registered.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// The settings provider could not produce a snapshot. The scheduler
    /// treats this as a no-send posture, not a guess.
    #[error("settings unavailable: {0}")]
    SettingsUnavailable(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
