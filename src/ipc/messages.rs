//! IPC message types for CLI ↔ daemon communication

use serde::{Deserialize, Serialize};

/// Requests sent from the CLI to the running daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum OverlayRequest {
    /// The settings file was edited; reload it and apply
    SettingsChanged,

    /// Show a new random hadith now
    Refresh,

    /// Health check
    Ping,

    /// Request graceful shutdown
    Shutdown,
}

/// Responses sent from the daemon back to the CLI
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum OverlayResponse {
    /// Health check response
    Pong,

    /// Acknowledgment that the request was queued
    Ready,

    /// Error occurred
    Error(String),
}
