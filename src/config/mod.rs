//! Configuration management for hadith-overlay
//!
//! - **settings**: the typed, immutable settings snapshot and key parsing
//! - **store**: the JSON file backed store with change subscriptions

pub mod settings;
pub mod store;

pub use settings::{Settings, SettingsError, SettingsKey};
pub use store::{JsonSettingsStore, SettingsStore, SubscriptionId};
