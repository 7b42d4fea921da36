//! Settings store shared with the external preferences surface
//!
//! The store owns the settings file. The daemon reads snapshots, writes the
//! position keys after a drag, and reloads when told the file changed.
//! Subscribers are notified after every reload; they recompute everything, so
//! a notification that changed nothing is harmless.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::settings::{Settings, SettingsKey};

/// Identifies a change subscription so it can be dropped at shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

pub type ChangeListener = Box<dyn Fn() + Send>;

/// What the core needs from a settings store
pub trait SettingsStore {
    /// Current values as an immutable snapshot
    fn snapshot(&self) -> Settings;

    /// Write one integer key (the core only ever writes the position keys)
    fn set_int(&mut self, key: SettingsKey, value: i32) -> Result<()>;

    /// Register a "settings changed" listener
    fn subscribe(&mut self, listener: ChangeListener) -> SubscriptionId;

    /// Drop a listener; unknown ids are ignored
    fn unsubscribe(&mut self, id: SubscriptionId);
}

/// Shared subscription bookkeeping
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, ChangeListener)>,
}

impl Subscribers {
    pub fn add(&mut self, listener: ChangeListener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(existing, _)| *existing != id);
    }

    pub fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

/// JSON file backed store (`$XDG_CONFIG_HOME/hadith-overlay/settings.json`)
pub struct JsonSettingsStore {
    path: PathBuf,
    settings: Settings,
    subscribers: Subscribers,
}

impl JsonSettingsStore {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(crate::constants::config::APP_DIR);
        path.push(crate::constants::config::FILENAME);
        path
    }

    /// Open the store, creating the file with defaults when it does not exist.
    /// An unparsable file is left untouched and defaults are used in memory.
    pub fn open(path: PathBuf) -> Self {
        let settings = Self::read(&path);
        let store = Self {
            path,
            settings,
            subscribers: Subscribers::default(),
        };
        store.backfill_missing_keys();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One key rendered the way `set` accepts it
    pub fn value(&self, key: SettingsKey) -> String {
        self.settings.get(key)
    }

    fn read(path: &Path) -> Settings {
        let mut settings = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to parse settings file, using defaults");
                    error!(path = %path.display(), "The file has been preserved - fix the syntax error and reload.");
                    Settings::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "No settings file found, using defaults");
                Settings::default()
            }
        };
        settings.validate_and_clamp();
        settings
    }

    /// Write defaults for keys missing from the file so users see every option.
    /// Never touches a file that does not parse.
    fn backfill_missing_keys(&self) {
        let mut document = match self.read_document() {
            Ok(Some(document)) => document,
            Ok(None) => {
                match self.save() {
                    Ok(()) => info!(path = %self.path.display(), "Created settings file with defaults"),
                    Err(e) => error!(error = ?e, "Failed to write settings file"),
                }
                return;
            }
            Err(_) => return,
        };

        let current = match self.serialized() {
            Ok(current) => current,
            Err(e) => {
                error!(error = ?e, "Failed to serialize settings");
                return;
            }
        };
        let mut missing = Vec::new();
        for key in SettingsKey::ALL {
            if !document.contains_key(key.name())
                && let Some(value) = current.get(key.name())
            {
                document.insert(key.name().to_string(), value.clone());
                missing.push(key.name());
            }
        }
        if missing.is_empty() {
            return;
        }

        match self.write_document(document) {
            Ok(()) => info!(path = %self.path.display(), added_keys = ?missing, "Added missing default(s) to settings file"),
            Err(e) => error!(error = ?e, "Failed to write settings file"),
        }
    }

    /// The file as a JSON object; `None` when it does not exist yet
    fn read_document(&self) -> Result<Option<Map<String, Value>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).context(format!("Failed to read settings file {}", self.path.display()));
            }
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(document)) => Ok(Some(document)),
            Ok(_) => anyhow::bail!("Settings file {} is not a JSON object", self.path.display()),
            Err(e) => Err(e).context(format!("Failed to parse settings file {}", self.path.display())),
        }
    }

    fn write_document(&self, document: Map<String, Value>) -> Result<()> {
        let contents = serde_json::to_string_pretty(&Value::Object(document))
            .context("Failed to serialize settings to JSON")?;
        fs::write(&self.path, contents)
            .context(format!("Failed to write settings file to {}", self.path.display()))
    }

    fn serialized(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(&self.settings).context("Failed to serialize settings to JSON")? {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("Settings did not serialize to a JSON object"),
        }
    }

    /// Write the whole snapshot (used to create a missing file)
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create settings directory: {}", parent.display()))?;
        }
        self.write_document(self.serialized()?)
    }

    /// Re-read the file and notify every subscriber
    pub fn reload(&mut self) {
        self.settings = Self::read(&self.path);
        debug!(subscribers = self.subscribers.len(), "Settings reloaded, notifying subscribers");
        self.subscribers.notify();
    }

    /// Parse and persist one key given as text (used by the `set` subcommand).
    ///
    /// Only that key changes on disk. Other keys keep whatever the file holds
    /// now, including edits not reloaded yet. A file that does not parse is
    /// never overwritten.
    pub fn set_from_str(&mut self, key: SettingsKey, raw: &str) -> Result<()> {
        let mut updated = self.settings.clone();
        updated.set(key, raw)?;

        let document = match self.read_document() {
            Ok(document) => document,
            Err(e) => {
                error!(path = %self.path.display(), key = %key, error = ?e, "Refusing to write settings: fix the file and reload");
                return Err(e.context(format!("Not saving {} over an unreadable settings file", key)));
            }
        };

        self.settings = updated;
        let Some(mut document) = document else {
            return self.save()
                .context(format!("Failed to save settings after updating {}", key));
        };
        if let Some(value) = self.serialized()?.remove(key.name()) {
            document.insert(key.name().to_string(), value);
        }
        self.write_document(document)
            .context(format!("Failed to save settings after updating {}", key))
    }
}

impl SettingsStore for JsonSettingsStore {
    fn snapshot(&self) -> Settings {
        self.settings.clone()
    }

    fn set_int(&mut self, key: SettingsKey, value: i32) -> Result<()> {
        // A drag can end partly off screen; store the nearest accepted value
        let value = match key.int_range() {
            Some(range) => {
                let clamped = (value as i64).clamp(*range.start(), *range.end());
                if clamped != value as i64 {
                    debug!(key = %key, value = value, using = clamped, "Clamping written value");
                }
                clamped
            }
            None => value as i64,
        };
        self.set_from_str(key, &value.to_string())
    }

    fn subscribe(&mut self, listener: ChangeListener) -> SubscriptionId {
        self.subscribers.add(listener)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.remove(id);
    }
}
