//! Status area menu via D-Bus StatusNotifierItem (ksni)
//!
//! The tray runs on its own thread with a current-thread tokio runtime. Menu
//! actions are forwarded to the daemon loop as [`AppEvent`]s.

use anyhow::{Context, Result};
use ksni::menu::StandardItem;
use ksni::{MenuItem, TrayMethods};
use std::sync::mpsc;
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::surface::Indicator;

use super::AppEvent;

struct HadithTray {
    tx: mpsc::Sender<AppEvent>,
}

impl HadithTray {
    fn send(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            warn!("Daemon loop is gone, ignoring tray action");
        }
    }
}

impl ksni::Tray for HadithTray {
    fn id(&self) -> String {
        crate::constants::config::APP_DIR.to_string()
    }

    fn title(&self) -> String {
        "Hadith Overlay".to_string()
    }

    fn icon_name(&self) -> String {
        "accessories-dictionary".to_string()
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        vec![
            StandardItem {
                label: "Refresh Hadith".into(),
                icon_name: "view-refresh".into(),
                activate: Box::new(|this: &mut Self| this.send(AppEvent::RefreshNow)),
                ..Default::default()
            }
            .into(),
            MenuItem::Separator,
            StandardItem {
                label: "Settings".into(),
                icon_name: "preferences-system".into(),
                activate: Box::new(|this: &mut Self| this.send(AppEvent::OpenSettings)),
                ..Default::default()
            }
            .into(),
            StandardItem {
                label: "Quit".into(),
                icon_name: "application-exit".into(),
                activate: Box::new(|this: &mut Self| this.send(AppEvent::Shutdown)),
                ..Default::default()
            }
            .into(),
        ]
    }
}

/// Handle to the running tray thread
pub struct TrayIndicator {
    stop: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TrayIndicator {
    pub fn spawn(tx: mpsc::Sender<AppEvent>) -> Result<Self> {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build tokio runtime for tray")?;

        let thread = std::thread::Builder::new()
            .name("tray".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let handle = match (HadithTray { tx }).spawn().await {
                        Ok(handle) => handle,
                        Err(e) => {
                            error!(error = %e, "Failed to register tray icon (no StatusNotifier host?)");
                            return;
                        }
                    };
                    info!("Tray icon registered");

                    // Sender dropped or signalled: either way, stop
                    let _ = stop_rx.await;
                    handle.shutdown().await;
                    debug!("Tray icon removed");
                });
            })
            .context("Failed to spawn tray thread")?;

        Ok(Self {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

impl Indicator for TrayIndicator {
    fn release(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("Tray thread panicked");
        }
    }
}

impl Drop for TrayIndicator {
    fn drop(&mut self) {
        self.release();
    }
}
