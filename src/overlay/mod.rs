//! Overlay daemon - shows a random hadith on the desktop
//!
//! Everything that touches overlay state runs on this module's event loop.
//! Helper threads (X11 reader, IPC listener, signal listener, tray) only send
//! [`AppEvent`]s over a single channel.

mod event_handler;
pub mod font;
pub mod font_discovery;
mod ipc_handler;
pub mod richtext;
mod tray;
mod window;
mod x11_utils;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::config::JsonSettingsStore;
use crate::ipc::{OverlayClient, OverlayRequest, OverlayResponse, OverlayServer};
use crate::orchestrator::Overlay;
use crate::style::WidgetStyle;

use event_handler::handle_event;
use font::TextRenderer;
use tray::TrayIndicator;
use window::OverlayWindow;
use x11_utils::CachedAtoms;

/// Everything the daemon loop reacts to
#[derive(Debug)]
pub enum AppEvent {
    X11(Event),
    /// The X11 connection is gone; the daemon cannot continue
    X11Lost(String),
    /// Settings file changed on disk; reload the store
    ReloadSettings,
    /// Store reloaded; subscribers must recompute
    SettingsChanged,
    RefreshNow,
    OpenSettings,
    Shutdown,
}

fn spawn_x11_reader(conn: Arc<RustConnection>, tx: mpsc::Sender<AppEvent>) -> Result<()> {
    std::thread::Builder::new()
        .name("x11-events".to_string())
        .spawn(move || loop {
            match conn.wait_for_event() {
                Ok(event) => {
                    if tx.send(AppEvent::X11(event)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(AppEvent::X11Lost(e.to_string()));
                    break;
                }
            }
        })
        .context("Failed to spawn X11 event thread")?;
    Ok(())
}

fn spawn_signal_listener(tx: mpsc::Sender<AppEvent>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal = signal, "Received signal, shutting down");
                let _ = tx.send(AppEvent::Shutdown);
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

/// Open the settings file in the user's default editor
fn open_settings(path: &Path) {
    match std::process::Command::new("xdg-open").arg(path).spawn() {
        Ok(mut child) => {
            info!(path = %path.display(), "Opened settings file");
            // Reap in the background so the child does not linger as a zombie
            std::thread::spawn(move || child.wait());
        }
        Err(e) => error!(path = %path.display(), error = %e, "Failed to open settings"),
    }
}

fn daemon_already_running() -> bool {
    OverlayClient::connect()
        .and_then(|mut client| client.request(&OverlayRequest::Ping))
        .is_ok_and(|response| response == OverlayResponse::Pong)
}

pub fn run_daemon(content_path: PathBuf, settings_path: PathBuf) -> Result<()> {
    if daemon_already_running() {
        anyhow::bail!("hadith-overlay is already running");
    }

    let (conn, screen_num) = x11rb::connect(None)
        .context("Failed to connect to X11 server. Is DISPLAY set correctly?")?;
    let conn = Arc::new(conn);
    let root = {
        let screen = &conn.setup().roots[screen_num];
        info!(
            screen = screen_num,
            width = screen.width_in_pixels,
            height = screen.height_in_pixels,
            "Connected to X11 server"
        );
        screen.root
    };

    // Watch other top-level windows so the topmost layer can re-raise
    conn.change_window_attributes(
        root,
        &ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_NOTIFY),
    )
    .context("Failed to set event mask on root window")?;

    let atoms = CachedAtoms::new(&conn).context("Failed to cache X11 atoms at startup")?;
    let text = TextRenderer::from_system().context("Failed to initialize text renderer")?;

    let (tx, rx) = mpsc::channel::<AppEvent>();
    spawn_x11_reader(conn.clone(), tx.clone())?;
    spawn_signal_listener(tx.clone())?;
    match OverlayServer::bind() {
        Ok(server) => {
            ipc_handler::spawn_ipc_listener(server, tx.clone());
        }
        Err(e) => warn!(error = ?e, "IPC unavailable, CLI commands will not reach this daemon"),
    }

    let store = JsonSettingsStore::open(settings_path);
    let mut overlay = Overlay::new(store);

    let listener_tx = tx.clone();
    let window_conn = conn.clone();
    overlay
        .start(
            &content_path,
            move |settings| {
                OverlayWindow::new(
                    window_conn,
                    screen_num,
                    atoms,
                    text,
                    WidgetStyle::from_settings(settings),
                    settings.position(),
                )
            },
            Box::new(move || {
                let _ = listener_tx.send(AppEvent::SettingsChanged);
            }),
            Instant::now(),
        )
        .context("Failed to start overlay")?;

    match TrayIndicator::spawn(tx.clone()) {
        Ok(tray) => overlay.attach_indicator(Box::new(tray)),
        Err(e) => warn!(error = ?e, "Tray icon unavailable"),
    }
    drop(tx);

    info!("Overlay daemon running");
    run_event_loop(&mut overlay, &rx);

    overlay.shutdown();
    info!("Overlay daemon stopped");
    Ok(())
}

fn run_event_loop(overlay: &mut Overlay<OverlayWindow, JsonSettingsStore>, rx: &mpsc::Receiver<AppEvent>) {
    loop {
        let received = match overlay.next_deadline() {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let event = match received {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => {
                if let Err(e) = overlay.on_tick(Instant::now()) {
                    error!(error = ?e, "Scheduled refresh failed");
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("All event sources closed");
                return;
            }
        };

        let result = match event {
            AppEvent::X11(event) => handle_event(overlay, event),
            AppEvent::X11Lost(reason) => {
                error!(reason = %reason, "Lost connection to X11 server");
                return;
            }
            AppEvent::ReloadSettings => {
                overlay.store_mut().reload();
                Ok(())
            }
            AppEvent::SettingsChanged => overlay.on_settings_changed(Instant::now()),
            AppEvent::RefreshNow => {
                debug!("Manual refresh");
                overlay.refresh_now()
            }
            AppEvent::OpenSettings => {
                open_settings(overlay.store().path());
                Ok(())
            }
            AppEvent::Shutdown => return,
        };
        if let Err(e) = result {
            error!(error = ?e, "Event handling error");
        }

        // A busy event stream must not starve the timer
        if let Err(e) = overlay.on_tick(Instant::now()) {
            error!(error = ?e, "Scheduled refresh failed");
        }
    }
}
