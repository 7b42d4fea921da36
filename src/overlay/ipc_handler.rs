//! IPC listener thread: turns CLI requests into daemon events

use anyhow::{Context, Result};
use std::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::ipc::{OverlayClient, OverlayRequest, OverlayResponse, OverlayServer};

use super::AppEvent;

/// Spawn IPC listener thread. The server (and its socket file) lives as long
/// as the thread does.
pub fn spawn_ipc_listener(server: OverlayServer, tx: mpsc::Sender<AppEvent>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = run_ipc_loop(&server, &tx) {
            error!(error = ?e, "IPC listener thread crashed");
        }
    })
}

fn run_ipc_loop(server: &OverlayServer, tx: &mpsc::Sender<AppEvent>) -> Result<()> {
    info!(socket = %server.path().display(), "IPC listener started");

    loop {
        let mut client = server.accept().context("Failed to accept IPC connection")?;
        match serve_client(&mut client, tx) {
            Ok(true) => continue,
            Ok(false) => break Ok(()),
            Err(e) => warn!(error = ?e, "IPC connection closed or error"),
        }
    }
}

/// Handle requests until the client hangs up. Returns `false` once the main
/// loop is gone and the listener should stop.
fn serve_client(client: &mut OverlayClient, tx: &mpsc::Sender<AppEvent>) -> Result<bool> {
    loop {
        let request = match client.recv_request() {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "IPC client disconnected");
                return Ok(true);
            }
        };
        debug!(request = ?request, "Received IPC request");

        let (event, response) = match request {
            OverlayRequest::Ping => (None, OverlayResponse::Pong),
            OverlayRequest::SettingsChanged => (Some(AppEvent::ReloadSettings), OverlayResponse::Ready),
            OverlayRequest::Refresh => (Some(AppEvent::RefreshNow), OverlayResponse::Ready),
            OverlayRequest::Shutdown => {
                info!("Received shutdown request via IPC");
                (Some(AppEvent::Shutdown), OverlayResponse::Ready)
            }
        };

        if let Some(event) = event
            && tx.send(event).is_err()
        {
            warn!("Main loop is gone, stopping IPC listener");
            client
                .send_response(&OverlayResponse::Error("daemon is shutting down".to_string()))
                .ok();
            return Ok(false);
        }
        client.send_response(&response)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_become_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.sock");
        let server = OverlayServer::bind_to(path.clone()).unwrap();
        let (tx, rx) = mpsc::channel();
        let _listener = spawn_ipc_listener(server, tx);

        let mut client = OverlayClient::connect_to(&path).unwrap();
        assert_eq!(client.request(&OverlayRequest::Ping).unwrap(), OverlayResponse::Pong);
        assert_eq!(client.request(&OverlayRequest::SettingsChanged).unwrap(), OverlayResponse::Ready);
        assert_eq!(client.request(&OverlayRequest::Refresh).unwrap(), OverlayResponse::Ready);

        assert!(matches!(rx.recv().unwrap(), AppEvent::ReloadSettings));
        assert!(matches!(rx.recv().unwrap(), AppEvent::RefreshNow));
        assert!(rx.try_recv().is_err());
    }
}
