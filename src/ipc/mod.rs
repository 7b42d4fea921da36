//! IPC (Inter-Process Communication) via Unix sockets
//!
//! Lets the CLI subcommands reach the running daemon (settings reload, refresh,
//! quit). Uses length-prefixed JSON over a Unix domain socket.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{config, ipc::{MAX_MESSAGE_SIZE, SOCKET_NAME}};

mod messages;
pub use messages::{OverlayRequest, OverlayResponse};

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(config::APP_DIR).join(SOCKET_NAME));
    }

    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(config::APP_DIR).join(SOCKET_NAME))
}

/// One end of a connection; the CLI holds the client side, the daemon's
/// listener thread holds the accepted side
pub struct OverlayClient {
    stream: UnixStream,
}

impl OverlayClient {
    /// Connect to the daemon socket
    pub fn connect() -> Result<Self> {
        let path = default_socket_path()?;
        Self::connect_to(&path)
    }

    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to hadith-overlay daemon at {}", path.display()))?;
        Ok(Self { stream })
    }

    /// Send request and wait for the response
    pub fn request(&mut self, req: &OverlayRequest) -> Result<OverlayResponse> {
        write_message(&mut self.stream, req)?;
        read_message(&mut self.stream)
    }

    /// Receive a request (daemon side, blocking)
    pub fn recv_request(&mut self) -> Result<OverlayRequest> {
        read_message(&mut self.stream)
    }

    /// Reply to a request (daemon side)
    pub fn send_response(&mut self, resp: &OverlayResponse) -> Result<()> {
        write_message(&mut self.stream, resp)
    }
}

/// Server listener owned by the daemon
pub struct OverlayServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl OverlayServer {
    /// Create server and bind to default socket path
    pub fn bind() -> Result<Self> {
        let socket_path = default_socket_path()?;
        Self::bind_to(socket_path)
    }

    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Left behind by a daemon that did not exit cleanly
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
            debug!(path = %socket_path.display(), "Removed stale socket");
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept incoming connection (blocking)
    pub fn accept(&self) -> Result<OverlayClient> {
        let (stream, _addr) = self.listener.accept()
            .context("Failed to accept IPC connection")?;
        Ok(OverlayClient { stream })
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for OverlayServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Write length-prefixed message to stream
fn write_message<T: Serialize>(stream: &mut impl Write, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Length prefix (u32 little-endian)
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;
    stream
        .write_all(&json)
        .context("Failed to write message payload")?;
    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
fn read_message<T: for<'de> Deserialize<'de>>(stream: &mut impl Read) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}
