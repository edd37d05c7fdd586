use std::path::{Path, PathBuf};

use tokio::runtime::Handle as TokioHandle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::{
    assets::Handle,
    error::AssetError,
    texture::{TextureData, TextureFormat},
};

/// Completion notice for a load started with [`AssetServer::load_texture`].
#[derive(Debug)]
pub enum AssetEvent {
    TextureLoaded {
        handle: Handle<TextureData>,
        path: PathBuf,
        data: TextureData,
    },
    /// Permanent: the server never retries.
    TextureFailed {
        handle: Handle<TextureData>,
        path: PathBuf,
        error: AssetError,
    },
}

impl AssetEvent {
    pub fn handle(&self) -> Handle<TextureData> {
        match self {
            AssetEvent::TextureLoaded { handle, .. } | AssetEvent::TextureFailed { handle, .. } => {
                *handle
            }
        }
    }
}

/// Resolves textures off the render thread.
///
/// Decoding runs on the I/O runtime; results come back through a channel the
/// render thread drains with [`AssetServer::poll`] between frames.
pub struct AssetServer {
    event_sender: UnboundedSender<AssetEvent>,
    event_receiver: UnboundedReceiver<AssetEvent>,
    // The "Ticket" to the Async World
    io_handle: TokioHandle,
    pending: usize,
}

impl AssetServer {
    pub fn new(io_handle: TokioHandle) -> Self {
        let (event_sender, event_receiver) = unbounded_channel();
        Self {
            event_sender,
            event_receiver,
            io_handle,
            pending: 0,
        }
    }

    /// Starts decoding `path` and returns its handle immediately.
    pub fn load_texture(&mut self, path: impl AsRef<Path>, format: TextureFormat) -> Handle<TextureData> {
        let handle = Handle::<TextureData>::new();
        let path = path.as_ref().to_path_buf();
        let sender = self.event_sender.clone();
        self.pending += 1;

        self.io_handle.spawn(async move {
            log::info!("[AssetServer] Loading: {}", path.display());

            let path_clone = path.clone();
            let result =
                tokio::task::spawn_blocking(move || TextureData::open(&path_clone, format)).await;

            let event = match result {
                Ok(Ok(data)) => AssetEvent::TextureLoaded { handle, path, data },
                Ok(Err(error)) => AssetEvent::TextureFailed { handle, path, error },
                Err(join) => AssetEvent::TextureFailed {
                    handle,
                    path,
                    error: join.into(),
                },
            };

            // The receiver only disappears when the server is dropped.
            let _ = sender.send(event);
        });

        handle
    }

    /// Drains every completed load without blocking.
    pub fn poll(&mut self) -> Vec<AssetEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_receiver.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            events.push(event);
        }
        events
    }

    /// Waits for the next completed load. Returns `None` once nothing is pending.
    pub async fn next_event(&mut self) -> Option<AssetEvent> {
        if self.pending == 0 {
            return None;
        }
        let event = self.event_receiver.recv().await;
        if event.is_some() {
            self.pending -= 1;
        }
        event
    }

    /// Number of loads started but not yet observed.
    pub fn pending(&self) -> usize {
        self.pending
    }
}
