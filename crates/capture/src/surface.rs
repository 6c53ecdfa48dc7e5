//! The video surface a stream is rendered to and decoded from.

use std::sync::Arc;

use crate::device::MediaStream;

/// Binding between a live stream and the element that displays it.
///
/// Holds at most one stream. Binding a new stream replaces the old binding
/// without stopping it; stopping tracks is the session's job.
#[derive(Default)]
pub struct VideoSurface {
    stream: Option<Arc<dyn MediaStream>>,
    playing: bool,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a stream to the surface.
    pub fn bind(&mut self, stream: Arc<dyn MediaStream>) {
        if let Some(previous) = &self.stream {
            tracing::debug!(previous = %previous.id(), next = %stream.id(), "Rebinding video surface");
        }
        self.stream = Some(stream);
        self.playing = false;
    }

    /// Start playback of the bound stream.
    ///
    /// Returns `false` when there is nothing live to play.
    pub fn play(&mut self) -> bool {
        match &self.stream {
            Some(stream) if stream.is_live() => {
                self.playing = true;
                true
            }
            Some(stream) => {
                tracing::warn!(stream = %stream.id(), "Video surface bound to a stopped stream");
                false
            }
            None => false,
        }
    }

    /// Detach the stream, returning it if one was bound.
    pub fn detach(&mut self) -> Option<Arc<dyn MediaStream>> {
        self.playing = false;
        self.stream.take()
    }

    /// The currently bound stream.
    pub fn stream(&self) -> Option<Arc<dyn MediaStream>> {
        self.stream.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}
