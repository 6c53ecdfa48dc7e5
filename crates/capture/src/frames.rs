//! A camera backed by a directory of still images.
//!
//! Frames are replayed in file-name order and loop forever, which makes it
//! possible to exercise the real decode engine without camera hardware.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use image::imageops::FilterType;

use crate::device::{Frame, MediaProvider, MediaStream, VideoConstraints};
use crate::error::AcquireError;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Media provider that opens a directory of frames as its only camera.
pub struct FrameDirectoryProvider {
    dir: PathBuf,
}

impl FrameDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// List the frame files in `dir`, sorted by name.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, AcquireError> {
    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        IoErrorKind::NotFound => AcquireError::NoDevice(format!("{} does not exist", dir.display())),
        IoErrorKind::PermissionDenied => {
            AcquireError::PermissionDenied(format!("cannot read {}", dir.display()))
        }
        _ => AcquireError::Device(format!("{}: {e}", dir.display())),
    })?;

    let mut frames: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();

    if frames.is_empty() {
        return Err(AcquireError::NoDevice(format!(
            "no image frames in {}",
            dir.display()
        )));
    }
    Ok(frames)
}

#[async_trait::async_trait]
impl MediaProvider for FrameDirectoryProvider {
    async fn request_video_stream(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Arc<dyn MediaStream>, AcquireError> {
        let dir = self.dir.clone();
        let frames = tokio::task::spawn_blocking(move || list_frames(&dir))
            .await
            .map_err(|e| AcquireError::Device(format!("frame listing failed: {e}")))??;

        tracing::info!(
            dir = %self.dir.display(),
            frames = frames.len(),
            "Opened frame directory camera"
        );
        Ok(Arc::new(FrameDirectoryStream::new(
            self.dir.display().to_string(),
            frames,
            *constraints,
        )))
    }

    fn name(&self) -> &str {
        "frame-directory"
    }
}

/// Stream over the frames of one directory.
pub struct FrameDirectoryStream {
    id: String,
    frames: Vec<PathBuf>,
    cursor: AtomicUsize,
    live: AtomicBool,
    max_width: u32,
    max_height: u32,
}

impl FrameDirectoryStream {
    pub fn new(id: String, frames: Vec<PathBuf>, constraints: VideoConstraints) -> Self {
        Self {
            id,
            frames,
            cursor: AtomicUsize::new(0),
            live: AtomicBool::new(true),
            max_width: constraints.ideal_width.max(1),
            max_height: constraints.ideal_height.max(1),
        }
    }

    fn load(&self, path: &Path) -> Result<Frame, String> {
        let mut img = image::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
        if img.width() > self.max_width || img.height() > self.max_height {
            img = img.resize(self.max_width, self.max_height, FilterType::Triangle);
        }
        let gray = img.to_luma8();
        let (width, height) = gray.dimensions();
        Frame::from_luma(width, height, gray.into_raw())
            .ok_or_else(|| format!("{}: frame size mismatch", path.display()))
    }
}

impl MediaStream for FrameDirectoryStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        "frame directory"
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn read_frame(&self) -> Option<Result<Frame, String>> {
        if !self.is_live() || self.frames.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.frames.len();
        Some(self.load(&self.frames[index]))
    }

    fn stop_all_tracks(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            tracing::debug!(stream = %self.id, "Frame directory stream stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tillscan-frames-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_directory_is_no_device() {
        let err = list_frames(Path::new("/definitely/not/a/camera")).unwrap_err();
        assert!(matches!(err, AcquireError::NoDevice(_)));
    }

    #[test]
    fn test_directory_without_images_is_no_device() {
        let dir = scratch_dir("empty");
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();
        assert!(matches!(list_frames(&dir), Err(AcquireError::NoDevice(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_stream_loops_frames_and_downscales() {
        let dir = scratch_dir("loop");
        image::GrayImage::from_pixel(64, 32, image::Luma([200u8]))
            .save(dir.join("b.png"))
            .unwrap();
        image::GrayImage::from_pixel(8, 8, image::Luma([10u8]))
            .save(dir.join("a.png"))
            .unwrap();

        let provider = FrameDirectoryProvider::new(&dir);
        let constraints = VideoConstraints {
            ideal_width: 32,
            ideal_height: 32,
            ..VideoConstraints::default()
        };
        let stream = provider.request_video_stream(&constraints).await.unwrap();

        let first = stream.read_frame().unwrap().unwrap();
        assert_eq!((first.width, first.height), (8, 8));
        assert_eq!(first.pixel(0, 0), 10);

        let second = stream.read_frame().unwrap().unwrap();
        assert_eq!((second.width, second.height), (32, 16));

        let third = stream.read_frame().unwrap().unwrap();
        assert_eq!(third.width, 8);

        stream.stop_all_tracks();
        assert!(stream.read_frame().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
