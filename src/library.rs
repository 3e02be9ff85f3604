//! Photo-library writers.
//!
//! `write` hands the image to a rayon worker and returns immediately; the
//! outcome arrives through the completion callback. There is no retry.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use image::RgbaImage;

use crate::error::LibraryError;
use crate::io::{SaveFormat, encode_and_write};

/// Where a successful write ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPhoto {
    pub path: PathBuf,
}

pub type SaveResult = Result<SavedPhoto, LibraryError>;
pub type SaveCallback = Box<dyn FnOnce(SaveResult) + Send + 'static>;

pub trait PhotoLibrary {
    /// Persist `image`. `on_complete` is called exactly once, possibly from
    /// another thread.
    fn write(&self, image: RgbaImage, on_complete: SaveCallback);
}

/// Encode on a rayon worker and report through `on_complete`.
fn spawn_write(
    image: RgbaImage,
    path: PathBuf,
    format: SaveFormat,
    quality: u8,
    on_complete: SaveCallback,
) {
    rayon::spawn(move || {
        let result = ensure_parent(&path)
            .and_then(|()| encode_and_write(&image, &path, format, quality))
            .map(|()| SavedPhoto { path });
        on_complete(result);
    });
}

fn ensure_parent(path: &Path) -> Result<(), LibraryError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

// ============================================================================
// ALBUM: a directory of auto-named photos
// ============================================================================

/// A directory acting as the photo album. Files are named
/// `instafilter_<YYYYMMDD_HHMMSS>_<n>.<ext>` and never overwrite each other.
#[derive(Debug)]
pub struct AlbumLibrary {
    dir: PathBuf,
    format: SaveFormat,
    quality: u8,
    counter: AtomicU32,
}

impl AlbumLibrary {
    pub fn new(dir: impl Into<PathBuf>, format: SaveFormat, quality: u8) -> Self {
        Self {
            dir: dir.into(),
            format,
            quality,
            counter: AtomicU32::new(1),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve the next unused file name.
    fn next_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        loop {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            let candidate = self.dir.join(format!(
                "instafilter_{stamp}_{n:04}.{}",
                self.format.extension()
            ));
            if !candidate.exists() {
                return candidate;
            }
        }
    }
}

impl PhotoLibrary for AlbumLibrary {
    fn write(&self, image: RgbaImage, on_complete: SaveCallback) {
        let path = self.next_path();
        log::debug!("album write queued: {}", path.display());
        spawn_write(image, path, self.format, self.quality, on_complete);
    }
}

// ============================================================================
// FILE TARGET: one explicit output path
// ============================================================================

/// Writes every image to the same path (the batch `--output` case).
#[derive(Debug, Clone)]
pub struct FileTarget {
    path: PathBuf,
    format: SaveFormat,
    quality: u8,
}

impl FileTarget {
    pub fn new(path: impl Into<PathBuf>, format: SaveFormat, quality: u8) -> Self {
        Self { path: path.into(), format, quality }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PhotoLibrary for FileTarget {
    fn write(&self, image: RgbaImage, on_complete: SaveCallback) {
        spawn_write(image, self.path.clone(), self.format, self.quality, on_complete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load_image_sync;
    use image::Rgba;
    use std::sync::mpsc;

    fn write_blocking(library: &dyn PhotoLibrary, image: RgbaImage) -> SaveResult {
        let (tx, rx) = mpsc::channel();
        library.write(
            image,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        rx.recv().unwrap()
    }

    #[test]
    fn album_creates_directory_and_unique_names() {
        let root = tempfile::tempdir().unwrap();
        let album = AlbumLibrary::new(root.path().join("Album"), SaveFormat::Png, 90);
        let img = RgbaImage::from_pixel(4, 4, Rgba([5, 6, 7, 255]));

        let first = write_blocking(&album, img.clone()).unwrap();
        let second = write_blocking(&album, img.clone()).unwrap();
        assert_ne!(first.path, second.path);
        assert!(first.path.starts_with(album.dir()));
        assert_eq!(first.path.extension().unwrap(), "png");
        assert_eq!(load_image_sync(&second.path, u64::MAX).unwrap(), img);
    }

    #[test]
    fn file_target_writes_exact_path() {
        let root = tempfile::tempdir().unwrap();
        let target = FileTarget::new(root.path().join("nested/out.bmp"), SaveFormat::Bmp, 90);
        let img = RgbaImage::from_pixel(3, 2, Rgba([200, 10, 10, 255]));
        let saved = write_blocking(&target, img.clone()).unwrap();
        assert_eq!(saved.path, target.path());
        assert_eq!(load_image_sync(target.path(), u64::MAX).unwrap(), img);
    }

    #[test]
    fn failed_write_reports_error() {
        let root = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = root.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let target = FileTarget::new(blocker.join("out.png"), SaveFormat::Png, 90);
        let result = write_blocking(&target, RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255])));
        assert!(matches!(result, Err(LibraryError::Io(_))));
    }
}
