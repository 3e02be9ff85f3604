//! Image picker bridge.
//!
//! A picker presents some selection surface and reports back exactly once:
//! either an image or a dismissal. [`FilePicker`] is the file-system
//! implementation used by the CLI; it decodes on a rayon worker so the
//! caller is never blocked by a large file.

use std::collections::VecDeque;
use std::path::PathBuf;

use image::RgbaImage;

use crate::io::load_image_sync;

/// Terminal outcome of one `present` call.
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    Picked(RgbaImage),
    Dismissed,
}

pub type PickCallback = Box<dyn FnOnce(PickOutcome) + Send + 'static>;

pub trait ImagePicker {
    /// Present the picker. `on_complete` is called exactly once, possibly
    /// from another thread.
    fn present(&mut self, on_complete: PickCallback);
}

/// Picks files from a queue of paths, one per `present`.
#[derive(Debug, Clone)]
pub struct FilePicker {
    queue: VecDeque<PathBuf>,
    max_pixels: u64,
}

impl FilePicker {
    pub fn new(max_pixels: u64) -> Self {
        Self { queue: VecDeque::new(), max_pixels }
    }

    pub fn with_paths<I>(paths: I, max_pixels: u64) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self { queue: paths.into_iter().collect(), max_pixels }
    }

    /// Queue a path for the next `present`.
    pub fn push(&mut self, path: PathBuf) {
        self.queue.push_back(path);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl ImagePicker for FilePicker {
    fn present(&mut self, on_complete: PickCallback) {
        let Some(path) = self.queue.pop_front() else {
            log::debug!("picker dismissed: nothing queued");
            on_complete(PickOutcome::Dismissed);
            return;
        };

        let max_pixels = self.max_pixels;
        rayon::spawn(move || {
            let outcome = match load_image_sync(&path, max_pixels) {
                Ok(img) => {
                    log::info!(
                        "picked {} ({}x{})",
                        path.display(),
                        img.width(),
                        img.height()
                    );
                    PickOutcome::Picked(img)
                }
                Err(e) => {
                    log::warn!("picker dismissed: {e}");
                    PickOutcome::Dismissed
                }
            };
            on_complete(outcome);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{SaveFormat, encode_and_write};
    use image::Rgba;
    use std::sync::mpsc;

    fn present_blocking(picker: &mut FilePicker) -> PickOutcome {
        let (tx, rx) = mpsc::channel();
        picker.present(Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }));
        rx.recv().unwrap()
    }

    #[test]
    fn empty_queue_dismisses() {
        let mut picker = FilePicker::new(u64::MAX);
        assert_eq!(present_blocking(&mut picker), PickOutcome::Dismissed);
    }

    #[test]
    fn delivers_queued_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        let img_a = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        let img_b = RgbaImage::from_pixel(3, 1, Rgba([9, 8, 7, 255]));
        encode_and_write(&img_a, &a, SaveFormat::Png, 90).unwrap();
        encode_and_write(&img_b, &b, SaveFormat::Png, 90).unwrap();

        let mut picker = FilePicker::with_paths([a, b], u64::MAX);
        assert_eq!(picker.pending(), 2);
        assert_eq!(present_blocking(&mut picker), PickOutcome::Picked(img_a));
        assert_eq!(present_blocking(&mut picker), PickOutcome::Picked(img_b));
        assert_eq!(present_blocking(&mut picker), PickOutcome::Dismissed);
    }

    #[test]
    fn undecodable_file_dismisses() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.jpg");
        std::fs::write(&bad, b"\x00\x01garbage").unwrap();
        let mut picker = FilePicker::new(u64::MAX);
        picker.push(bad);
        assert_eq!(present_blocking(&mut picker), PickOutcome::Dismissed);
    }
}
