//! The filter session: single source of truth for the selected filter, its
//! parameters, the source image and the derived output image.
//!
//! Every mutator recomputes synchronously before returning, so the output
//! is never stale relative to the last (source, variant, parameters) triple.
//! When a transform yields nothing, the previous output is kept rather than
//! cleared.

use image::RgbaImage;

use crate::error::SessionError;
use crate::filter::{FilterParameters, FilterVariant, ParameterSlot};
use crate::library::{PhotoLibrary, SaveResult};
use crate::ops::{CpuTransform, ImageTransform};
use crate::picker::PickOutcome;

/// What a recompute did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecomputeOutcome {
    /// No source image yet.
    Skipped,
    /// Output replaced with a fresh result.
    Updated,
    /// The transform produced nothing; the previous output was kept.
    NoOutput,
}

pub struct FilterSession<T: ImageTransform = CpuTransform> {
    transform: T,
    variant: FilterVariant,
    params: FilterParameters,
    source: Option<RgbaImage>,
    output: Option<RgbaImage>,
}

impl FilterSession<CpuTransform> {
    /// Sepia, 0.5 / 100 / 10, no image.
    pub fn new() -> Self {
        Self::with_transform(CpuTransform)
    }
}

impl Default for FilterSession<CpuTransform> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ImageTransform> FilterSession<T> {
    pub fn with_transform(transform: T) -> Self {
        Self::with_defaults(transform, FilterVariant::default(), FilterParameters::default())
    }

    pub fn with_defaults(transform: T, variant: FilterVariant, params: FilterParameters) -> Self {
        Self {
            transform,
            variant,
            params,
            source: None,
            output: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn variant(&self) -> FilterVariant {
        self.variant
    }

    /// Label of the active filter, e.g. "Gaussian Blur".
    pub fn label(&self) -> &'static str {
        self.variant.label()
    }

    pub fn parameters(&self) -> FilterParameters {
        self.params
    }

    pub fn parameter(&self, slot: ParameterSlot) -> f32 {
        self.params.get(slot)
    }

    pub fn source(&self) -> Option<&RgbaImage> {
        self.source.as_ref()
    }

    pub fn output(&self) -> Option<&RgbaImage> {
        self.output.as_ref()
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Replace the source image and recompute.
    pub fn set_source_image(&mut self, image: RgbaImage) -> RecomputeOutcome {
        log::debug!("source image set ({}x{})", image.width(), image.height());
        self.source = Some(image);
        self.recompute()
    }

    /// Apply a picker outcome. A dismissal changes nothing and returns `None`.
    pub fn handle_pick(&mut self, outcome: PickOutcome) -> Option<RecomputeOutcome> {
        match outcome {
            PickOutcome::Picked(image) => Some(self.set_source_image(image)),
            PickOutcome::Dismissed => {
                log::debug!("pick dismissed, session unchanged");
                None
            }
        }
    }

    /// Switch filters. Parameter values carry over; the new variant reads
    /// whichever slots it declares.
    pub fn set_variant(&mut self, variant: FilterVariant) -> RecomputeOutcome {
        log::info!("filter: {}", variant.label());
        self.variant = variant;
        self.recompute()
    }

    /// Store a slider value. Recomputes only when the active filter reads
    /// this slot and an image is loaded.
    pub fn set_parameter(&mut self, slot: ParameterSlot, value: f32) -> RecomputeOutcome {
        self.params.set(slot, value);
        if !self.variant.accepts(slot) {
            log::debug!("{slot} = {value} stored; {} does not use it", self.variant.label());
            return RecomputeOutcome::Skipped;
        }
        if self.source.is_none() {
            return RecomputeOutcome::Skipped;
        }
        self.recompute()
    }

    /// Re-derive the output from the current source, variant and parameters.
    pub fn recompute(&mut self) -> RecomputeOutcome {
        let Some(source) = self.source.as_ref() else {
            return RecomputeOutcome::Skipped;
        };

        let applied = self.params.applied_to(self.variant);
        match self.transform.apply(source, self.variant, &applied) {
            Some(image) => {
                self.output = Some(image);
                RecomputeOutcome::Updated
            }
            None => {
                log::debug!(
                    "{} produced no output for {:?}; keeping previous image",
                    self.variant.label(),
                    applied
                );
                RecomputeOutcome::NoOutput
            }
        }
    }

    // ------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------

    /// Hand the output to `library`, logging the outcome when it arrives.
    pub fn request_save<L>(&self, library: &L) -> Result<(), SessionError>
    where
        L: PhotoLibrary + ?Sized,
    {
        self.request_save_with(library, |_| {})
    }

    /// Like [`FilterSession::request_save`], also forwarding the outcome to
    /// `on_complete` after it has been logged.
    pub fn request_save_with<L, F>(&self, library: &L, on_complete: F) -> Result<(), SessionError>
    where
        L: PhotoLibrary + ?Sized,
        F: FnOnce(&SaveResult) + Send + 'static,
    {
        let Some(output) = self.output.as_ref() else {
            log::info!("save requested with no image selected");
            return Err(SessionError::NoImageSelected);
        };

        library.write(
            output.clone(),
            Box::new(move |result| {
                match &result {
                    Ok(saved) => log::info!("Success! saved {}", saved.path.display()),
                    Err(e) => log::error!("Oops: {e}"),
                }
                on_complete(&result);
            }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryError;
    use crate::filter::AppliedParameters;
    use crate::library::{SaveCallback, SavedPhoto};
    use image::Rgba;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};

    fn photo() -> RgbaImage {
        RgbaImage::from_fn(24, 16, |x, y| Rgba([(x * 10) as u8, (y * 15) as u8, 128, 255]))
    }

    /// Transform that fails on demand and counts calls.
    struct Flaky {
        fail: Cell<bool>,
        calls: Cell<usize>,
    }

    impl ImageTransform for Flaky {
        fn apply(
            &self,
            source: &RgbaImage,
            variant: FilterVariant,
            params: &AppliedParameters,
        ) -> Option<RgbaImage> {
            self.calls.set(self.calls.get() + 1);
            if self.fail.get() {
                None
            } else {
                CpuTransform.apply(source, variant, params)
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        written: Mutex<Vec<RgbaImage>>,
    }

    impl PhotoLibrary for Recorder {
        fn write(&self, image: RgbaImage, on_complete: SaveCallback) {
            self.written.lock().unwrap().push(image);
            on_complete(Ok(SavedPhoto { path: "memory".into() }));
        }
    }

    /// Library that rejects every write.
    struct FullDisk;

    impl PhotoLibrary for FullDisk {
        fn write(&self, _image: RgbaImage, on_complete: SaveCallback) {
            on_complete(Err(LibraryError::Io(std::io::Error::other("disk full"))));
        }
    }

    #[test]
    fn starts_with_defaults() {
        let session = FilterSession::new();
        assert_eq!(session.variant(), FilterVariant::Sepia);
        assert_eq!(session.label(), "Sepia Tone");
        assert_eq!(session.parameters(), FilterParameters::default());
        assert!(session.source().is_none());
        assert!(session.output().is_none());
    }

    #[test]
    fn recompute_without_source_is_skipped() {
        let mut session = FilterSession::new();
        assert_eq!(session.recompute(), RecomputeOutcome::Skipped);
        assert_eq!(session.set_variant(FilterVariant::Edges), RecomputeOutcome::Skipped);
        assert!(session.output().is_none());
    }

    #[test]
    fn loading_image_produces_filtered_output() {
        let mut session = FilterSession::new();
        assert_eq!(session.set_source_image(photo()), RecomputeOutcome::Updated);
        let expected = crate::ops::adjustments::sepia(&photo(), 0.5);
        assert_eq!(session.output(), Some(&expected));
    }

    #[test]
    fn undeclared_slot_does_not_recompute() {
        let flaky = Flaky { fail: Cell::new(false), calls: Cell::new(0) };
        let mut session = FilterSession::with_transform(flaky);
        session.set_source_image(photo());
        let before = session.output().cloned();
        let calls = session.transform.calls.get();

        assert_eq!(session.set_parameter(ParameterSlot::Scale, 77.0), RecomputeOutcome::Skipped);
        assert_eq!(session.transform.calls.get(), calls);
        assert_eq!(session.output().cloned(), before);
        assert_eq!(session.parameter(ParameterSlot::Scale), 77.0);
    }

    #[test]
    fn failed_transform_keeps_previous_output() {
        let flaky = Flaky { fail: Cell::new(false), calls: Cell::new(0) };
        let mut session = FilterSession::with_transform(flaky);
        session.set_source_image(photo());
        let good = session.output().cloned().unwrap();

        session.transform.fail.set(true);
        assert_eq!(
            session.set_parameter(ParameterSlot::Intensity, 0.9),
            RecomputeOutcome::NoOutput
        );
        assert_eq!(session.output(), Some(&good));
    }

    #[test]
    fn dismissed_pick_changes_nothing() {
        let mut session = FilterSession::new();
        assert_eq!(session.handle_pick(PickOutcome::Dismissed), None);
        assert!(session.source().is_none());

        assert_eq!(
            session.handle_pick(PickOutcome::Picked(photo())),
            Some(RecomputeOutcome::Updated)
        );
        let out = session.output().cloned();
        assert_eq!(session.handle_pick(PickOutcome::Dismissed), None);
        assert_eq!(session.source(), Some(&photo()));
        assert_eq!(session.output().cloned(), out);
    }

    #[test]
    fn new_source_replaces_output() {
        let mut session = FilterSession::new();
        session.set_variant(FilterVariant::Pixellate);
        session.set_source_image(photo());
        let second = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        session.set_source_image(second.clone());
        assert_eq!(session.output(), Some(&second));
    }

    #[test]
    fn save_without_image_is_refused() {
        let session = FilterSession::new();
        let library = Recorder::default();
        assert_eq!(session.request_save(&library), Err(SessionError::NoImageSelected));
        assert!(library.written.lock().unwrap().is_empty());
    }

    #[test]
    fn save_hands_over_output_and_reports() {
        let mut session = FilterSession::new();
        session.set_source_image(photo());
        let library = Recorder::default();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        session
            .request_save_with(&library, move |result| {
                *sink.lock().unwrap() = Some(result.is_ok());
            })
            .unwrap();
        assert_eq!(library.written.lock().unwrap().as_slice(), &[session.output().unwrap().clone()]);
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[test]
    fn failed_write_reaches_callback_and_leaves_session_intact() {
        let mut session = FilterSession::new();
        session.set_variant(FilterVariant::Vignette);
        session.set_source_image(photo());
        session.set_parameter(ParameterSlot::Intensity, 0.7);
        let output = session.output().cloned();
        let params = session.parameters();

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        session
            .request_save_with(&FullDisk, move |result| {
                *sink.lock().unwrap() = Some(result.as_ref().map(|_| ()).map_err(|e| e.to_string()));
            })
            .unwrap();

        let reported = seen.lock().unwrap().take().unwrap();
        assert!(reported.unwrap_err().contains("disk full"));
        assert_eq!(session.output().cloned(), output);
        assert_eq!(session.source(), Some(&photo()));
        assert_eq!(session.parameters(), params);
        assert_eq!(session.variant(), FilterVariant::Vignette);
    }
}
