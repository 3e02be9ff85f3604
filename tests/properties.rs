use image::{Rgba, RgbaImage};
use proptest::prelude::*;

use instafilter::{FilterSession, FilterVariant, ParameterSlot, RecomputeOutcome};

fn variant() -> impl Strategy<Value = FilterVariant> {
    prop::sample::select(FilterVariant::ALL.to_vec())
}

fn slot() -> impl Strategy<Value = ParameterSlot> {
    prop::sample::select(ParameterSlot::ALL.to_vec())
}

fn photo(seed: u8) -> RgbaImage {
    RgbaImage::from_fn(12, 9, |x, y| {
        Rgba([seed.wrapping_add((x * 19) as u8), (y * 23) as u8, seed ^ 0x5A, 255])
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn undeclared_slot_never_changes_output(
        variant in variant(),
        slot in slot(),
        value in 0.0f32..500.0,
        seed in any::<u8>(),
    ) {
        prop_assume!(!variant.accepts(slot));
        let mut session = FilterSession::new();
        session.set_variant(variant);
        session.set_source_image(photo(seed));
        let before = session.output().cloned();

        prop_assert_eq!(session.set_parameter(slot, value), RecomputeOutcome::Skipped);
        prop_assert_eq!(session.output().cloned(), before);
        prop_assert_eq!(session.parameter(slot), value);
    }

    #[test]
    fn output_keeps_source_dimensions(
        variant in variant(),
        intensity in 0.0f32..=1.0,
        radius in 0.0f32..60.0,
        scale in 0.0f32..60.0,
    ) {
        let mut session = FilterSession::new();
        session.set_variant(variant);
        session.set_parameter(ParameterSlot::Intensity, intensity);
        session.set_parameter(ParameterSlot::Radius, radius);
        session.set_parameter(ParameterSlot::Scale, scale);
        prop_assert_eq!(session.set_source_image(photo(7)), RecomputeOutcome::Updated);
        let out = session.output().unwrap();
        prop_assert_eq!(out.dimensions(), (12, 9));
    }

    #[test]
    fn slug_and_label_parse_back(variant in variant()) {
        prop_assert_eq!(variant.slug().parse::<FilterVariant>().unwrap(), variant);
        prop_assert_eq!(variant.label().parse::<FilterVariant>().unwrap(), variant);
    }
}
