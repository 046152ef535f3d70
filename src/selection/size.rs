//! Best-fit capture size selection.

use crate::capture::{CameraParameters, PixelFormat, Resolution, Viewport};

/// Picks the supported resolution that best fits `target`.
///
/// First pass: among sizes whose aspect ratio is within `tolerance` of
/// the target's, take the one whose height is closest to the target
/// height. Second pass, only if the first found nothing: ignore aspect
/// ratio and take the closest height overall. Ties go to the earliest
/// entry in `supported`.
///
/// Returns `None` only when `supported` is empty.
pub fn select_optimal(
    supported: &[Resolution],
    target: Viewport,
    tolerance: f64,
) -> Option<Resolution> {
    let target_ratio = f64::from(target.width) / f64::from(target.height);

    let framed = supported
        .iter()
        .filter(|size| (size.aspect_ratio() - target_ratio).abs() <= tolerance);

    closest_height(framed, target.height).or_else(|| {
        tracing::debug!(
            target_width = target.width,
            target_height = target.height,
            "No size within aspect tolerance, matching on height only"
        );
        closest_height(supported.iter(), target.height)
    })
}

fn closest_height<'a>(
    candidates: impl Iterator<Item = &'a Resolution>,
    height: u32,
) -> Option<Resolution> {
    // min_by_key keeps the first of equal keys
    candidates
        .min_by_key(|size| size.height.abs_diff(height))
        .copied()
}

/// Applies `requested` as the preview size only if the device supports it
/// exactly. Returns the applied size; no match leaves `params` untouched.
pub fn apply_preferred_size(
    params: &mut CameraParameters,
    requested: Resolution,
) -> Option<Resolution> {
    let supported = params.supported_preview_sizes.contains(&requested);
    if supported {
        params.preview_size = Some(requested);
    }
    supported.then_some(requested)
}

/// Applies `requested` as the preview format only if the device supports
/// it. Returns the applied format; no match leaves `params` untouched.
pub fn apply_preferred_format(
    params: &mut CameraParameters,
    requested: PixelFormat,
) -> Option<PixelFormat> {
    let supported = params.supported_preview_formats.contains(&requested);
    if supported {
        params.preview_format = Some(requested);
    }
    supported.then_some(requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TOLERANCE: f64 = 0.1;

    fn sizes(list: &[(u32, u32)]) -> Vec<Resolution> {
        list.iter().map(|&(w, h)| Resolution::new(w, h)).collect()
    }

    #[test]
    fn test_prefers_matching_aspect() {
        let supported = sizes(&[(640, 480), (800, 600), (1280, 720)]);
        let chosen = select_optimal(&supported, Viewport::new(1270, 720), TOLERANCE);
        assert_eq!(chosen, Some(Resolution::new(1280, 720)));
    }

    #[test]
    fn test_falls_back_to_height_only() {
        let supported = sizes(&[(640, 480)]);
        let chosen = select_optimal(&supported, Viewport::new(1920, 1080), TOLERANCE);
        assert_eq!(chosen, Some(Resolution::new(640, 480)));
    }

    #[test]
    fn test_aspect_match_beats_closer_height() {
        // 4:3 target; 1280x720 is closer in height but the wrong shape
        let supported = sizes(&[(1280, 720), (640, 480)]);
        let chosen = select_optimal(&supported, Viewport::new(960, 720), TOLERANCE);
        assert_eq!(chosen, Some(Resolution::new(640, 480)));
    }

    #[test]
    fn test_ties_resolve_to_first() {
        let supported = sizes(&[(800, 600), (1024, 600)]);
        let chosen = select_optimal(&supported, Viewport::new(50, 50), TOLERANCE);
        assert_eq!(chosen, Some(Resolution::new(800, 600)));
    }

    #[test]
    fn test_empty_set_has_no_result() {
        assert_eq!(select_optimal(&[], Viewport::new(640, 480), TOLERANCE), None);
    }

    #[test]
    fn test_zero_height_target_uses_fallback_pass() {
        let supported = sizes(&[(640, 480), (320, 240)]);
        let chosen = select_optimal(&supported, Viewport::new(640, 0), TOLERANCE);
        assert_eq!(chosen, Some(Resolution::new(320, 240)));
    }

    #[test]
    fn test_preferred_size_exact_match_only() {
        let mut params = CameraParameters {
            supported_preview_sizes: sizes(&[(640, 480), (1280, 720)]),
            ..Default::default()
        };

        assert_eq!(apply_preferred_size(&mut params, Resolution::new(1280, 721)), None);
        assert_eq!(params.preview_size, None);

        assert_eq!(
            apply_preferred_size(&mut params, Resolution::new(1280, 720)),
            Some(Resolution::new(1280, 720))
        );
        assert_eq!(params.preview_size, Some(Resolution::new(1280, 720)));
    }

    #[test]
    fn test_preferred_format_unsupported_is_noop() {
        let mut params = CameraParameters {
            preview_format: Some(PixelFormat::Nv21),
            supported_preview_formats: vec![PixelFormat::Nv21],
            ..Default::default()
        };

        assert_eq!(apply_preferred_format(&mut params, PixelFormat::Rgb565), None);
        assert_eq!(params.preview_format, Some(PixelFormat::Nv21));
    }

    fn resolution() -> impl Strategy<Value = Resolution> {
        (1u32..4000, 1u32..4000).prop_map(|(w, h)| Resolution::new(w, h))
    }

    proptest! {
        #[test]
        fn prop_result_is_member(
            supported in prop::collection::vec(resolution(), 1..12),
            w in 1u32..4000,
            h in 1u32..4000,
        ) {
            let chosen = select_optimal(&supported, Viewport::new(w, h), TOLERANCE);
            prop_assert!(chosen.is_some());
            prop_assert!(supported.contains(&chosen.unwrap()));
        }

        #[test]
        fn prop_prefers_tolerance_subset(
            supported in prop::collection::vec(resolution(), 1..12),
            w in 1u32..4000,
            h in 1u32..4000,
        ) {
            let ratio = f64::from(w) / f64::from(h);
            let within = |r: &Resolution| (r.aspect_ratio() - ratio).abs() <= TOLERANCE;
            let chosen = select_optimal(&supported, Viewport::new(w, h), TOLERANCE).unwrap();
            if supported.iter().any(within) {
                prop_assert!(within(&chosen));
            }
        }
    }
}
