//! Pure calculation functions for shrink dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use crate::formula::AxisResolution;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("requested size resolves to nothing ({width:.2}x{height:.2})")]
    NonPositive { width: f64, height: f64 },
    #[error("source image has no pixels ({0}x{1})")]
    EmptySource(u32, u32),
}

/// Reconcile two axis resolutions into final output dimensions.
///
/// Contain-fit: the aspect ratio of `source` is preserved and the image is
/// never enlarged.
///
/// - both axes derived → `source` unchanged
/// - one axis explicit → that axis drives the scale, the other follows
/// - both explicit → the smaller of the two scales wins
///
/// In every case the scale is capped at 1.0, axes are rounded half-up and
/// clamped to `1..=source`.
///
/// # Examples
/// ```
/// # use ribs::formula::AxisResolution;
/// # use ribs::imaging::{Dimensions, contain_fit};
/// let source = Dimensions { width: 160, height: 90 };
///
/// // 80 wide, height follows the aspect ratio
/// let fit = contain_fit(AxisResolution::Explicit(80.0), AxisResolution::Derived, source).unwrap();
/// assert_eq!((fit.width, fit.height), (80, 45));
///
/// // Never upscales
/// let fit = contain_fit(AxisResolution::Explicit(320.0), AxisResolution::Explicit(90.0), source).unwrap();
/// assert_eq!((fit.width, fit.height), (160, 90));
/// ```
pub fn contain_fit(
    width: AxisResolution,
    height: AxisResolution,
    source: Dimensions,
) -> Result<Dimensions, ResolutionError> {
    if source.width == 0 || source.height == 0 {
        return Err(ResolutionError::EmptySource(source.width, source.height));
    }
    let src_w = source.width as f64;
    let src_h = source.height as f64;

    let scale = match (width.target(), height.target()) {
        (None, None) => return Ok(source),
        (Some(tw), None) => tw / src_w,
        (None, Some(th)) => th / src_h,
        (Some(tw), Some(th)) => (tw / src_w).min(th / src_h),
    }
    .min(1.0);

    let out_w = round_half_up(src_w * scale);
    let out_h = round_half_up(src_h * scale);
    if out_w <= 0.0 && out_h <= 0.0 {
        return Err(ResolutionError::NonPositive {
            width: src_w * scale,
            height: src_h * scale,
        });
    }

    Ok(Dimensions {
        width: clamp_axis(out_w, source.width),
        height: clamp_axis(out_h, source.height),
    })
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

fn clamp_axis(value: f64, max: u32) -> u32 {
    value.clamp(1.0, max as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use AxisResolution::{Derived, Explicit};

    const SOURCE: Dimensions = Dimensions {
        width: 160,
        height: 90,
    };

    fn fit(width: AxisResolution, height: AxisResolution) -> (u32, u32) {
        let d = contain_fit(width, height, SOURCE).unwrap();
        (d.width, d.height)
    }

    // =========================================================================
    // Derived axes
    // =========================================================================

    #[test]
    fn both_derived_is_passthrough() {
        assert_eq!(fit(Derived, Derived), (160, 90));
    }

    #[test]
    fn width_only_derives_height() {
        assert_eq!(fit(Explicit(80.0), Derived), (80, 45));
    }

    #[test]
    fn height_only_derives_width() {
        // 160 * 60/90 = 106.67
        assert_eq!(fit(Derived, Explicit(60.0)), (107, 60));
    }

    #[test]
    fn derived_axis_rounds_half_up() {
        // 90 * 140/160 = 78.75
        assert_eq!(fit(Explicit(140.0), Derived), (140, 79));
        // 90 * 90/160 = 50.625
        assert_eq!(fit(Explicit(90.0), Derived), (90, 51));
    }

    #[test]
    fn single_axis_never_upscales() {
        assert_eq!(fit(Explicit(320.0), Derived), (160, 90));
        assert_eq!(fit(Derived, Explicit(180.0)), (160, 90));
    }

    // =========================================================================
    // Both axes explicit
    // =========================================================================

    #[test]
    fn exact_half() {
        assert_eq!(fit(Explicit(80.0), Explicit(45.0)), (80, 45));
    }

    #[test]
    fn no_upscale_clamp() {
        assert_eq!(fit(Explicit(320.0), Explicit(90.0)), (160, 90));
        assert_eq!(fit(Explicit(320.0), Explicit(180.0)), (160, 90));
        assert_eq!(fit(Explicit(160.0), Explicit(180.0)), (160, 90));
    }

    #[test]
    fn smaller_scale_wins() {
        assert_eq!(fit(Explicit(80.0), Explicit(180.0)), (80, 45));
        assert_eq!(fit(Explicit(320.0), Explicit(45.0)), (80, 45));
        // min(150/160, 50/90) = 0.5556 → 88.9 x 50
        assert_eq!(fit(Explicit(150.0), Explicit(50.0)), (89, 50));
    }

    #[test]
    fn scale_never_exceeds_one() {
        for tw in [1.0, 37.0, 159.0, 160.0, 161.0, 1000.0] {
            for th in [1.0, 12.0, 89.0, 90.0, 91.0, 1000.0] {
                let (w, h) = fit(Explicit(tw), Explicit(th));
                assert!(w <= 160 && h <= 90, "{tw}x{th} → {w}x{h}");
                assert!(w >= 1 && h >= 1, "{tw}x{th} → {w}x{h}");
            }
        }
    }

    #[test]
    fn tiny_target_clamps_to_one_pixel() {
        // 90 * 1/160 = 0.56 → 1
        assert_eq!(fit(Explicit(1.0), Derived), (1, 1));
        // 160 * 0.4/90 rounds to 1, height 0.4 rounds to 0 → clamped
        assert_eq!(fit(Derived, Explicit(0.4)), (1, 1));
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn non_positive_both_axes_is_error() {
        let err = contain_fit(Explicit(-40.0), Derived, SOURCE).unwrap_err();
        assert!(matches!(err, ResolutionError::NonPositive { .. }));
        assert!(contain_fit(Explicit(0.0), Derived, SOURCE).is_err());
        assert!(contain_fit(Explicit(-1.0), Explicit(45.0), SOURCE).is_err());
    }

    #[test]
    fn empty_source_is_error() {
        let source = Dimensions {
            width: 0,
            height: 90,
        };
        assert_eq!(
            contain_fit(Derived, Derived, source),
            Err(ResolutionError::EmptySource(0, 90))
        );
    }

    #[test]
    fn resolution_is_pure() {
        let a = contain_fit(Explicit(150.0), Explicit(50.0), SOURCE);
        let b = contain_fit(Explicit(150.0), Explicit(50.0), SOURCE);
        assert_eq!(a, b);
    }
}
