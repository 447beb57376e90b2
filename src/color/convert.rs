//! Elementary per-patch conversion functions.
//!
//! Every function converts one source view into a destination view of the
//! same size. They are registered as graph edges and run once per patch by
//! the conversion executor; a function invoked with a channel type it does
//! not implement reports [`PatchVisionError::UnsupportedChannelType`].

use crate::image::buffer::{with_depth, DynView, DynViewMut};
use crate::image::{Depth, ImageView, ImageViewMut, Primitive};
use crate::util::{PatchVisionError, PatchVisionResult};
use num_traits::AsPrimitive;

/// Converts the pixels of `src` into `dst`.
pub type ConvertFn = fn(DynView<'_>, DynViewMut<'_>) -> PatchVisionResult<()>;

/// Applies `f` to every pair of source and destination pixels.
fn map_pixels<S, D, F>(
    src: ImageView<'_, S>,
    mut dst: ImageViewMut<'_, D>,
    f: F,
) -> PatchVisionResult<()>
where
    S: Primitive,
    D: Primitive,
    F: Fn(&[S], &mut [D]),
{
    if src.size() != dst.size() {
        return Err(PatchVisionError::SizeMismatch {
            expected_width: dst.width(),
            expected_height: dst.height(),
            width: src.width(),
            height: src.height(),
        });
    }
    let (sc, dc) = (src.channels(), dst.channels());
    for (y, src_row) in src.rows().enumerate() {
        let Some(dst_row) = dst.row_mut(y) else {
            break;
        };
        for (s, d) in src_row.chunks_exact(sc).zip(dst_row.chunks_exact_mut(dc)) {
            f(s, d);
        }
    }
    Ok(())
}

fn typed_pair<'s, 'd, S: Primitive, D: Primitive>(
    src: DynView<'s>,
    dst: DynViewMut<'d>,
    operation: &'static str,
) -> PatchVisionResult<(ImageView<'s, S>, ImageViewMut<'d, D>)> {
    Ok((src.typed(operation)?, dst.typed(operation)?))
}

fn expect_channels(view: &DynView<'_>, expected: usize) -> PatchVisionResult<()> {
    if view.channels() != expected {
        return Err(PatchVisionError::ChannelCountMismatch {
            expected,
            got: view.channels(),
        });
    }
    Ok(())
}

/// Drops the alpha channel. All depths.
pub fn bgra_to_bgr(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
    expect_channels(&src, 4)?;
    fn run<T: Primitive>(src: ImageView<'_, T>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
        map_pixels(src, dst.typed::<T>("BGRA to BGR")?, |s, d| {
            d.copy_from_slice(&s[..3]);
        })
    }
    with_depth!(src, DynView, view => run(view, dst))
}

/// Adds an opaque alpha channel. `u8` only.
pub fn bgr_to_bgra(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
    expect_channels(&src, 3)?;
    let (src, dst) = typed_pair::<u8, u8>(src, dst, "BGR to BGRA")?;
    map_pixels(src, dst, |s, d| {
        d[..3].copy_from_slice(s);
        d[3] = u8::MAX;
    })
}

/// Luma approximation `(2R + 5G + B) / 8`. `u8` only.
pub fn bgr_to_gray(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
    expect_channels(&src, 3)?;
    let (src, dst) = typed_pair::<u8, u8>(src, dst, "BGR to Gray")?;
    map_pixels(src, dst, |s, d| {
        let (b, g, r) = (s[0] as u32, s[1] as u32, s[2] as u32);
        d[0] = (((r << 1) + (g << 2) + g + b) >> 3) as u8;
    })
}

/// Replicates the intensity into all three channels. All depths.
pub fn gray_to_bgr(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
    expect_channels(&src, 1)?;
    fn run<T: Primitive>(src: ImageView<'_, T>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
        map_pixels(src, dst.typed::<T>("Gray to BGR")?, |s, d| {
            d.fill(s[0]);
        })
    }
    with_depth!(src, DynView, view => run(view, dst))
}

/// Real part from the intensity, zero imaginary part. `f32` and `f64` only.
pub fn gray_to_complex(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
    expect_channels(&src, 1)?;
    fn run<T: Primitive>(src: ImageView<'_, T>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
        map_pixels(src, dst.typed::<T>("Gray to Complex")?, |s, d| {
            d[0] = s[0];
            d[1] = T::default();
        })
    }
    match src {
        DynView::F32(view) => run(view, dst),
        DynView::F64(view) => run(view, dst),
        other => Err(PatchVisionError::UnsupportedChannelType {
            operation: "Gray to Complex",
            depth: other.depth(),
        }),
    }
}

/// 8-bit HSV with the hue halved into `0..180`.
pub fn bgr_to_hsv(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
    expect_channels(&src, 3)?;
    let (src, dst) = typed_pair::<u8, u8>(src, dst, "BGR to HSV")?;
    map_pixels(src, dst, |s, d| d.copy_from_slice(&bgr_to_hsv_pixel([s[0], s[1], s[2]])))
}

/// Inverse of [`bgr_to_hsv`]. `u8` only.
pub fn hsv_to_bgr(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
    expect_channels(&src, 3)?;
    let (src, dst) = typed_pair::<u8, u8>(src, dst, "HSV to BGR")?;
    map_pixels(src, dst, |s, d| d.copy_from_slice(&hsv_to_bgr_pixel([s[0], s[1], s[2]])))
}

pub(crate) fn bgr_to_hsv_pixel([b, g, r]: [u8; 3]) -> [u8; 3] {
    let min = b.min(g).min(r) as i32;
    let max = b.max(g).max(r) as i32;
    if max == 0 {
        return [0, 0, 0];
    }
    let s = 255 * (max - min) / max;
    if s == 0 {
        return [0, 0, max as u8];
    }
    let (b, g, r) = (b as i32, g as i32, r as i32);
    let delta = max - min;
    let hue = if max == r {
        let h = 60 * (g - b) / delta;
        if h < 0 {
            h + 360
        } else {
            h
        }
    } else if max == g {
        120 + 60 * (b - r) / delta
    } else {
        240 + 60 * (r - g) / delta
    };
    [(hue / 2) as u8, s as u8, max as u8]
}

pub(crate) fn hsv_to_bgr_pixel([h, s, v]: [u8; 3]) -> [u8; 3] {
    if s == 0 {
        return [v, v, v];
    }
    let hue = h as i32 * 2;
    let quadrant = hue / 60;
    let offset = hue % 60;
    let v32 = v as i32;
    let vs = v32 * s as i32;

    let p = (v32 - vs / 255) as u8;
    let q = (v32 - (vs / 255 * offset) / 60) as u8;
    let t = (v32 - (vs / 255 * (60 - offset)) / 60) as u8;

    match quadrant {
        0 => [p, t, v],
        1 => [p, v, q],
        2 => [t, v, p],
        3 => [v, q, p],
        4 => [v, p, t],
        _ => [q, p, v],
    }
}

/// Channel-wise numeric conversion with `as` semantics.
fn convert_depth<S, D>(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()>
where
    S: Primitive + AsPrimitive<D>,
    D: Primitive,
{
    let (src, dst) = typed_pair::<S, D>(src, dst, "depth conversion")?;
    map_pixels(src, dst, |s, d| {
        for (out, &value) in d.iter_mut().zip(s) {
            *out = value.as_();
        }
    })
}

fn depth_converter_from<S>(to: Depth) -> ConvertFn
where
    S: Primitive
        + AsPrimitive<u8>
        + AsPrimitive<i16>
        + AsPrimitive<i32>
        + AsPrimitive<f32>
        + AsPrimitive<f64>,
{
    match to {
        Depth::U8 => convert_depth::<S, u8>,
        Depth::I16 => convert_depth::<S, i16>,
        Depth::I32 => convert_depth::<S, i32>,
        Depth::F32 => convert_depth::<S, f32>,
        Depth::F64 => convert_depth::<S, f64>,
    }
}

/// Conversion function between two channel depths of the same color.
pub fn depth_converter(from: Depth, to: Depth) -> ConvertFn {
    match from {
        Depth::U8 => depth_converter_from::<u8>(to),
        Depth::I16 => depth_converter_from::<i16>(to),
        Depth::I32 => depth_converter_from::<i32>(to),
        Depth::F32 => depth_converter_from::<f32>(to),
        Depth::F64 => depth_converter_from::<f64>(to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageView;

    fn run(
        f: ConvertFn,
        src: &[u8],
        src_channels: usize,
        dst_channels: usize,
    ) -> PatchVisionResult<Vec<u8>> {
        let width = src.len() / src_channels;
        let view = ImageView::new(src, width, 1, src_channels, src.len())?;
        let mut out = vec![0u8; width * dst_channels];
        let dst = ImageViewMut::new(&mut out, width, 1, dst_channels, width * dst_channels)?;
        f(DynView::U8(view), DynViewMut::U8(dst))?;
        Ok(out)
    }

    #[test]
    fn gray_weights_red_green_blue() {
        let out = run(bgr_to_gray, &[8, 16, 24, 255, 255, 255], 3, 1).unwrap();
        // (2*24 + 5*16 + 8) / 8 = 17
        assert_eq!(out, vec![17, 255]);
    }

    #[test]
    fn hsv_primary_colors() {
        assert_eq!(bgr_to_hsv_pixel([0, 0, 255]), [0, 255, 255]);
        assert_eq!(bgr_to_hsv_pixel([0, 255, 0]), [60, 255, 255]);
        assert_eq!(bgr_to_hsv_pixel([255, 0, 0]), [120, 255, 255]);
        assert_eq!(bgr_to_hsv_pixel([40, 40, 40]), [0, 0, 40]);
        assert_eq!(bgr_to_hsv_pixel([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn hsv_round_trip_is_close_for_saturated_colors() {
        for bgr in [[0u8, 0, 255], [0, 255, 0], [255, 0, 0], [30, 200, 90]] {
            let back = hsv_to_bgr_pixel(bgr_to_hsv_pixel(bgr));
            for (a, b) in bgr.iter().zip(back.iter()) {
                assert!((*a as i32 - *b as i32).abs() <= 8, "{bgr:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn bgra_drops_alpha() {
        let out = run(bgra_to_bgr, &[1, 2, 3, 4, 5, 6, 7, 8], 4, 3).unwrap();
        assert_eq!(out, vec![1, 2, 3, 5, 6, 7]);
        let out = run(bgr_to_bgra, &[1, 2, 3], 3, 4).unwrap();
        assert_eq!(out, vec![1, 2, 3, 255]);
    }

    #[test]
    fn unsupported_depth_is_reported() {
        let err = run(gray_to_complex, &[1, 2], 1, 2).unwrap_err();
        assert_eq!(
            err,
            PatchVisionError::UnsupportedChannelType {
                operation: "Gray to Complex",
                depth: Depth::U8,
            }
        );
    }

    #[test]
    fn depth_conversion_uses_numeric_casts() {
        let src = [1.7f32, -3.2, 300.0];
        let view = ImageView::new(&src[..], 3, 1, 1, 3).unwrap();
        let mut out = vec![0u8; 3];
        let dst = ImageViewMut::new(&mut out, 3, 1, 1, 3).unwrap();
        depth_converter(Depth::F32, Depth::U8)(DynView::F32(view), DynViewMut::U8(dst)).unwrap();
        assert_eq!(out, vec![1, 0, 255]);
    }
}
