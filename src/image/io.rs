//! Convenience helpers for loading and saving images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::color::{Bgr, ColorInfo, Gray};
use crate::image::Image;
use crate::util::{PatchVisionError, PatchVisionResult};
use std::path::Path;

fn io_error(err: image::ImageError) -> PatchVisionError {
    PatchVisionError::ImageIo {
        reason: err.to_string(),
    }
}

/// Creates a `Bgr`/`u8` image from a dynamic image.
pub fn bgr_from_dynamic_image(img: &image::DynamicImage) -> PatchVisionResult<Image> {
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let mut data = rgb.into_raw();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Image::from_vec(ColorInfo::of::<Bgr, u8>()?, data, width, height)
}

/// Loads an image from disk as `Bgr`/`u8`.
pub fn load_bgr_image<P: AsRef<Path>>(path: P) -> PatchVisionResult<Image> {
    let img = image::open(path).map_err(io_error)?;
    bgr_from_dynamic_image(&img)
}

/// Copies a `Gray`/`u8` image into an `image::GrayImage`.
pub fn to_gray_image(img: &Image) -> PatchVisionResult<image::GrayImage> {
    let expected = ColorInfo::of::<Gray, u8>()?;
    if img.info() != expected {
        return Err(PatchVisionError::ColorMismatch {
            expected: expected.to_string(),
            got: img.info().to_string(),
        });
    }
    let view = img.typed::<u8>()?;
    let mut raw = Vec::with_capacity(img.width() * img.height());
    for row in view.rows() {
        raw.extend_from_slice(row);
    }
    image::GrayImage::from_raw(img.width() as u32, img.height() as u32, raw).ok_or(
        PatchVisionError::BufferTooSmall {
            needed: img.width() * img.height(),
            got: 0,
        },
    )
}

/// Saves a `Gray`/`u8` image; the format follows the file extension.
pub fn save_gray_image<P: AsRef<Path>>(img: &Image, path: P) -> PatchVisionResult<()> {
    to_gray_image(img)?.save(path).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::{bgr_from_dynamic_image, to_gray_image};
    use crate::color::{Bgr, ColorInfo};
    use crate::image::Image;

    #[test]
    fn rgb_is_reordered_to_bgr() {
        let rgb = image::RgbImage::from_raw(1, 1, vec![10, 20, 30]).unwrap();
        let img = bgr_from_dynamic_image(&image::DynamicImage::ImageRgb8(rgb)).unwrap();
        assert_eq!(img.info(), ColorInfo::of::<Bgr, u8>().unwrap());
        assert_eq!(img.typed::<u8>().unwrap().pixel(0, 0).unwrap(), &[30, 20, 10]);
    }

    #[test]
    fn only_gray_images_are_exported() {
        let bgr = Image::of::<Bgr, u8>(2, 2).unwrap();
        assert!(to_gray_image(&bgr).is_err());
    }
}
