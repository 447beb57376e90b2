//! Strided image views and owned dynamic images.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! Pixels are stored as `channels` interleaved elements. The stride counts
//! elements between the starts of consecutive rows, so a stride larger than
//! `width * channels` represents padded rows. ROI slices are zero-copy views
//! into the same backing slice and keep the parent stride.

use crate::util::{PatchVisionError, PatchVisionResult};

pub mod buffer;
mod channels;
pub mod depth;
#[cfg(feature = "image-io")]
pub mod io;
pub mod region;

pub use buffer::{DynView, DynViewMut, Image, ImageData};
pub use depth::{Depth, Primitive};
pub use region::{ImageSize, Region};

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous single-channel view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> PatchVisionResult<Self> {
        Self::new(data, width, height, 1, width)
    }

    /// Creates a view with an explicit channel count and stride (in elements).
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> PatchVisionResult<Self> {
        let needed = required_len(width, height, channels, stride)?;
        if data.len() < needed {
            return Err(PatchVisionError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the image size.
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Returns the number of interleaved channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the interleaved channels of pixel `(x, y)` if it is within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<&'a [T]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y
            .checked_mul(self.stride)?
            .checked_add(x.checked_mul(self.channels)?)?;
        self.data.get(start..start + self.channels)
    }

    /// Returns one channel of pixel `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize, channel: usize) -> Option<&'a T> {
        if channel >= self.channels {
            return None;
        }
        self.pixel(x, y).and_then(|px| px.get(channel))
    }

    /// Returns a contiguous slice for row `y` with length `width * channels`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.row_len())?;
        self.data.get(start..end)
    }

    /// Iterates over all rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        let row_len = self.row_len();
        let data = self.data;
        let stride = self.stride;
        (0..self.height).map(move |y| &data[y * stride..y * stride + row_len])
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(&self, region: Region) -> PatchVisionResult<ImageView<'a, T>> {
        let start = roi_start(region, self.size(), self.channels, self.stride)?;
        let data = self
            .data
            .get(start..)
            .ok_or(PatchVisionError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;
        ImageView::new(data, region.width, region.height, self.channels, self.stride)
    }

    fn row_len(&self) -> usize {
        self.width * self.channels
    }
}

/// Mutable borrowed 2D image view with an explicit stride.
#[derive(Debug)]
pub struct ImageViewMut<'a, T> {
    data: &'a mut [T],
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
}

impl<'a, T> ImageViewMut<'a, T> {
    /// Creates a mutable view with an explicit channel count and stride (in elements).
    pub fn new(
        data: &'a mut [T],
        width: usize,
        height: usize,
        channels: usize,
        stride: usize,
    ) -> PatchVisionResult<Self> {
        let needed = required_len(width, height, channels, stride)?;
        if data.len() < needed {
            return Err(PatchVisionError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
            stride,
        })
    }

    /// Creates a contiguous single-channel mutable view.
    pub fn from_slice(data: &'a mut [T], width: usize, height: usize) -> PatchVisionResult<Self> {
        Self::new(data, width, height, 1, width)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns a read-only view of the same pixels.
    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &*self.data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            stride: self.stride,
        }
    }

    /// Reborrows the view for a shorter lifetime.
    pub fn reborrow(&mut self) -> ImageViewMut<'_, T> {
        ImageViewMut {
            data: &mut *self.data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            stride: self.stride,
        }
    }

    /// Returns a mutable slice for row `y` with length `width * channels`.
    pub fn row_mut(&mut self, y: usize) -> Option<&mut [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * self.channels)?;
        self.data.get_mut(start..end)
    }

    /// Returns the interleaved channels of pixel `(x, y)` mutably.
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> Option<&mut [T]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = y * self.stride + x * self.channels;
        self.data.get_mut(start..start + self.channels)
    }

    /// Returns a mutable zero-copy ROI view.
    pub fn roi_mut(&mut self, region: Region) -> PatchVisionResult<ImageViewMut<'_, T>> {
        let start = roi_start(region, self.size(), self.channels, self.stride)?;
        let len = self.data.len();
        let data = self
            .data
            .get_mut(start..)
            .ok_or(PatchVisionError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: len,
            })?;
        ImageViewMut::new(data, region.width, region.height, self.channels, self.stride)
    }

    /// Splits the view into consecutive full-width row stripes.
    ///
    /// `heights` must sum to the view height; every stripe borrows a disjoint
    /// part of the backing slice.
    pub fn split_rows(self, heights: &[usize]) -> PatchVisionResult<Vec<ImageViewMut<'a, T>>> {
        let total: usize = heights.iter().sum();
        if total != self.height {
            return Err(PatchVisionError::InvalidPatchLayout {
                reason: "stripe heights do not sum to the image height",
            });
        }
        let (width, channels, stride) = (self.width, self.channels, self.stride);
        let mut rest = self.data;
        let mut stripes = Vec::with_capacity(heights.len());
        for (idx, &h) in heights.iter().enumerate() {
            if h == 0 {
                return Err(PatchVisionError::InvalidPatchLayout {
                    reason: "empty stripe",
                });
            }
            let taken = std::mem::take(&mut rest);
            let (head, tail) = if idx + 1 == heights.len() {
                (taken, Default::default())
            } else {
                let split = (h * stride).min(taken.len());
                taken.split_at_mut(split)
            };
            stripes.push(ImageViewMut::new(head, width, h, channels, stride)?);
            rest = tail;
        }
        Ok(stripes)
    }
}

fn roi_start(
    region: Region,
    size: ImageSize,
    channels: usize,
    stride: usize,
) -> PatchVisionResult<usize> {
    if region.width == 0 || region.height == 0 {
        return Err(PatchVisionError::InvalidDimensions {
            width: region.width,
            height: region.height,
        });
    }
    if !region.fits_within(size) {
        return Err(PatchVisionError::RegionOutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            img_width: size.width,
            img_height: size.height,
        });
    }
    region
        .y
        .checked_mul(stride)
        .and_then(|v| v.checked_add(region.x * channels))
        .ok_or(PatchVisionError::InvalidDimensions {
            width: size.width,
            height: size.height,
        })
}

pub(crate) fn required_len(
    width: usize,
    height: usize,
    channels: usize,
    stride: usize,
) -> PatchVisionResult<usize> {
    if width == 0 || height == 0 || channels == 0 {
        return Err(PatchVisionError::InvalidDimensions { width, height });
    }
    let row_len = width
        .checked_mul(channels)
        .ok_or(PatchVisionError::InvalidDimensions { width, height })?;
    if stride < row_len {
        return Err(PatchVisionError::InvalidStride { row_len, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_len))
        .ok_or(PatchVisionError::InvalidDimensions { width, height })?;
    Ok(needed)
}
