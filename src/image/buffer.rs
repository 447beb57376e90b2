//! Owned images tagged with a color/depth descriptor.
//!
//! An [`Image`] owns its pixels and carries the [`ColorInfo`] that describes
//! them. Storage is a closed enum over the supported channel depths, so
//! per-depth algorithms dispatch with an exhaustive `match` instead of a
//! runtime type table.

use crate::color::{ColorInfo, ColorSpace, Comparison};
use crate::image::depth::{Depth, Primitive};
use crate::image::region::{ImageSize, Region};
use crate::image::{required_len, ImageView, ImageViewMut};
use crate::util::{PatchVisionError, PatchVisionResult};

/// Dispatches an expression over every variant of a depth-tagged enum.
macro_rules! with_depth {
    ($value:expr, $enum:ident, $bind:ident => $body:expr) => {
        match $value {
            $enum::U8($bind) => $body,
            $enum::I16($bind) => $body,
            $enum::I32($bind) => $body,
            $enum::F32($bind) => $body,
            $enum::F64($bind) => $body,
        }
    };
}

pub(crate) use with_depth;

/// Depth-tagged pixel storage.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl ImageData {
    /// Zero-filled storage of `len` elements.
    pub fn zeros(depth: Depth, len: usize) -> Self {
        match depth {
            Depth::U8 => ImageData::U8(vec![0; len]),
            Depth::I16 => ImageData::I16(vec![0; len]),
            Depth::I32 => ImageData::I32(vec![0; len]),
            Depth::F32 => ImageData::F32(vec![0.0; len]),
            Depth::F64 => ImageData::F64(vec![0.0; len]),
        }
    }

    /// Depth tag of the storage.
    pub fn depth(&self) -> Depth {
        match self {
            ImageData::U8(_) => Depth::U8,
            ImageData::I16(_) => Depth::I16,
            ImageData::I32(_) => Depth::I32,
            ImageData::F32(_) => Depth::F32,
            ImageData::F64(_) => Depth::F64,
        }
    }

    /// Number of stored elements (including row padding).
    pub fn len(&self) -> usize {
        with_depth!(self, ImageData, values => values.len())
    }

    /// Returns true if no elements are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Depth-tagged borrowed view.
#[derive(Clone, Copy, Debug)]
pub enum DynView<'a> {
    U8(ImageView<'a, u8>),
    I16(ImageView<'a, i16>),
    I32(ImageView<'a, i32>),
    F32(ImageView<'a, f32>),
    F64(ImageView<'a, f64>),
}

impl<'a> DynView<'a> {
    pub fn depth(&self) -> Depth {
        match self {
            DynView::U8(_) => Depth::U8,
            DynView::I16(_) => Depth::I16,
            DynView::I32(_) => Depth::I32,
            DynView::F32(_) => Depth::F32,
            DynView::F64(_) => Depth::F64,
        }
    }

    pub fn width(&self) -> usize {
        with_depth!(self, DynView, view => view.width())
    }

    pub fn height(&self) -> usize {
        with_depth!(self, DynView, view => view.height())
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width(), self.height())
    }

    pub fn channels(&self) -> usize {
        with_depth!(self, DynView, view => view.channels())
    }

    /// Narrows to a typed view, failing with the operation name on a depth mismatch.
    pub fn typed<T: Primitive>(self, operation: &'static str) -> PatchVisionResult<ImageView<'a, T>> {
        let depth = self.depth();
        T::from_dyn(self).ok_or(PatchVisionError::UnsupportedChannelType { operation, depth })
    }

    /// Zero-copy sub-region view.
    pub fn roi(&self, region: Region) -> PatchVisionResult<DynView<'a>> {
        Ok(match self {
            DynView::U8(view) => DynView::U8(view.roi(region)?),
            DynView::I16(view) => DynView::I16(view.roi(region)?),
            DynView::I32(view) => DynView::I32(view.roi(region)?),
            DynView::F32(view) => DynView::F32(view.roi(region)?),
            DynView::F64(view) => DynView::F64(view.roi(region)?),
        })
    }
}

/// Depth-tagged mutable borrowed view.
#[derive(Debug)]
pub enum DynViewMut<'a> {
    U8(ImageViewMut<'a, u8>),
    I16(ImageViewMut<'a, i16>),
    I32(ImageViewMut<'a, i32>),
    F32(ImageViewMut<'a, f32>),
    F64(ImageViewMut<'a, f64>),
}

impl<'a> DynViewMut<'a> {
    pub fn depth(&self) -> Depth {
        match self {
            DynViewMut::U8(_) => Depth::U8,
            DynViewMut::I16(_) => Depth::I16,
            DynViewMut::I32(_) => Depth::I32,
            DynViewMut::F32(_) => Depth::F32,
            DynViewMut::F64(_) => Depth::F64,
        }
    }

    pub fn width(&self) -> usize {
        with_depth!(self, DynViewMut, view => view.width())
    }

    pub fn height(&self) -> usize {
        with_depth!(self, DynViewMut, view => view.height())
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width(), self.height())
    }

    pub fn channels(&self) -> usize {
        with_depth!(self, DynViewMut, view => view.channels())
    }

    /// Narrows to a typed mutable view, failing with the operation name on a depth mismatch.
    pub fn typed<T: Primitive>(
        self,
        operation: &'static str,
    ) -> PatchVisionResult<ImageViewMut<'a, T>> {
        let depth = self.depth();
        T::from_dyn_mut(self).ok_or(PatchVisionError::UnsupportedChannelType { operation, depth })
    }

    /// Splits into consecutive full-width row stripes.
    pub fn split_rows(self, heights: &[usize]) -> PatchVisionResult<Vec<DynViewMut<'a>>> {
        fn wrap<'v, T: Primitive>(
            stripes: Vec<ImageViewMut<'v, T>>,
        ) -> Vec<DynViewMut<'v>> {
            stripes.into_iter().map(T::into_dyn_mut).collect()
        }
        Ok(match self {
            DynViewMut::U8(view) => wrap(view.split_rows(heights)?),
            DynViewMut::I16(view) => wrap(view.split_rows(heights)?),
            DynViewMut::I32(view) => wrap(view.split_rows(heights)?),
            DynViewMut::F32(view) => wrap(view.split_rows(heights)?),
            DynViewMut::F64(view) => wrap(view.split_rows(heights)?),
        })
    }
}

/// Owned image with interleaved channels and an explicit row stride.
///
/// The descriptor is a `'static` reference into the process-wide
/// [`ColorInfo`] cache. Casting an image to a structurally compatible
/// descriptor only swaps that reference; the pixel buffer is untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    info: &'static ColorInfo,
    width: usize,
    height: usize,
    stride: usize,
    data: ImageData,
}

impl Image {
    /// Allocates a zeroed, contiguous image.
    pub fn new(info: &'static ColorInfo, width: usize, height: usize) -> PatchVisionResult<Self> {
        let row_len = width
            .checked_mul(info.channels())
            .ok_or(PatchVisionError::InvalidDimensions { width, height })?;
        Self::with_stride(info, width, height, row_len * info.channel_size())
    }

    /// Allocates a zeroed image whose rows are `stride_bytes` apart.
    ///
    /// The stride must cover a full row and be a multiple of the channel size.
    pub fn with_stride(
        info: &'static ColorInfo,
        width: usize,
        height: usize,
        stride_bytes: usize,
    ) -> PatchVisionResult<Self> {
        let stride = elements_stride(info, width, stride_bytes)?;
        let len = required_len(width, height, info.channels(), stride)?;
        // Keep the trailing row padded too so that row stripes split evenly.
        let len = len.max(height * stride);
        Ok(Self {
            info,
            width,
            height,
            stride,
            data: ImageData::zeros(info.depth(), len),
        })
    }

    /// Allocates a zeroed image for a statically known color space and depth.
    pub fn of<C: ColorSpace, T: Primitive>(width: usize, height: usize) -> PatchVisionResult<Self> {
        Self::new(ColorInfo::of::<C, T>()?, width, height)
    }

    /// Wraps a contiguous buffer of interleaved pixels.
    pub fn from_vec<T: Primitive>(
        info: &'static ColorInfo,
        data: Vec<T>,
        width: usize,
        height: usize,
    ) -> PatchVisionResult<Self> {
        let stride_bytes = width
            .checked_mul(info.size())
            .ok_or(PatchVisionError::InvalidDimensions { width, height })?;
        Self::from_vec_with_stride(info, data, width, height, stride_bytes)
    }

    /// Wraps a buffer of interleaved pixels whose rows are `stride_bytes` apart.
    pub fn from_vec_with_stride<T: Primitive>(
        info: &'static ColorInfo,
        data: Vec<T>,
        width: usize,
        height: usize,
        stride_bytes: usize,
    ) -> PatchVisionResult<Self> {
        if info.depth() != T::DEPTH {
            return Err(PatchVisionError::UnsupportedChannelType {
                operation: "image construction",
                depth: T::DEPTH,
            });
        }
        let stride = elements_stride(info, width, stride_bytes)?;
        let needed = required_len(width, height, info.channels(), stride)?;
        if data.len() < needed {
            return Err(PatchVisionError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            info,
            width,
            height,
            stride,
            data: T::wrap(data),
        })
    }

    /// Color/depth descriptor of the pixels.
    pub fn info(&self) -> &'static ColorInfo {
        self.info
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
        self.info.channels()
    }

    pub fn depth(&self) -> Depth {
        self.info.depth()
    }

    /// Row pitch in elements.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Row pitch in bytes; may exceed `width * pixel size`.
    pub fn stride_bytes(&self) -> usize {
        self.stride * self.info.channel_size()
    }

    /// Backing storage including padding.
    pub fn data(&self) -> &ImageData {
        &self.data
    }

    /// Consumes the image and returns its storage.
    pub fn into_data(self) -> ImageData {
        self.data
    }

    /// Depth-tagged read-only view of the whole image.
    pub fn view(&self) -> DynView<'_> {
        let (w, h, c, s) = (self.width, self.height, self.channels(), self.stride);
        with_depth!(&self.data, ImageData, values => Primitive::into_dyn(ImageView {
            data: values.as_slice(),
            width: w,
            height: h,
            channels: c,
            stride: s,
        }))
    }

    /// Depth-tagged mutable view of the whole image.
    pub fn view_mut(&mut self) -> DynViewMut<'_> {
        let (w, h, c, s) = (self.width, self.height, self.channels(), self.stride);
        with_depth!(&mut self.data, ImageData, values => Primitive::into_dyn_mut(ImageViewMut {
            data: values.as_mut_slice(),
            width: w,
            height: h,
            channels: c,
            stride: s,
        }))
    }

    /// Typed read-only view; fails if `T` is not the image depth.
    pub fn typed<T: Primitive>(&self) -> PatchVisionResult<ImageView<'_, T>> {
        self.view().typed("typed view")
    }

    /// Typed mutable view; fails if `T` is not the image depth.
    pub fn typed_mut<T: Primitive>(&mut self) -> PatchVisionResult<ImageViewMut<'_, T>> {
        self.view_mut().typed("typed view")
    }

    /// Reinterprets the pixels with another descriptor without copying.
    ///
    /// Only allowed between castable descriptors (same channel count and
    /// depth, one side generic or both the same color).
    pub fn cast(mut self, info: &'static ColorInfo) -> PatchVisionResult<Self> {
        if !self.info.equals(info, Comparison::Castable) {
            return Err(PatchVisionError::ColorMismatch {
                expected: info.to_string(),
                got: self.info.to_string(),
            });
        }
        self.info = info;
        Ok(self)
    }

    /// Copies pixels of `src` into `self`.
    ///
    /// Both images must have the same size and castable descriptors.
    pub fn copy_from(&mut self, src: &Image) -> PatchVisionResult<()> {
        if self.size() != src.size() {
            return Err(PatchVisionError::SizeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: src.width,
                height: src.height,
            });
        }
        if !self.info.equals(src.info, Comparison::Castable) {
            return Err(PatchVisionError::ColorMismatch {
                expected: self.info.to_string(),
                got: src.info.to_string(),
            });
        }
        copy_view(src.view(), self.view_mut())
    }

    /// Splits an interleaved image into single-channel planes of the given color.
    pub fn split_channels(&self) -> PatchVisionResult<Vec<Image>> {
        crate::image::channels::split_channels(self)
    }

    /// Merges equally sized single-channel planes into one interleaved image.
    pub fn merge_channels(
        planes: &[Image],
        info: &'static ColorInfo,
    ) -> PatchVisionResult<Image> {
        crate::image::channels::merge_channels(planes, info)
    }
}

/// Copies pixel rows between two views of equal shape and depth.
pub(crate) fn copy_view(src: DynView<'_>, dst: DynViewMut<'_>) -> PatchVisionResult<()> {
    fn copy_typed<T: Primitive>(
        src: ImageView<'_, T>,
        mut dst: ImageViewMut<'_, T>,
    ) -> PatchVisionResult<()> {
        if src.size() != dst.size() || src.channels() != dst.channels() {
            return Err(PatchVisionError::SizeMismatch {
                expected_width: dst.width(),
                expected_height: dst.height(),
                width: src.width(),
                height: src.height(),
            });
        }
        for (y, row) in src.rows().enumerate() {
            if let Some(out) = dst.row_mut(y) {
                out.copy_from_slice(row);
            }
        }
        Ok(())
    }

    match src {
        DynView::U8(view) => copy_typed(view, dst.typed("copy")?),
        DynView::I16(view) => copy_typed(view, dst.typed("copy")?),
        DynView::I32(view) => copy_typed(view, dst.typed("copy")?),
        DynView::F32(view) => copy_typed(view, dst.typed("copy")?),
        DynView::F64(view) => copy_typed(view, dst.typed("copy")?),
    }
}

fn elements_stride(
    info: &ColorInfo,
    width: usize,
    stride_bytes: usize,
) -> PatchVisionResult<usize> {
    let row_len = width * info.channels();
    if stride_bytes % info.channel_size() != 0 || stride_bytes / info.channel_size() < row_len {
        return Err(PatchVisionError::InvalidStride {
            row_len: row_len * info.channel_size(),
            stride: stride_bytes,
        });
    }
    Ok(stride_bytes / info.channel_size())
}
