//! Error types for patchvision.

use crate::image::Depth;
use thiserror::Error;

/// Result alias for patchvision operations.
pub type PatchVisionResult<T> = std::result::Result<T, PatchVisionError>;

/// Errors that can occur when running patchvision algorithms.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PatchVisionError {
    /// A color-space layout is malformed (no fields or mixed field depths).
    #[error("invalid color layout for {color}: {reason}")]
    InvalidColorLayout {
        color: &'static str,
        reason: &'static str,
    },
    /// No registered conversion path connects the two descriptors.
    #[error("no conversion path from {from} to {to}")]
    NoConversionPath { from: String, to: String },
    /// An operation was dispatched with a channel depth it does not implement.
    #[error("{operation} does not support channel type {depth:?}")]
    UnsupportedChannelType {
        operation: &'static str,
        depth: Depth,
    },
    /// Width or height is zero or overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than a row of pixels or not a multiple of the channel size.
    #[error("invalid stride {stride} for row length {row_len}")]
    InvalidStride { row_len: usize, stride: usize },
    /// Backing buffer is shorter than the layout requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A region does not lie within the image it addresses.
    #[error("region ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height}")]
    RegionOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Two images that must share a size do not.
    #[error("size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    SizeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
    /// Channel count differs from what the operation expects.
    #[error("channel count mismatch: expected {expected}, got {got}")]
    ChannelCountMismatch { expected: usize, got: usize },
    /// Destination color is not compatible with the source for a direct copy.
    #[error("color mismatch: expected {expected}, got {got}")]
    ColorMismatch { expected: String, got: String },
    /// Patches handed to a destination are not full-width ordered stripes.
    #[error("invalid patch layout: {reason}")]
    InvalidPatchLayout { reason: &'static str },
    /// Histogram configuration is invalid.
    #[error("invalid histogram: {reason}")]
    InvalidHistogram { reason: &'static str },
    /// Two histograms with different shapes were combined.
    #[error("histogram shape mismatch: {left:?} vs {right:?}")]
    HistogramShapeMismatch { left: Vec<usize>, right: Vec<usize> },
    /// Image decoding or encoding failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}
