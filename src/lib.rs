//! PatchVision is a CPU image-processing core built around patch-parallel
//! processing, typed color/depth conversions and dense histograms.
//!
//! - [`ParallelProcessor`] splits a target region into horizontal stripes and
//!   runs a per-patch function on each, in parallel with the `rayon` feature.
//! - [`ColorInfo`] describes a `(color space, depth)` pair; the
//!   [`ConversionGraph`] finds the cheapest conversion between descriptors,
//!   preferring zero-copy casts, and executes it.
//! - [`DenseHistogram`] calculates, back-projects and combines N-dimensional
//!   histograms, feeding the [`meanshift`]/[`camshift`] tracker.

pub mod color;
pub mod histogram;
pub mod image;
pub mod lowlevel;
pub mod parallel;
mod trace;
pub mod tracking;
pub mod util;

pub use color::{
    find_cheapest_path, Bgr, Bgra, Color2, Color3, Color4, ColorInfo, ColorSpace, Comparison,
    Complex, ConversionGraph, ConversionPath, Gray, Hsv,
};
pub use histogram::DenseHistogram;
#[cfg(feature = "image-io")]
pub use image::io;
pub use image::{Depth, DynView, DynViewMut, Image, ImageSize, ImageView, ImageViewMut, Primitive, Region};
pub use parallel::{ParallelOptions, ParallelProcessor, PatchPlanner};
pub use tracking::{camshift, meanshift, Box2D, CentralMoments, MeanshiftResult, RawMoments, TermCriteria};
pub use util::{PatchVisionError, PatchVisionResult};

#[cfg(not(feature = "tracing"))]
pub use trace::NoopSpan;
