//! Low-level building blocks for custom patch pipelines.
//!
//! These items expose the patch destinations, the stripe planner, the
//! elementary conversion functions and graph construction for callers that
//! plug their own per-patch functions into the engine. Most users should
//! prefer [`Image::convert_to`](crate::Image::convert_to) and
//! [`DenseHistogram`](crate::DenseHistogram).

pub use crate::color::convert::{
    bgr_to_bgra, bgr_to_gray, bgr_to_hsv, bgra_to_bgr, depth_converter, gray_to_bgr,
    gray_to_complex, hsv_to_bgr, ConvertFn,
};
pub use crate::color::{
    ChannelField, ColorLayout, ColorType, ConversionEdge, ConversionGraphBuilder, EdgeKind,
    FieldType,
};
pub use crate::image::ImageData;
pub use crate::parallel::options::{force_sequential_default, set_force_sequential_default};
pub use crate::parallel::plan::available_cores;
pub use crate::parallel::{Partials, PatchDestination};
