//! Color spaces, color/depth descriptors and conversions between them.
//!
//! - [`spaces`]: built-in color spaces and their declared channel layouts.
//! - [`info`]: the memoized [`ColorInfo`] descriptor registry.
//! - [`convert`]: elementary per-patch conversion functions.
//! - [`graph`]: the conversion graph, cheapest-path search and execution.

pub mod convert;
pub mod graph;
pub mod info;
pub mod spaces;

pub use graph::{
    find_cheapest_path, ConversionEdge, ConversionGraph, ConversionGraphBuilder, ConversionPath,
    EdgeKind,
};
pub use info::{ColorInfo, ColorType, Comparison};
pub use spaces::{
    Bgr, Bgra, ChannelField, Color2, Color3, Color4, ColorLayout, ColorSpace, Complex, FieldType,
    Gray, Hsv,
};
