//! Channel depths and the sealed set of primitive channel types.

use crate::image::buffer::{DynView, DynViewMut, ImageData};
use crate::image::{ImageView, ImageViewMut};
use std::fmt::Debug;

/// Primitive channel type of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Depth {
    U8,
    I16,
    I32,
    F32,
    F64,
}

impl Depth {
    /// Every supported depth, in registration order.
    pub const ALL: [Depth; 5] = [Depth::U8, Depth::I16, Depth::I32, Depth::F32, Depth::F64];

    /// Size of one channel in bytes.
    pub const fn size(self) -> usize {
        match self {
            Depth::U8 => 1,
            Depth::I16 => 2,
            Depth::I32 | Depth::F32 => 4,
            Depth::F64 => 8,
        }
    }

    /// Rust name of the primitive type.
    pub const fn name(self) -> &'static str {
        match self {
            Depth::U8 => "u8",
            Depth::I16 => "i16",
            Depth::I32 => "i32",
            Depth::F32 => "f32",
            Depth::F64 => "f64",
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// A primitive type usable as an image channel.
///
/// The trait is sealed; the set of depths is closed so that every dynamic
/// image can be matched exhaustively.
pub trait Primitive:
    sealed::Sealed + Copy + Default + PartialEq + PartialOrd + Debug + Send + Sync + 'static
{
    /// Depth tag of this type.
    const DEPTH: Depth;

    /// Wraps an owned buffer into dynamic storage.
    fn wrap(data: Vec<Self>) -> ImageData;

    /// Borrows dynamic storage as this type, if the depth matches.
    fn unwrap_ref(data: &ImageData) -> Option<&[Self]>;

    /// Mutably borrows dynamic storage as this type, if the depth matches.
    fn unwrap_mut(data: &mut ImageData) -> Option<&mut [Self]>;

    /// Narrows a dynamic view to a typed view.
    fn from_dyn(view: DynView<'_>) -> Option<ImageView<'_, Self>>;

    /// Narrows a dynamic mutable view to a typed mutable view.
    fn from_dyn_mut(view: DynViewMut<'_>) -> Option<ImageViewMut<'_, Self>>;

    /// Widens a typed view into a dynamic view.
    fn into_dyn(view: ImageView<'_, Self>) -> DynView<'_>;

    /// Widens a typed mutable view into a dynamic mutable view.
    fn into_dyn_mut(view: ImageViewMut<'_, Self>) -> DynViewMut<'_>;
}

macro_rules! impl_primitive {
    ($ty:ty, $variant:ident) => {
        impl Primitive for $ty {
            const DEPTH: Depth = Depth::$variant;

            fn wrap(data: Vec<Self>) -> ImageData {
                ImageData::$variant(data)
            }

            fn unwrap_ref(data: &ImageData) -> Option<&[Self]> {
                match data {
                    ImageData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn unwrap_mut(data: &mut ImageData) -> Option<&mut [Self]> {
                match data {
                    ImageData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn from_dyn(view: DynView<'_>) -> Option<ImageView<'_, Self>> {
                match view {
                    DynView::$variant(view) => Some(view),
                    _ => None,
                }
            }

            fn from_dyn_mut(view: DynViewMut<'_>) -> Option<ImageViewMut<'_, Self>> {
                match view {
                    DynViewMut::$variant(view) => Some(view),
                    _ => None,
                }
            }

            fn into_dyn(view: ImageView<'_, Self>) -> DynView<'_> {
                DynView::$variant(view)
            }

            fn into_dyn_mut(view: ImageViewMut<'_, Self>) -> DynViewMut<'_> {
                DynViewMut::$variant(view)
            }
        }
    };
}

impl_primitive!(u8, U8);
impl_primitive!(i16, I16);
impl_primitive!(i32, I32);
impl_primitive!(f32, F32);
impl_primitive!(f64, F64);

#[cfg(test)]
mod tests {
    use super::{Depth, Primitive};

    #[test]
    fn depth_sizes_match_type_sizes() {
        assert_eq!(Depth::U8.size(), std::mem::size_of::<u8>());
        assert_eq!(Depth::I16.size(), std::mem::size_of::<i16>());
        assert_eq!(Depth::I32.size(), std::mem::size_of::<i32>());
        assert_eq!(Depth::F32.size(), std::mem::size_of::<f32>());
        assert_eq!(Depth::F64.size(), std::mem::size_of::<f64>());
    }

    #[test]
    fn wrap_and_unwrap_respect_depth() {
        let data = <f32 as Primitive>::wrap(vec![1.0, 2.0]);
        assert_eq!(data.depth(), Depth::F32);
        assert!(<u8 as Primitive>::unwrap_ref(&data).is_none());
        assert_eq!(<f32 as Primitive>::unwrap_ref(&data), Some(&[1.0f32, 2.0][..]));
    }
}
