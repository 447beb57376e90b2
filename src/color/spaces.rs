//! Built-in color spaces and their channel layouts.

use crate::image::Depth;

/// Type of one channel field of a color space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// The channel takes the depth the color space is instantiated with.
    Channel,
    /// The channel is fixed to one primitive type.
    Fixed(Depth),
}

/// One named channel of a color space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelField {
    pub name: &'static str,
    pub ty: FieldType,
}

impl ChannelField {
    pub const fn channel(name: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::Channel,
        }
    }

    pub const fn fixed(name: &'static str, depth: Depth) -> Self {
        Self {
            name,
            ty: FieldType::Fixed(depth),
        }
    }
}

/// Declared channel layout of a color space.
///
/// The layout replaces field enumeration: its fields define the channel
/// count, and all of them must share one primitive type. The check runs when
/// a descriptor is first built for the color space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorLayout {
    /// Display name.
    pub name: &'static str,
    /// Conversion codename, used for logging and compatibility only.
    pub codename: &'static str,
    /// Marks placeholder color spaces that only describe the channel structure.
    pub generic: bool,
    pub fields: &'static [ChannelField],
}

/// A color space usable as the color half of a [`ColorInfo`](crate::ColorInfo).
pub trait ColorSpace: 'static {
    const LAYOUT: ColorLayout;
}

macro_rules! color_space {
    ($(#[$meta:meta])* $name:ident, $codename:expr, generic = $generic:expr, [$($field:expr),* $(,)?]) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl ColorSpace for $name {
            const LAYOUT: ColorLayout = ColorLayout {
                name: stringify!($name),
                codename: $codename,
                generic: $generic,
                fields: &[$(ChannelField::channel($field)),*],
            };
        }
    };
}

color_space!(
    /// Single intensity channel.
    Gray, "Gray", generic = false, ["intensity"]
);
color_space!(
    /// Blue, green, red.
    Bgr, "BGR", generic = false, ["b", "g", "r"]
);
color_space!(
    /// Blue, green, red, alpha.
    Bgra, "BGRA", generic = false, ["b", "g", "r", "a"]
);
color_space!(
    /// Hue, saturation, value. For `u8` the hue is stored halved (0..180).
    Hsv, "HSV", generic = false, ["h", "s", "v"]
);
color_space!(
    /// Real and imaginary parts.
    Complex, "Complex", generic = false, ["re", "im"]
);
color_space!(
    /// Two channels without color semantics.
    Color2, "", generic = true, ["c0", "c1"]
);
color_space!(
    /// Three channels without color semantics.
    Color3, "", generic = true, ["c0", "c1", "c2"]
);
color_space!(
    /// Four channels without color semantics.
    Color4, "", generic = true, ["c0", "c1", "c2", "c3"]
);

#[cfg(test)]
mod tests {
    use super::{Bgra, Color3, ColorSpace, FieldType, Gray};

    #[test]
    fn layouts_declare_channel_fields() {
        assert_eq!(Gray::LAYOUT.fields.len(), 1);
        assert_eq!(Bgra::LAYOUT.fields.len(), 4);
        assert!(Bgra::LAYOUT.fields.iter().all(|f| f.ty == FieldType::Channel));
        assert!(Color3::LAYOUT.generic);
        assert!(!Gray::LAYOUT.generic);
        assert_eq!(Bgra::LAYOUT.name, "Bgra");
    }
}
