//! Memoized color/depth descriptors.
//!
//! A [`ColorInfo`] pairs a color space with a channel depth. Descriptors are
//! built once per `(color space, depth)` pair, leaked to `'static`, and
//! served from a process-wide cache afterwards; concurrent first use builds
//! the descriptor only once. Each thread keeps its own copy of the pointers it
//! has already resolved, so repeated lookups never touch the shared lock.

use crate::color::spaces::{ColorLayout, ColorSpace, FieldType};
use crate::image::{Depth, Primitive};
use crate::trace::trace_event;
use crate::util::{PatchVisionError, PatchVisionResult};
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{OnceLock, PoisonError, RwLock};

type InfoKey = (TypeId, Depth);
type InfoCache = RwLock<HashMap<InfoKey, &'static ColorInfo>>;

thread_local! {
    static RESOLVED: RefCell<HashMap<InfoKey, &'static ColorInfo>> = RefCell::new(HashMap::new());
}

fn cache() -> &'static InfoCache {
    static CACHE: OnceLock<InfoCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Identity of a color space plus its declared layout.
#[derive(Clone, Copy, Debug)]
pub struct ColorType {
    id: TypeId,
    layout: ColorLayout,
}

impl ColorType {
    pub fn of<C: ColorSpace>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            layout: C::LAYOUT,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn layout(&self) -> &ColorLayout {
        &self.layout
    }

    pub fn name(&self) -> &'static str {
        self.layout.name
    }
}

impl PartialEq for ColorType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ColorType {}

impl Hash for ColorType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// How two descriptors are compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    /// Same color space and same depth.
    Default,
    /// Same channel count and depth, and either side generic or both the same color.
    Castable,
    /// Same depth, any color.
    Depth,
}

/// Descriptor of a `(color space, depth)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorInfo {
    color: ColorType,
    depth: Depth,
    channels: usize,
    channel_size: usize,
    is_generic: bool,
    codename: &'static str,
}

impl ColorInfo {
    /// Returns the cached descriptor for color space `C` at `depth`.
    pub fn get<C: ColorSpace>(depth: Depth) -> PatchVisionResult<&'static ColorInfo> {
        let key = (TypeId::of::<C>(), depth);
        if let Some(info) = RESOLVED.with(|resolved| resolved.borrow().get(&key).copied()) {
            return Ok(info);
        }
        let info = Self::get_shared::<C>(key, depth)?;
        RESOLVED.with(|resolved| resolved.borrow_mut().insert(key, info));
        Ok(info)
    }

    fn get_shared<C: ColorSpace>(key: InfoKey, depth: Depth) -> PatchVisionResult<&'static ColorInfo> {
        if let Some(info) = cache()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied()
        {
            return Ok(info);
        }

        let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&info) = map.get(&key) {
            return Ok(info);
        }
        let info: &'static ColorInfo = Box::leak(Box::new(Self::build(ColorType::of::<C>(), depth)?));
        trace_event!(
            "color_info_built",
            color = info.name(),
            depth = depth.name(),
            channels = info.channels
        );
        map.insert(key, info);
        Ok(info)
    }

    /// Returns the cached descriptor for color space `C` and primitive `T`.
    pub fn of<C: ColorSpace, T: Primitive>() -> PatchVisionResult<&'static ColorInfo> {
        Self::get::<C>(T::DEPTH)
    }

    fn build(color: ColorType, depth: Depth) -> PatchVisionResult<Self> {
        let layout = color.layout;
        let invalid = |reason| PatchVisionError::InvalidColorLayout {
            color: layout.name,
            reason,
        };
        let first = layout.fields.first().ok_or_else(|| invalid("color space has no channel fields"))?;
        if layout.fields.iter().any(|field| field.ty != first.ty) {
            return Err(invalid("channel fields do not share one primitive type"));
        }
        if let FieldType::Fixed(fixed) = first.ty {
            if fixed != depth {
                return Err(invalid("color space is fixed to another channel type"));
            }
        }
        Ok(Self {
            color,
            depth,
            channels: layout.fields.len(),
            channel_size: depth.size(),
            is_generic: layout.generic,
            codename: layout.codename,
        })
    }

    pub fn color(&self) -> ColorType {
        self.color
    }

    pub fn name(&self) -> &'static str {
        self.color.name()
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    /// Number of channels per pixel.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Size of one channel in bytes.
    pub fn channel_size(&self) -> usize {
        self.channel_size
    }

    /// Size of one pixel in bytes.
    pub fn size(&self) -> usize {
        self.channels * self.channel_size
    }

    pub fn is_generic(&self) -> bool {
        self.is_generic
    }

    pub fn codename(&self) -> &'static str {
        self.codename
    }

    /// Compares two descriptors under the given mode.
    pub fn equals(&self, other: &ColorInfo, comparison: Comparison) -> bool {
        match comparison {
            Comparison::Default => self.color == other.color && self.depth == other.depth,
            Comparison::Castable => {
                self.channels == other.channels
                    && self.depth == other.depth
                    && (self.is_generic || other.is_generic || self.color == other.color)
            }
            Comparison::Depth => self.depth == other.depth,
        }
    }
}

impl fmt::Display for ColorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.name(), self.depth.name())
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorInfo, Comparison};
    use crate::color::spaces::{ChannelField, ColorLayout, ColorSpace};
    use crate::color::{Bgr, Color3, Gray, Hsv};
    use crate::image::Depth;
    use crate::util::PatchVisionError;

    struct Empty;
    impl ColorSpace for Empty {
        const LAYOUT: ColorLayout = ColorLayout {
            name: "Empty",
            codename: "",
            generic: false,
            fields: &[],
        };
    }

    struct Mixed;
    impl ColorSpace for Mixed {
        const LAYOUT: ColorLayout = ColorLayout {
            name: "Mixed",
            codename: "",
            generic: false,
            fields: &[ChannelField::channel("a"), ChannelField::fixed("b", Depth::F32)],
        };
    }

    struct Fixed;
    impl ColorSpace for Fixed {
        const LAYOUT: ColorLayout = ColorLayout {
            name: "Fixed",
            codename: "",
            generic: false,
            fields: &[ChannelField::fixed("a", Depth::F32)],
        };
    }

    #[test]
    fn descriptors_are_memoized() {
        let a = ColorInfo::of::<Bgr, f32>().unwrap();
        let b = ColorInfo::get::<Bgr>(Depth::F32).unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.channels(), 3);
        assert_eq!(a.channel_size(), 4);
        assert_eq!(a.size(), a.channels() * a.channel_size());
        assert_eq!(a.to_string(), "<Bgr, f32>");
    }

    #[test]
    fn descriptors_are_shared_across_threads() {
        let local = ColorInfo::of::<Hsv, i16>().unwrap() as *const ColorInfo as usize;
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    let first = ColorInfo::of::<Hsv, i16>().unwrap();
                    let second = ColorInfo::of::<Hsv, i16>().unwrap();
                    assert!(std::ptr::eq(first, second));
                    first as *const ColorInfo as usize
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), local);
        }
    }

    #[test]
    fn malformed_layouts_are_rejected() {
        assert_eq!(
            ColorInfo::of::<Empty, u8>().unwrap_err(),
            PatchVisionError::InvalidColorLayout {
                color: "Empty",
                reason: "color space has no channel fields",
            }
        );
        assert!(matches!(
            ColorInfo::of::<Mixed, f32>(),
            Err(PatchVisionError::InvalidColorLayout { color: "Mixed", .. })
        ));
        assert!(ColorInfo::of::<Fixed, f32>().is_ok());
        assert!(ColorInfo::of::<Fixed, u8>().is_err());
    }

    #[test]
    fn comparison_modes() {
        let bgr = ColorInfo::of::<Bgr, u8>().unwrap();
        let color3 = ColorInfo::of::<Color3, u8>().unwrap();
        let hsv = ColorInfo::of::<Hsv, u8>().unwrap();
        let gray = ColorInfo::of::<Gray, u8>().unwrap();

        assert!(bgr.equals(color3, Comparison::Castable));
        assert!(color3.equals(bgr, Comparison::Castable));
        assert!(!bgr.equals(color3, Comparison::Default));
        assert!(!bgr.equals(hsv, Comparison::Castable));
        assert!(!bgr.equals(hsv, Comparison::Default));
        assert!(bgr.equals(gray, Comparison::Depth));
        assert!(!color3.equals(ColorInfo::of::<Color3, f32>().unwrap(), Comparison::Castable));
    }
}
