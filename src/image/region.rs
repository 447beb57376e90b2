//! Axis-aligned regions and sizes.

/// Width and height of a 2D structure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    /// Creates a size.
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Returns `width * height`.
    pub fn area(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Returns true if either side is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle `(x, y, width, height)` over a 2D buffer.
///
/// Used both as a whole-image bound and as a patch or sub-rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    /// Creates a region.
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole structure of the given size.
    pub const fn from_size(size: ImageSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Returns the region size.
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Returns true if the region has zero area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns true if `self` lies inside a structure of the given size.
    pub fn fits_within(&self, size: ImageSize) -> bool {
        match (self.x.checked_add(self.width), self.y.checked_add(self.height)) {
            (Some(right), Some(bottom)) => right <= size.width && bottom <= size.height,
            _ => false,
        }
    }

    /// Center point in floating-point coordinates.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Intersection of a signed rectangle with `self`.
    ///
    /// `x`/`y` may be negative (a window shifted past the image edge). Returns an
    /// empty region anchored at the clamped origin if there is no overlap.
    pub fn intersect_signed(&self, x: i64, y: i64, width: usize, height: usize) -> Region {
        let left = x.max(self.x as i64);
        let top = y.max(self.y as i64);
        let right = (x + width as i64).min(self.right() as i64);
        let bottom = (y + height as i64).min(self.bottom() as i64);
        if right <= left || bottom <= top {
            let cx = left.clamp(self.x as i64, self.right() as i64) as usize;
            let cy = top.clamp(self.y as i64, self.bottom() as i64) as usize;
            return Region::new(cx, cy, 0, 0);
        }
        Region::new(
            left as usize,
            top as usize,
            (right - left) as usize,
            (bottom - top) as usize,
        )
    }

    /// Intersection of two regions.
    pub fn intersect(&self, other: &Region) -> Region {
        self.intersect_signed(other.x as i64, other.y as i64, other.width, other.height)
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageSize, Region};

    #[test]
    fn intersect_clips_negative_origin() {
        let bounds = Region::from_size(ImageSize::new(10, 8));
        let clipped = bounds.intersect_signed(-3, -2, 6, 5);
        assert_eq!(clipped, Region::new(0, 0, 3, 3));
    }

    #[test]
    fn intersect_without_overlap_is_empty() {
        let bounds = Region::from_size(ImageSize::new(10, 8));
        let clipped = bounds.intersect(&Region::new(20, 20, 4, 4));
        assert!(clipped.is_empty());
    }

    #[test]
    fn fits_within_checks_both_edges() {
        let size = ImageSize::new(4, 4);
        assert!(Region::new(1, 1, 3, 3).fits_within(size));
        assert!(!Region::new(2, 0, 3, 1).fits_within(size));
        assert!(!Region::new(0, usize::MAX, 1, 2).fits_within(size));
    }
}
