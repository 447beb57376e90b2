//! Horizontal stripe planning for patch-parallel processing.

use crate::image::{ImageSize, Region};

/// Number of patches planned per available core.
const PATCHES_PER_CORE: usize = 2;

/// Splits a region into full-width horizontal stripes.
///
/// The planner targets two stripes per core so that uneven per-stripe cost
/// still balances across workers. A trailing stripe shorter than the stripe
/// height is merged into its predecessor, so no planned stripe is shorter
/// than `min(min_patch_height, height)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchPlanner {
    cores: usize,
    min_patch_height: usize,
}

impl PatchPlanner {
    /// Creates a planner sized for the worker pool of the current process.
    pub fn new(min_patch_height: usize) -> Self {
        Self::with_cores(available_cores(), min_patch_height)
    }

    /// Creates a planner for an explicit core count (clamped to at least one).
    pub fn with_cores(cores: usize, min_patch_height: usize) -> Self {
        Self {
            cores: cores.max(1),
            min_patch_height,
        }
    }

    pub fn cores(&self) -> usize {
        self.cores
    }

    pub fn min_patch_height(&self) -> usize {
        self.min_patch_height
    }

    /// Stripe height used for a region of the given size.
    pub fn stripe_height(&self, size: ImageSize) -> usize {
        if size.is_empty() {
            return 0;
        }
        let target = self.cores * PATCHES_PER_CORE;
        let avg_area = size.area() / target;
        let height = avg_area / size.width;
        height.max(self.min_patch_height).max(1)
    }

    /// Plans the stripes for a region of the given size.
    ///
    /// Stripes are returned top to bottom; their union is exactly the region.
    pub fn plan(&self, size: ImageSize) -> Vec<Region> {
        if size.is_empty() {
            return Vec::new();
        }
        let stripe = self.stripe_height(size);
        let mut patches = Vec::with_capacity(size.height / stripe + 1);
        let mut y = 0;
        while y < size.height {
            let h = stripe.min(size.height - y);
            patches.push(Region::new(0, y, size.width, h));
            y += h;
        }

        if patches.len() > 1 {
            if let Some(last) = patches.last().copied() {
                if last.height < stripe {
                    patches.pop();
                    if let Some(prev) = patches.last_mut() {
                        prev.height += last.height;
                    }
                }
            }
        }
        patches
    }
}

impl Default for PatchPlanner {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Number of workers available to the patch fan-out.
pub fn available_cores() -> usize {
    #[cfg(feature = "rayon")]
    {
        rayon::current_num_threads().max(1)
    }
    #[cfg(not(feature = "rayon"))]
    {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::PatchPlanner;
    use crate::image::{ImageSize, Region};

    #[test]
    fn stripes_target_two_per_core() {
        let planner = PatchPlanner::with_cores(4, 1);
        let patches = planner.plan(ImageSize::new(10, 80));
        assert_eq!(patches.len(), 8);
        assert!(patches.iter().all(|p| p.height == 10 && p.width == 10));
    }

    #[test]
    fn short_trailing_stripe_is_merged() {
        let planner = PatchPlanner::with_cores(2, 1);
        // 4 patches over 10 rows -> stripe height 2, exact fit.
        assert_eq!(planner.plan(ImageSize::new(3, 10)).len(), 5);

        let planner = PatchPlanner::with_cores(8, 4);
        let patches = planner.plan(ImageSize::new(3, 10));
        assert_eq!(
            patches,
            vec![Region::new(0, 0, 3, 4), Region::new(0, 4, 3, 6)]
        );
    }

    #[test]
    fn min_height_larger_than_region_yields_single_stripe() {
        let planner = PatchPlanner::with_cores(8, 50);
        let patches = planner.plan(ImageSize::new(7, 20));
        assert_eq!(patches, vec![Region::new(0, 0, 7, 20)]);
    }

    #[test]
    fn empty_region_has_no_patches() {
        let planner = PatchPlanner::with_cores(4, 1);
        assert!(planner.plan(ImageSize::new(0, 10)).is_empty());
        assert!(planner.plan(ImageSize::new(10, 0)).is_empty());
    }
}
