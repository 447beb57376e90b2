use patchvision::{ImageSize, PatchPlanner, Region};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn assert_tiles(patches: &[Region], size: ImageSize, min_patch_height: usize) {
    assert!(!patches.is_empty());
    let mut y = 0;
    for patch in patches {
        assert_eq!(patch.x, 0);
        assert_eq!(patch.width, size.width);
        assert_eq!(patch.y, y, "patches must be contiguous");
        assert!(patch.height >= min_patch_height.min(size.height).max(1));
        y += patch.height;
    }
    assert_eq!(y, size.height);
}

#[test]
fn random_regions_are_tiled_exactly() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..2000 {
        let size = ImageSize::new(rng.random_range(1..=600), rng.random_range(1..=600));
        let min_patch_height = rng.random_range(0..=80);
        let cores = rng.random_range(1..=64);
        let planner = PatchPlanner::with_cores(cores, min_patch_height);
        let patches = planner.plan(size);
        assert_tiles(&patches, size, min_patch_height);
        assert!(patches.len() <= size.height);
    }
}

#[test]
fn trailing_stripe_is_never_shorter_than_stripe_height() {
    let planner = PatchPlanner::with_cores(3, 5);
    let size = ImageSize::new(513, 777);
    let patches = planner.plan(size);
    let stripe = planner.stripe_height(size);
    assert!(patches.iter().all(|p| p.height >= stripe));
    assert_tiles(&patches, size, 5);
}

#[test]
fn very_wide_region_uses_unit_stripes() {
    let planner = PatchPlanner::with_cores(16, 0);
    let size = ImageSize::new(10_000, 4);
    assert_eq!(planner.stripe_height(size), 1);
    assert_eq!(planner.plan(size).len(), 4);
}
