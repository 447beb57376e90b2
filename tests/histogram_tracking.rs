use patchvision::{
    camshift, meanshift, Bgr, ColorInfo, DenseHistogram, Image, ImageView, Region, TermCriteria,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn single_pixel_lands_in_expected_bin() {
    let a = [128u8];
    let b = [128u8];
    let pa = ImageView::from_slice(&a[..], 1, 1).unwrap();
    let pb = ImageView::from_slice(&b[..], 1, 1).unwrap();
    let mut hist = DenseHistogram::new(&[4, 4], &[(0.0, 255.0), (0.0, 255.0)]).unwrap();
    hist.calculate(&[pa, pb], false, None).unwrap();

    assert_eq!(hist.value_at(&[2, 2]), Some(1.0));
    assert_eq!(hist.sum(), 1.0);
    for i in 0..4 {
        for j in 0..4 {
            if (i, j) != (2, 2) {
                assert_eq!(hist.value_at(&[i, j]), Some(0.0));
            }
        }
    }
}

#[test]
fn ratio_histogram_is_bounded() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let mut h1 = DenseHistogram::new(&[6, 5], &[(0.0, 255.0), (0.0, 255.0)]).unwrap();
        let mut h2 = h1.copy_blank();
        for v in h1.values_mut() {
            *v = if rng.random_bool(0.2) { 0.0 } else { rng.random_range(0.0..1000.0) };
        }
        for v in h2.values_mut() {
            *v = if rng.random_bool(0.3) { 0.0 } else { rng.random_range(0.0..1000.0) };
        }
        let nf = rng.random_range(0.0..255.0);
        let gain = rng.random_range(0.1..4.0);
        let ratio = h1.create_ratio_histogram(&h2, nf, gain).unwrap();
        assert!(ratio.values().iter().all(|&v| v <= nf));
    }
}

#[test]
fn normalize_is_idempotent() {
    let mut hist = DenseHistogram::new(&[8], &[(0.0, 7.0)]).unwrap();
    hist.values_mut().copy_from_slice(&[1.0, 0.0, 3.0, 4.0, 0.5, 0.25, 9.0, 2.25]);
    hist.normalize(255.0);
    let once = hist.values().to_vec();
    hist.normalize(255.0);
    for (a, b) in once.iter().zip(hist.values()) {
        assert!((a - b).abs() < 1e-3);
    }
    assert!((hist.sum() - 255.0).abs() < 1e-3);
}

#[test]
fn normalize_leaves_empty_histogram_untouched() {
    let mut hist = DenseHistogram::new(&[3], &[(0.0, 2.0)]).unwrap();
    hist.normalize(1.0);
    assert_eq!(hist.values(), &[0.0, 0.0, 0.0]);
}

/// Red square on a blue background.
fn scene(width: usize, height: usize, object: Region) -> Image {
    let mut data: Vec<u8> = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let inside = x >= object.x && x < object.right() && y >= object.y && y < object.bottom();
            if inside {
                data.extend_from_slice(&[20, 10, 230]);
            } else {
                data.extend_from_slice(&[200, 60, 10]);
            }
        }
    }
    Image::from_vec(ColorInfo::of::<Bgr, u8>().unwrap(), data, width, height).unwrap()
}

#[test]
fn hue_backprojection_tracks_object() {
    let model_region = Region::new(20, 20, 16, 16);
    let frame = scene(120, 90, model_region);
    let hsv = frame
        .convert_to(ColorInfo::of::<patchvision::Hsv, u8>().unwrap())
        .unwrap();
    let planes = hsv.split_channels().unwrap();
    let hue = planes[0].typed::<u8>().unwrap();
    let sat = planes[1].typed::<u8>().unwrap();

    let mut model = DenseHistogram::new(&[16, 8], &[(0.0, 179.0), (0.0, 255.0)]).unwrap();
    model
        .calculate(&[hue.roi(model_region).unwrap(), sat.roi(model_region).unwrap()], false, None)
        .unwrap();
    model.normalize(255.0);
    assert!((model.max() - 255.0).abs() < 1e-3);

    // Object moved; the tracker starts from the old location.
    let moved = Region::new(34, 28, 16, 16);
    let frame = scene(120, 90, moved);
    let planes = frame
        .convert_to(ColorInfo::of::<patchvision::Hsv, u8>().unwrap())
        .unwrap()
        .split_channels()
        .unwrap();
    let probability = model
        .back_project(&[planes[0].typed::<u8>().unwrap(), planes[1].typed::<u8>().unwrap()])
        .unwrap();
    let probability = probability.typed::<u8>().unwrap();
    assert_eq!(probability.get(40, 35, 0).copied(), Some(255));
    assert_eq!(probability.get(5, 5, 0).copied(), Some(0));

    let result = meanshift(probability, model_region, TermCriteria::default()).unwrap();
    let (cx, cy) = result.window.center();
    assert!((cx - 42.0).abs() <= 3.0, "{:?}", result.window);
    assert!((cy - 36.0).abs() <= 3.0, "{:?}", result.window);

    let found = camshift(probability, model_region, TermCriteria::default()).unwrap();
    assert!(!found.is_empty());
    assert!(found.width > 12.0 && found.width < 24.0, "{found:?}");
    assert!(found.height > 12.0 && found.height < 24.0, "{found:?}");
}
