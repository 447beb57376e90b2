use patchvision::color::EdgeKind;
use patchvision::{
    find_cheapest_path, Bgr, Bgra, Color3, Color4, ColorInfo, Complex, ConversionGraph, Gray,
    Hsv, Image, PatchVisionError,
};

#[test]
fn bgr_to_color3_is_a_pure_cast() {
    let bgr = ColorInfo::of::<Bgr, u8>().unwrap();
    let color3 = ColorInfo::of::<Color3, u8>().unwrap();
    let path = find_cheapest_path(bgr, &[color3]).unwrap().unwrap();
    assert!(path.is_empty());
    assert!(path.is_cast_only());
    assert_eq!(path.cost(), 0);
}

#[test]
fn bgr_to_hsv_chains_a_single_conversion() {
    let bgr = ColorInfo::of::<Bgr, u8>().unwrap();
    let hsv = ColorInfo::of::<Hsv, u8>().unwrap();
    let path = find_cheapest_path(bgr, &[hsv]).unwrap().unwrap();
    assert!(!path.is_empty());
    assert_eq!(path.edges().first().unwrap().source(), bgr);
    assert_eq!(path.edges().last().unwrap().destination(), hsv);
    for pair in path.edges().windows(2) {
        assert_eq!(pair[0].destination(), pair[1].source());
    }
    assert!(path.copies_data());
}

#[test]
fn empty_path_returns_the_same_allocation() {
    let image = Image::from_vec(ColorInfo::of::<Bgr, u8>().unwrap(), vec![1u8, 2, 3, 4, 5, 6], 2, 1).unwrap();
    let ptr = image.typed::<u8>().unwrap().as_slice().as_ptr();
    let color3 = ColorInfo::of::<Color3, u8>().unwrap();
    let cast = image.convert_to(color3).unwrap();
    assert_eq!(cast.info(), color3);
    assert_eq!(cast.typed::<u8>().unwrap().as_slice().as_ptr(), ptr);
}

#[test]
fn generic_source_relabels_without_conversion() {
    let image = Image::from_vec(ColorInfo::of::<Color3, u8>().unwrap(), vec![0u8, 0, 255], 1, 1).unwrap();
    let hsv = ColorInfo::of::<Hsv, u8>().unwrap();
    let path = find_cheapest_path(image.info(), &[hsv]).unwrap().unwrap();
    assert!(path.is_empty());
    let relabelled = image.convert_to(hsv).unwrap();
    assert_eq!(relabelled.info(), hsv);
    assert_eq!(relabelled.typed::<u8>().unwrap().pixel(0, 0).unwrap(), &[0, 0, 255]);
}

#[test]
fn casts_through_generic_colors_keep_meaning() {
    // Bgr/f32 must not reach Hsv/f32 by relabelling through Color3/f32.
    let bgr = ColorInfo::of::<Bgr, f32>().unwrap();
    let hsv = ColorInfo::of::<Hsv, f32>().unwrap();
    let path = find_cheapest_path(bgr, &[hsv]).unwrap().unwrap();
    assert!(path.edges().iter().all(|edge| edge.kind() == EdgeKind::Convert));
}

#[test]
fn multi_stage_conversion_executes_every_edge() {
    // Bgra/f32 -> Bgr/f32 -> Bgr/u8 -> Gray/u8
    let info = ColorInfo::of::<Bgra, f32>().unwrap();
    let image = Image::from_vec(info, vec![8.0f32, 16.0, 24.0, 1.0, 300.0, 300.0, 300.0, 1.0], 2, 1).unwrap();
    let gray = ColorInfo::of::<Gray, u8>().unwrap();
    let path = find_cheapest_path(info, &[gray]).unwrap().unwrap();
    assert_eq!(path.len(), 3);
    let out = path.execute(image).unwrap();
    assert_eq!(out.info(), gray);
    assert_eq!(out.typed::<u8>().unwrap().row(0).unwrap(), &[17, 255]);
}

#[test]
fn depth_conversion_between_all_depths() {
    let graph = ConversionGraph::global().unwrap();
    for from in patchvision::Depth::ALL {
        for to in patchvision::Depth::ALL {
            let src = ColorInfo::get::<Gray>(from).unwrap();
            let dst = ColorInfo::get::<Gray>(to).unwrap();
            let path = graph.find_cheapest_path(src, &[dst]).unwrap();
            assert_eq!(path.len(), usize::from(from != to));
        }
    }
    let image = Image::from_vec(ColorInfo::of::<Gray, i16>().unwrap(), vec![-5i16, 7, 300], 3, 1).unwrap();
    let out = image.convert_to(ColorInfo::of::<Gray, f64>().unwrap()).unwrap();
    assert_eq!(out.typed::<f64>().unwrap().row(0).unwrap(), &[-5.0, 7.0, 300.0]);
}

#[test]
fn cheapest_candidate_is_chosen() {
    let bgr = ColorInfo::of::<Bgr, u8>().unwrap();
    let hsv = ColorInfo::of::<Hsv, u8>().unwrap();
    let color3 = ColorInfo::of::<Color3, u8>().unwrap();
    let path = find_cheapest_path(bgr, &[hsv, color3]).unwrap().unwrap();
    assert_eq!(path.destination(), color3);
}

#[test]
fn missing_path_is_an_error() {
    let image = Image::of::<Complex, f32>(2, 2).unwrap();
    let err = image.convert_to(ColorInfo::of::<Color4, u8>().unwrap()).unwrap_err();
    assert_eq!(
        err,
        PatchVisionError::NoConversionPath {
            from: "<Complex, f32>".to_string(),
            to: "<Color4, u8>".to_string(),
        }
    );
}

#[test]
fn mismatched_source_is_rejected_by_execute() {
    let bgr = ColorInfo::of::<Bgr, u8>().unwrap();
    let hsv = ColorInfo::of::<Hsv, u8>().unwrap();
    let path = find_cheapest_path(bgr, &[hsv]).unwrap().unwrap();
    let gray = Image::of::<Gray, u8>(2, 2).unwrap();
    assert!(matches!(
        path.execute(gray),
        Err(PatchVisionError::ColorMismatch { .. })
    ));
}

#[test]
fn gray_to_complex_keeps_real_part() {
    let image = Image::from_vec(ColorInfo::of::<Gray, f32>().unwrap(), vec![1.5f32, -2.0], 2, 1).unwrap();
    let out = image.convert_to(ColorInfo::of::<Complex, f32>().unwrap()).unwrap();
    assert_eq!(out.typed::<f32>().unwrap().row(0).unwrap(), &[1.5, 0.0, -2.0, 0.0]);
}
