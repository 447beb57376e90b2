//! Dense N-dimensional histograms over 8-bit channel planes.
//!
//! Each dimension maps a channel value to a bin through an affine
//! `(scale, offset)` pair derived from the bin count and the value range:
//! `scale = bins / (max - min + 1)`, `offset = -min * scale`. Bins are stored
//! row-major with the last dimension varying fastest.
//!
//! Calculation runs through the [`ParallelProcessor`]: every patch counts
//! into its own partial histogram, and partials are summed once all patches
//! completed. Back-projection writes disjoint row stripes and needs no merge.

use crate::color::{ColorInfo, Gray};
use crate::image::buffer::{DynView, DynViewMut};
use crate::image::{Image, ImageSize, ImageView, Region};
use crate::parallel::{ParallelOptions, ParallelProcessor, Partials};
use crate::trace::trace_span;
use crate::util::{PatchVisionError, PatchVisionResult};

/// Dense histogram with per-dimension bin counts and value ranges.
#[derive(Clone, Debug)]
pub struct DenseHistogram {
    bins: Vec<usize>,
    ranges: Vec<(f32, f32)>,
    scales: Vec<f32>,
    offsets: Vec<f32>,
    strides: Vec<usize>,
    values: Vec<f32>,
    options: Option<ParallelOptions>,
}

struct Samples<'p> {
    planes: &'p [ImageView<'p, u8>],
    mask: Option<ImageView<'p, u8>>,
}

impl DenseHistogram {
    /// Creates a zeroed histogram.
    ///
    /// `bins[d]` is the bin count and `ranges[d]` the inclusive value range of
    /// dimension `d`.
    pub fn new(bins: &[usize], ranges: &[(f32, f32)]) -> PatchVisionResult<Self> {
        if bins.is_empty() {
            return Err(PatchVisionError::InvalidHistogram {
                reason: "histogram needs at least one dimension",
            });
        }
        if bins.len() != ranges.len() {
            return Err(PatchVisionError::InvalidHistogram {
                reason: "bin sizes and ranges differ in length",
            });
        }
        if bins.contains(&0) {
            return Err(PatchVisionError::InvalidHistogram {
                reason: "bin count must be positive",
            });
        }
        if ranges.iter().any(|&(min, max)| !(max >= min)) {
            return Err(PatchVisionError::InvalidHistogram {
                reason: "range maximum is below its minimum",
            });
        }

        let scales: Vec<f32> = bins
            .iter()
            .zip(ranges)
            .map(|(&n, &(min, max))| n as f32 / (max - min + 1.0))
            .collect();
        let offsets = scales
            .iter()
            .zip(ranges)
            .map(|(&scale, &(min, _))| -min * scale)
            .collect();

        let too_large = || PatchVisionError::InvalidHistogram {
            reason: "total bin count overflows usize",
        };
        let mut strides = vec![1usize; bins.len()];
        for d in (0..bins.len() - 1).rev() {
            strides[d] = strides[d + 1].checked_mul(bins[d + 1]).ok_or_else(too_large)?;
        }
        let len = strides[0].checked_mul(bins[0]).ok_or_else(too_large)?;

        Ok(Self {
            bins: bins.to_vec(),
            ranges: ranges.to_vec(),
            scales,
            offsets,
            strides,
            values: vec![0.0; len],
            options: None,
        })
    }

    /// Uses `options` for calculation and back-projection instead of the defaults.
    pub fn with_parallel_options(mut self, options: ParallelOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.bins.len()
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn ranges(&self) -> &[(f32, f32)] {
        &self.ranges
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Flattened bin values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Value of the bin at an N-dimensional index.
    pub fn value_at(&self, index: &[usize]) -> Option<f32> {
        if index.len() != self.dims() || index.iter().zip(&self.bins).any(|(&i, &n)| i >= n) {
            return None;
        }
        let flat: usize = index.iter().zip(&self.strides).map(|(&i, &s)| i * s).sum();
        self.values.get(flat).copied()
    }

    /// Flattened bin index of a sample, or `None` if any channel falls outside
    /// its range.
    pub fn bin_index(&self, sample: &[f32]) -> Option<usize> {
        if sample.len() != self.dims() {
            return None;
        }
        let mut flat = 0;
        for d in 0..self.dims() {
            let idx = (sample[d] * self.scales[d] + self.offsets[d]).floor();
            if idx < 0.0 || idx >= self.bins[d] as f32 {
                return None;
            }
            flat += idx as usize * self.strides[d];
        }
        Some(flat)
    }

    /// Counts the samples of `planes` (one plane per dimension).
    ///
    /// Pixels whose mask value is zero are skipped. Unless `accumulate` is
    /// set, all bins are zeroed first. Samples outside a range are ignored.
    pub fn calculate(
        &mut self,
        planes: &[ImageView<'_, u8>],
        accumulate: bool,
        mask: Option<ImageView<'_, u8>>,
    ) -> PatchVisionResult<()> {
        let size = self.check_planes(planes)?;
        if let Some(mask) = mask {
            check_plane(mask, size)?;
        }
        let _span = trace_span!(
            "histogram_calculate",
            dims = self.dims(),
            width = size.width,
            height = size.height
        )
        .entered();

        if !accumulate {
            self.values.fill(0.0);
        }
        let samples = Samples { planes, mask };
        let this = &*self;
        let partials = ParallelProcessor::new(
            size,
            || Ok(Partials::new(vec![0.0f32; this.values.len()])),
            |src: &Samples<'_>, part: &mut Vec<f32>, region: Region| {
                this.count_patch(src, part, region);
                Ok(())
            },
        )
        .with_options(this.parallel_options())
        .process(&samples)?;

        for part in partials.parts() {
            for (value, count) in self.values.iter_mut().zip(part) {
                *value += count;
            }
        }
        Ok(())
    }

    /// Dynamic-depth variant of [`calculate`](Self::calculate).
    pub fn calculate_dyn(
        &mut self,
        planes: &[DynView<'_>],
        accumulate: bool,
        mask: Option<DynView<'_>>,
    ) -> PatchVisionResult<()> {
        let planes = typed_planes(planes, "histogram calculation")?;
        let mask = mask.map(|m| m.typed::<u8>("histogram mask")).transpose()?;
        self.calculate(&planes, accumulate, mask)
    }

    fn count_patch(&self, src: &Samples<'_>, part: &mut [f32], region: Region) {
        let mut sample = vec![0.0f32; self.dims()];
        for y in region.y..region.bottom() {
            let rows: Vec<&[u8]> = src.planes.iter().filter_map(|p| p.row(y)).collect();
            let mask_row = src.mask.and_then(|m| m.row(y));
            for x in region.x..region.right() {
                if mask_row.is_some_and(|m| m[x] == 0) {
                    continue;
                }
                for (s, row) in sample.iter_mut().zip(&rows) {
                    *s = row[x] as f32;
                }
                if let Some(idx) = self.bin_index(&sample) {
                    part[idx] += 1.0;
                }
            }
        }
    }

    /// Maps every pixel of `planes` to its bin value.
    ///
    /// Produces a `Gray`/`u8` image of the plane size; bin values saturate to
    /// `0..=255` and samples outside a range map to zero.
    pub fn back_project(&self, planes: &[ImageView<'_, u8>]) -> PatchVisionResult<Image> {
        let size = self.check_planes(planes)?;
        let _span = trace_span!(
            "histogram_back_project",
            dims = self.dims(),
            width = size.width,
            height = size.height
        )
        .entered();

        let info = ColorInfo::of::<Gray, u8>()?;
        let samples = Samples { planes, mask: None };
        let processor = ParallelProcessor::new(
            size,
            || Image::new(info, size.width, size.height),
            |src: &Samples<'_>, dst: DynViewMut<'_>, region: Region| {
                let mut dst = dst.typed::<u8>("back projection")?;
                let mut sample = vec![0.0f32; self.dims()];
                for (row_idx, y) in (region.y..region.bottom()).enumerate() {
                    let rows: Vec<&[u8]> = src.planes.iter().filter_map(|p| p.row(y)).collect();
                    let Some(out) = dst.row_mut(row_idx) else {
                        continue;
                    };
                    for (x, value) in out.iter_mut().enumerate() {
                        for (s, row) in sample.iter_mut().zip(&rows) {
                            *s = row[x] as f32;
                        }
                        *value = self
                            .bin_index(&sample)
                            .map_or(0, |idx| self.values[idx] as u8);
                    }
                }
                Ok(())
            },
        )
        .with_options(self.parallel_options());
        processor.process(&samples)
    }

    /// Dynamic-depth variant of [`back_project`](Self::back_project).
    pub fn back_project_dyn(&self, planes: &[DynView<'_>]) -> PatchVisionResult<Image> {
        let planes = typed_planes(planes, "histogram back projection")?;
        self.back_project(&planes)
    }

    /// Builds `min(normalization_factor, self / (other_gain * other))` bin by bin.
    ///
    /// Bins where `other` is zero keep the value of `self`; every result is
    /// finally clamped to `normalization_factor`.
    pub fn create_ratio_histogram(
        &self,
        other: &DenseHistogram,
        normalization_factor: f32,
        other_gain: f32,
    ) -> PatchVisionResult<DenseHistogram> {
        self.check_shape(other)?;
        let mut ratio = self.copy_blank();
        for ((out, &h1), &h2) in ratio.values.iter_mut().zip(&self.values).zip(&other.values) {
            let value = if h2 != 0.0 {
                normalization_factor.min(h1 / (other_gain * h2))
            } else {
                h1
            };
            *out = value.min(normalization_factor);
        }
        Ok(ratio)
    }

    /// Multiplies every bin by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for value in &mut self.values {
            *value *= factor;
        }
    }

    /// Rescales the bins so that they sum to `scale`; no-op on an empty histogram.
    pub fn normalize(&mut self, scale: f32) {
        let sum = self.sum();
        if sum != 0.0 {
            self.scale((1.0 / sum) * scale);
        }
    }

    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    pub fn min(&self) -> f32 {
        self.values.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Mean flat bin index, weighted by bin value. Zero for an empty histogram.
    pub fn mean(&self) -> f32 {
        self.weighted_average(|index| index as f64) as f32
    }

    /// Standard deviation of the flat bin index around [`DenseHistogram::mean`],
    /// weighted by bin value.
    pub fn deviation(&self) -> f32 {
        let mean = f64::from(self.mean());
        self.weighted_average(|index| (index as f64 - mean).powi(2))
            .sqrt() as f32
    }

    fn weighted_average(&self, value: impl Fn(usize) -> f64) -> f64 {
        let (total, weight) = self
            .values
            .iter()
            .enumerate()
            .fold((0.0f64, 0.0f64), |(total, weight), (index, &bin)| {
                let bin = f64::from(bin);
                (total + value(index) * bin, weight + bin)
            });
        if weight == 0.0 {
            0.0
        } else {
            total / weight
        }
    }

    /// Same shape, all bins zero.
    pub fn copy_blank(&self) -> DenseHistogram {
        let mut blank = self.clone();
        blank.values.fill(0.0);
        blank
    }

    fn parallel_options(&self) -> ParallelOptions {
        self.options.clone().unwrap_or_default()
    }

    fn check_shape(&self, other: &DenseHistogram) -> PatchVisionResult<()> {
        if self.bins != other.bins {
            return Err(PatchVisionError::HistogramShapeMismatch {
                left: self.bins.clone(),
                right: other.bins.clone(),
            });
        }
        Ok(())
    }

    fn check_planes(&self, planes: &[ImageView<'_, u8>]) -> PatchVisionResult<ImageSize> {
        if planes.len() != self.dims() {
            return Err(PatchVisionError::ChannelCountMismatch {
                expected: self.dims(),
                got: planes.len(),
            });
        }
        let size = planes[0].size();
        for &plane in planes {
            check_plane(plane, size)?;
        }
        Ok(size)
    }
}

fn check_plane(plane: ImageView<'_, u8>, size: ImageSize) -> PatchVisionResult<()> {
    if plane.channels() != 1 {
        return Err(PatchVisionError::ChannelCountMismatch {
            expected: 1,
            got: plane.channels(),
        });
    }
    if plane.size() != size {
        return Err(PatchVisionError::SizeMismatch {
            expected_width: size.width,
            expected_height: size.height,
            width: plane.width(),
            height: plane.height(),
        });
    }
    Ok(())
}

fn typed_planes<'a>(
    planes: &[DynView<'a>],
    operation: &'static str,
) -> PatchVisionResult<Vec<ImageView<'a, u8>>> {
    planes.iter().map(|plane| plane.typed::<u8>(operation)).collect()
}

#[cfg(test)]
mod tests {
    use super::DenseHistogram;
    use crate::image::{Depth, ImageView};
    use crate::parallel::ParallelOptions;
    use crate::util::PatchVisionError;

    fn full_range_2d() -> DenseHistogram {
        DenseHistogram::new(&[4, 4], &[(0.0, 255.0), (0.0, 255.0)]).unwrap()
    }

    #[test]
    fn strides_put_last_dimension_fastest() {
        let hist = DenseHistogram::new(&[2, 3, 4], &[(0.0, 1.0); 3]).unwrap();
        assert_eq!(hist.strides(), &[12, 4, 1]);
        assert_eq!(hist.values().len(), 24);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        assert!(matches!(
            DenseHistogram::new(&[], &[]),
            Err(PatchVisionError::InvalidHistogram { .. })
        ));
        assert!(DenseHistogram::new(&[4, 0], &[(0.0, 1.0); 2]).is_err());
        assert!(DenseHistogram::new(&[4], &[(5.0, 1.0)]).is_err());
        assert!(matches!(
            DenseHistogram::new(&[usize::MAX, 2], &[(0.0, 1.0); 2]),
            Err(PatchVisionError::InvalidHistogram { .. })
        ));
        assert!(DenseHistogram::new(&[2, usize::MAX, 2], &[(0.0, 1.0); 3]).is_err());
    }

    #[test]
    fn mask_skips_pixels() {
        let a = [10u8, 200, 10, 200];
        let mask = [255u8, 0, 255, 0];
        let plane = ImageView::from_slice(&a[..], 4, 1).unwrap();
        let mask = ImageView::from_slice(&mask[..], 4, 1).unwrap();
        let mut hist = DenseHistogram::new(&[2], &[(0.0, 255.0)]).unwrap();
        hist.calculate(&[plane], false, Some(mask)).unwrap();
        assert_eq!(hist.values(), &[2.0, 0.0]);

        hist.calculate(&[plane], true, None).unwrap();
        assert_eq!(hist.values(), &[4.0, 2.0]);
        hist.calculate(&[plane], false, None).unwrap();
        assert_eq!(hist.values(), &[2.0, 2.0]);
    }

    #[test]
    fn out_of_range_samples_are_ignored() {
        let a = [5u8, 60, 150];
        let plane = ImageView::from_slice(&a[..], 3, 1).unwrap();
        let mut hist = DenseHistogram::new(&[5], &[(10.0, 109.0)]).unwrap();
        hist.calculate(&[plane], false, None).unwrap();
        assert_eq!(hist.sum(), 1.0);
        assert_eq!(hist.value_at(&[2]), Some(1.0));
    }

    #[test]
    fn parallel_calculation_matches_sequential() {
        let width = 211;
        let height = 97;
        let a: Vec<u8> = (0..width * height).map(|i| (i * 7 % 256) as u8).collect();
        let b: Vec<u8> = (0..width * height).map(|i| (i * 13 % 256) as u8).collect();
        let pa = ImageView::from_slice(&a, width, height).unwrap();
        let pb = ImageView::from_slice(&b, width, height).unwrap();

        let mut seq = full_range_2d().with_parallel_options(ParallelOptions::sequential());
        let mut par = full_range_2d().with_parallel_options(ParallelOptions::parallel());
        seq.calculate(&[pa, pb], false, None).unwrap();
        par.calculate(&[pa, pb], false, None).unwrap();
        assert_eq!(seq.values(), par.values());
        assert_eq!(par.sum(), (width * height) as f32);
    }

    #[test]
    fn back_projection_reads_bins() {
        let a = [0u8, 255];
        let plane = ImageView::from_slice(&a[..], 2, 1).unwrap();
        let mut hist = DenseHistogram::new(&[2], &[(0.0, 255.0)]).unwrap();
        hist.values_mut().copy_from_slice(&[3.0, 400.0]);
        let projected = hist.back_project(&[plane]).unwrap();
        assert_eq!(projected.typed::<u8>().unwrap().row(0).unwrap(), &[3, 255]);
    }

    #[test]
    fn ratio_falls_back_to_numerator_on_empty_bins() {
        let mut h1 = DenseHistogram::new(&[3], &[(0.0, 2.0)]).unwrap();
        let mut h2 = h1.copy_blank();
        h1.values_mut().copy_from_slice(&[4.0, 0.5, 9.0]);
        h2.values_mut().copy_from_slice(&[2.0, 0.0, 1.0]);
        let ratio = h1.create_ratio_histogram(&h2, 3.0, 1.0).unwrap();
        assert_eq!(ratio.values(), &[2.0, 0.5, 3.0]);

        let other = DenseHistogram::new(&[4], &[(0.0, 2.0)]).unwrap();
        assert_eq!(
            h1.create_ratio_histogram(&other, 1.0, 1.0).unwrap_err(),
            PatchVisionError::HistogramShapeMismatch {
                left: vec![3],
                right: vec![4],
            }
        );
    }

    #[test]
    fn statistics_and_blank_copy() {
        let mut hist = DenseHistogram::new(&[4], &[(0.0, 3.0)]).unwrap();
        hist.values_mut().copy_from_slice(&[1.0, 2.0, 3.0, 6.0]);
        assert_eq!(hist.sum(), 12.0);
        assert_eq!(hist.min(), 1.0);
        assert_eq!(hist.max(), 6.0);
        assert!((hist.mean() - 26.0 / 12.0).abs() < 1e-6);
        hist.normalize(1.0);
        assert!((hist.sum() - 1.0).abs() < 1e-6);
        let blank = hist.copy_blank();
        assert_eq!(blank.bins(), hist.bins());
        assert_eq!(blank.sum(), 0.0);
    }

    #[test]
    fn mean_and_deviation_weight_bin_indices() {
        let mut hist = DenseHistogram::new(&[4], &[(0.0, 3.0)]).unwrap();
        assert_eq!(hist.mean(), 0.0);
        assert_eq!(hist.deviation(), 0.0);

        hist.values_mut().copy_from_slice(&[0.0, 0.0, 0.0, 6.0]);
        assert_eq!(hist.mean(), 3.0);
        assert_eq!(hist.deviation(), 0.0);

        hist.values_mut().copy_from_slice(&[2.0, 0.0, 0.0, 2.0]);
        assert!((hist.mean() - 1.5).abs() < 1e-6);
        assert!((hist.deviation() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn dyn_planes_require_u8() {
        let a = [1.0f32, 2.0];
        let plane = ImageView::from_slice(&a[..], 2, 1).unwrap();
        let mut hist = DenseHistogram::new(&[2], &[(0.0, 255.0)]).unwrap();
        let err = hist
            .calculate_dyn(&[crate::image::DynView::F32(plane)], false, None)
            .unwrap_err();
        assert_eq!(
            err,
            PatchVisionError::UnsupportedChannelType {
                operation: "histogram calculation",
                depth: Depth::F32,
            }
        );
    }
}
