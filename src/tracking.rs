//! Image moments and the Meanshift/Camshift tracker.
//!
//! Both trackers operate on a single-channel probability map (usually a
//! histogram back-projection). Moments are accumulated per patch through the
//! [`ParallelProcessor`] and summed afterwards.

use crate::image::buffer::DynView;
use crate::image::{ImageView, Primitive, Region};
use crate::parallel::{ParallelOptions, ParallelProcessor, Partials};
use crate::trace::{trace_event, trace_span};
use crate::util::math::{rad_to_deg, symmetric_eigen_2x2};
use crate::util::{PatchVisionError, PatchVisionResult};
use num_traits::AsPrimitive;

/// Spatial raw moments `M_pq = sum x^p y^q I(x, y)` up to order 3.
///
/// Coordinates are relative to the top-left corner of the view the moments
/// were computed on.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawMoments {
    pub order: usize,
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m11: f64,
    pub m20: f64,
    pub m02: f64,
    pub m21: f64,
    pub m12: f64,
    pub m30: f64,
    pub m03: f64,
}

impl RawMoments {
    /// Highest supported order.
    pub const MAX_ORDER: usize = 3;

    /// Computes moments up to `order` (clamped to `1..=3`).
    pub fn compute<T>(view: ImageView<'_, T>, order: usize) -> PatchVisionResult<Self>
    where
        T: Primitive + AsPrimitive<f64>,
    {
        Self::compute_with(view, order, ParallelOptions::default())
    }

    /// Computes moments with explicit dispatch options.
    pub fn compute_with<T>(
        view: ImageView<'_, T>,
        order: usize,
        options: ParallelOptions,
    ) -> PatchVisionResult<Self>
    where
        T: Primitive + AsPrimitive<f64>,
    {
        if view.channels() != 1 {
            return Err(PatchVisionError::ChannelCountMismatch {
                expected: 1,
                got: view.channels(),
            });
        }
        let seed = RawMoments {
            order: order.clamp(1, Self::MAX_ORDER),
            ..Default::default()
        };
        let partials = ParallelProcessor::new(
            view.size(),
            || Ok(Partials::new(seed)),
            |src: &ImageView<'_, T>, part: &mut RawMoments, region: Region| {
                part.accumulate(src, region);
                Ok(())
            },
        )
        .with_options(options)
        .process(&view)?;

        Ok(partials.parts().iter().fold(seed, |mut total, part| {
            total.merge(part);
            total
        }))
    }

    /// Moments of a `u8` or `f32` plane.
    pub fn compute_dyn(view: DynView<'_>, order: usize) -> PatchVisionResult<Self> {
        match view {
            DynView::U8(view) => Self::compute(view, order),
            DynView::F32(view) => Self::compute(view, order),
            other => Err(PatchVisionError::UnsupportedChannelType {
                operation: "raw moments",
                depth: other.depth(),
            }),
        }
    }

    fn accumulate<T>(&mut self, src: &ImageView<'_, T>, region: Region)
    where
        T: Primitive + AsPrimitive<f64>,
    {
        for y in region.y..region.bottom() {
            let Some(row) = src.row(y) else {
                continue;
            };
            let yf = y as f64;
            for x in region.x..region.right() {
                let v: f64 = row[x].as_();
                let xf = x as f64;
                self.m00 += v;
                self.m10 += xf * v;
                self.m01 += yf * v;
                if self.order >= 2 {
                    self.m11 += xf * yf * v;
                    self.m20 += xf * xf * v;
                    self.m02 += yf * yf * v;
                }
                if self.order >= 3 {
                    self.m21 += xf * xf * yf * v;
                    self.m12 += xf * yf * yf * v;
                    self.m30 += xf * xf * xf * v;
                    self.m03 += yf * yf * yf * v;
                }
            }
        }
    }

    fn merge(&mut self, other: &RawMoments) {
        self.m00 += other.m00;
        self.m10 += other.m10;
        self.m01 += other.m01;
        self.m11 += other.m11;
        self.m20 += other.m20;
        self.m02 += other.m02;
        self.m21 += other.m21;
        self.m12 += other.m12;
        self.m30 += other.m30;
        self.m03 += other.m03;
    }

    /// Centroid x; NaN when the mass is zero.
    pub fn center_x(&self) -> f64 {
        self.m10 / self.m00
    }

    /// Centroid y; NaN when the mass is zero.
    pub fn center_y(&self) -> f64 {
        self.m01 / self.m00
    }

    pub fn area(&self) -> f64 {
        self.m00
    }
}

/// Central moments `mu_pq` derived from raw moments.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CentralMoments {
    pub mu00: f64,
    pub mu11: f64,
    pub mu20: f64,
    pub mu02: f64,
    pub mu21: f64,
    pub mu12: f64,
    pub mu30: f64,
    pub mu03: f64,
    inv_m00: f64,
}

impl CentralMoments {
    pub fn from_raw(m: &RawMoments) -> Self {
        let x = m.center_x();
        let y = m.center_y();
        Self {
            mu00: m.m00,
            mu11: m.m11 - m.m01 * x,
            mu20: m.m20 - m.m10 * x,
            mu02: m.m02 - m.m01 * y,
            mu21: m.m21 - 2.0 * x * m.m11 - y * m.m20 + 2.0 * x * x * m.m01,
            mu12: m.m12 - 2.0 * y * m.m11 - x * m.m02 + 2.0 * y * y * m.m10,
            mu30: m.m30 - 3.0 * x * m.m20 + 2.0 * x * x * m.m10,
            mu03: m.m03 - 3.0 * y * m.m02 + 2.0 * y * y * m.m01,
            inv_m00: 1.0 / m.m00,
        }
    }

    /// Normalized covariance `[[a, b], [b, c]]` of the mass distribution.
    pub fn covariance(&self) -> (f64, f64, f64) {
        (
            self.mu20 * self.inv_m00,
            self.mu11 * self.inv_m00,
            self.mu02 * self.inv_m00,
        )
    }

    /// Ellipse with the same second-order moments, centered at the origin.
    ///
    /// Axis lengths are four standard deviations along the principal axes;
    /// the angle (degrees) is that of the major axis.
    pub fn ellipse(&self) -> Box2D {
        let (a, b, c) = self.covariance();
        let (l1, l2, angle) = symmetric_eigen_2x2(a, b, c);
        Box2D {
            center: (0.0, 0.0),
            width: (l1.sqrt() * 4.0) as f32,
            height: (l2.sqrt() * 4.0) as f32,
            angle: rad_to_deg(angle) as f32,
        }
    }
}

/// Rotated rectangle: center, axis lengths and angle in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box2D {
    pub center: (f32, f32),
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl Box2D {
    /// Returned when the tracked object is lost.
    pub const EMPTY: Box2D = Box2D {
        center: (0.0, 0.0),
        width: 0.0,
        height: 0.0,
        angle: 0.0,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// Stopping rule for iterative searches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TermCriteria {
    pub max_iterations: usize,
    /// Minimum window shift (in pixels, L1) to keep iterating.
    pub min_error: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            min_error: 1.0,
        }
    }
}

impl TermCriteria {
    pub fn should_terminate(&self, iteration: usize, error: f64) -> bool {
        iteration >= self.max_iterations || error <= self.min_error
    }
}

/// Outcome of [`meanshift`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeanshiftResult {
    /// Final search window, clipped to the image.
    pub window: Region,
    /// Second-order central moments of the last window before the final shift.
    pub moments: CentralMoments,
    pub iterations: usize,
}

/// Shifts `roi` towards the centroid of `probability` until it settles.
///
/// Each step moves the window by the truncated offset between its center and
/// the centroid of the mass inside it, then clips it to the image. A final
/// pass computes second-order moments and applies one more shift.
pub fn meanshift(
    probability: ImageView<'_, u8>,
    roi: Region,
    criteria: TermCriteria,
) -> PatchVisionResult<MeanshiftResult> {
    let _span = trace_span!("meanshift", x = roi.x, y = roi.y, width = roi.width, height = roi.height)
        .entered();
    let bounds = Region::from_size(probability.size());
    let mut window = bounds.intersect(&roi);
    let mut moments = RawMoments::default();
    let mut iterations = 0;
    let mut shift = u8::MAX as f64;

    while !criteria.should_terminate(iterations, shift) && !window.is_empty() {
        moments = RawMoments::compute(probability.roi(window)?, 1)?;
        let (dx, dy) = centroid_offset(&moments, window);
        window = bounds.intersect_signed(
            window.x as i64 + dx,
            window.y as i64 + dy,
            window.width,
            window.height,
        );
        shift = (dx.abs() + dy.abs()) as f64;
        iterations += 1;
    }

    if !window.is_empty() {
        moments = RawMoments::compute(probability.roi(window)?, 2)?;
        let (dx, dy) = centroid_offset(&moments, window);
        window = bounds.intersect_signed(
            window.x as i64 + dx,
            window.y as i64 + dy,
            window.width,
            window.height,
        );
    }
    trace_event!(
        "meanshift_done",
        iterations = iterations,
        x = window.x,
        y = window.y
    );

    Ok(MeanshiftResult {
        window,
        moments: CentralMoments::from_raw(&moments),
        iterations,
    })
}

/// Truncated offset from the window center to the centroid; zero for an empty window.
fn centroid_offset(moments: &RawMoments, window: Region) -> (i64, i64) {
    let dx = (moments.center_x() - window.width as f64 / 2.0) as i64;
    let dy = (moments.center_y() - window.height as f64 / 2.0) as i64;
    (dx, dy)
}

/// Meanshift followed by an ellipse fit of the object's mass.
///
/// Returns [`Box2D::EMPTY`] if the object is lost (no mass, or an axis
/// shorter than one pixel).
pub fn camshift(
    probability: ImageView<'_, u8>,
    roi: Region,
    criteria: TermCriteria,
) -> PatchVisionResult<Box2D> {
    let result = meanshift(probability, roi, criteria)?;
    let mut ellipse = result.moments.ellipse();
    if ellipse.width.is_nan() || ellipse.height.is_nan() || ellipse.width < 1.0 || ellipse.height < 1.0
    {
        return Ok(Box2D::EMPTY);
    }
    ellipse.center = result.window.center();
    Ok(ellipse)
}

#[cfg(test)]
mod tests {
    use super::{camshift, meanshift, Box2D, CentralMoments, RawMoments, TermCriteria};
    use crate::image::{ImageView, Region};
    use crate::parallel::ParallelOptions;

    fn blob(width: usize, height: usize, rect: Region) -> Vec<u8> {
        let mut data = vec![0u8; width * height];
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                data[y * width + x] = 255;
            }
        }
        data
    }

    #[test]
    fn moments_of_single_pixel() {
        let mut data = vec![0u8; 16];
        data[2 * 4 + 3] = 2;
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let m = RawMoments::compute(view, 3).unwrap();
        assert_eq!(m.m00, 2.0);
        assert_eq!(m.center_x(), 3.0);
        assert_eq!(m.center_y(), 2.0);
        assert_eq!(m.m21, 2.0 * 9.0 * 2.0);
        let c = CentralMoments::from_raw(&m);
        assert_eq!(c.mu20, 0.0);
        assert_eq!(c.mu11, 0.0);
    }

    #[test]
    fn parallel_moments_match_sequential() {
        let data: Vec<u8> = (0..300 * 200).map(|i| (i % 251) as u8).collect();
        let view = ImageView::from_slice(&data, 300, 200).unwrap();
        let seq = RawMoments::compute_with(view, 3, ParallelOptions::sequential()).unwrap();
        let par = RawMoments::compute_with(view, 3, ParallelOptions::parallel()).unwrap();
        assert_eq!(seq.m00, par.m00);
        assert!((seq.m20 - par.m20).abs() / seq.m20 < 1e-12);
        assert!((seq.m03 - par.m03).abs() / seq.m03 < 1e-12);
    }

    #[test]
    fn meanshift_moves_towards_blob() {
        let data = blob(100, 80, Region::new(60, 30, 20, 20));
        let view = ImageView::from_slice(&data, 100, 80).unwrap();
        let result = meanshift(view, Region::new(45, 20, 20, 20), TermCriteria::default()).unwrap();
        let (cx, cy) = result.window.center();
        assert!((cx - 70.0).abs() <= 3.0, "{:?}", result.window);
        assert!((cy - 40.0).abs() <= 3.0, "{:?}", result.window);
        assert!(result.iterations <= 10);
    }

    #[test]
    fn camshift_fits_horizontal_blob() {
        let data = blob(100, 80, Region::new(25, 35, 40, 10));
        let view = ImageView::from_slice(&data, 100, 80).unwrap();
        let found = camshift(view, Region::new(20, 30, 50, 20), TermCriteria::default()).unwrap();
        assert!(found.width > 40.0 && found.width < 50.0, "{found:?}");
        assert!(found.height > 8.0 && found.height < 15.0, "{found:?}");
        assert!(found.angle.abs() < 1.0);
        assert_eq!(found.center, (45.0, 40.0));
    }

    #[test]
    fn camshift_reports_lost_object() {
        let data = vec![0u8; 40 * 40];
        let view = ImageView::from_slice(&data, 40, 40).unwrap();
        let found = camshift(view, Region::new(5, 5, 10, 10), TermCriteria::default()).unwrap();
        assert_eq!(found, Box2D::EMPTY);
        assert!(found.is_empty());
    }
}
