//! Numeric helpers for moments and ellipse fitting.

/// Converts radians to degrees.
pub(crate) fn rad_to_deg(angle_rad: f64) -> f64 {
    angle_rad.to_degrees()
}

/// Eigen-decomposition of the symmetric matrix `[[a, b], [b, c]]`.
///
/// Returns `(lambda_max, lambda_min, angle_rad)` where `angle_rad` is the
/// orientation of the eigenvector belonging to `lambda_max`.
pub(crate) fn symmetric_eigen_2x2(a: f64, b: f64, c: f64) -> (f64, f64, f64) {
    let ac_diff = a - c;
    let ac_sum = a + c;
    let sqrt_disc = (ac_diff * ac_diff + 4.0 * b * b).sqrt();

    let lambda1 = (ac_sum + sqrt_disc) / 2.0;
    let lambda2 = (ac_sum - sqrt_disc) / 2.0;
    // atan2(0, 0) would report a horizontal axis for a vertical ellipse.
    let angle = if b == 0.0 && ac_diff < 0.0 {
        std::f64::consts::FRAC_PI_2
    } else {
        (2.0 * b).atan2(ac_diff + sqrt_disc)
    };
    (lambda1, lambda2, angle)
}
