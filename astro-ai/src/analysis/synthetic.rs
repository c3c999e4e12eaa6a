//! Synthetic galaxy-like test image

use ndarray::Array2;

/// Elliptical Gaussian centred in a `rows × cols` frame, values in `[0, 1]`
///
/// Wider along x than along y.
pub fn gaussian_blob(rows: usize, cols: usize) -> Array2<f64> {
    const SIGMA_X: f64 = 0.28;
    const SIGMA_Y: f64 = 0.18;

    let axis = |i: usize, n: usize| {
        if n <= 1 {
            0.0
        } else {
            -1.0 + 2.0 * i as f64 / (n - 1) as f64
        }
    };

    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let x = axis(c, cols);
        let y = axis(r, rows);
        (-(x * x / (2.0 * SIGMA_X * SIGMA_X) + y * y / (2.0 * SIGMA_Y * SIGMA_Y))).exp()
    })
}

/// [`gaussian_blob`] scaled to 8-bit grayscale
pub fn gaussian_blob_u8(rows: usize, cols: usize) -> Array2<u8> {
    gaussian_blob(rows, cols).mapv(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
}
