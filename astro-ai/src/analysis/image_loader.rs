//! Decode image bytes into a luminance array

use crate::artifacts::is_fits;
use crate::types::{PipelineError, PipelineResult};
use ndarray::Array2;

/// Decode to 8-bit luma held as `f64`, indexed `[row, col]`
///
/// # Errors
/// `ImageDecode` for FITS data (stored, not analyzed) and for anything the
/// image library cannot read.
pub fn decode_luma(bytes: &[u8]) -> PipelineResult<Array2<f64>> {
    if is_fits(bytes) {
        return Err(PipelineError::ImageDecode(
            "FITS data is stored but cannot be analyzed; request a JPEG or PNG source".to_string(),
        ));
    }

    let luma = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::ImageDecode(e.to_string()))?
        .to_luma8();
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineError::ImageDecode("Image has no pixels".to_string()));
    }

    let pixels: Vec<f64> = luma.into_raw().into_iter().map(f64::from).collect();
    Array2::from_shape_vec((height as usize, width as usize), pixels)
        .map_err(|e| PipelineError::ImageDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Luma};
    use std::io::Cursor;

    #[test]
    fn test_png_rows_and_columns() {
        // 3 wide, 2 tall; pixel value encodes position
        let buffer = ImageBuffer::from_fn(3, 2, |x, y| Luma([(y * 10 + x) as u8]));
        let mut png = Cursor::new(Vec::new());
        buffer.write_to(&mut png, ImageFormat::Png).unwrap();

        let array = decode_luma(&png.into_inner()).unwrap();
        assert_eq!(array.dim(), (2, 3));
        assert_eq!(array[[1, 2]], 12.0);
        assert_eq!(array[[0, 1]], 1.0);
    }

    #[test]
    fn test_fits_refused() {
        let err = decode_luma(b"SIMPLE  =                    T / conforms").unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecode(_)));
    }

    #[test]
    fn test_garbage_refused() {
        assert!(matches!(
            decode_luma(b"<html>not an image</html>"),
            Err(PipelineError::ImageDecode(_))
        ));
    }
}
