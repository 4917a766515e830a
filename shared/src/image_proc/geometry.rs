//! Grayscale conversion, padding, cropping and resizing.

use image::{imageops, Rgb, RgbImage};
use ndarray::Array2;

/// Convert an RGB image to a grayscale working frame using BT.601 luma
/// weights.
///
/// # Returns
/// Array with shape (height, width), values in 0.0..=255.0
pub fn grayscale(rgb: &RgbImage) -> Array2<f32> {
    let (width, height) = rgb.dimensions();
    let mut gray = Array2::<f32>::zeros((height as usize, width as usize));

    for (col, row, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        gray[[row as usize, col as usize]] =
            0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    }

    gray
}

/// Pad an RGB image with a constant border on all four sides.
///
/// # Arguments
/// * `rgb` - Source image
/// * `pad` - Border width in pixels
/// * `value` - Fill color for the border
pub fn pad_border(rgb: &RgbImage, pad: u32, value: Rgb<u8>) -> RgbImage {
    let (width, height) = rgb.dimensions();
    let mut out = RgbImage::from_pixel(width + 2 * pad, height + 2 * pad, value);

    for (col, row, pixel) in rgb.enumerate_pixels() {
        out.put_pixel(col + pad, row + pad, *pixel);
    }

    out
}

/// Crop a square region of half-side `half` centered at (cx, cy), clamped to
/// the image bounds.
///
/// The requested region is intersected with the image, so a center near an
/// edge yields a smaller (possibly non-square) crop rather than an error.
///
/// # Returns
/// The cropped image; empty intersections collapse to a 1x1 crop at the
/// clamped center, and a zero-sized source yields a zero-sized crop.
pub fn crop_square(rgb: &RgbImage, cx: i64, cy: i64, half: i64) -> RgbImage {
    if rgb.width() == 0 || rgb.height() == 0 {
        return RgbImage::new(0, 0);
    }

    let (width, height) = (rgb.width() as i64, rgb.height() as i64);

    let x0 = (cx - half).clamp(0, width - 1);
    let y0 = (cy - half).clamp(0, height - 1);
    let x1 = (cx + half).clamp(x0 + 1, width);
    let y1 = (cy + half).clamp(y0 + 1, height);

    imageops::crop_imm(rgb, x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32).to_image()
}

/// Resize an RGB image with bilinear filtering.
pub fn resize_rgb(rgb: &RgbImage, width: u32, height: u32) -> RgbImage {
    imageops::resize(rgb, width, height, imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grayscale_weights() {
        let mut rgb = RgbImage::new(2, 1);
        rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, Rgb([0, 255, 0]));

        let gray = grayscale(&rgb);
        assert_relative_eq!(gray[[0, 0]], 0.299 * 255.0, epsilon = 1e-3);
        assert_relative_eq!(gray[[0, 1]], 0.587 * 255.0, epsilon = 1e-3);
    }

    #[test]
    fn test_pad_border_geometry() {
        let rgb = RgbImage::from_pixel(4, 3, Rgb([10, 20, 30]));
        let padded = pad_border(&rgb, 2, Rgb([0, 0, 0]));

        assert_eq!(padded.dimensions(), (8, 7));
        // Border is fill color, interior is the original
        assert_eq!(padded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(padded.get_pixel(2, 2).0, [10, 20, 30]);
        assert_eq!(padded.get_pixel(5, 4).0, [10, 20, 30]);
        assert_eq!(padded.get_pixel(7, 6).0, [0, 0, 0]);
    }

    #[test]
    fn test_crop_square_interior() {
        let mut rgb = RgbImage::new(10, 10);
        rgb.put_pixel(5, 5, Rgb([255, 255, 255]));

        let crop = crop_square(&rgb, 5, 5, 2);
        assert_eq!(crop.dimensions(), (4, 4));
        // Center pixel lands at the crop origin offset
        assert_eq!(crop.get_pixel(2, 2).0, [255, 255, 255]);
    }

    #[test]
    fn test_crop_square_clamps_at_edges() {
        let rgb = RgbImage::new(10, 10);

        let crop = crop_square(&rgb, 1, 1, 5);
        // Requested region extends past the top-left corner and is clamped.
        assert_eq!(crop.dimensions(), (6, 6));

        let crop = crop_square(&rgb, 9, 9, 3);
        assert_eq!(crop.dimensions(), (4, 4));
    }

    #[test]
    fn test_crop_square_empty_image() {
        let rgb = RgbImage::new(0, 0);
        let crop = crop_square(&rgb, 5, 5, 3);
        assert_eq!(crop.dimensions(), (0, 0));
    }

    #[test]
    fn test_resize_dimensions() {
        let rgb = RgbImage::from_pixel(100, 60, Rgb([50, 60, 70]));
        let small = resize_rgb(&rgb, 256, 256);
        assert_eq!(small.dimensions(), (256, 256));
        // Constant image stays constant under bilinear resampling
        assert_eq!(small.get_pixel(128, 128).0, [50, 60, 70]);
    }
}
