//! Separable Gaussian blur for grayscale working frames.
//!
//! The limb-detection stage smooths the frame several times with a fixed
//! kernel size before edge extraction. Sigma follows the usual
//! kernel-size-derived convention `0.3*((ksize-1)*0.5 - 1) + 0.8` so a
//! given kernel size means the same amount of smoothing it did in the
//! heritage tooling. Borders reflect (mirror about the edge pixel).

use ndarray::{Array2, Zip};

/// Build a normalized 1D Gaussian kernel for the given odd size.
///
/// # Panics
/// Panics if `ksize` is even or zero.
fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    assert!(ksize % 2 == 1 && ksize > 0, "Kernel size must be odd");

    let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (ksize / 2) as i32;

    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }
    kernel
}

/// Reflect an out-of-range index back into `0..len` (mirror about the edge
/// pixel, so index -1 maps to 1 and `len` maps to `len - 2`).
fn reflect(idx: i32, len: usize) -> usize {
    // A length-1 axis has a single valid index; the mirror fold below would
    // oscillate between i and -i forever.
    if len < 2 {
        return 0;
    }

    let len = len as i32;
    let mut i = idx;
    // Frames are always much wider than the kernel half-width, so a couple
    // of folds suffice.
    while i < 0 || i >= len {
        if i < 0 {
            i = -i;
        }
        if i >= len {
            i = 2 * (len - 1) - i;
        }
    }
    i as usize
}

/// Gaussian blur with a square kernel of the given odd size.
///
/// Applies the separable kernel along rows then columns, with rows (then
/// columns) processed in parallel.
///
/// # Arguments
/// * `img` - Grayscale frame, shape (height, width)
/// * `ksize` - Odd kernel size in pixels
///
/// # Returns
/// Blurred frame with the same shape
pub fn gaussian_blur(img: &Array2<f32>, ksize: usize) -> Array2<f32> {
    let kernel = gaussian_kernel(ksize);
    let half = (ksize / 2) as i32;
    let (height, width) = img.dim();

    // Horizontal pass
    let mut tmp = Array2::<f32>::zeros((height, width));
    Zip::from(tmp.rows_mut())
        .and(img.rows())
        .par_for_each(|mut out_row, in_row| {
            for col in 0..width {
                let mut acc = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let c = reflect(col as i32 + k as i32 - half, width);
                    acc += w * in_row[c];
                }
                out_row[col] = acc;
            }
        });

    // Vertical pass
    let mut out = Array2::<f32>::zeros((height, width));
    Zip::from(out.columns_mut())
        .and(tmp.columns())
        .par_for_each(|mut out_col, in_col| {
            for row in 0..height {
                let mut acc = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let r = reflect(row as i32 + k as i32 - half, height);
                    acc += w * in_col[r];
                }
                out_col[row] = acc;
            }
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_is_normalized() {
        for ksize in [3, 5, 15] {
            let kernel = gaussian_kernel(ksize);
            assert_eq!(kernel.len(), ksize);
            let sum: f32 = kernel.iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-5);
            // Symmetric about the center tap
            assert_relative_eq!(kernel[0], kernel[ksize - 1], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_constant_image_unchanged() {
        let img = Array2::<f32>::from_elem((20, 30), 42.0);
        let blurred = gaussian_blur(&img, 15);

        for &v in blurred.iter() {
            assert_relative_eq!(v, 42.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_impulse_spreads_symmetrically() {
        let mut img = Array2::<f32>::zeros((21, 21));
        img[[10, 10]] = 100.0;

        let blurred = gaussian_blur(&img, 5);

        // Peak stays at the impulse location
        assert!(blurred[[10, 10]] > blurred[[10, 11]]);
        // Symmetric response
        assert_relative_eq!(blurred[[10, 9]], blurred[[10, 11]], epsilon = 1e-5);
        assert_relative_eq!(blurred[[9, 10]], blurred[[11, 10]], epsilon = 1e-5);
        // Energy conserved
        let total: f32 = blurred.iter().sum();
        assert_relative_eq!(total, 100.0, epsilon = 1e-2);
    }

    #[test]
    fn test_reflect_indexing() {
        assert_eq!(reflect(-1, 10), 1);
        assert_eq!(reflect(-2, 10), 2);
        assert_eq!(reflect(10, 10), 8);
        assert_eq!(reflect(11, 10), 7);
        assert_eq!(reflect(5, 10), 5);
        // Length-1 axes have nothing to mirror into
        assert_eq!(reflect(-2, 1), 0);
        assert_eq!(reflect(3, 1), 0);
    }

    #[test]
    fn test_single_row_and_column_frames() {
        // The kernel is wider than the short axis; blur must still return
        // and leave a constant frame constant.
        let row = Array2::<f32>::from_elem((1, 30), 5.0);
        let blurred = gaussian_blur(&row, 5);
        assert_eq!(blurred.dim(), (1, 30));
        for &v in blurred.iter() {
            assert_relative_eq!(v, 5.0, epsilon = 1e-4);
        }

        let col = Array2::<f32>::from_elem((30, 1), 7.0);
        let blurred = gaussian_blur(&col, 5);
        assert_eq!(blurred.dim(), (30, 1));
        for &v in blurred.iter() {
            assert_relative_eq!(v, 7.0, epsilon = 1e-4);
        }
    }

    #[test]
    #[should_panic(expected = "Kernel size must be odd")]
    fn test_even_kernel_panics() {
        gaussian_kernel(4);
    }
}
