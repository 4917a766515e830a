//! Bilinear demosaic for the IEU camera's BGGR Bayer mosaic.
//!
//! The camera delivers a single-channel 8-bit mosaic with the filter layout
//!
//! ```text
//!   B G B G ...
//!   G R G R ...
//!   B G B G ...
//! ```
//!
//! Each output pixel keeps its measured channel and reconstructs the two
//! missing channels from the average of the available neighbors of that
//! color. Border pixels average whatever neighbors exist, so the output has
//! exactly the input dimensions.

use image::RgbImage;
use ndarray::Array2;

/// Color of a Bayer site in the BGGR layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    Blue,
    GreenOnBlueRow,
    GreenOnRedRow,
    Red,
}

fn site(row: usize, col: usize) -> Site {
    match (row % 2, col % 2) {
        (0, 0) => Site::Blue,
        (0, 1) => Site::GreenOnBlueRow,
        (1, 0) => Site::GreenOnRedRow,
        _ => Site::Red,
    }
}

/// Average the mosaic values at the given offsets from (row, col), skipping
/// offsets that fall outside the frame.
fn neighbor_mean(raw: &Array2<u8>, row: usize, col: usize, offsets: &[(i32, i32)]) -> f32 {
    let (height, width) = raw.dim();
    let mut sum = 0.0f32;
    let mut count = 0u32;

    for &(dr, dc) in offsets {
        let r = row as i32 + dr;
        let c = col as i32 + dc;
        if r >= 0 && r < height as i32 && c >= 0 && c < width as i32 {
            sum += raw[[r as usize, c as usize]] as f32;
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

const CROSS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const HORIZONTAL: [(i32, i32); 2] = [(0, -1), (0, 1)];
const VERTICAL: [(i32, i32); 2] = [(-1, 0), (1, 0)];

/// Demosaic a BGGR mosaic to RGB by bilinear interpolation.
///
/// # Arguments
/// * `raw` - Mosaic frame with shape (height, width)
///
/// # Returns
/// RGB image with the same dimensions as the mosaic
pub fn demosaic_bilinear(raw: &Array2<u8>) -> RgbImage {
    let (height, width) = raw.dim();
    let mut rgb = RgbImage::new(width as u32, height as u32);

    for row in 0..height {
        for col in 0..width {
            let value = raw[[row, col]] as f32;

            let (r, g, b) = match site(row, col) {
                Site::Blue => (
                    neighbor_mean(raw, row, col, &DIAGONAL),
                    neighbor_mean(raw, row, col, &CROSS),
                    value,
                ),
                Site::GreenOnBlueRow => (
                    neighbor_mean(raw, row, col, &VERTICAL),
                    value,
                    neighbor_mean(raw, row, col, &HORIZONTAL),
                ),
                Site::GreenOnRedRow => (
                    neighbor_mean(raw, row, col, &HORIZONTAL),
                    value,
                    neighbor_mean(raw, row, col, &VERTICAL),
                ),
                Site::Red => (
                    value,
                    neighbor_mean(raw, row, col, &CROSS),
                    neighbor_mean(raw, row, col, &DIAGONAL),
                ),
            };

            rgb.put_pixel(
                col as u32,
                row as u32,
                image::Rgb([
                    r.round().clamp(0.0, 255.0) as u8,
                    g.round().clamp(0.0, 255.0) as u8,
                    b.round().clamp(0.0, 255.0) as u8,
                ]),
            );
        }
    }

    rgb
}
