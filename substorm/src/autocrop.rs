//! Adaptive Earth-limb auto-crop.
//!
//! Locates the Earth's limb in a noisy full-disk frame by iterating the
//! gradient Hough transform over a widening radius window while walking the
//! accumulator vote threshold down, accepts the first window whose circle
//! count falls in the configured band, averages the surviving circles, and
//! crops a margin-padded square around the mean disk. The position of the
//! mean disk relative to the frame borders classifies the pointing error.

use crate::hough::{Circle, HoughConfig, HoughTransform};
use image::{Rgb, RgbImage};
use log::{debug, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use shared::image_proc::{crop_square, gaussian_blur, grayscale, pad_border};
use thiserror::Error;

/// Tuning parameters for the limb search.
///
/// Defaults are the flight values for the 1920x1200 IEU frames, where the
/// Earth disk subtends roughly 800-1500 px.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Gaussian blur kernel size applied before edge extraction
    pub blur_kernel: usize,
    /// Number of blur passes
    pub blur_passes: usize,
    /// First radius window center, pixels
    pub starting_radius: usize,
    /// Half-width of the radius window and the window advance step
    pub radius_delta: usize,
    /// Give up once the window center passes this radius
    pub ending_radius: usize,
    /// Gradient magnitude for a pixel to count as a limb edge
    pub gradient_threshold: f32,
    /// Vote threshold at the start of each radius window
    pub starting_votes: u32,
    /// Walking the threshold below this advances the radius window
    pub min_votes: u32,
    /// Threshold adjustment step
    pub vote_step: u32,
    /// Fewest circles accepted as a limb fix
    pub min_circles: usize,
    /// Most circles accepted as a limb fix
    pub max_circles: usize,
    /// Crop half-side as a fraction of the mean radius beyond the disk
    pub margin_ratio: f32,
    /// Black border padding around the frame before cropping, pixels
    pub border_pad: usize,
    /// Hough accumulator downscale factor
    pub accumulator_scale: usize,
    /// Minimum separation between detected centers, pixels
    pub min_center_dist: f32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 15,
            blur_passes: 3,
            starting_radius: 800,
            radius_delta: 25,
            ending_radius: 1500,
            gradient_threshold: 15.0,
            starting_votes: 240,
            min_votes: 170,
            vote_step: 5,
            min_circles: 3,
            max_circles: 10,
            margin_ratio: 0.2,
            border_pad: 300,
            accumulator_scale: 2,
            min_center_dist: 5.0,
        }
    }
}

impl CropConfig {
    fn hough_config(&self, radius: usize) -> HoughConfig {
        HoughConfig {
            accumulator_scale: self.accumulator_scale,
            min_center_dist: self.min_center_dist,
            gradient_threshold: self.gradient_threshold,
            vote_threshold: self.starting_votes,
            min_radius: radius.saturating_sub(self.radius_delta),
            max_radius: radius + self.radius_delta,
        }
    }
}

/// Pointing-error classification of the detected disk.
///
/// The numeric codes are the legacy telemetry encoding: 0 is nominal, 1-4
/// report which frame border the disk crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pointing {
    /// Disk fits entirely inside the frame
    Nominal,
    /// Disk crosses the left frame border
    TooFarLeft,
    /// Disk crosses the right frame border
    TooFarRight,
    /// Disk crosses the top frame border
    TooFarUp,
    /// Disk crosses the bottom frame border
    TooFarDown,
}

impl Pointing {
    /// Legacy telemetry pointing code.
    pub fn code(&self) -> u8 {
        match self {
            Pointing::Nominal => 0,
            Pointing::TooFarLeft => 1,
            Pointing::TooFarRight => 2,
            Pointing::TooFarUp => 3,
            Pointing::TooFarDown => 4,
        }
    }

    /// True when the disk fits inside the frame.
    pub fn is_nominal(&self) -> bool {
        matches!(self, Pointing::Nominal)
    }
}

/// Mean of the circles that survived the search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanCircle {
    /// Center x (column) in unpadded frame coordinates
    pub cx: f32,
    /// Center y (row) in unpadded frame coordinates
    pub cy: f32,
    /// Mean radius, pixels
    pub radius: f32,
}

/// Result of a successful limb search.
#[derive(Debug, Clone)]
pub struct AutoCrop {
    /// Square crop around the disk, from the border-padded frame
    pub crop: RgbImage,
    /// Averaged disk estimate in unpadded frame coordinates
    pub circle: MeanCircle,
    /// Pointing-error classification
    pub pointing: Pointing,
}

/// Terminal failure of the limb search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CropError {
    /// Radius range exhausted without an acceptable circle count
    #[error("no circle found with radius up to {searched_to} px")]
    NoCircleFound {
        /// Largest radius window center that was searched
        searched_to: usize,
    },
}

/// Per-window cap on threshold adjustments. The walk is monotone except for
/// single-step corrections, so hitting this means a vote cliff is making the
/// raise/lower steps ping-pong; bail to the next window.
const MAX_WINDOW_STEPS: usize = 64;

/// Locate the Earth disk and crop a square region around it.
///
/// Runs the adaptive Hough search over `rgb`, averages the surviving
/// circles, pads the frame by `config.border_pad` black pixels and crops a
/// square of half-side `(1 + margin_ratio) * mean_radius` around the mean
/// center. The returned pointing code reports whether the mean disk crosses
/// any frame border.
///
/// # Errors
/// [`CropError::NoCircleFound`] when the radius range is exhausted without
/// any window producing an acceptable circle count.
pub fn auto_crop(rgb: &RgbImage, config: &CropConfig) -> Result<AutoCrop, CropError> {
    let mut gray = grayscale(rgb);
    for _ in 0..config.blur_passes {
        gray = gaussian_blur(&gray, config.blur_kernel);
    }

    let circles = search_circles(&gray, config)?;
    let circle = mean_circle(&circles);
    debug!(
        "Limb fix from {} circles: center ({:.1}, {:.1}), radius {:.1}",
        circles.len(),
        circle.cx,
        circle.cy,
        circle.radius
    );

    let pad = config.border_pad as i64;
    let padded = pad_border(rgb, config.border_pad as u32, Rgb([0, 0, 0]));
    let half = ((1.0 + config.margin_ratio) * circle.radius).round() as i64;
    let crop = crop_square(
        &padded,
        circle.cx.round() as i64 + pad,
        circle.cy.round() as i64 + pad,
        half,
    );

    let pointing = classify_pointing(&circle, rgb.width(), rgb.height());
    if !pointing.is_nominal() {
        warn!("Pointing error: {:?} (code {})", pointing, pointing.code());
    }

    Ok(AutoCrop {
        crop,
        circle,
        pointing,
    })
}

/// The adaptive search: walk the vote threshold down within each radius
/// window, advancing the window whenever the threshold floor is crossed.
fn search_circles(gray: &Array2<f32>, config: &CropConfig) -> Result<Vec<Circle>, CropError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Step {
        Raised,
        Lowered,
    }

    let mut radius = config.starting_radius;
    let mut votes = config.starting_votes;
    let mut transform: Option<HoughTransform> = None;
    let mut window_steps = 0usize;
    let mut last_step: Option<Step> = None;

    loop {
        if votes < config.min_votes || window_steps > MAX_WINDOW_STEPS {
            votes = config.starting_votes;
            radius += config.radius_delta;
            transform = None;
            window_steps = 0;
            last_step = None;
        }
        if radius > config.ending_radius {
            return Err(CropError::NoCircleFound {
                searched_to: radius - config.radius_delta,
            });
        }

        let hough = transform
            .get_or_insert_with(|| HoughTransform::build(gray, &config.hough_config(radius)));
        let mut circles = hough.circles_at(votes);
        debug!(
            "Radius window {} +/- {}: {} circles at {} votes",
            radius,
            config.radius_delta,
            circles.len(),
            votes
        );
        window_steps += 1;

        if circles.len() > config.max_circles {
            if last_step == Some(Step::Lowered) {
                // A single lower step jumped over the band; the strongest
                // entries are still the limb.
                circles.truncate(config.max_circles);
                return Ok(circles);
            }
            votes += config.vote_step;
            last_step = Some(Step::Raised);
        } else if circles.len() < config.min_circles {
            if last_step == Some(Step::Raised) && !circles.is_empty() {
                // A single raise step jumped over the band the other way.
                return Ok(circles);
            }
            votes = votes.saturating_sub(config.vote_step.max(1));
            last_step = Some(Step::Lowered);
        } else {
            return Ok(circles);
        }
    }
}

/// Average the surviving circle centers and radii.
fn mean_circle(circles: &[Circle]) -> MeanCircle {
    let n = circles.len() as f32;
    MeanCircle {
        cx: circles.iter().map(|c| c.cx).sum::<f32>() / n,
        cy: circles.iter().map(|c| c.cy).sum::<f32>() / n,
        radius: circles.iter().map(|c| c.radius).sum::<f32>() / n,
    }
}

/// Classify which frame border, if any, the mean disk crosses.
///
/// Checked in the legacy order: left, right, up, down.
fn classify_pointing(circle: &MeanCircle, width: u32, height: u32) -> Pointing {
    if circle.cx - circle.radius < 0.0 {
        Pointing::TooFarLeft
    } else if circle.cx + circle.radius > width as f32 {
        Pointing::TooFarRight
    } else if circle.cy - circle.radius < 0.0 {
        Pointing::TooFarUp
    } else if circle.cy + circle.radius > height as f32 {
        Pointing::TooFarDown
    } else {
        Pointing::Nominal
    }
}
