//! Gradient Hough circle transform.
//!
//! Two-stage method in the style of the classic gradient Hough: edge pixels
//! vote for candidate centers along their gradient direction, then each
//! surviving center gets its radius from the distance distribution of the
//! edge pixels that support it.
//!
//! The accumulator is built once per radius window and can be re-queried at
//! different vote thresholds, which is what the auto-crop backoff search
//! does while it walks the threshold down.

use ndarray::Array2;

/// Configuration for one circle-detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughConfig {
    /// Accumulator downscale factor relative to the image (1 = full
    /// resolution).
    pub accumulator_scale: usize,
    /// Minimum distance between accepted centers, in image pixels.
    pub min_center_dist: f32,
    /// Gradient magnitude required for a pixel to count as an edge.
    pub gradient_threshold: f32,
    /// Accumulator votes required for a center candidate.
    pub vote_threshold: u32,
    /// Smallest circle radius searched, in pixels.
    pub min_radius: usize,
    /// Largest circle radius searched, in pixels.
    pub max_radius: usize,
}

impl Default for HoughConfig {
    fn default() -> Self {
        Self {
            accumulator_scale: 2,
            min_center_dist: 5.0,
            gradient_threshold: 15.0,
            vote_threshold: 240,
            min_radius: 775,
            max_radius: 825,
        }
    }
}

/// A detected circle with its accumulator support.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center x (column), image pixels
    pub cx: f32,
    /// Center y (row), image pixels
    pub cy: f32,
    /// Radius, pixels
    pub radius: f32,
    /// Accumulator votes at the center cell
    pub votes: u32,
}

/// An edge pixel with its unit gradient direction.
#[derive(Debug, Clone, Copy)]
struct EdgePoint {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
}

/// Center-voting accumulator for one radius window.
///
/// Build once with [`HoughTransform::build`], then extract circles at any
/// vote threshold with [`HoughTransform::circles_at`].
#[derive(Debug)]
pub struct HoughTransform {
    accumulator: Array2<u32>,
    edges: Vec<EdgePoint>,
    scale: usize,
    min_center_dist: f32,
    min_radius: usize,
    max_radius: usize,
}

impl HoughTransform {
    /// Run edge extraction and center voting over the whole frame.
    ///
    /// # Arguments
    /// * `gray` - Grayscale frame, shape (height, width)
    /// * `config` - Detection parameters; `vote_threshold` is ignored here
    ///   and supplied per [`Self::circles_at`] call
    pub fn build(gray: &Array2<f32>, config: &HoughConfig) -> Self {
        let (height, width) = gray.dim();
        let scale = config.accumulator_scale.max(1);
        let acc_rows = height.div_ceil(scale);
        let acc_cols = width.div_ceil(scale);

        let edges = sobel_edges(gray, config.gradient_threshold);

        let mut accumulator = Array2::<u32>::zeros((acc_rows, acc_cols));
        if config.min_radius <= config.max_radius {
            for edge in &edges {
                // Vote along the gradient in both senses: the limb gradient
                // points into the bright disk, but the sense depends on
                // whether the disk is brighter than space.
                for sign in [1.0f32, -1.0] {
                    let mut last_cell = (usize::MAX, usize::MAX);
                    for t in config.min_radius..=config.max_radius {
                        let px = edge.x + sign * edge.dx * t as f32;
                        let py = edge.y + sign * edge.dy * t as f32;
                        if px < 0.0 || py < 0.0 || px >= width as f32 || py >= height as f32 {
                            break;
                        }
                        let cell = (py as usize / scale, px as usize / scale);
                        if cell == last_cell {
                            continue;
                        }
                        accumulator[cell] += 1;
                        last_cell = cell;
                    }
                }
            }
        }

        Self {
            accumulator,
            edges,
            scale,
            min_center_dist: config.min_center_dist,
            min_radius: config.min_radius,
            max_radius: config.max_radius,
        }
    }

    /// Extract circles whose center support meets `vote_threshold`.
    ///
    /// Center candidates are accumulator local maxima; greedy non-maximum
    /// suppression keeps the strongest candidate within `min_center_dist`.
    /// Each center's radius is the mode of its supporting edge distances.
    /// Results are sorted by descending votes.
    pub fn circles_at(&self, vote_threshold: u32) -> Vec<Circle> {
        let threshold = vote_threshold.max(1);
        let (rows, cols) = self.accumulator.dim();

        let mut candidates: Vec<(usize, usize, u32)> = Vec::new();
        for row in 0..rows {
            for col in 0..cols {
                let votes = self.accumulator[[row, col]];
                if votes < threshold || !self.is_local_max(row, col) {
                    continue;
                }
                candidates.push((row, col, votes));
            }
        }
        candidates.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

        let mut circles: Vec<Circle> = Vec::new();
        for (row, col, votes) in candidates {
            let cx = (col as f32 + 0.5) * self.scale as f32;
            let cy = (row as f32 + 0.5) * self.scale as f32;

            let too_close = circles.iter().any(|c| {
                let dx = c.cx - cx;
                let dy = c.cy - cy;
                (dx * dx + dy * dy).sqrt() < self.min_center_dist
            });
            if too_close {
                continue;
            }

            if let Some(radius) = self.estimate_radius(cx, cy) {
                circles.push(Circle {
                    cx,
                    cy,
                    radius,
                    votes,
                });
            }
        }

        circles
    }

    /// Accumulator cell is a local maximum over its 8-neighborhood.
    fn is_local_max(&self, row: usize, col: usize) -> bool {
        let (rows, cols) = self.accumulator.dim();
        let votes = self.accumulator[[row, col]];

        for dr in -1i32..=1 {
            for dc in -1i32..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = row as i32 + dr;
                let c = col as i32 + dc;
                if r < 0 || c < 0 || r >= rows as i32 || c >= cols as i32 {
                    continue;
                }
                if self.accumulator[[r as usize, c as usize]] > votes {
                    return false;
                }
            }
        }
        true
    }

    /// Mode of edge-pixel distances from (cx, cy) within the radius window,
    /// refined by a weighted mean over the neighboring bins.
    fn estimate_radius(&self, cx: f32, cy: f32) -> Option<f32> {
        if self.min_radius > self.max_radius {
            return None;
        }

        let bins = self.max_radius - self.min_radius + 1;
        let mut histogram = vec![0u32; bins];

        for edge in &self.edges {
            let dx = edge.x - cx;
            let dy = edge.y - cy;
            let dist = (dx * dx + dy * dy).sqrt().round() as usize;
            if dist >= self.min_radius && dist <= self.max_radius {
                histogram[dist - self.min_radius] += 1;
            }
        }

        let (mode, &count) = histogram
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)?;
        if count == 0 {
            return None;
        }

        // Weighted mean over mode +/- 1 for sub-bin placement
        let mut weight = 0.0f32;
        let mut sum = 0.0f32;
        for offset in mode.saturating_sub(1)..(mode + 2).min(bins) {
            let w = histogram[offset] as f32;
            weight += w;
            sum += w * (self.min_radius + offset) as f32;
        }
        Some(sum / weight)
    }
}

/// Extract edge pixels via 3x3 Sobel gradients.
///
/// Pixels whose gradient magnitude meets `threshold` are returned with their
/// unit gradient direction. The one-pixel image border is skipped.
fn sobel_edges(gray: &Array2<f32>, threshold: f32) -> Vec<EdgePoint> {
    let (height, width) = gray.dim();
    if height < 3 || width < 3 {
        return Vec::new();
    }

    let mut edges = Vec::new();
    for row in 1..height - 1 {
        for col in 1..width - 1 {
            let p = |dr: usize, dc: usize| gray[[row + dr - 1, col + dc - 1]];

            let gx = (p(0, 2) + 2.0 * p(1, 2) + p(2, 2)) - (p(0, 0) + 2.0 * p(1, 0) + p(2, 0));
            let gy = (p(2, 0) + 2.0 * p(2, 1) + p(2, 2)) - (p(0, 0) + 2.0 * p(0, 1) + p(0, 2));

            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude >= threshold && magnitude > 0.0 {
                edges.push(EdgePoint {
                    x: col as f32,
                    y: row as f32,
                    dx: gx / magnitude,
                    dy: gy / magnitude,
                });
            }
        }
    }
    edges
}

/// One-shot circle detection: build the accumulator and extract circles at
/// the configured vote threshold.
pub fn detect_circles(gray: &Array2<f32>, config: &HoughConfig) -> Vec<Circle> {
    HoughTransform::build(gray, config).circles_at(config.vote_threshold)
}
