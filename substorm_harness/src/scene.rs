//! Synthetic Earth-disk scene generation.
//!
//! Scenes are scaled-down stand-ins for IEU frames: a bright disk against a
//! dark sky with uniform pixel noise, optionally carrying an auroral arc
//! along the upper limb. Geometry is jittered per scene from a seeded RNG so
//! repeated trials see different but reproducible pointings.

use image::RgbImage;
use ndarray::Array2;
use rand::Rng;
use shared::ImageSize;
use substorm::CropConfig;

/// Sky background level, counts.
const SKY_LEVEL: f32 = 10.0;

/// Disk body level, counts per channel (r, g, b).
const DISK_LEVEL: [f32; 3] = [90.0, 100.0, 120.0];

/// Peak auroral arc boost, counts per channel. Green dominated.
const ARC_LEVEL: [f32; 3] = [30.0, 130.0, 50.0];

/// Geometry and photometry of one synthetic scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    /// Frame dimensions
    pub size: ImageSize,
    /// Disk center (cx, cy), pixels
    pub center: (f32, f32),
    /// Disk radius, pixels
    pub radius: f32,
    /// Whether the scene carries an auroral arc
    pub substorm: bool,
    /// Half-amplitude of the uniform pixel noise, counts
    pub noise: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            size: ImageSize::from_width_height(300, 300),
            center: (150.0, 150.0),
            radius: 50.0,
            substorm: false,
            noise: 4.0,
        }
    }
}

/// Draw a scene with jittered geometry.
///
/// Center jitter stays small enough that the disk never crosses a frame
/// border, so every generated scene survives the pointing check.
pub fn random_scene<R: Rng>(substorm: bool, rng: &mut R) -> (SceneConfig, RgbImage) {
    let base = SceneConfig::default();
    let config = SceneConfig {
        center: (
            base.center.0 + rng.random_range(-15.0..=15.0),
            base.center.1 + rng.random_range(-15.0..=15.0),
        ),
        radius: base.radius + rng.random_range(-8.0..=8.0),
        substorm,
        ..base
    };
    let frame = render_scene(&config, rng);
    (config, frame)
}

/// Render the scene into an RGB frame.
pub fn render_scene<R: Rng>(config: &SceneConfig, rng: &mut R) -> RgbImage {
    let (cx, cy) = config.center;
    let mut frame = RgbImage::new(config.size.width as u32, config.size.height as u32);

    for (col, row, pixel) in frame.enumerate_pixels_mut() {
        let dx = col as f32 - cx;
        let dy = row as f32 - cy;
        let dist = (dx * dx + dy * dy).sqrt();

        let mut level = if dist <= config.radius {
            DISK_LEVEL
        } else {
            [SKY_LEVEL; 3]
        };

        // Auroral arc: an annulus just inside the limb, upper half only,
        // feathered toward its edges.
        if config.substorm && dy < 0.0 {
            let inner = 0.70 * config.radius;
            let outer = 0.95 * config.radius;
            if dist >= inner && dist <= outer {
                let mid = 0.5 * (inner + outer);
                let half_width = 0.5 * (outer - inner);
                let falloff = 1.0 - ((dist - mid).abs() / half_width);
                for (channel, boost) in level.iter_mut().zip(ARC_LEVEL) {
                    *channel += boost * falloff;
                }
            }
        }

        let noise = rng.random_range(-config.noise..=config.noise);
        pixel.0 = level.map(|v| (v + noise).round().clamp(0.0, 255.0) as u8);
    }

    frame
}

/// Limb search tuning scaled to the harness scenes, whose disks are an
/// order of magnitude smaller than flight frames.
pub fn scene_crop_config() -> CropConfig {
    CropConfig {
        blur_kernel: 5,
        blur_passes: 1,
        starting_radius: 40,
        radius_delta: 10,
        ending_radius: 90,
        starting_votes: 120,
        min_votes: 10,
        min_circles: 1,
        border_pad: 60,
        ..CropConfig::default()
    }
}

/// Remosaic an RGB scene to the BGGR layout the IEU camera delivers.
///
/// Each site keeps the channel its color filter would have measured, so
/// demosaicking the result approximately reproduces the scene.
pub fn mosaic_scene(rgb: &RgbImage) -> Array2<u8> {
    let (width, height) = rgb.dimensions();
    let mut raw = Array2::<u8>::zeros((height as usize, width as usize));

    for (col, row, pixel) in rgb.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        raw[[row as usize, col as usize]] = match (row % 2, col % 2) {
            (0, 0) => b,
            (1, 1) => r,
            _ => g,
        };
    }

    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_render_is_deterministic_for_a_seed() {
        let config = SceneConfig::default();
        let a = render_scene(&config, &mut ChaCha8Rng::seed_from_u64(7));
        let b = render_scene(&config, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_disk_is_brighter_than_sky() {
        let config = SceneConfig {
            noise: 0.0,
            ..SceneConfig::default()
        };
        let frame = render_scene(&config, &mut ChaCha8Rng::seed_from_u64(1));

        assert_eq!(frame.get_pixel(150, 150).0, [90, 100, 120]);
        assert_eq!(frame.get_pixel(5, 5).0, [10, 10, 10]);
    }

    #[test]
    fn test_arc_boosts_upper_limb_only() {
        let config = SceneConfig {
            substorm: true,
            noise: 0.0,
            ..SceneConfig::default()
        };
        let frame = render_scene(&config, &mut ChaCha8Rng::seed_from_u64(1));

        // Arc midline crosses (150, 150 - 0.825 * 50) on the upper limb.
        let upper = frame.get_pixel(150, 150 - 41);
        let lower = frame.get_pixel(150, 150 + 41);
        assert!(upper.0[1] > lower.0[1] + 50, "upper = {:?}", upper.0);
        // Mirror point on the lower limb is plain disk.
        assert_eq!(lower.0, [90, 100, 120]);
    }

    #[test]
    fn test_random_scene_stays_inside_frame() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..20 {
            let (config, _) = random_scene(false, &mut rng);
            let (cx, cy) = config.center;
            assert!(cx - config.radius > 0.0);
            assert!(cx + config.radius < config.size.width as f32);
            assert!(cy - config.radius > 0.0);
            assert!(cy + config.radius < config.size.height as f32);
        }
    }

    #[test]
    fn test_mosaic_site_layout() {
        let mut rgb = RgbImage::new(4, 4);
        for pixel in rgb.pixels_mut() {
            pixel.0 = [10, 20, 30];
        }

        let raw = mosaic_scene(&rgb);
        assert_eq!(raw[[0, 0]], 30);
        assert_eq!(raw[[0, 1]], 20);
        assert_eq!(raw[[1, 0]], 20);
        assert_eq!(raw[[1, 1]], 10);
    }
}
