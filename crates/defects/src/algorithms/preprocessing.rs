use image::{GrayImage, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::{
    error::Result,
    traits::{Binarizer, ImagePreprocessor},
};

/// Gaussian blur preprocessor for noise reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GaussianBlurPreprocessor {
    pub sigma: f32,
}

impl Default for GaussianBlurPreprocessor {
    fn default() -> Self {
        // sigma a 5x5 kernel gets when no sigma is given
        Self { sigma: 1.1 }
    }
}

impl ImagePreprocessor for GaussianBlurPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        if self.sigma <= 0.0 {
            return Ok(image.clone());
        }
        Ok(imageproc::filter::gaussian_blur_f32(image, self.sigma))
    }
}

/// Median filter preprocessor, robust to salt-and-pepper noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MedianBlurPreprocessor {
    pub radius: u32,
}

impl Default for MedianBlurPreprocessor {
    fn default() -> Self {
        Self { radius: 2 }
    }
}

impl ImagePreprocessor for MedianBlurPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::filter::median_filter(image, self.radius, self.radius))
    }
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a grid of tiles, each tile gets its own clipped
/// equalization lookup table, and every pixel is mapped through a bilinear
/// blend of the four nearest tile tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClaheEnhancer {
    pub clip_limit: f32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl Default for ClaheEnhancer {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles_x: 8,
            tiles_y: 8,
        }
    }
}

impl ImagePreprocessor for ClaheEnhancer {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(image.clone());
        }

        let tile_w = width.div_ceil(self.tiles_x.clamp(1, width));
        let tile_h = height.div_ceil(self.tiles_y.clamp(1, height));
        let grid_w = width.div_ceil(tile_w);
        let grid_h = height.div_ceil(tile_h);

        let mut luts = Vec::with_capacity((grid_w * grid_h) as usize);
        for ty in 0..grid_h {
            for tx in 0..grid_w {
                let x0 = tx * tile_w;
                let y0 = ty * tile_h;
                let x1 = (x0 + tile_w).min(width);
                let y1 = (y0 + tile_h).min(height);

                let mut hist = [0u32; 256];
                for y in y0..y1 {
                    for x in x0..x1 {
                        hist[image.get_pixel(x, y)[0] as usize] += 1;
                    }
                }
                luts.push(clipped_equalization(&mut hist, (x1 - x0) * (y1 - y0), self.clip_limit));
            }
        }

        let lut_at = |tx: i64, ty: i64| {
            let tx = tx.clamp(0, i64::from(grid_w) - 1) as usize;
            let ty = ty.clamp(0, i64::from(grid_h) - 1) as usize;
            &luts[ty * grid_w as usize + tx]
        };

        Ok(GrayImage::from_fn(width, height, |x, y| {
            let value = image.get_pixel(x, y)[0] as usize;

            // Tile-centre coordinates of this pixel
            let gx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
            let gy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
            let tx = gx.floor();
            let ty = gy.floor();
            let ax = gx - tx;
            let ay = gy - ty;
            let (tx, ty) = (tx as i64, ty as i64);

            let top = f32::from(lut_at(tx, ty)[value]) * (1.0 - ax)
                + f32::from(lut_at(tx + 1, ty)[value]) * ax;
            let bottom = f32::from(lut_at(tx, ty + 1)[value]) * (1.0 - ax)
                + f32::from(lut_at(tx + 1, ty + 1)[value]) * ax;

            Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
        }))
    }
}

/// Clip the histogram, spread the excess evenly, and return the CDF mapping.
fn clipped_equalization(hist: &mut [u32; 256], pixel_count: u32, clip_limit: f32) -> [u8; 256] {
    if clip_limit > 0.0 {
        let limit = ((clip_limit * pixel_count as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }

        let step = excess / 256;
        let residual = excess % 256;
        for (i, bin) in hist.iter_mut().enumerate() {
            *bin += step;
            if (i as u32) < residual {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / pixel_count.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (value, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[value] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Edge-preserving bilateral smoothing over a circular window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BilateralSmoother {
    pub diameter: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
}

impl Default for BilateralSmoother {
    fn default() -> Self {
        Self {
            diameter: 9,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

impl ImagePreprocessor for BilateralSmoother {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || self.diameter < 2 {
            return Ok(image.clone());
        }

        let radius = (self.diameter / 2) as i64;
        let space_coeff = -0.5 / (self.sigma_space * self.sigma_space);
        let color_coeff = -0.5 / (self.sigma_color * self.sigma_color);

        let mut window = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let dist2 = (dx * dx + dy * dy) as f32;
                if dist2 <= (radius * radius) as f32 {
                    window.push((dx, dy, (dist2 * space_coeff).exp()));
                }
            }
        }
        let color_weights: Vec<f32> = (0..256)
            .map(|diff| ((diff * diff) as f32 * color_coeff).exp())
            .collect();

        let max_x = i64::from(width) - 1;
        let max_y = i64::from(height) - 1;
        Ok(GrayImage::from_fn(width, height, |x, y| {
            let center = image.get_pixel(x, y)[0];
            let mut sum = 0.0f32;
            let mut norm = 0.0f32;
            for &(dx, dy, space_weight) in &window {
                let sx = (i64::from(x) + dx).clamp(0, max_x) as u32;
                let sy = (i64::from(y) + dy).clamp(0, max_y) as u32;
                let value = image.get_pixel(sx, sy)[0];
                let weight = space_weight * color_weights[usize::from(value.abs_diff(center))];
                sum += weight * f32::from(value);
                norm += weight;
            }
            Luma([(sum / norm).round().clamp(0.0, 255.0) as u8])
        }))
    }
}

/// Fixed threshold with inverted sense: pixels at or below the threshold are foreground
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InverseThreshold;

impl Binarizer for InverseThreshold {
    fn binarize(&self, image: &GrayImage, threshold: u8) -> GrayImage {
        let mut mask = imageproc::contrast::threshold(image, threshold);
        image::imageops::invert(&mut mask);
        mask
    }
}

/// Gaussian-weighted local threshold, inverted.
///
/// A pixel is foreground when it is at least `c` below the Gaussian-weighted
/// mean of its `block_size` neighbourhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AdaptiveThreshold {
    pub block_size: u32,
    pub c: f32,
}

impl Default for AdaptiveThreshold {
    fn default() -> Self {
        Self {
            block_size: 11,
            c: 2.0,
        }
    }
}

impl AdaptiveThreshold {
    /// Sigma of a Gaussian kernel spanning `block_size` pixels
    pub fn sigma(&self) -> f32 {
        0.3 * ((self.block_size.max(3) as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }

    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        if image.width() == 0 || image.height() == 0 {
            return image.clone();
        }
        let local_mean = imageproc::filter::gaussian_blur_f32(image, self.sigma());
        let mut mask = GrayImage::new(image.width(), image.height());
        for ((out, src), mean) in mask.pixels_mut().zip(image.pixels()).zip(local_mean.pixels()) {
            if f32::from(src[0]) <= f32::from(mean[0]) - self.c {
                out[0] = 255;
            }
        }
        mask
    }
}

/// Union of a local adaptive threshold and the caller's global threshold.
///
/// The adaptive pass picks up faint segments with local contrast, the global
/// pass keeps long uniform stretches the adaptive pass would fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DualThreshold {
    pub adaptive: AdaptiveThreshold,
}

impl Binarizer for DualThreshold {
    fn binarize(&self, image: &GrayImage, threshold: u8) -> GrayImage {
        let mut mask = self.adaptive.apply(image);
        let global = InverseThreshold.binarize(image, threshold);
        for (out, g) in mask.pixels_mut().zip(global.pixels()) {
            out[0] |= g[0];
        }
        mask
    }
}
