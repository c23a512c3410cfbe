use std::collections::BTreeMap;

use image::GrayImage;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::types::Orientation;

/// Pixel count and raw moments of one labeled region
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionStats {
    pub label: u32,
    pub pixel_count: u32,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}

impl RegionStats {
    fn new(label: u32) -> Self {
        Self {
            label,
            ..Self::default()
        }
    }

    pub fn add_pixel(&mut self, x: u32, y: u32) {
        let (x, y) = (f64::from(x), f64::from(y));
        self.pixel_count += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
        self.sum_xy += x * y;
    }

    /// Moments of every nonzero pixel of `mask`
    pub fn from_mask(mask: &GrayImage) -> Self {
        let mut stats = Self::new(1);
        for (x, y, pixel) in mask.enumerate_pixels() {
            if pixel[0] != 0 {
                stats.add_pixel(x, y);
            }
        }
        stats
    }

    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.pixel_count == 0 {
            return None;
        }
        let n = f64::from(self.pixel_count);
        Some((self.sum_x / n, self.sum_y / n))
    }

    /// Angle between the row axis and the region's major axis, in `[-π/2, π/2]`.
    ///
    /// A region elongated along x measures about `±π/2`. Equal variances fall
    /// back to `±π/4` by the sign of the covariance.
    pub fn major_axis_angle(&self) -> f64 {
        let Some((cx, cy)) = self.centroid() else {
            return 0.0;
        };
        let n = f64::from(self.pixel_count);
        let mu20 = self.sum_xx / n - cx * cx;
        let mu02 = self.sum_yy / n - cy * cy;
        let mu11 = self.sum_xy / n - cx * cy;
        if mu20 == mu02 {
            return if mu11 > 0.0 {
                std::f64::consts::FRAC_PI_4
            } else {
                -std::f64::consts::FRAC_PI_4
            };
        }
        0.5 * (2.0 * mu11).atan2(mu02 - mu20)
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_angle(self.major_axis_angle())
    }
}

/// 4-connected components of the nonzero pixels, in label order
pub fn label_regions(mask: &GrayImage) -> (image::ImageBuffer<image::Luma<u32>, Vec<u32>>, Vec<RegionStats>) {
    let labels = connected_components(mask, Connectivity::Four, image::Luma([0u8]));

    let mut regions: BTreeMap<u32, RegionStats> = BTreeMap::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        regions
            .entry(label)
            .or_insert_with(|| RegionStats::new(label))
            .add_pixel(x, y);
    }

    (labels, regions.into_values().collect())
}

/// Region with the most pixels; the lowest label wins ties
pub fn largest_region(mask: &GrayImage) -> Option<RegionStats> {
    let (_, regions) = label_regions(mask);
    regions
        .into_iter()
        .reduce(|best, region| if region.pixel_count > best.pixel_count { region } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with(rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(80, 80);
        for &(x0, y0, x1, y1) in rects {
            for y in y0..y1 {
                for x in x0..x1 {
                    mask.put_pixel(x, y, Luma([255u8]));
                }
            }
        }
        mask
    }

    #[test]
    fn test_label_regions_counts_pixels() {
        let mask = mask_with(&[(0, 0, 5, 5), (20, 20, 30, 22)]);
        let (_, regions) = label_regions(&mask);
        let counts: Vec<u32> = regions.iter().map(|r| r.pixel_count).collect();
        assert_eq!(counts, vec![25, 20]);
    }

    #[test]
    fn test_diagonal_neighbours_are_separate_regions() {
        let mask = mask_with(&[(10, 10, 11, 11), (11, 11, 12, 12)]);
        let (_, regions) = label_regions(&mask);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_largest_region_and_orientation() {
        let mask = mask_with(&[(5, 5, 70, 10), (40, 30, 45, 40)]);
        let largest = largest_region(&mask).expect("region");
        assert_eq!(largest.pixel_count, 65 * 5);
        assert!((largest.major_axis_angle().abs() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert_eq!(largest.orientation(), Orientation::Vertical);
    }

    #[test]
    fn test_tall_region_is_measured_from_rows() {
        let stats = RegionStats::from_mask(&mask_with(&[(30, 2, 34, 78)]));
        assert!(stats.major_axis_angle().abs() < 1e-9);
        assert_eq!(stats.orientation(), Orientation::Horizontal);
    }

    #[test]
    fn test_diagonal_region_angle_sign() {
        let mut mask = GrayImage::new(40, 40);
        for i in 0..40 {
            mask.put_pixel(i, i, Luma([255u8]));
        }
        let stats = RegionStats::from_mask(&mask);
        assert!((stats.major_axis_angle() - std::f64::consts::FRAC_PI_4).abs() < 1e-9);
    }

    #[test]
    fn test_empty_mask_has_no_region() {
        assert!(largest_region(&GrayImage::new(10, 10)).is_none());
        assert_eq!(RegionStats::from_mask(&GrayImage::new(4, 4)).centroid(), None);
    }
}
