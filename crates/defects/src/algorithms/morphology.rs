use image::{GrayImage, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{algorithms::regions::label_regions, types::DetectionParameters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementShape {
    Rect,
    Ellipse,
}

/// Structuring element anchored at its centre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StructuringElement {
    pub shape: ElementShape,
    pub width: u32,
    pub height: u32,
}

impl StructuringElement {
    pub fn ellipse(width: u32, height: u32) -> Self {
        Self { shape: ElementShape::Ellipse, width, height }
    }

    pub fn rect(width: u32, height: u32) -> Self {
        Self { shape: ElementShape::Rect, width, height }
    }

    /// Offsets of the element's set cells relative to the anchor
    pub fn offsets(&self) -> Vec<(i64, i64)> {
        let width = i64::from(self.width.max(1));
        let height = i64::from(self.height.max(1));
        let cx = width / 2;
        let cy = height / 2;

        let mut offsets = Vec::new();
        for row in 0..height {
            let (start, end) = match self.shape {
                ElementShape::Rect => (0, width),
                ElementShape::Ellipse => {
                    // Row span of the inscribed ellipse
                    let dy = row - cy;
                    let r2 = (cy * cy) as f64;
                    let half = if cy == 0 {
                        cx
                    } else {
                        (cx as f64 * ((r2 - (dy * dy) as f64).max(0.0) / r2).sqrt()).round() as i64
                    };
                    ((cx - half).max(0), (cx + half + 1).min(width))
                }
            };
            for col in start..end {
                offsets.push((col - cx, row - cy));
            }
        }
        offsets
    }
}

fn hit(mask: &GrayImage, x: i64, y: i64) -> Option<bool> {
    if x < 0 || y < 0 || x >= i64::from(mask.width()) || y >= i64::from(mask.height()) {
        return None;
    }
    Some(mask.get_pixel(x as u32, y as u32)[0] != 0)
}

/// Binary erosion; pixels outside the image never erode the foreground
pub fn erode(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    let offsets = element.offsets();
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let keep = offsets
            .iter()
            .all(|&(dx, dy)| hit(mask, i64::from(x) + dx, i64::from(y) + dy).unwrap_or(true));
        Luma([if keep { 255 } else { 0 }])
    })
}

/// Binary dilation; pixels outside the image never add foreground
pub fn dilate(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    let offsets = element.offsets();
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let set = offsets
            .iter()
            .any(|&(dx, dy)| hit(mask, i64::from(x) + dx, i64::from(y) + dy).unwrap_or(false));
        Luma([if set { 255 } else { 0 }])
    })
}

/// `iterations` erosions followed by as many dilations
pub fn open(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = erode(&out, element);
    }
    for _ in 0..iterations {
        out = dilate(&out, element);
    }
    out
}

/// `iterations` dilations followed by as many erosions
pub fn close(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    let mut out = mask.clone();
    for _ in 0..iterations {
        out = dilate(&out, element);
    }
    for _ in 0..iterations {
        out = erode(&out, element);
    }
    out
}

/// Drop every 4-connected component with fewer than `min_pixels` pixels
pub fn remove_small_components(mask: &GrayImage, min_pixels: f64) -> GrayImage {
    let (labels, regions) = label_regions(mask);
    let keep: std::collections::HashSet<u32> = regions
        .iter()
        .filter(|region| f64::from(region.pixel_count) >= min_pixels)
        .map(|region| region.label)
        .collect();

    debug!(
        components = regions.len(),
        kept = keep.len(),
        min_pixels,
        "component size filter"
    );

    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let label = labels.get_pixel(x, y)[0];
        Luma([if label != 0 && keep.contains(&label) { 255 } else { 0 }])
    })
}

/// Open/close passes plus an optional component size pre-filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MorphologicalCleaner {
    pub element: StructuringElement,
    pub open_iterations: u32,
    pub close_iterations: u32,
    /// Components smaller than `min_area * ratio` pixels are dropped
    pub component_area_ratio: Option<f64>,
}

impl Default for MorphologicalCleaner {
    fn default() -> Self {
        Self {
            element: StructuringElement::ellipse(3, 3),
            open_iterations: 1,
            close_iterations: 1,
            component_area_ratio: None,
        }
    }
}

impl MorphologicalCleaner {
    /// Returns a new mask; the input is left untouched
    pub fn clean(&self, mask: &GrayImage, params: &DetectionParameters) -> GrayImage {
        let mut cleaned = open(mask, &self.element, self.open_iterations);
        cleaned = close(&cleaned, &self.element, self.close_iterations);
        if let Some(ratio) = self.component_area_ratio {
            cleaned = remove_small_components(&cleaned, params.min_area * ratio);
        }
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element_rows(element: &StructuringElement) -> Vec<String> {
        let offsets = element.offsets();
        let (w, h) = (element.width as i64, element.height as i64);
        (0..h)
            .map(|row| {
                (0..w)
                    .map(|col| {
                        if offsets.contains(&(col - w / 2, row - h / 2)) { '#' } else { '.' }
                    })
                    .collect()
            })
            .collect()
    }

    fn filled(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for &(x0, y0, x1, y1) in rects {
            for y in y0..y1 {
                for x in x0..x1 {
                    mask.put_pixel(x, y, Luma([255u8]));
                }
            }
        }
        mask
    }

    fn count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] != 0).count()
    }

    #[test]
    fn test_ellipse_elements() {
        assert_eq!(
            element_rows(&StructuringElement::ellipse(3, 3)),
            vec![".#.", "###", ".#."]
        );
        assert_eq!(
            element_rows(&StructuringElement::ellipse(5, 5)),
            vec!["..#..", "#####", "#####", "#####", "..#.."]
        );
        assert_eq!(StructuringElement::rect(3, 3).offsets().len(), 9);
    }

    #[test]
    fn test_open_removes_specks() {
        let mut mask = filled(40, 40, &[(10, 10, 30, 30)]);
        mask.put_pixel(2, 2, Luma([255u8]));
        let opened = open(&mask, &StructuringElement::ellipse(3, 3), 1);
        assert_eq!(opened.get_pixel(2, 2)[0], 0);
        assert_eq!(opened.get_pixel(20, 20)[0], 255);
    }

    #[test]
    fn test_close_bridges_gap() {
        let mask = filled(40, 20, &[(2, 8, 19, 13), (20, 8, 38, 13)]);
        let closed = close(&mask, &StructuringElement::ellipse(5, 5), 1);
        assert_eq!(closed.get_pixel(19, 10)[0], 255);
    }

    #[test]
    fn test_border_does_not_erode() {
        let mask = filled(10, 10, &[(0, 0, 10, 10)]);
        let eroded = erode(&mask, &StructuringElement::ellipse(5, 5));
        assert_eq!(count(&eroded), 100);
    }

    #[test]
    fn test_remove_small_components() {
        let mask = filled(50, 50, &[(0, 0, 3, 3), (10, 10, 30, 30)]);
        let filtered = remove_small_components(&mask, 10.0);
        assert_eq!(count(&filtered), 400);
        assert_eq!(filtered.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn test_cleaner_leaves_input_untouched() {
        let mask = filled(30, 30, &[(5, 5, 25, 25)]);
        let before = mask.clone();
        let cleaner = MorphologicalCleaner {
            element: StructuringElement::ellipse(5, 5),
            open_iterations: 1,
            close_iterations: 2,
            component_area_ratio: Some(0.1),
        };
        let params = DetectionParameters::new(1000.0, None, 100).expect("params");
        let cleaned = cleaner.clean(&mask, &params);
        assert_eq!(mask, before);
        // 400 pixels survive a 100 pixel floor
        assert!(count(&cleaned) > 300);
    }
}
