use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::ShapeInstance;

pub const GREEN: [u8; 3] = [0, 255, 0];
pub const RED: [u8; 3] = [255, 0, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];

/// Draws accepted boundaries, and optionally their simplified polylines,
/// onto an RGB copy of the source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayRenderer {
    pub outline_color: [u8; 3],
    /// `None` skips the simplified polyline
    pub polyline_color: Option<[u8; 3]>,
    pub thickness: u32,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self {
            outline_color: GREEN,
            polyline_color: None,
            thickness: 2,
        }
    }
}

impl OverlayRenderer {
    pub fn render(&self, source: &DynamicImage, instances: &[ShapeInstance]) -> RgbImage {
        let mut canvas = source.to_rgb8();
        for instance in instances {
            self.draw_closed(&mut canvas, &instance.contour.points, Rgb(self.outline_color));
        }
        if let Some(color) = self.polyline_color {
            for instance in instances {
                self.draw_closed(&mut canvas, &instance.simplified, Rgb(color));
            }
        }
        canvas
    }

    fn draw_closed(&self, canvas: &mut RgbImage, points: &[[i32; 2]], color: Rgb<u8>) {
        if points.is_empty() {
            return;
        }
        let thickness = self.thickness.max(1) as i32;
        let spread = (thickness - 1) / 2;
        for (i, &[x0, y0]) in points.iter().enumerate() {
            let [x1, y1] = points[(i + 1) % points.len()];
            for oy in -spread..thickness - spread {
                for ox in -spread..thickness - spread {
                    draw_line_segment_mut(
                        canvas,
                        ((x0 + ox) as f32, (y0 + oy) as f32),
                        ((x1 + ox) as f32, (y1 + oy) as f32),
                        color,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Contour;

    fn square_instance() -> ShapeInstance {
        let points = vec![[10, 10], [10, 30], [30, 30], [30, 10]];
        ShapeInstance {
            contour: Contour::new(points.clone()),
            area: 400.0,
            perimeter: 80.0,
            solidity: 1.0,
            width: None,
            length: None,
            circularity: None,
            orientation: None,
            simplified: vec![[10, 10], [30, 30], [30, 10]],
        }
    }

    #[test]
    fn test_overlay_draws_on_copy() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([200, 200, 200])));
        let renderer = OverlayRenderer { polyline_color: Some(RED), ..Default::default() };
        let overlay = renderer.render(&source, &[square_instance()]);

        assert_eq!(overlay.get_pixel(10, 20), &Rgb(GREEN));
        // Diagonal of the simplified polyline
        assert_eq!(overlay.get_pixel(20, 20), &Rgb(RED));
        assert_eq!(overlay.get_pixel(40, 40), &Rgb([200, 200, 200]));
        assert_eq!(source.to_rgb8().get_pixel(10, 20), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_thin_outline_without_polyline() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([0, 0, 0])));
        let renderer = OverlayRenderer { outline_color: BLUE, polyline_color: None, thickness: 1 };
        let overlay = renderer.render(&source, &[square_instance()]);
        assert_eq!(overlay.get_pixel(20, 10), &Rgb(BLUE));
        assert_eq!(overlay.get_pixel(20, 20), &Rgb([0, 0, 0]));
        assert_eq!(overlay.get_pixel(20, 11), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_empty_instances_echo_source() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([7, 8, 9])));
        let overlay = OverlayRenderer::default().render(&source, &[]);
        assert_eq!(overlay, source.to_rgb8());
    }
}
