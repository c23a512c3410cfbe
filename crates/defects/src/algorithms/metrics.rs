use geo_types::{Coord, LineString};
use image::{GrayImage, Luma};
use imageproc::{
    distance_transform::euclidean_squared_distance_transform, drawing::draw_polygon_mut,
    point::Point,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::regions::RegionStats,
    types::{Contour, ShapeInstance, WidthStats},
};

const CIRCULARITY_EPSILON: f64 = 1e-10;

/// Which per-instance descriptors to compute on top of area/perimeter/solidity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricsEngine {
    pub width: bool,
    pub length: bool,
    pub circularity: bool,
    pub orientation: bool,
    /// Douglas-Peucker tolerance as a fraction of the perimeter
    pub simplify_ratio: f64,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self {
            width: false,
            length: false,
            circularity: false,
            orientation: false,
            simplify_ratio: 0.005,
        }
    }
}

impl MetricsEngine {
    pub fn measure(&self, contour: Contour) -> ShapeInstance {
        let area = contour.area();
        let perimeter = contour.perimeter();
        let solidity = contour.solidity();

        let filled = (self.width || self.orientation).then(|| fill_contour(&contour));

        let width = if self.width {
            Some(filled.as_ref().map(width_stats).unwrap_or_default())
        } else {
            None
        };
        let orientation = if self.orientation {
            filled.as_ref().map(|mask| RegionStats::from_mask(mask).orientation())
        } else {
            None
        };

        ShapeInstance {
            area,
            perimeter,
            solidity,
            width,
            length: self.length.then_some(perimeter),
            circularity: self.circularity.then(|| circularity(area, perimeter)),
            orientation,
            simplified: simplify(&contour, perimeter * self.simplify_ratio),
            contour,
        }
    }
}

/// `4π·area / perimeter²`, 1.0 for a perfect circle
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter + CIRCULARITY_EPSILON)
}

/// Render one contour, boundary included, into a mask cropped to its
/// bounding box with a one pixel background margin.
pub fn fill_contour(contour: &Contour) -> GrayImage {
    let Some((min, max)) = contour.bounding_box() else {
        return GrayImage::new(0, 0);
    };
    let width = (max[0] - min[0] + 3) as u32;
    let height = (max[1] - min[1] + 3) as u32;
    let mut mask = GrayImage::new(width, height);

    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(contour.len());
    for &[x, y] in &contour.points {
        let point = Point::new(x - min[0] + 1, y - min[1] + 1);
        if polygon.last() != Some(&point) {
            polygon.push(point);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut mask, &polygon, Luma([255u8]));
    }
    for point in &polygon {
        mask.put_pixel(point.x as u32, point.y as u32, Luma([255u8]));
    }
    mask
}

/// Twice the distance from every foreground pixel to the nearest background pixel
pub fn width_stats(mask: &GrayImage) -> WidthStats {
    let mut background = mask.clone();
    image::imageops::invert(&mut background);
    let distances = euclidean_squared_distance_transform(&background);

    let mut stats = WidthStats {
        min: f64::INFINITY,
        ..WidthStats::default()
    };
    let mut sum = 0.0;
    for (pixel, distance) in mask.pixels().zip(distances.pixels()) {
        if pixel[0] == 0 {
            continue;
        }
        let width = 2.0 * distance[0].sqrt();
        stats.min = stats.min.min(width);
        stats.max = stats.max.max(width);
        sum += width;
        stats.samples += 1;
    }

    if stats.samples == 0 {
        return WidthStats::default();
    }
    stats.mean = sum / stats.samples as f64;
    stats
}

/// Douglas-Peucker approximation of the closed contour
pub fn simplify(contour: &Contour, epsilon: f64) -> Vec<[i32; 2]> {
    use geo::Simplify;
    if contour.len() < 3 || epsilon <= 0.0 {
        return contour.points.clone();
    }

    let mut coords: Vec<Coord<f64>> = contour
        .points
        .iter()
        .map(|&[x, y]| Coord { x: f64::from(x), y: f64::from(y) })
        .collect();
    coords.push(coords[0]);

    let simplified = LineString::new(coords).simplify(&epsilon);
    let mut points: Vec<[i32; 2]> = simplified
        .coords()
        .map(|c| [c.x.round() as i32, c.y.round() as i32])
        .collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}
