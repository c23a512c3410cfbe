use geo_types::{Coord, LineString, Polygon};
use image::{DynamicImage, GrayImage, RgbImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    error::{DefectError, Result},
    kind::DefectKind,
};

/// Caller-supplied knobs shared by all three detectors.
///
/// `max_area` is an optional upper bound: `None` means unbounded. Values are
/// checked by [`DetectionParameters::validate`] before any pixel work happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionParameters {
    /// Smallest accepted contour area in pixels (must be ≥ 1)
    pub min_area: f64,
    /// Largest accepted contour area in pixels, `None` for unbounded
    #[serde(default)]
    pub max_area: Option<f64>,
    /// Global binarization threshold in `[0, 255]`
    pub threshold: i32,
}

impl DetectionParameters {
    pub fn new(min_area: f64, max_area: Option<f64>, threshold: i32) -> Result<Self> {
        let params = Self {
            min_area,
            max_area,
            threshold,
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        if !self.min_area.is_finite() || self.min_area < 1.0 {
            return Err(DefectError::InvalidParameters(format!(
                "min_area must be a finite number >= 1, got {}",
                self.min_area
            )));
        }
        if let Some(max_area) = self.max_area {
            if max_area.is_nan() {
                return Err(DefectError::InvalidParameters(
                    "max_area must be a number".to_string(),
                ));
            }
            if self.min_area > max_area {
                return Err(DefectError::InvalidParameters(format!(
                    "min_area ({}) must not exceed max_area ({})",
                    self.min_area, max_area
                )));
            }
        }
        if !(0..=255).contains(&self.threshold) {
            return Err(DefectError::InvalidParameters(format!(
                "threshold must be within 0-255, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Threshold as a pixel value. Only meaningful after validation.
    pub fn threshold_u8(&self) -> u8 {
        self.threshold.clamp(0, 255) as u8
    }

    /// Whether `area` lies in `[min_area, max_area]`
    pub fn area_in_bounds(&self, area: f64) -> bool {
        area >= self.min_area && self.max_area.is_none_or(|max| area <= max)
    }
}

/// Outer boundary of one connected foreground region, in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Contour {
    pub points: Vec<[i32; 2]>,
}

impl Contour {
    pub fn new(points: Vec<[i32; 2]>) -> Self {
        Self { points }
    }

    /// Convert to a geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .points
            .iter()
            .map(|&[x, y]| Coord {
                x: f64::from(x),
                y: f64::from(y),
            })
            .collect();

        Polygon::new(LineString::new(coords), vec![])
    }

    /// Polygon area enclosed by the boundary points
    pub fn area(&self) -> f64 {
        use geo::Area;
        if self.points.len() < 3 {
            return 0.0;
        }
        self.to_geo_polygon().unsigned_area()
    }

    /// Closed arc length of the boundary
    pub fn perimeter(&self) -> f64 {
        use geo::EuclideanLength;
        if self.points.len() < 2 {
            return 0.0;
        }
        self.to_geo_polygon().exterior().euclidean_length()
    }

    pub fn convex_hull_area(&self) -> f64 {
        use geo::{Area, ConvexHull};
        if self.points.len() < 3 {
            return 0.0;
        }
        self.to_geo_polygon().convex_hull().unsigned_area()
    }

    /// Area over convex hull area, 0 when the hull is degenerate
    pub fn solidity(&self) -> f64 {
        let hull_area = self.convex_hull_area();
        if hull_area > 0.0 {
            self.area() / hull_area
        } else {
            0.0
        }
    }

    /// Inclusive pixel bounding box as `([min_x, min_y], [max_x, max_y])`
    pub fn bounding_box(&self) -> Option<([i32; 2], [i32; 2])> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for &[x, y] in &self.points {
            min = [min[0].min(x), min[1].min(y)];
            max = [max[0].max(x), max[1].max(y)];
        }
        Some((min, max))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Local thickness statistics over one crack's filled mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WidthStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Number of in-mask pixels the statistics were taken over
    pub samples: usize,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Classify a major-axis angle measured from the row axis.
    ///
    /// `|angle| < π/4` is labelled horizontal, the rest vertical.
    pub fn from_angle(angle: f64) -> Self {
        if angle.abs() < std::f64::consts::FRAC_PI_4 {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }
}

/// One accepted contour with its measured attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeInstance {
    pub contour: Contour,
    pub area: f64,
    pub perimeter: f64,
    pub solidity: f64,
    pub width: Option<WidthStats>,
    pub length: Option<f64>,
    pub circularity: Option<f64>,
    pub orientation: Option<Orientation>,
    /// Douglas-Peucker approximation of the contour, used only for drawing
    pub simplified: Vec<[i32; 2]>,
}

/// Summary of the whole instance list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AggregatedMetrics {
    pub count: usize,
    pub total_area: f64,
    pub mean_area: f64,
    pub areas: Vec<f64>,
    pub class: ClassMetrics,
}

impl AggregatedMetrics {
    pub fn crack(&self) -> Option<&CrackMetrics> {
        match &self.class {
            ClassMetrics::Crack(metrics) => Some(metrics),
            _ => None,
        }
    }

    pub fn hole(&self) -> Option<&HoleMetrics> {
        match &self.class {
            ClassMetrics::Hole(metrics) => Some(metrics),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassMetrics {
    Crack(CrackMetrics),
    Hole(HoleMetrics),
    Grain,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrackMetrics {
    /// Representative (maximum) width of every crack, in instance order
    pub widths: Vec<f64>,
    /// Arc length of every crack, in instance order
    pub lengths: Vec<f64>,
    pub mean_width: f64,
    /// Absent when no crack was accepted
    pub largest: Option<LargestCrack>,
}

/// Headline numbers for the largest crack.
///
/// Width statistics come from the instance with the largest polygon area,
/// while `orientation` and `region_area` come from the labeled component of
/// the cleaned mask with the most pixels. The two can refer to different
/// cracks when cleanup merged or split regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LargestCrack {
    pub index: usize,
    pub region_area: u32,
    pub angle: f64,
    pub orientation: Orientation,
    pub max_length: f64,
    pub max_width: f64,
    pub min_width: f64,
    pub mean_width: f64,
    pub length_to_max_width_ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HoleMetrics {
    pub circularities: Vec<f64>,
    pub mean_circularity: f64,
}

/// Everything one `detect` call produces. Owned entirely by the caller.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub kind: DefectKind,
    pub summary: AggregatedMetrics,
    pub instances: Vec<ShapeInstance>,
    pub grayscale: GrayImage,
    pub binary_mask: GrayImage,
    pub overlay: RgbImage,
}

impl AnalysisResult {
    /// Well-formed result with no instances; rasters echo the input image.
    pub fn empty(kind: DefectKind, image: &DynamicImage) -> Self {
        let grayscale = image.to_luma8();
        Self {
            kind,
            summary: crate::algorithms::aggregate(kind, &[], None),
            instances: Vec::new(),
            binary_mask: grayscale.clone(),
            grayscale,
            overlay: image.to_rgb8(),
        }
    }

    pub fn image_dimensions(&self) -> (u32, u32) {
        self.overlay.dimensions()
    }

    /// Raster-free view of the result, suitable for JSON output
    pub fn report(&self) -> AnalysisReport {
        let (image_width, image_height) = self.image_dimensions();
        AnalysisReport {
            kind: self.kind,
            image_width,
            image_height,
            summary: self.summary.clone(),
            instances: self
                .instances
                .iter()
                .enumerate()
                .map(|(id, instance)| InstanceReport::new(id, instance))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub kind: DefectKind,
    pub image_width: u32,
    pub image_height: u32,
    pub summary: AggregatedMetrics,
    pub instances: Vec<InstanceReport>,
}

/// Scalar attributes of one instance, without its boundary points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InstanceReport {
    pub id: usize,
    pub area: f64,
    pub perimeter: f64,
    pub solidity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<WidthStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circularity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    pub point_count: usize,
}

impl InstanceReport {
    fn new(id: usize, instance: &ShapeInstance) -> Self {
        Self {
            id,
            area: instance.area,
            perimeter: instance.perimeter,
            solidity: instance.solidity,
            width: instance.width,
            length: instance.length,
            circularity: instance.circularity,
            orientation: instance.orientation,
            point_count: instance.contour.len(),
        }
    }
}
