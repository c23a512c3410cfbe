//! # Rock-Core Defect Quantification
//!
//! Turns a photograph of a rock core into discrete defect instances (cracks,
//! holes or grains) with measured geometry, plus the intermediate rasters a
//! presentation layer needs.
//!
//! ## Core Features
//!
//! - **One detector interface**: [`ShapeDetector`] with crack, hole and grain implementations
//! - **Composable segmentation**: preprocess, binarize, clean, extract and filter stages
//!   assembled with [`PipelineBuilder`]
//! - **Shape metrics**: area, perimeter, solidity, distance-transform width, circularity and
//!   moment-based orientation
//! - **GeoJSON export**: accepted boundaries with their metrics as feature properties
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use defects::{DefectKind, ShapeDetector};
//!
//! let image = image::open("core.png")?;
//! let kind = DefectKind::Crack;
//! let result = kind.detector().detect(&image, &kind.default_parameters())?;
//!
//! println!("{} cracks, mean width {:.1}px", result.summary.count,
//!     result.summary.crack().map(|c| c.mean_width).unwrap_or_default());
//! result.overlay.save("overlay.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Tuning
//!
//! ```rust,no_run
//! use defects::{algorithms::*, CrackDetector, DetectionParameters, ShapeDetector};
//!
//! let detector = CrackDetector {
//!     solidity: SolidityFilter { max_solidity: 0.5 },
//!     cleaner: MorphologicalCleaner {
//!         close_iterations: 3,
//!         ..CrackDetector::default().cleaner
//!     },
//!     ..CrackDetector::default()
//! };
//! let params = DetectionParameters::new(500.0, None, 90)?;
//! let result = detector.detect(&image::open("core.png")?, &params)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod kind;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod detectors;
pub mod io;

#[cfg(test)]
mod test_utils;

// Re-exports for convenience
pub use error::{DefectError, Result};
pub use types::*;
pub use kind::DefectKind;
pub use traits::*;
pub use pipeline::{builder::PipelineBuilder, Pipeline, Segmentation};
pub use detectors::{decode_image, validate_image, CrackDetector, GrainDetector, HoleDetector};
pub use io::contours_from_geojson;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use strum::IntoEnumIterator;

    fn params(min_area: f64, max_area: Option<f64>, threshold: i32) -> DetectionParameters {
        DetectionParameters::new(min_area, max_area, threshold).expect("valid parameters")
    }

    #[test]
    fn test_uniform_image_has_no_instances() {
        let image = uniform_image(80, 60, 200);
        for kind in DefectKind::iter() {
            let result = kind.detector().detect(&image, &kind.default_parameters()).expect("detect");
            assert_eq!(result.summary.count, 0, "{kind}");
            assert_eq!(result.summary.total_area, 0.0);
            assert_eq!(result.summary.mean_area, 0.0);
            assert!(result.instances.is_empty());
            assert_eq!(result.binary_mask.dimensions(), (80, 60));
            assert!(result.binary_mask.pixels().all(|p| p[0] == 0));
            if let Some(crack) = result.summary.crack() {
                assert!(crack.largest.is_none());
                assert!(crack.widths.is_empty());
            }
        }
    }

    #[test]
    fn test_empty_image_returns_empty_result() {
        let image = image::DynamicImage::new_rgb8(0, 0);
        for kind in DefectKind::iter() {
            let result = kind.detector().detect(&image, &kind.default_parameters()).expect("detect");
            assert_eq!(result.summary.count, 0);
            assert_eq!(result.image_dimensions(), (0, 0));
        }
    }

    #[test]
    fn test_invalid_parameters_fail_before_processing() {
        let image = l_crack_image();
        let bad = [
            DetectionParameters { min_area: 10.0, max_area: None, threshold: 300 },
            DetectionParameters { min_area: 10.0, max_area: None, threshold: -1 },
            DetectionParameters { min_area: 0.5, max_area: None, threshold: 100 },
            DetectionParameters { min_area: 100.0, max_area: Some(10.0), threshold: 100 },
        ];
        for kind in DefectKind::iter() {
            for params in &bad {
                let err = kind.detector().detect(&image, params).unwrap_err();
                assert!(err.is_parameter_error(), "{kind}: {params:?}");
            }
        }
    }

    #[test]
    fn test_concave_crack_is_accepted() {
        let result = CrackDetector::default()
            .detect(&l_crack_image(), &params(1000.0, None, 100))
            .expect("detect");

        assert_eq!(result.summary.count, 1);
        let instance = &result.instances[0];
        assert!(instance.solidity < 0.7, "solidity {}", instance.solidity);
        assert!(instance.area >= 1000.0);

        let crack = result.summary.crack().expect("crack metrics");
        assert_eq!(crack.widths.len(), result.summary.count);
        assert_eq!(crack.lengths.len(), result.summary.count);

        let largest = crack.largest.as_ref().expect("largest crack");
        // The long leg runs along x, across the row axis
        assert!(largest.angle.abs() > 1.2, "angle {}", largest.angle);
        assert_eq!(largest.orientation, Orientation::Vertical);
        assert!(
            largest.max_width >= 8.0 && largest.max_width <= 16.0,
            "max width {}",
            largest.max_width
        );
        assert!(largest.length_to_max_width_ratio > 0.0);
        assert_eq!(largest.max_length, crack.lengths[0]);
    }

    #[test]
    fn test_crack_lists_follow_instances() {
        let result = CrackDetector::default()
            .detect(&two_l_cracks_image(), &params(1000.0, None, 100))
            .expect("detect");

        assert_eq!(result.summary.count, 2);
        let crack = result.summary.crack().expect("crack metrics");
        assert_eq!(crack.widths.len(), 2);
        assert_eq!(crack.lengths.len(), 2);
        assert!(crack.widths.iter().all(|&w| w >= 8.0 && w <= 16.0), "widths {:?}", crack.widths);

        // Raster order puts the upper, smaller crack first
        let (upper, lower) = (&result.instances[0], &result.instances[1]);
        assert!(lower.area > upper.area);

        let largest = crack.largest.as_ref().expect("largest crack");
        assert_eq!(largest.index, 1);
        assert_eq!(largest.max_width, crack.widths[1]);
        assert_eq!(largest.max_length, crack.lengths.iter().copied().fold(0.0, f64::max));
        assert!(largest.region_area > 2000, "region area {}", largest.region_area);
        assert_eq!(largest.orientation, Orientation::Vertical);
    }

    #[test]
    fn test_compact_blob_is_not_a_crack() {
        let result = CrackDetector::default()
            .detect(&square_blob_image(), &params(100.0, None, 100))
            .expect("detect");
        assert_eq!(result.summary.count, 0);
        // The blob survives segmentation; only the solidity gate drops it
        assert!(result.binary_mask.get_pixel(60, 60)[0] != 0);
    }

    #[test]
    fn test_hole_circularity_separates_disk_from_square() {
        let result = HoleDetector::default()
            .detect(&square_and_disk_image(), &params(1.0, Some(10000.0), 100))
            .expect("detect");
        assert_eq!(result.summary.count, 2);

        let hole = result.summary.hole().expect("hole metrics");
        // Raster order: the square's top edge comes first
        let square = hole.circularities[0];
        let disk = hole.circularities[1];
        assert!(disk > 0.86, "disk circularity {disk}");
        assert!(square > 0.7 && square < 0.85, "square circularity {square}");
        assert!((hole.mean_circularity - (square + disk) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_accepted_areas_respect_bounds() {
        let image = square_and_disk_image();
        let bounds = params(1.0, Some(10000.0), 100);
        for kind in DefectKind::iter() {
            let result = kind.detector().detect(&image, &bounds).expect("detect");
            let pixels = f64::from(image.width() * image.height());
            for instance in &result.instances {
                assert!(bounds.area_in_bounds(instance.area));
                assert!(instance.area >= 0.0 && instance.area <= pixels);
            }
            assert_eq!(result.summary.areas.len(), result.summary.count);
        }
    }

    #[test]
    fn test_raising_min_area_never_adds_instances() {
        let image = small_and_large_holes_image();
        let detector = HoleDetector::default();
        let loose = detector.detect(&image, &params(1.0, None, 100)).expect("detect");
        let strict = detector.detect(&image, &params(200.0, None, 100)).expect("detect");
        assert_eq!(loose.summary.count, 2);
        assert_eq!(strict.summary.count, 1);
        assert!(strict.summary.count <= loose.summary.count);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let image = l_crack_image();
        let detector = CrackDetector::default();
        let params = params(1000.0, None, 100);
        let first = detector.detect(&image, &params).expect("detect");
        let second = detector.detect(&image, &params).expect("detect");
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.instances, second.instances);
        assert_eq!(first.binary_mask, second.binary_mask);
        assert_eq!(first.overlay, second.overlay);
    }

    #[test]
    fn test_grain_count() {
        let result = GrainDetector::default()
            .detect(&grains_image(), &params(5.0, Some(5000.0), 120))
            .expect("detect");
        assert_eq!(result.summary.count, 4);
        assert!(result.summary.areas.iter().all(|&a| a > 25.0 && a <= 100.0));
        assert!(result.instances.iter().all(|i| i.width.is_none() && i.circularity.is_none()));
    }

    #[test]
    fn test_source_image_is_left_untouched() {
        let image = square_and_disk_image();
        let before = image.clone();
        let result = HoleDetector::default()
            .detect(&image, &params(1.0, Some(10000.0), 100))
            .expect("detect");
        assert_eq!(image, before);
        assert_ne!(result.overlay, before.to_rgb8());
        assert_eq!(result.grayscale, before.to_luma8());
    }

    #[test]
    fn test_report_serializes() {
        let result = HoleDetector::default()
            .detect(&small_and_large_holes_image(), &params(1.0, None, 100))
            .expect("detect");
        let json = serde_json::to_value(result.report()).expect("serialize");
        assert_eq!(json["kind"], "hole");
        assert_eq!(json["summary"]["count"], 2);
        assert_eq!(json["summary"]["class"]["kind"], "hole");
        assert_eq!(json["instances"].as_array().map(Vec::len), Some(2));
    }
}
