use image::DynamicImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::{
    algorithms::{
        AreaFilter, BilateralSmoother, ClaheEnhancer, DualThreshold, ExternalContourExtractor,
        MetricsEngine, MorphologicalCleaner, OverlayRenderer, SolidityFilter, StructuringElement,
        GREEN, RED,
    },
    detectors::{run, Stages},
    error::Result,
    kind::DefectKind,
    pipeline::Pipeline,
    traits::ShapeDetector,
    types::{AnalysisResult, DetectionParameters},
};

/// Thin, elongated dark features.
///
/// Contrast is equalized locally and smoothed edge-preserving before a union
/// of adaptive and global thresholds. Compact blobs are rejected by solidity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrackDetector {
    pub clahe: ClaheEnhancer,
    pub smoother: BilateralSmoother,
    pub binarizer: DualThreshold,
    pub cleaner: MorphologicalCleaner,
    pub solidity: SolidityFilter,
    pub metrics: MetricsEngine,
    pub overlay: OverlayRenderer,
}

impl Default for CrackDetector {
    fn default() -> Self {
        Self {
            clahe: ClaheEnhancer::default(),
            smoother: BilateralSmoother::default(),
            binarizer: DualThreshold::default(),
            cleaner: MorphologicalCleaner {
                element: StructuringElement::ellipse(5, 5),
                open_iterations: 1,
                close_iterations: 2,
                component_area_ratio: Some(0.1),
            },
            solidity: SolidityFilter::default(),
            metrics: MetricsEngine {
                width: true,
                length: true,
                orientation: true,
                ..MetricsEngine::default()
            },
            overlay: OverlayRenderer {
                outline_color: GREEN,
                polyline_color: Some(RED),
                thickness: 2,
            },
        }
    }
}

impl CrackDetector {
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::builder()
            .add_preprocessor(self.clahe.clone())
            .add_preprocessor(self.smoother.clone())
            .set_binarizer(self.binarizer.clone())
            .set_cleaner(self.cleaner.clone())
            .set_contour_extractor(ExternalContourExtractor)
            .add_filter(AreaFilter)
            .add_filter(self.solidity.clone())
            .build()
    }
}

impl ShapeDetector for CrackDetector {
    fn kind(&self) -> DefectKind {
        DefectKind::Crack
    }

    fn detect(&self, image: &DynamicImage, params: &DetectionParameters) -> Result<AnalysisResult> {
        let stages = Stages {
            kind: self.kind(),
            pipeline: self.pipeline(),
            metrics: &self.metrics,
            overlay: &self.overlay,
            label_regions: true,
        };
        run(stages, image, params)
    }
}
