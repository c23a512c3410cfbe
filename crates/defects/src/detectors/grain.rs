use image::DynamicImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::{
    algorithms::{
        AreaFilter, ExternalContourExtractor, InverseThreshold, MedianBlurPreprocessor,
        MetricsEngine, MorphologicalCleaner, OverlayRenderer, StructuringElement, BLUE,
    },
    detectors::{run, Stages},
    error::Result,
    kind::DefectKind,
    pipeline::Pipeline,
    traits::ShapeDetector,
    types::{AnalysisResult, DetectionParameters},
};

/// Mineral grains; only the size distribution is reported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GrainDetector {
    pub median: MedianBlurPreprocessor,
    pub cleaner: MorphologicalCleaner,
    pub metrics: MetricsEngine,
    pub overlay: OverlayRenderer,
}

impl Default for GrainDetector {
    fn default() -> Self {
        Self {
            median: MedianBlurPreprocessor::default(),
            // opening only
            cleaner: MorphologicalCleaner {
                element: StructuringElement::rect(3, 3),
                open_iterations: 1,
                close_iterations: 0,
                component_area_ratio: None,
            },
            metrics: MetricsEngine::default(),
            overlay: OverlayRenderer {
                outline_color: BLUE,
                polyline_color: None,
                thickness: 1,
            },
        }
    }
}

impl GrainDetector {
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::builder()
            .add_preprocessor(self.median.clone())
            .set_binarizer(InverseThreshold)
            .set_cleaner(self.cleaner.clone())
            .set_contour_extractor(ExternalContourExtractor)
            .add_filter(AreaFilter)
            .build()
    }
}

impl ShapeDetector for GrainDetector {
    fn kind(&self) -> DefectKind {
        DefectKind::Grain
    }

    fn detect(&self, image: &DynamicImage, params: &DetectionParameters) -> Result<AnalysisResult> {
        let stages = Stages {
            kind: self.kind(),
            pipeline: self.pipeline(),
            metrics: &self.metrics,
            overlay: &self.overlay,
            label_regions: false,
        };
        run(stages, image, params)
    }
}
