use image::DynamicImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::{
    algorithms::{
        AreaFilter, ExternalContourExtractor, GaussianBlurPreprocessor, InverseThreshold,
        MetricsEngine, MorphologicalCleaner, OverlayRenderer,
    },
    detectors::{run, Stages},
    error::Result,
    kind::DefectKind,
    pipeline::Pipeline,
    traits::ShapeDetector,
    types::{AnalysisResult, DetectionParameters},
};

/// Dark voids, measured by area and circularity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HoleDetector {
    pub blur: GaussianBlurPreprocessor,
    pub cleaner: MorphologicalCleaner,
    pub metrics: MetricsEngine,
    pub overlay: OverlayRenderer,
}

impl Default for HoleDetector {
    fn default() -> Self {
        Self {
            blur: GaussianBlurPreprocessor::default(),
            cleaner: MorphologicalCleaner::default(),
            metrics: MetricsEngine {
                circularity: true,
                ..MetricsEngine::default()
            },
            overlay: OverlayRenderer::default(),
        }
    }
}

impl HoleDetector {
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::builder()
            .add_preprocessor(self.blur.clone())
            .set_binarizer(InverseThreshold)
            .set_cleaner(self.cleaner.clone())
            .set_contour_extractor(ExternalContourExtractor)
            .add_filter(AreaFilter)
            .build()
    }
}

impl ShapeDetector for HoleDetector {
    fn kind(&self) -> DefectKind {
        DefectKind::Hole
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
