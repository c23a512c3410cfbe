pub mod builder;

use image::GrayImage;
use tracing::debug;
use crate::{
    algorithms::MorphologicalCleaner,
    error::Result,
    traits::{Binarizer, ContourExtractor, ImagePreprocessor, ShapeFilter},
    types::{Contour, DetectionParameters},
};

/// Output of the segmentation half of a detector
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Cleaned binary mask the contours were taken from
    pub mask: GrayImage,
    /// Contours that passed every filter, in extraction order
    pub accepted: Vec<Contour>,
    /// Number of contours before filtering
    pub candidates: usize,
}

/// Preprocess → binarize → clean → extract → filter
pub struct Pipeline {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    binarizer: Box<dyn Binarizer>,
    cleaner: MorphologicalCleaner,
    contour_extractor: Box<dyn ContourExtractor>,
    filters: Vec<Box<dyn ShapeFilter>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        binarizer: Box<dyn Binarizer>,
        cleaner: MorphologicalCleaner,
        contour_extractor: Box<dyn ContourExtractor>,
        filters: Vec<Box<dyn ShapeFilter>>,
    ) -> Self {
        Self {
            preprocessors,
            binarizer,
            cleaner,
            contour_extractor,
            filters,
        }
    }

    /// Run the segmentation stages on an already converted grayscale image
    pub fn segment(&self, gray: &GrayImage, params: &DetectionParameters) -> Result<Segmentation> {
        let mut current = gray.clone();
        for preprocessor in &self.preprocessors {
            current = preprocessor.preprocess(&current)?;
        }

        let binary = self.binarizer.binarize(&current, params.threshold_u8());
        let mask = self.cleaner.clean(&binary, params);

        let contours = self.contour_extractor.extract_contours(&mask)?;
        let candidates = contours.len();
        let accepted: Vec<Contour> = contours
            .into_iter()
            .filter(|contour| self.filters.iter().all(|filter| filter.accepts(contour, params)))
            .collect();

        debug!(
            foreground = mask.pixels().filter(|p| p[0] != 0).count(),
            candidates,
            accepted = accepted.len(),
            "segmentation finished"
        );

        Ok(Segmentation {
            mask,
            accepted,
            candidates,
        })
    }

    /// Get pipeline information
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} preprocessors, {} filters",
            self.preprocessors.len(),
            self.filters.len()
        )
    }
}
