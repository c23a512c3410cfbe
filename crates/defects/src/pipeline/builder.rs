use crate::{
    algorithms::{AreaFilter, ExternalContourExtractor, InverseThreshold, MorphologicalCleaner},
    pipeline::Pipeline,
    traits::{Binarizer, ContourExtractor, ImagePreprocessor, ShapeFilter},
};

/// Builder for segmentation pipelines with a fluent API.
///
/// Unset stages default to inverse global thresholding, a 3×3 elliptical
/// open/close, external contour extraction and the area filter.
pub struct PipelineBuilder {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    binarizer: Option<Box<dyn Binarizer>>,
    cleaner: Option<MorphologicalCleaner>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    filters: Vec<Box<dyn ShapeFilter>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            binarizer: None,
            cleaner: None,
            contour_extractor: None,
            filters: Vec::new(),
        }
    }

    /// Add a preprocessor; preprocessors run in insertion order
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the binarizer (replaces any existing one)
    pub fn set_binarizer<B>(mut self, binarizer: B) -> Self
    where
        B: Binarizer + 'static,
    {
        self.binarizer = Some(Box::new(binarizer));
        self
    }

    pub fn set_cleaner(mut self, cleaner: MorphologicalCleaner) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Add a shape filter; a contour must pass all of them
    pub fn add_filter<F>(mut self, filter: F) -> Self
    where
        F: ShapeFilter + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let binarizer = self.binarizer.unwrap_or_else(|| Box::new(InverseThreshold));
        let contour_extractor = self
            .contour_extractor
            .unwrap_or_else(|| Box::new(ExternalContourExtractor));
        let mut filters = self.filters;
        if filters.is_empty() {
            filters.push(Box::new(AreaFilter));
        }

        Pipeline::new(
            self.preprocessors,
            binarizer,
            self.cleaner.unwrap_or_default(),
            contour_extractor,
            filters,
        )
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
