use image::{DynamicImage, GrayImage};
use crate::{
    error::Result,
    kind::DefectKind,
    types::{AnalysisResult, Contour, DetectionParameters},
};

/// Trait for grayscale-to-grayscale preprocessing (contrast, smoothing)
pub trait ImagePreprocessor: Send + Sync {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for turning a grayscale image into a 0/255 foreground mask
pub trait Binarizer: Send + Sync {
    /// Defects are foreground (255) in the returned mask
    fn binarize(&self, image: &GrayImage, threshold: u8) -> GrayImage;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract external boundaries from a binary mask
    fn extract_contours(&self, mask: &GrayImage) -> Result<Vec<Contour>>;
}

/// Trait for accept/reject tests applied to each extracted contour
pub trait ShapeFilter: Send + Sync {
    fn accepts(&self, contour: &Contour, params: &DetectionParameters) -> bool;
}

/// One defect class: image and parameters in, measured shapes out.
pub trait ShapeDetector: Send + Sync {
    fn kind(&self) -> DefectKind;

    /// Run the full pipeline.
    ///
    /// Parameter problems are returned as errors before any pixel work.
    /// An empty image yields an empty result rather than an error.
    fn detect(&self, image: &DynamicImage, params: &DetectionParameters) -> Result<AnalysisResult>;
}
