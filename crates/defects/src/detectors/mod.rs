pub mod crack;
pub mod hole;
pub mod grain;

pub use crack::CrackDetector;
pub use hole::HoleDetector;
pub use grain::GrainDetector;

use image::DynamicImage;
use tracing::{debug, info, info_span, warn};
use crate::{
    algorithms::{aggregate, largest_region, MetricsEngine, OverlayRenderer},
    error::{DefectError, Result},
    kind::DefectKind,
    pipeline::Pipeline,
    types::{AnalysisResult, DetectionParameters, ShapeInstance},
};

/// Decode an encoded raster (PNG, JPEG, TIFF) held in memory
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Rejects rasters with no pixels
pub fn validate_image(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DefectError::InvalidImage(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// The stages a detector plugs into the shared run loop
pub(crate) struct Stages<'a> {
    pub kind: DefectKind,
    pub pipeline: Pipeline,
    pub metrics: &'a MetricsEngine,
    pub overlay: &'a OverlayRenderer,
    /// Feed the largest labeled region of the mask to the summary
    pub label_regions: bool,
}

pub(crate) fn run(
    stages: Stages<'_>,
    image: &DynamicImage,
    params: &DetectionParameters,
) -> Result<AnalysisResult> {
    params.validate()?;

    let span = info_span!("detect", kind = %stages.kind);
    let _enter = span.enter();

    if let Err(err) = validate_image(image) {
        warn!(error = %err, "returning empty result");
        return Ok(AnalysisResult::empty(stages.kind, image));
    }

    let grayscale = image.to_luma8();
    debug!(width = grayscale.width(), height = grayscale.height(), "{}", stages.pipeline.info());
    let segmentation = stages.pipeline.segment(&grayscale, params)?;

    let instances: Vec<ShapeInstance> = segmentation
        .accepted
        .into_iter()
        .map(|contour| stages.metrics.measure(contour))
        .collect();

    let region = if stages.label_regions && !instances.is_empty() {
        largest_region(&segmentation.mask)
    } else {
        None
    };
    let summary = aggregate(stages.kind, &instances, region.as_ref());
    let overlay = stages.overlay.render(image, &instances);

    info!(
        count = summary.count,
        candidates = segmentation.candidates,
        total_area = summary.total_area,
        "detection complete"
    );

    Ok(AnalysisResult {
        kind: stages.kind,
        summary,
        instances,
        grayscale,
        binary_mask: segmentation.mask,
        overlay,
    })
}
