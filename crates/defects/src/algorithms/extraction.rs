use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::{error::Result, traits::ContourExtractor, types::Contour};

/// Imageproc-based extractor keeping only outermost boundaries.
///
/// Boundaries of holes, and of regions nested inside holes, are skipped.
/// Contours come out in raster order of their first boundary pixel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExternalContourExtractor;

impl ContourExtractor for ExternalContourExtractor {
    fn extract_contours(&self, mask: &GrayImage) -> Result<Vec<Contour>> {
        if mask.width() == 0 || mask.height() == 0 {
            return Ok(Vec::new());
        }

        let contours = find_contours::<i32>(mask)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .map(|contour| {
                Contour::new(contour.points.iter().map(|p| [p.x, p.y]).collect())
            })
            .collect();

        Ok(contours)
    }
}
