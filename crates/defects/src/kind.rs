use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    detectors::{CrackDetector, GrainDetector, HoleDetector},
    traits::ShapeDetector,
    types::DetectionParameters,
};

#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DefectKind {
    /// Thin, elongated surface cracks
    Crack,
    /// Voids and pores
    Hole,
    /// Mineral grains
    Grain,
}

impl DefectKind {
    /// Get a list of all kind names
    pub fn names() -> &'static [&'static str] {
        <Self as VariantNames>::VARIANTS
    }

    /// Get the JSON schema for the kind enum
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DefectKind)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Crack => "Adaptive + global binarization, solidity-gated contours, width/length/orientation metrics",
            Self::Hole => "Gaussian-smoothed global binarization, area-bounded contours, circularity metrics",
            Self::Grain => "Median-smoothed global binarization, area-bounded contours, size distribution",
        }
    }

    /// Parameter set the analysis service used when the caller supplied none
    pub fn default_parameters(&self) -> DetectionParameters {
        match self {
            Self::Crack => DetectionParameters {
                min_area: 1000.0,
                max_area: None,
                threshold: 100,
            },
            Self::Hole => DetectionParameters {
                min_area: 1.0,
                max_area: Some(1000.0),
                threshold: 100,
            },
            Self::Grain => DetectionParameters {
                min_area: 5.0,
                max_area: Some(5000.0),
                threshold: 120,
            },
        }
    }

    /// Detector for this kind with default tuning
    pub fn detector(&self) -> Box<dyn ShapeDetector> {
        match self {
            Self::Crack => Box::new(CrackDetector::default()),
            Self::Hole => Box::new(HoleDetector::default()),
            Self::Grain => Box::new(GrainDetector::default()),
        }
    }
}
