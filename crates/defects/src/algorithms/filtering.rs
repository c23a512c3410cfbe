use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::{
    traits::ShapeFilter,
    types::{Contour, DetectionParameters},
};

/// Accepts contours whose polygon area lies in `[min_area, max_area]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AreaFilter;

impl ShapeFilter for AreaFilter {
    fn accepts(&self, contour: &Contour, params: &DetectionParameters) -> bool {
        params.area_in_bounds(contour.area())
    }
}

/// Accepts elongated or concave contours only.
///
/// Compact blobs have a solidity near 1; cracks sit well below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SolidityFilter {
    /// Exclusive upper bound on solidity
    pub max_solidity: f64,
}

impl Default for SolidityFilter {
    fn default() -> Self {
        Self { max_solidity: 0.7 }
    }
}

impl ShapeFilter for SolidityFilter {
    fn accepts(&self, contour: &Contour, _params: &DetectionParameters) -> bool {
        contour.solidity() < self.max_solidity
    }
}
