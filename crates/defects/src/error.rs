use thiserror::Error;

#[derive(Error, Debug)]
pub enum DefectError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Failed to decode image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

impl DefectError {
    /// True for failures caused by the caller's parameter set.
    pub fn is_parameter_error(&self) -> bool {
        matches!(self, Self::InvalidParameters(_))
    }

    /// True for failures caused by the input raster itself.
    pub fn is_image_error(&self) -> bool {
        matches!(self, Self::InvalidImage(_) | Self::ImageLoad(_))
    }
}

pub type Result<T> = std::result::Result<T, DefectError>;
