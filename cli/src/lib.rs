use base64::{engine::general_purpose::STANDARD, Engine as _};
use defects::{AnalysisReport, AnalysisResult, ClassMetrics, DefectError, DefectKind, DetectionParameters};
use image::{DynamicImage, ImageFormat};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Bin count of the charted histograms
pub const HISTOGRAM_BINS: usize = 20;

#[derive(Error, Debug)]
pub enum CoreCliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    ImageError(#[from] image::ImageError),
    #[error(transparent)]
    DefectError(#[from] DefectError),
    #[error("Invalid max area '{0}': expected a number or 'inf'")]
    InvalidMaxArea(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Parse a max-area argument; `inf`, `infinity` and the empty string mean unbounded
pub fn parse_max_area(raw: &str) -> Result<Option<f64>, CoreCliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("inf")
        || trimmed.eq_ignore_ascii_case("infinity")
    {
        return Ok(None);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| CoreCliError::InvalidMaxArea(raw.to_string()))?;
    if value.is_nan() {
        return Err(CoreCliError::InvalidMaxArea(raw.to_string()));
    }
    Ok(value.is_finite().then_some(value))
}

/// Upper area bound as written in a job file: a number or a sentinel string
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum AreaBound {
    Limit(f64),
    Sentinel(String),
}

impl AreaBound {
    pub fn resolve(&self) -> Result<Option<f64>, CoreCliError> {
        match self {
            Self::Limit(value) if value.is_infinite() => Ok(None),
            Self::Limit(value) => Ok(Some(*value)),
            Self::Sentinel(text) => parse_max_area(text),
        }
    }
}

/// One image to analyze; unset parameters fall back to the kind's defaults
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchJob {
    pub name: String,
    pub image: String,
    pub kind: DefectKind,
    pub min_area: Option<f64>,
    pub max_area: Option<AreaBound>,
    pub threshold: Option<i32>,
}

impl BatchJob {
    pub fn parameters(&self) -> Result<DetectionParameters, CoreCliError> {
        let defaults = self.kind.default_parameters();
        let max_area = match &self.max_area {
            Some(bound) => bound.resolve()?,
            None => defaults.max_area,
        };
        Ok(DetectionParameters::new(
            self.min_area.unwrap_or(defaults.min_area),
            max_area,
            self.threshold.unwrap_or(defaults.threshold),
        )?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BatchConfig {
    pub output_dir: String,
    #[serde(default)]
    pub geojson: bool,
    #[serde(default)]
    pub embed_images: bool,
    pub jobs: Vec<BatchJob>,
}

impl BatchConfig {
    /// Load BatchConfig from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CoreCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CoreCliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load BatchConfig from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CoreCliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CoreCliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CoreCliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CoreCliError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, CoreCliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, CoreCliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram over the value range
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Histogram {
    pub label: String,
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    /// The last bin is closed on the right. A constant series gets the range `v ± 0.5`.
    pub fn from_values(label: &str, values: &[f64], bins: usize) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return Self { label: label.to_string(), bins: Vec::new() };
        }

        let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let step = (hi - lo) / bins as f64;

        let mut counts = vec![0usize; bins];
        for value in finite {
            let index = (((value - lo) / step) as usize).min(bins - 1);
            counts[index] += 1;
        }

        Self {
            label: label.to_string(),
            bins: counts
                .into_iter()
                .enumerate()
                .map(|(i, count)| HistogramBin {
                    start: lo + step * i as f64,
                    end: lo + step * (i + 1) as f64,
                    count,
                })
                .collect(),
        }
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).sum()
    }

    /// Text rendering, one bar per bin
    pub fn render(&self, width: usize) -> String {
        let peak = self.bins.iter().map(|bin| bin.count).max().unwrap_or(0).max(1);
        let mut out = format!("{}\n", self.label);
        for bin in &self.bins {
            let bar = "#".repeat(bin.count * width / peak);
            out.push_str(&format!("{:>10.2} - {:<10.2} | {:<width$} {}\n", bin.start, bin.end, bar, bin.count));
        }
        out
    }
}

/// The series the presentation layer charts for each kind
pub fn charted_values(report: &AnalysisReport) -> (&'static str, Vec<f64>) {
    match &report.summary.class {
        ClassMetrics::Crack(crack) => ("Crack width (px)", crack.widths.clone()),
        ClassMetrics::Hole(_) => ("Hole area (px²)", report.summary.areas.clone()),
        ClassMetrics::Grain => ("Grain area (px²)", report.summary.areas.clone()),
    }
}

/// Base64 of the PNG encoding of `image`
pub fn encode_png_base64(image: &DynamicImage) -> Result<String, CoreCliError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(STANDARD.encode(bytes))
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EmbeddedImages {
    pub grayscale: String,
    pub binary_mask: String,
    pub overlay: String,
}

impl EmbeddedImages {
    pub fn from_result(result: &AnalysisResult) -> Result<Self, CoreCliError> {
        Ok(Self {
            grayscale: encode_png_base64(&DynamicImage::ImageLuma8(result.grayscale.clone()))?,
            binary_mask: encode_png_base64(&DynamicImage::ImageLuma8(result.binary_mask.clone()))?,
            overlay: encode_png_base64(&DynamicImage::ImageRgb8(result.overlay.clone()))?,
        })
    }
}

/// What `report.json` holds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliReport {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub histogram: Histogram,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<EmbeddedImages>,
}

impl CliReport {
    pub fn new(result: &AnalysisResult, embed_images: bool) -> Result<Self, CoreCliError> {
        let report = result.report();
        let (label, values) = charted_values(&report);
        Ok(Self {
            histogram: Histogram::from_values(label, &values, HISTOGRAM_BINS),
            images: embed_images.then(|| EmbeddedImages::from_result(result)).transpose()?,
            report,
        })
    }
}

/// Write the rasters, `report.json` and optionally `shapes.geojson` into `dir`
pub fn save_outputs<P: AsRef<Path>>(
    result: &AnalysisResult,
    dir: P,
    geojson: bool,
    embed_images: bool,
) -> Result<CliReport, CoreCliError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    if result.image_dimensions() != (0, 0) {
        result.grayscale.save(dir.join("gray.png"))?;
        result.binary_mask.save(dir.join("binary.png"))?;
        result.overlay.save(dir.join("overlay.png"))?;
    }

    let report = CliReport::new(result, embed_images)?;
    fs::write(dir.join("report.json"), serde_json::to_string_pretty(&report)?)?;

    if geojson {
        fs::write(dir.join("shapes.geojson"), result.to_geojson_string()?)?;
    }
    Ok(report)
}
