use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use serde_json::{Map, Number, Value as JsonValue};
use crate::{
    error::{DefectError, Result},
    types::{AnalysisResult, Contour},
};

/// Closed exterior ring in pixel coordinates
fn ring(points: &[[i32; 2]]) -> Vec<Vec<f64>> {
    let mut ring: Vec<Vec<f64>> = points
        .iter()
        .map(|&[x, y]| vec![f64::from(x), f64::from(y)])
        .collect();
    if let Some(first) = ring.first().cloned() {
        if ring.last() != Some(&first) {
            ring.push(first);
        }
    }
    ring
}

impl AnalysisResult {
    /// One Polygon feature per instance, metrics as properties.
    ///
    /// Image size, instance count and defect kind are stored as foreign
    /// members of the collection.
    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .report()
            .instances
            .into_iter()
            .zip(&self.instances)
            .map(|(report, instance)| {
                let geometry = Geometry::new(Value::Polygon(vec![ring(&instance.contour.points)]));

                let properties = match serde_json::to_value(&report) {
                    Ok(JsonValue::Object(map)) => map,
                    _ => Map::new(),
                };

                Feature {
                    bbox: None,
                    geometry: Some(geometry),
                    id: Some(geojson::feature::Id::Number(Number::from(report.id))),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let (image_width, image_height) = self.image_dimensions();
        let mut foreign_members = Map::new();
        foreign_members.insert("image_width".to_string(), JsonValue::from(image_width));
        foreign_members.insert("image_height".to_string(), JsonValue::from(image_height));
        foreign_members.insert("shape_count".to_string(), JsonValue::from(self.instances.len()));
        foreign_members.insert("kind".to_string(), JsonValue::from(self.kind.to_string()));

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        }
    }

    /// Export to GeoJSON and serialize to a pretty-printed JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }
}

/// Read the instance boundaries back out of an exported collection.
///
/// The closing point of each ring is dropped again.
pub fn contours_from_geojson(geojson_str: &str) -> Result<Vec<Contour>> {
    let collection = match geojson_str.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => {
            return Err(DefectError::InvalidParameters(
                "expected a GeoJSON FeatureCollection".to_string(),
            ))
        }
    };

    collection
        .features
        .iter()
        .map(|feature| {
            let Some(Geometry { value: Value::Polygon(rings), .. }) = &feature.geometry else {
                return Err(DefectError::InvalidParameters(
                    "feature without polygon geometry".to_string(),
                ));
            };
            let mut points: Vec<[i32; 2]> = rings
                .first()
                .map(|exterior| {
                    exterior
                        .iter()
                        .filter(|position| position.len() >= 2)
                        .map(|position| [position[0].round() as i32, position[1].round() as i32])
                        .collect()
                })
                .unwrap_or_default();
            if points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            Ok(Contour::new(points))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::aggregate, kind::DefectKind, types::ShapeInstance};
    use image::{GrayImage, RgbImage};

    fn create_test_result() -> AnalysisResult {
        let contour = Contour::new(vec![[10, 10], [10, 30], [30, 30], [30, 10]]);
        let instance = ShapeInstance {
            area: contour.area(),
            perimeter: contour.perimeter(),
            solidity: contour.solidity(),
            width: None,
            length: None,
            circularity: Some(0.785),
            orientation: None,
            simplified: contour.points.clone(),
            contour,
        };
        let instances = vec![instance];
        AnalysisResult {
            kind: DefectKind::Hole,
            summary: aggregate(DefectKind::Hole, &instances, None),
            instances,
            grayscale: GrayImage::new(64, 48),
            binary_mask: GrayImage::new(64, 48),
            overlay: RgbImage::new(64, 48),
        }
    }

    #[test]
    fn test_geojson_export() {
        let collection = create_test_result().to_geojson();
        assert_eq!(collection.features.len(), 1);

        let members = collection.foreign_members.as_ref().expect("foreign members");
        assert_eq!(members["image_width"], 64);
        assert_eq!(members["image_height"], 48);
        assert_eq!(members["shape_count"], 1);
        assert_eq!(members["kind"], "hole");

        let feature = &collection.features[0];
        let properties = feature.properties.as_ref().expect("properties");
        assert_eq!(properties["area"], 400.0);
        assert_eq!(properties["circularity"], 0.785);
        assert!(properties.get("width").is_none());

        match &feature.geometry.as_ref().expect("geometry").value {
            Value::Polygon(rings) => {
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0].first(), rings[0].last());
            }
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_geojson_string_reads_back() {
        let result = create_test_result();
        let text = result.to_geojson_string().expect("serialize");
        let contours = contours_from_geojson(&text).expect("parse");
        assert_eq!(contours, vec![result.instances[0].contour.clone()]);
    }

    #[test]
    fn test_rejects_non_collection() {
        let point = r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#;
        assert!(contours_from_geojson(point).is_err());
        assert!(contours_from_geojson("{").is_err());
    }
}
