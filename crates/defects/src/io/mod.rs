pub mod geojson;

pub use self::geojson::contours_from_geojson;
