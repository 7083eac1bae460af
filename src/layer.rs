use std::{fmt::Display, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PublishError;

/// Axis-aligned bounds in EPSG:4326.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingExtent {
    pub const WORLD: BoundingExtent = BoundingExtent {
        x_min: -180.0,
        x_max: 180.0,
        y_min: -90.0,
        y_max: 90.0,
    };

    pub fn union(&self, other: &BoundingExtent) -> BoundingExtent {
        BoundingExtent {
            x_min: self.x_min.min(other.x_min),
            x_max: self.x_max.max(other.x_max),
            y_min: self.y_min.min(other.y_min),
            y_max: self.y_max.max(other.y_max),
        }
    }

    fn include(&mut self, x: f64, y: f64) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
    }

    fn point(x: f64, y: f64) -> BoundingExtent {
        BoundingExtent {
            x_min: x,
            x_max: x,
            y_min: y,
            y_max: y,
        }
    }
}

impl FromStr for BoundingExtent {
    type Err = String;

    /// Parses `x_min,x_max,y_min,y_max`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid extent '{}': {}", s, e))?;

        let &[x_min, x_max, y_min, y_max] = values.as_slice() else {
            return Err(format!(
                "extent '{}' must have four values: x_min,x_max,y_min,y_max",
                s
            ));
        };

        if values.iter().any(|v| !v.is_finite()) {
            return Err(format!("extent '{}' must only contain finite numbers", s));
        }

        if x_min > x_max || y_min > y_max {
            return Err(format!("extent '{}' has a minimum above its maximum", s));
        }

        Ok(BoundingExtent {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Point,
    Line,
    Polygon,
    Raster,
}

impl Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Point => write!(f, "point"),
            LayerKind::Line => write!(f, "line"),
            LayerKind::Polygon => write!(f, "polygon"),
            LayerKind::Raster => write!(f, "raster"),
        }
    }
}

impl FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "point" => Ok(LayerKind::Point),
            "line" => Ok(LayerKind::Line),
            "polygon" => Ok(LayerKind::Polygon),
            "raster" => Ok(LayerKind::Raster),
            other => Err(format!(
                "unsupported layer type '{}', expected point, line, polygon or raster",
                other
            )),
        }
    }
}

/// Answers geometry questions about a dataset on disk.
pub trait LayerInspector {
    /// Extent in EPSG:4326, or `None` when it cannot be determined.
    fn extent(&self, path: &Path) -> Result<Option<BoundingExtent>, PublishError>;

    fn kind(&self, path: &Path) -> Result<LayerKind, PublishError>;
}

const RASTER_EXTENSIONS: &[&str] = &["tif", "tiff", "ecw", "img", "jp2", "jpg", "png", "pdf"];
const GEOJSON_EXTENSIONS: &[&str] = &["json", "geojson"];

/// Inspector working from file extensions and GeoJSON content.
///
/// Formats it cannot read (shapefiles, MapInfo, KML, GPX) fall back to
/// `default_kind` and an unknown extent.
#[derive(Debug, Clone)]
pub struct FileInspector {
    default_kind: LayerKind,
}

impl FileInspector {
    pub fn new(default_kind: LayerKind) -> Self {
        Self { default_kind }
    }

    fn read_geojson(path: &Path) -> Result<Value, PublishError> {
        let content = fs::read_to_string(path).map_err(|e| PublishError::inspection(path, e))?;
        serde_json::from_str(&content).map_err(|e| PublishError::inspection(path, e))
    }
}

impl Default for FileInspector {
    fn default() -> Self {
        Self::new(LayerKind::Polygon)
    }
}

fn extension_in(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| set.contains(&ext))
}

impl LayerInspector for FileInspector {
    fn extent(&self, path: &Path) -> Result<Option<BoundingExtent>, PublishError> {
        if extension_in(path, GEOJSON_EXTENSIONS) {
            let document = Self::read_geojson(path)?;
            Ok(geojson_extent(&document))
        } else {
            Ok(None)
        }
    }

    fn kind(&self, path: &Path) -> Result<LayerKind, PublishError> {
        if extension_in(path, RASTER_EXTENSIONS) {
            return Ok(LayerKind::Raster);
        }
        if !extension_in(path, GEOJSON_EXTENSIONS) {
            return Ok(self.default_kind);
        }

        let document = Self::read_geojson(path)?;
        let geometry_type = first_geometry_type(&document).unwrap_or("None");
        match geometry_type {
            "Point" | "MultiPoint" => Ok(LayerKind::Point),
            "LineString" | "MultiLineString" => Ok(LayerKind::Line),
            "Polygon" | "MultiPolygon" => Ok(LayerKind::Polygon),
            other => Err(PublishError::UnsupportedGeometry {
                path: path.to_path_buf(),
                geometry: other.to_string(),
            }),
        }
    }
}

fn geometries(document: &Value) -> Vec<&Value> {
    match document.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => document
            .get("features")
            .and_then(Value::as_array)
            .map(|features| {
                features
                    .iter()
                    .filter_map(|f| f.get("geometry"))
                    .filter(|g| !g.is_null())
                    .collect()
            })
            .unwrap_or_default(),
        Some("Feature") => document
            .get("geometry")
            .filter(|g| !g.is_null())
            .into_iter()
            .collect(),
        Some(_) => vec![document],
        None => Vec::new(),
    }
}

fn first_geometry_type(document: &Value) -> Option<&str> {
    geometries(document)
        .first()
        .copied()
        .and_then(|g| g.get("type"))
        .and_then(Value::as_str)
}

fn collect_positions(coordinates: &Value, extent: &mut Option<BoundingExtent>) {
    let Some(items) = coordinates.as_array() else {
        return;
    };

    match (items.first().and_then(Value::as_f64), items.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => {
            *extent = Some(match *extent {
                Some(mut current) => {
                    current.include(x, y);
                    current
                }
                None => BoundingExtent::point(x, y),
            });
        }
        _ => {
            for item in items {
                collect_positions(item, extent);
            }
        }
    }
}

fn collect_geometry(geometry: &Value, extent: &mut Option<BoundingExtent>) {
    if let Some(children) = geometry.get("geometries").and_then(Value::as_array) {
        for child in children {
            collect_geometry(child, extent);
        }
    } else if let Some(coordinates) = geometry.get("coordinates") {
        collect_positions(coordinates, extent);
    }
}

/// Bounds of every position in a GeoJSON document.
pub fn geojson_extent(document: &Value) -> Option<BoundingExtent> {
    let mut extent = None;
    for geometry in geometries(document) {
        collect_geometry(geometry, &mut extent);
    }
    extent
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_union_covers_both_extents() {
        let melbourne = BoundingExtent {
            x_min: 144.5,
            x_max: 145.5,
            y_min: -38.5,
            y_max: -37.5,
        };
        let sydney = BoundingExtent {
            x_min: 150.5,
            x_max: 151.5,
            y_min: -34.2,
            y_max: -33.5,
        };

        let both = melbourne.union(&sydney);
        assert_eq!(
            both,
            BoundingExtent {
                x_min: 144.5,
                x_max: 151.5,
                y_min: -38.5,
                y_max: -33.5,
            }
        );
        assert_eq!(both.union(&BoundingExtent::WORLD), BoundingExtent::WORLD);
    }

    #[test]
    fn test_parse_extent() {
        let extent: BoundingExtent = "140.9, 150.0, -39.2, -33.9".parse().unwrap();
        assert_eq!(extent.x_min, 140.9);
        assert_eq!(extent.y_max, -33.9);

        assert!("1,2,3".parse::<BoundingExtent>().is_err());
        assert!("1,2,3,east".parse::<BoundingExtent>().is_err());
        assert!("10,0,0,10".parse::<BoundingExtent>().is_err());

        for extent in ["NaN,1,0,1", "0,inf,0,1", "-inf,1,0,1", "0,1,nan,NaN"] {
            assert!(
                extent.parse::<BoundingExtent>().is_err(),
                "{:?} should be rejected",
                extent
            );
        }
    }

    #[test]
    fn test_layer_kind_names() {
        assert_eq!("Polygon".parse::<LayerKind>(), Ok(LayerKind::Polygon));
        assert_eq!(LayerKind::Line.to_string(), "line");
        assert_eq!(serde_json::to_value(LayerKind::Raster).unwrap(), "raster");
        let err = "multipoint".parse::<LayerKind>().unwrap_err();
        assert!(err.contains("'multipoint'"), "{}", err);
    }

    #[test]
    fn test_geojson_extent_over_feature_collection() {
        let document = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [144.96, -37.81]}},
                {"type": "Feature", "geometry": null},
                {"type": "Feature", "geometry": {
                    "type": "LineString",
                    "coordinates": [[145.0, -38.0], [146.5, -36.2]]
                }}
            ]
        });

        assert_eq!(
            geojson_extent(&document),
            Some(BoundingExtent {
                x_min: 144.96,
                x_max: 146.5,
                y_min: -38.0,
                y_max: -36.2,
            })
        );
    }

    #[test]
    fn test_geojson_extent_of_empty_collection() {
        let document = json!({"type": "FeatureCollection", "features": []});
        assert_eq!(geojson_extent(&document), None);
    }

    #[test]
    fn test_file_inspector_classifies_datasets() {
        let dir = tempdir().unwrap();
        let parks = dir.path().join("parks.geojson");
        fs::write(
            &parks,
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[0.0, 0.0], [1.0, 0.0], [1.0, 2.0], [0.0, 0.0]]]]
                }
            })
            .to_string(),
        )
        .unwrap();
        let stops = dir.path().join("stops.json");
        fs::write(
            &stops,
            json!({"type": "GeometryCollection", "geometries": [
                {"type": "Point", "coordinates": [3.0, 4.0]}
            ]})
            .to_string(),
        )
        .unwrap();

        let inspector = FileInspector::new(LayerKind::Line);

        assert_eq!(inspector.kind(&parks).unwrap(), LayerKind::Polygon);
        assert_eq!(
            inspector.extent(&parks).unwrap(),
            Some(BoundingExtent {
                x_min: 0.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 2.0,
            })
        );
        assert_eq!(
            inspector.kind(Path::new("/d/scan.tif")).unwrap(),
            LayerKind::Raster
        );
        assert_eq!(
            inspector.kind(Path::new("/d/roads.shp")).unwrap(),
            LayerKind::Line
        );
        assert_eq!(inspector.extent(Path::new("/d/roads.shp")).unwrap(), None);

        let err = inspector.kind(&stops).unwrap_err();
        assert!(matches!(
            err,
            PublishError::UnsupportedGeometry { ref geometry, .. } if geometry == "GeometryCollection"
        ));
    }
}
