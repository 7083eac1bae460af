use serde::Serialize;

use crate::layer::{BoundingExtent, LayerKind};
use crate::serde_utils::serialize_as_json_string;

const MAP_DESCRIPTION: &str = "Description";
const MAP_PROJ4: &str = "+init=epsg:4326";
const MAP_UNITS: &str = "degree";

#[derive(Debug, Clone, Serialize)]
pub struct MapDescriptor {
    pub name: String,
    pub bounds: BoundingExtent,
    pub description: String,
    pub proj4: String,
    pub units: String,
}

impl MapDescriptor {
    pub fn new(name: impl Into<String>, bounds: BoundingExtent) -> Self {
        Self {
            name: name.into(),
            bounds,
            description: MAP_DESCRIPTION.to_string(),
            proj4: MAP_PROJ4.to_string(),
            units: MAP_UNITS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerSource {
    #[serde(rename = "type")]
    pub type_: String,
    pub src: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerDescriptor {
    pub mid: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(serialize_with = "serialize_as_json_string")]
    pub source: LayerSource,
}

impl LayerDescriptor {
    /// Describes `basename`, already uploaded into `folder`, as a layer of map `mid`.
    pub fn from_upload(mid: u64, basename: &str, folder: &str, kind: LayerKind) -> Self {
        Self {
            mid,
            name: basename.to_string(),
            kind,
            source: LayerSource {
                type_: "file".to_string(),
                src: format!("/{}/{}", folder, basename),
                name: basename.to_string(),
            },
        }
    }
}
