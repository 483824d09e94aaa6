use crate::error::BotError;
use crate::geocode::GeoPoint;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use stac::Item;
use std::fmt;

const COPOL_BANDS: [&str; 2] = ["VV", "HH"];
const CROSSPOL_BANDS: [&str; 2] = ["VH", "HV"];

/// One Sentinel-1 catalog entry, decoded from a STAC item after selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: String,
    pub collection: String,
    pub acquired: DateTime<Utc>,
    /// Outer footprint ring as `[lon, lat]` pairs.
    pub footprint: Vec<[f64; 2]>,
    pub orbit: OrbitDirection,
    pub bands: Vec<String>,
}

impl Scene {
    pub fn from_item(item: &Item) -> Result<Self> {
        let value = serde_json::to_value(item)?;
        let id = item.id.to_owned();
        let invalid = |field: &'static str| BotError::InvalidScene {
            id: id.clone(),
            field,
        };

        let collection = value
            .get("collection")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("collection"))?
            .to_owned();

        let properties = value
            .get("properties")
            .ok_or_else(|| invalid("properties"))?;

        let acquired = properties
            .get("datetime")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .ok_or_else(|| invalid("datetime"))?
            .with_timezone(&Utc);

        let orbit = properties
            .get("sat:orbit_state")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("sat:orbit_state"))?
            .parse::<OrbitDirection>()?;

        let bands = properties
            .get("sar:polarizations")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("sar:polarizations"))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect::<Vec<_>>();

        let footprint = value
            .get("geometry")
            .and_then(extract_outer_ring)
            .ok_or_else(|| invalid("geometry"))?;

        Ok(Self {
            id,
            collection,
            acquired,
            footprint,
            orbit,
            bands,
        })
    }

    /// Independent arithmetic mean of footprint latitudes and longitudes.
    pub fn mean_point(&self) -> Result<GeoPoint> {
        mean_point(&self.footprint)
    }
}

fn extract_outer_ring(geometry: &Value) -> Option<Vec<[f64; 2]>> {
    let coordinates = geometry.get("coordinates")?;
    let ring = match geometry.get("type")?.as_str()? {
        "Polygon" => coordinates.get(0)?,
        "MultiPolygon" => coordinates.get(0)?.get(0)?,
        _ => return None,
    };
    ring.as_array()?
        .iter()
        .map(|position| {
            let lon = position.get(0)?.as_f64()?;
            let lat = position.get(1)?.as_f64()?;
            Some([lon, lat])
        })
        .collect()
}

pub fn mean_point(footprint: &[[f64; 2]]) -> Result<GeoPoint> {
    if footprint.is_empty() {
        return Err(BotError::EmptyFootprint.into());
    }
    let n = footprint.len() as f64;
    let lon = footprint.iter().map(|p| p[0]).sum::<f64>() / n;
    let lat = footprint.iter().map(|p| p[1]).sum::<f64>() / n;
    Ok(GeoPoint { lat, lon })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrbitDirection {
    Ascending,
    Descending,
    Other(String),
}

impl std::str::FromStr for OrbitDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let direction = match s.to_ascii_lowercase().as_str() {
            "ascending" => Self::Ascending,
            "descending" => Self::Descending,
            _ => Self::Other(capitalize(s)),
        };
        Ok(direction)
    }
}

impl fmt::Display for OrbitDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "Ascending"),
            Self::Descending => write!(f, "Descending"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Co-polarized and cross-polarized band ids of a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandPair {
    pub copol: String,
    pub crosspol: String,
}

impl BandPair {
    /// First co-pol id and first cross-pol id in list order.
    pub fn resolve(bands: &[String]) -> Result<Self> {
        let copol = bands.iter().find(|b| COPOL_BANDS.contains(&b.as_str()));
        let crosspol = bands.iter().find(|b| CROSSPOL_BANDS.contains(&b.as_str()));
        match (copol, crosspol) {
            (Some(copol), Some(crosspol)) => Ok(Self {
                copol: copol.to_owned(),
                crosspol: crosspol.to_owned(),
            }),
            _ => Err(BotError::MissingBands {
                available: bands.join(", "),
            }
            .into()),
        }
    }
}
