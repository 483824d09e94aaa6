//! Offline reverse geocoding.
//!
//! The default index is the GeoNames cities dataset embedded by
//! `reverse_geocoder`. A custom `latitude,longitude,city,country` CSV
//! gazetteer can replace it.
use crate::error::BotError;
use crate::settings::GeocoderSettings;
use anyhow::Result;
use reverse_geocoder::ReverseGeocoder;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// ISO 3166-1 alpha-2 code to country name.
const COUNTRIES_CSV: &str = include_str!("../data/countries.csv");

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub city: String,
}

pub trait Geocoder {
    fn locate(&self, point: GeoPoint) -> Result<Location>;
}

impl<G: Geocoder + ?Sized> Geocoder for Box<G> {
    fn locate(&self, point: GeoPoint) -> Result<Location> {
        (**self).locate(point)
    }
}

/// The configured gazetteer, or the embedded GeoNames index when none is set.
pub fn from_settings(settings: &GeocoderSettings) -> Result<Box<dyn Geocoder>> {
    match &settings.dataset {
        Some(path) => {
            tracing::info!("Loading geocoding dataset {}", path.display());
            Ok(Box::new(OfflineGeocoder::from_csv(path)?))
        }
        None => {
            tracing::info!("Loading embedded GeoNames index");
            Ok(Box::new(GeoNamesGeocoder::new()?))
        }
    }
}

#[derive(Debug, Deserialize)]
struct Country {
    code: String,
    name: String,
}

fn country_names(csv_text: &str) -> Result<HashMap<String, String>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let mut names = HashMap::new();
    for country in reader.deserialize::<Country>() {
        let country = country?;
        names.insert(country.code, country.name);
    }
    Ok(names)
}

/// Nearest populated place from the GeoNames cities dataset.
pub struct GeoNamesGeocoder {
    index: ReverseGeocoder,
    countries: HashMap<String, String>,
}

impl GeoNamesGeocoder {
    pub fn new() -> Result<Self> {
        let countries = country_names(COUNTRIES_CSV)?;
        Ok(Self {
            index: ReverseGeocoder::new(),
            countries,
        })
    }
}

impl Geocoder for GeoNamesGeocoder {
    fn locate(&self, point: GeoPoint) -> Result<Location> {
        let record = self.index.search((point.lat, point.lon)).record;
        // Unknown codes are shown as-is
        let country = self
            .countries
            .get(&record.cc)
            .cloned()
            .unwrap_or_else(|| record.cc.clone());
        Ok(Location {
            country,
            city: record.name.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Place {
    latitude: f64,
    longitude: f64,
    city: String,
    country: String,
}

/// Nearest-place lookup over a `latitude,longitude,city,country` CSV file.
pub struct OfflineGeocoder {
    places: Vec<Place>,
}

impl OfflineGeocoder {
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let places = reader
            .deserialize::<Place>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if places.is_empty() {
            return Err(BotError::EmptyGazetteer(path.display().to_string()).into());
        }
        tracing::debug!("Loaded {} places from {}", places.len(), path.display());
        Ok(Self { places })
    }
}

impl Geocoder for OfflineGeocoder {
    fn locate(&self, point: GeoPoint) -> Result<Location> {
        let nearest = self
            .places
            .iter()
            .map(|p| (haversine_km(point, p.latitude, p.longitude), p))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, p)| p)
            .ok_or(BotError::EmptyGazetteer("in-memory".to_string()))?;
        Ok(Location {
            country: nearest.country.to_owned(),
            city: nearest.city.to_owned(),
        })
    }
}

fn haversine_km(point: GeoPoint, lat: f64, lon: f64) -> f64 {
    let (lat1, lat2) = (point.lat.to_radians(), lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon - point.lon).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
