use crate::geocode::{GeoPoint, Geocoder, Location};
use crate::scene::{BandPair, OrbitDirection, Scene};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fmt;

/// Post text describing a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub location: Location,
    pub point: GeoPoint,
    pub acquired: DateTime<Utc>,
    pub orbit: OrbitDirection,
    pub bands: BandPair,
}

impl Caption {
    pub fn describe(scene: &Scene, bands: &BandPair, geocoder: &impl Geocoder) -> Result<Self> {
        let point = scene.mean_point()?;
        let location = geocoder.locate(point)?;
        Ok(Self {
            location,
            point,
            acquired: scene.acquired,
            orbit: scene.orbit.clone(),
            bands: bands.clone(),
        })
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}, {} ({:.6}, {:.6})",
            self.location.country, self.location.city, self.point.lon, self.point.lat
        )?;
        writeln!(f, "{} UTC", self.acquired.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "{} orbit", self.orbit)?;
        write!(f, "{}, {} polarizations", self.bands.copol, self.bands.crosspol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedGeocoder;

    impl Geocoder for FixedGeocoder {
        fn locate(&self, _point: GeoPoint) -> Result<Location> {
            Ok(Location {
                country: "Spain".to_string(),
                city: "Madrid".to_string(),
            })
        }
    }

    fn vv_vh() -> BandPair {
        BandPair {
            copol: "VV".to_string(),
            crosspol: "VH".to_string(),
        }
    }

    #[test]
    fn test_caption_format() {
        let caption = Caption {
            location: Location {
                country: "Spain".to_string(),
                city: "Madrid".to_string(),
            },
            point: GeoPoint {
                lat: 40.123456,
                lon: -3.654321,
            },
            acquired: Utc.with_ymd_and_hms(2023, 4, 1, 12, 0, 0).unwrap(),
            orbit: OrbitDirection::Ascending,
            bands: vv_vh(),
        };
        assert_eq!(
            caption.to_string(),
            "Spain, Madrid (-3.654321, 40.123456)\n\
             2023-04-01 12:00:00 UTC\n\
             Ascending orbit\n\
             VV, VH polarizations"
        );
    }

    #[test]
    fn test_describe_scene() {
        let scene = Scene {
            id: "S1B_TEST".to_string(),
            collection: "sentinel-1-grd".to_string(),
            acquired: Utc.with_ymd_and_hms(2021, 11, 30, 6, 5, 4).unwrap(),
            footprint: vec![[-3.0, 40.0], [-4.0, 41.0]],
            orbit: "DESCENDING".parse().unwrap(),
            bands: vec!["VV".to_string(), "VH".to_string()],
        };
        let caption = Caption::describe(&scene, &vv_vh(), &FixedGeocoder).unwrap();
        assert_eq!(
            caption.to_string(),
            "Spain, Madrid (-3.500000, 40.500000)\n\
             2021-11-30 06:05:04 UTC\n\
             Descending orbit\n\
             VV, VH polarizations"
        );
    }
}
