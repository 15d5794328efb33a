// ── Data-database fields ──
//
// People, places and things share location, fuzzing, children and
// payload semantics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::payload::Payload;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS-84 latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle (haversine) distance in kilometers.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// Fields shared by every data-database record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFields {
    pub(crate) coords: Option<Coordinate>,
    pub(crate) raw_coords: Option<Coordinate>,
    pub(crate) fuzzy: bool,
    pub(crate) fuzz_factor: Option<f64>,
    pub(crate) can_see_through_the_fuzz: Option<i64>,
    pub(crate) children: BTreeMap<String, Vec<i64>>,
    pub(crate) distance_km: Option<f64>,
    pub(crate) payload: Option<Payload>,
}

impl DataFields {
    /// The (possibly obfuscated) location.
    pub fn coords(&self) -> Option<Coordinate> {
        self.coords
    }

    /// The true location, only sent to callers who can see through the fuzz.
    pub fn raw_coords(&self) -> Option<Coordinate> {
        self.raw_coords
    }

    pub fn is_fuzzy(&self) -> bool {
        self.fuzzy
    }

    /// Obfuscation radius in kilometers.
    pub fn fuzz_factor(&self) -> Option<f64> {
        self.fuzz_factor
    }

    pub fn can_see_through_the_fuzz(&self) -> Option<i64> {
        self.can_see_through_the_fuzz
    }

    /// Child record IDs, keyed by kind name (`people`, `places`, `things`).
    pub fn children(&self) -> &BTreeMap<String, Vec<i64>> {
        &self.children
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Distance to the record: the server's figure when it sent one,
    /// otherwise the great-circle distance from `center`.
    pub fn distance(&self, center: Option<Coordinate>) -> Option<f64> {
        self.distance_km
            .or_else(|| Some(center?.distance_km(&self.coords?)))
    }

    pub fn set_coords(&mut self, coords: Option<Coordinate>) {
        self.coords = coords;
    }

    /// Set the obfuscation radius. A non-zero factor turns fuzzing on;
    /// zero or `None` turns it off.
    pub fn set_fuzz_factor(&mut self, factor: Option<f64>) {
        match factor {
            Some(f) if f != 0.0 => {
                self.fuzz_factor = Some(f);
                self.fuzzy = true;
            }
            _ => {
                self.fuzz_factor = None;
                self.fuzzy = false;
            }
        }
    }

    pub fn set_payload(&mut self, payload: Option<Payload>) {
        self.payload = payload;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzz_factor_drives_fuzzy_flag() {
        let mut data = DataFields::default();
        data.set_fuzz_factor(Some(2.5));
        assert!(data.is_fuzzy());
        assert_eq!(data.fuzz_factor(), Some(2.5));

        data.set_fuzz_factor(Some(0.0));
        assert!(!data.is_fuzzy());
        assert_eq!(data.fuzz_factor(), None);

        data.set_fuzz_factor(Some(1.0));
        data.set_fuzz_factor(None);
        assert!(!data.is_fuzzy());
    }

    #[test]
    fn server_distance_wins_over_computed() {
        let mut data = DataFields {
            coords: Some(Coordinate::new(0.0, 1.0)),
            ..DataFields::default()
        };
        let center = Some(Coordinate::new(0.0, 0.0));
        let computed = data.distance(center).unwrap_or_default();
        assert!((computed - 111.19).abs() < 0.1, "got {computed}");

        data.distance_km = Some(3.0);
        assert_eq!(data.distance(center), Some(3.0));
    }

    #[test]
    fn distance_needs_center_and_location() {
        let data = DataFields::default();
        assert_eq!(data.distance(Some(Coordinate::new(1.0, 1.0))), None);

        let located = DataFields {
            coords: Some(Coordinate::new(1.0, 1.0)),
            ..DataFields::default()
        };
        assert_eq!(located.distance(None), None);
    }
}
