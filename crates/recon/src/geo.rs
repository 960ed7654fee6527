//! Coordinate lookup + great-circle distance for the alternative finder.

use std::collections::HashMap;

use crate::alternatives::DistanceSource;
use crate::error::GeocodeUnavailable;
use crate::model::PanelProvider;
use crate::normalize::normalize_address;

/// Mean Earth radius (IUGG), kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Haversine great-circle distance in kilometers.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Pre-resolved coordinates keyed by normalized address.
///
/// Stands in for a geocoder: an address absent from the table is
/// `GeocodeUnavailable`.
#[derive(Debug, Clone, Default)]
pub struct CoordinateTable {
    by_address: HashMap<String, Coordinates>,
}

impl CoordinateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later inserts for the same normalized address win.
    pub fn insert(&mut self, address: &str, coords: Coordinates) {
        self.by_address.insert(normalize_address(address), coords);
    }

    pub fn locate(&self, address: &str) -> Result<Coordinates, GeocodeUnavailable> {
        self.by_address
            .get(&normalize_address(address))
            .copied()
            .ok_or_else(|| GeocodeUnavailable {
                address: address.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

impl DistanceSource for CoordinateTable {
    fn distance_km(&self, from: &PanelProvider, to: &PanelProvider) -> Result<f64, GeocodeUnavailable> {
        let a = self.locate(&from.address)?;
        let b = self.locate(&to.address)?;
        Ok(haversine_km(a, b))
    }
}
