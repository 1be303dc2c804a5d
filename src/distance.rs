// Copyright 2026 Placefinder Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Great-circle distance on a spherical Earth.

use crate::model::GeoPoint;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers. `None` if either point is out of range.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> Option<f64> {
    if !a.is_valid() || !b.is_valid() {
        return None;
    }
    let (phi1, phi2) = (a.lat.to_radians(), b.lat.to_radians());
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // rounding can push h a hair outside [0, 1] for antipodal points
    let h = h.clamp(0.0, 1.0);
    Some(EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt()))
}

/// Distance between two optional points; absent means incomparable, not zero.
pub fn distance_km(a: Option<GeoPoint>, b: Option<GeoPoint>) -> Option<f64> {
    haversine_km(a?, b?)
}
