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

//! Shared domain types used across the store, the search engine, and listings.

use serde::Deserialize;
use serde::Serialize;

use crate::coords::RawCoord;

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Builds a point, returning `None` when either component is out of range.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let point = Self { lat, lon };
        point.is_valid().then_some(point)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Position exactly as the ingestion feed wrote it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawPosition {
    pub lat: RawCoord,
    pub lon: RawCoord,
}

impl RawPosition {
    pub fn is_absent(&self) -> bool {
        self.lat.is_missing() || self.lon.is_missing()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<f64>,
    pub categories: Vec<String>,
    pub position: RawPosition,
    pub phone: Option<String>,
    pub source: String,
    pub last_update: Option<String>,
}

/// A place as handed to the store for insertion.
#[derive(Debug, Clone)]
pub struct NewPlace {
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub rating: Option<f64>,
    pub categories: Vec<String>,
    pub position: RawPosition,
    pub phone: Option<String>,
    pub last_update: Option<String>,
}

/// Saved per-user preferences. A `None` field is "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    pub min_rating: Option<f64>,
    pub category: Option<String>,
}

impl FilterSettings {
    pub fn is_empty(&self) -> bool {
        self.min_rating.is_none() && self.category.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchRequest {
    City {
        city: String,
        filters: FilterSettings,
    },
    Radius {
        origin: GeoPoint,
        radius_km: f64,
        filters: FilterSettings,
    },
}

impl SearchRequest {
    pub fn filters(&self) -> &FilterSettings {
        match self {
            SearchRequest::City { filters, .. } | SearchRequest::Radius { filters, .. } => filters,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredPlace {
    pub place: Place,
    /// Only present for radius searches.
    pub distance_km: Option<f64>,
}

/// Splits a free-text category column into labels.
pub fn split_categories(raw: &str) -> Vec<String> {
    raw.split([',', ';', '|'])
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Key used for case-insensitive city matching.
pub fn city_key(city: &str) -> String {
    city.trim().to_lowercase()
}
