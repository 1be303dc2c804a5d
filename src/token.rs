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

//! Navigation tokens: compact, versioned encodings of "the same query, page N".
//!
//! Wire form is `v1.` followed by unpadded URL-safe base64 of a small JSON
//! object. Coordinates and radius travel as scaled integers so a
//! decode/encode cycle reproduces the token byte for byte. The rating
//! threshold is a plain JSON number, which serde_json writes in shortest
//! round-trip form, so it is compared exactly as the user set it. City names
//! are JSON strings so no delimiter can collide with them.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::TokenError;
use crate::model::FilterSettings;
use crate::model::GeoPoint;
use crate::model::SearchRequest;

pub const TOKEN_PREFIX: &str = "v1.";

/// 5 decimal digits of a degree.
const COORD_SCALE: f64 = 1e5;
/// 2 decimal digits of a kilometer.
const RADIUS_SCALE: f64 = 1e2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationToken {
    #[serde(rename = "q")]
    pub query: TokenQuery,
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "p")]
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "k")]
pub enum TokenQuery {
    #[serde(rename = "city")]
    City {
        #[serde(rename = "n")]
        city: String,
    },
    #[serde(rename = "near")]
    Radius { lat: i64, lon: i64, km: i64 },
}

fn to_fixed(value: f64, scale: f64) -> i64 {
    (value * scale).round() as i64
}

fn from_fixed(value: i64, scale: f64) -> f64 {
    value as f64 / scale
}

impl NavigationToken {
    pub fn for_request(request: &SearchRequest, page: usize) -> Self {
        let query = match request {
            SearchRequest::City { city, .. } => TokenQuery::City {
                city: city.trim().to_string(),
            },
            SearchRequest::Radius {
                origin, radius_km, ..
            } => TokenQuery::Radius {
                lat: to_fixed(origin.lat, COORD_SCALE),
                lon: to_fixed(origin.lon, COORD_SCALE),
                km: to_fixed(*radius_km, RADIUS_SCALE),
            },
        };
        let filters = request.filters();
        Self {
            query,
            min_rating: filters.min_rating,
            category: filters
                .category
                .as_deref()
                .map(str::trim)
                .filter(|category| !category.is_empty())
                .map(str::to_string),
            page: u32::try_from(page).unwrap_or(u32::MAX),
        }
    }

    pub fn with_page(&self, page: usize) -> Self {
        Self {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            ..self.clone()
        }
    }

    pub fn to_request(&self) -> SearchRequest {
        let filters = FilterSettings {
            min_rating: self.min_rating,
            category: self.category.clone(),
        };
        match &self.query {
            TokenQuery::City { city } => SearchRequest::City {
                city: city.clone(),
                filters,
            },
            TokenQuery::Radius { lat, lon, km } => SearchRequest::Radius {
                // not validated here: an out-of-range origin degrades to an empty search
                origin: GeoPoint {
                    lat: from_fixed(*lat, COORD_SCALE),
                    lon: from_fixed(*lon, COORD_SCALE),
                },
                radius_km: from_fixed(*km, RADIUS_SCALE),
                filters,
            },
        }
    }

    pub fn encode(&self) -> Result<String, TokenError> {
        let payload = serde_json::to_vec(self).map_err(TokenError::Encode)?;
        Ok(format!("{TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(payload)))
    }

    pub fn decode(text: &str) -> Result<Self, TokenError> {
        let Some(payload) = text.trim().strip_prefix(TOKEN_PREFIX) else {
            return Err(TokenError::UnknownVersion);
        };
        let bytes = URL_SAFE_NO_PAD.decode(payload)?;
        let token: NavigationToken =
            serde_json::from_slice(&bytes).map_err(TokenError::Payload)?;
        match &token.query {
            TokenQuery::City { city } if city.trim().is_empty() => {
                return Err(TokenError::EmptyCity);
            }
            TokenQuery::Radius { km, .. } if *km < 0 => return Err(TokenError::InvalidRadius),
            _ => {}
        }
        debug!(page = token.page, "decoded navigation token");
        Ok(token)
    }
}

/// Rounds a request to token precision. Searching with the canonical form
/// makes the first page identical to any page later rebuilt from a token.
pub fn canonical_request(request: &SearchRequest) -> SearchRequest {
    NavigationToken::for_request(request, 0).to_request()
}
