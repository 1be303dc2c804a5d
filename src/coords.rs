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

//! Repair of raw latitude/longitude input from ingestion feeds.
//!
//! Feeds store coordinates as numbers or as text (with `.` or `,` decimal
//! separators), sometimes swapped, sometimes out of range. [`normalize`]
//! turns any of that into a valid [`GeoPoint`] or `None`; it never fails.

use rusqlite::types::FromSql;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;

use crate::model::GeoPoint;
use crate::model::RawPosition;

/// A single coordinate component of unknown shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoord {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl RawCoord {
    pub fn is_missing(&self) -> bool {
        match self {
            RawCoord::Missing => true,
            RawCoord::Text(text) => text.trim().is_empty(),
            RawCoord::Number(_) => false,
        }
    }
}

impl From<f64> for RawCoord {
    fn from(value: f64) -> Self {
        RawCoord::Number(value)
    }
}

impl From<&str> for RawCoord {
    fn from(value: &str) -> Self {
        RawCoord::Text(value.to_string())
    }
}

impl<T: Into<RawCoord>> From<Option<T>> for RawCoord {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawCoord::Missing)
    }
}

impl FromSql for RawCoord {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null | ValueRef::Blob(_) => RawCoord::Missing,
            ValueRef::Integer(n) => RawCoord::Number(n as f64),
            ValueRef::Real(n) => RawCoord::Number(n),
            ValueRef::Text(bytes) => RawCoord::Text(String::from_utf8_lossy(bytes).into_owned()),
        })
    }
}

/// Regional lon/lat swap: if the first value looks like a longitude in
/// `lon_band` and the second like a latitude in `lat_band`, they were
/// written in the wrong order. Both bands are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapHeuristic {
    pub enabled: bool,
    pub lon_band: [f64; 2],
    pub lat_band: [f64; 2],
}

impl Default for SwapHeuristic {
    fn default() -> Self {
        Self {
            enabled: true,
            lon_band: [6.0, 19.0],
            lat_band: [36.0, 47.0],
        }
    }
}

impl SwapHeuristic {
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn applies(&self, first: f64, second: f64) -> bool {
        self.enabled
            && (self.lon_band[0]..=self.lon_band[1]).contains(&first)
            && (self.lat_band[0]..=self.lat_band[1]).contains(&second)
    }
}

/// Parses one component. Anything that is not a finite real number is absent.
pub fn parse_number(raw: &RawCoord) -> Option<f64> {
    let value = match raw {
        RawCoord::Missing => return None,
        RawCoord::Number(n) => *n,
        RawCoord::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            text.replace(',', ".").parse::<f64>().ok()?
        }
    };
    value.is_finite().then_some(value)
}

fn in_range(lat: f64, lon: f64) -> bool {
    lat.abs() <= 90.0 && lon.abs() <= 180.0
}

/// Normalizes a raw `(lat, lon)` pair.
pub fn normalize(lat: &RawCoord, lon: &RawCoord, swap: &SwapHeuristic) -> Option<GeoPoint> {
    let (mut first, mut second) = (parse_number(lat)?, parse_number(lon)?);
    if !in_range(first, second) {
        std::mem::swap(&mut first, &mut second);
        if !in_range(first, second) {
            return None;
        }
    }
    if swap.applies(first, second) {
        std::mem::swap(&mut first, &mut second);
    }
    GeoPoint::new(first, second)
}

pub fn normalize_position(position: &RawPosition, swap: &SwapHeuristic) -> Option<GeoPoint> {
    normalize(&position.lat, &position.lon, swap)
}

/// Runs an already numeric point (e.g. a search origin) through the same repair.
pub fn normalize_point(point: GeoPoint, swap: &SwapHeuristic) -> Option<GeoPoint> {
    normalize(&point.lat.into(), &point.lon.into(), swap)
}
