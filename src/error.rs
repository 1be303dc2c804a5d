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

use thiserror::Error;

/// Caller contract violations, rejected before a search runs.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("radius must be a finite, non-negative number of kilometers (got {0})")]
    InvalidRadius(f64),

    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("search origin must be finite (got {lat}, {lon})")]
    NonFiniteOrigin { lat: f64, lon: f64 },

    #[error("city name is empty")]
    EmptyCity,

    #[error("minimum rating must be a finite number (got {0})")]
    InvalidMinRating(f64),
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("unknown navigation token version")]
    UnknownVersion,

    #[error("navigation token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("navigation token payload is malformed: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("navigation token could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("navigation token carries a negative radius")]
    InvalidRadius,

    #[error("navigation token carries an empty city")]
    EmptyCity,
}
