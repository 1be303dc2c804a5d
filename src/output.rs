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

use anyhow::Result;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use serde::Serialize;

use crate::coords::SwapHeuristic;
use crate::coords::normalize_position;
use crate::listing::Listing;
use crate::model::FilterSettings;
use crate::model::GeoPoint;
use crate::model::Place;
use crate::model::SearchRequest;

/// Characters left unescaped in map URLs, matching what browsers keep verbatim.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const MAX_ROUTE_STOPS: usize = 10;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsOut {
    pub took_ms: i64,
    pub total_hits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positioned_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageOut {
    pub index: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavOut {
    pub token: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceOut {
    pub ordinal: usize,
    pub id: i64,
    pub name: String,
    pub city: String,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub categories: Vec<String>,
    pub position: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorOut {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct JsonResponse {
    pub ok: bool,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<SearchRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PlaceOut>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav: Option<NavOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<FilterSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsOut>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOut>,
}

impl JsonResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            schema_version: "1".to_string(),
            ..Default::default()
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            ok: false,
            schema_version: "1".to_string(),
            error: Some(ErrorOut {
                code: code.to_string(),
                message: message.to_string(),
            }),
            ..Default::default()
        }
    }

    pub fn with_listing(mut self, listing: &Listing, swap: &SwapHeuristic) -> Self {
        self.query = Some(listing.request.clone());
        self.page = Some(page_out(listing));
        self.results = Some(place_outs(listing, swap));
        self.nav = Some(NavOut {
            token: listing.token.clone(),
            prev: listing.prev.clone(),
            next: listing.next.clone(),
        });
        self
    }

    pub fn with_place(mut self, place: serde_json::Value) -> Self {
        self.place = Some(place);
        self
    }

    pub fn with_settings(mut self, settings: FilterSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_maps_url(mut self, url: Option<String>) -> Self {
        self.maps_url = url;
        self
    }

    pub fn with_stats(mut self, stats: StatsOut) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

pub fn print_json(resp: &JsonResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(resp)?;
    println!("{text}");
    Ok(())
}

pub fn page_out(listing: &Listing) -> PageOut {
    let page = &listing.page;
    PageOut {
        index: page.index,
        page_size: page.page_size,
        total_items: page.total_items,
        total_pages: page.total_pages,
        has_prev: page.has_prev(),
        has_next: page.has_next(),
    }
}

fn place_outs(listing: &Listing, swap: &SwapHeuristic) -> Vec<PlaceOut> {
    let first = listing.page.first_ordinal();
    listing
        .page
        .items
        .iter()
        .enumerate()
        .map(|(offset, scored)| {
            let place = &scored.place;
            PlaceOut {
                ordinal: first + offset,
                id: place.id,
                name: place.name.clone(),
                city: place.city.clone(),
                address: place.address.clone(),
                rating: place.rating,
                categories: place.categories.clone(),
                position: normalize_position(&place.position, swap),
                distance_km: scored.distance_km,
                phone: place.phone.clone(),
            }
        })
        .collect()
}

pub fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(rating) => format!("{rating:.1}"),
        None => "n/a".to_string(),
    }
}

/// Meters below one kilometer, kilometers with one decimal above.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.1} km")
    }
}

/// Reduces a free-text phone number to a dialable `+<digits>` form.
pub fn normalize_phone_for_tel(phone: &str, default_prefix: &str) -> Option<String> {
    let cleaned: String = phone
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    if cleaned.is_empty() || cleaned == "+" {
        return None;
    }
    if let Some(rest) = cleaned.strip_prefix("00") {
        return Some(format!("+{rest}"));
    }
    if cleaned.starts_with('+') {
        return Some(cleaned);
    }
    Some(format!("{default_prefix}{cleaned}"))
}

fn maps_coord(point: GeoPoint) -> String {
    format!("{:.6},{:.6}", point.lat, point.lon)
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, URL_SAFE).to_string()
}

/// Search link for one place: by coordinates when they normalize, else by name and city.
pub fn place_maps_url(place: &Place, swap: &SwapHeuristic) -> String {
    let query = match normalize_position(&place.position, swap) {
        Some(point) => maps_coord(point),
        None => format!("{} {}", place.name, place.city),
    };
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        encode(&query)
    )
}

/// Walking directions through the first stops of a page, ending at the last one.
pub fn route_maps_url(
    places: &[&Place],
    origin: Option<GeoPoint>,
    swap: &SwapHeuristic,
) -> Option<String> {
    let stops: Vec<GeoPoint> = places
        .iter()
        .filter_map(|place| normalize_position(&place.position, swap))
        .take(MAX_ROUTE_STOPS)
        .collect();
    let (destination, waypoints) = stops.split_last()?;

    let mut params = vec![
        "api=1".to_string(),
        format!("destination={}", encode(&maps_coord(*destination))),
    ];
    if let Some(origin) = origin {
        params.push(format!("origin={}", encode(&maps_coord(origin))));
    }
    if !waypoints.is_empty() {
        let joined = waypoints
            .iter()
            .map(|point| maps_coord(*point))
            .collect::<Vec<_>>()
            .join("|");
        params.push(format!("waypoints={}", encode(&joined)));
    }
    params.push("travelmode=walking".to_string());
    Some(format!("https://www.google.com/maps/dir/?{}", params.join("&")))
}

pub fn print_listing(listing: &Listing) {
    let page = &listing.page;
    match &listing.request {
        SearchRequest::City { city, .. } => println!(
            "Found {} places in {} (page {}/{}):",
            page.total_items,
            city,
            page.index + 1,
            page.total_pages
        ),
        SearchRequest::Radius { radius_km, .. } => println!(
            "Places within {radius_km} km: found {} (page {}/{}):",
            page.total_items,
            page.index + 1,
            page.total_pages
        ),
    }
    let filters = listing.request.filters();
    if !filters.is_empty() {
        let mut parts = Vec::new();
        if let Some(min) = filters.min_rating {
            parts.push(format!("rating >= {}", format_rating(Some(min))));
        }
        if let Some(category) = &filters.category {
            parts.push(format!("category {category}"));
        }
        println!("Filters: {}", parts.join(", "));
    }
    let first = page.first_ordinal();
    for (offset, scored) in page.items.iter().enumerate() {
        let place = &scored.place;
        let rating = format_rating(place.rating);
        match scored.distance_km {
            Some(km) => println!(
                "{}. {} - {} - {} - {}\t[{}]",
                first + offset,
                place.name,
                place.city,
                rating,
                format_distance(km),
                place.id
            ),
            None => println!("{}. {} - {}\t[{}]", first + offset, place.name, rating, place.id),
        }
    }
    if let Some(prev) = &listing.prev {
        println!("prev: {prev}");
    }
    if let Some(next) = &listing.next {
        println!("next: {next}");
    }
}

pub fn print_place(place: &Place, distance_km: Option<f64>, phone_prefix: &str, maps_url: &str) {
    println!("{}", place.name);
    match place.address.as_deref() {
        Some(address) => println!("{} - {address}", place.city),
        None => println!("{}", place.city),
    }
    let updated = place
        .last_update
        .as_deref()
        .map(|u| format!(" (updated {u})"))
        .unwrap_or_default();
    println!("Rating: {}{updated}", format_rating(place.rating));
    if !place.categories.is_empty() {
        println!("Categories: {}", place.categories.join(", "));
    }
    if let Some(km) = distance_km {
        println!("Distance: {}", format_distance(km));
    }
    match place.phone.as_deref() {
        Some(phone) => match normalize_phone_for_tel(phone, phone_prefix) {
            Some(tel) => println!("Phone: {phone} (tel:{tel})"),
            None => println!("Phone: {phone}"),
        },
        None => println!("Phone: not available"),
    }
    if let Some(notes) = &place.notes {
        println!("Notes: {notes}");
    }
    println!("Map: {maps_url}");
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::listing::ListingOptions;
    use crate::listing::city_request;
    use crate::listing::list;
    use crate::query::EngineOptions;
    use crate::query::fixtures::MemoryPlaces;
    use crate::query::fixtures::place;
    use crate::query::fixtures::place_at;

    #[test]
    fn distances_switch_units_at_one_kilometer() {
        assert_eq!(format_distance(0.4567), "457 m");
        assert_eq!(format_distance(1.0), "1.0 km");
        assert_eq!(format_distance(12.345), "12.3 km");
    }

    #[test]
    fn phone_numbers_become_dialable() {
        assert_eq!(
            normalize_phone_for_tel(" 080 523-1234 ", "+39").as_deref(),
            Some("+390805231234")
        );
        assert_eq!(
            normalize_phone_for_tel("0039 080 1", "+39").as_deref(),
            Some("+390801")
        );
        assert_eq!(
            normalize_phone_for_tel("+44 20 7946", "+39").as_deref(),
            Some("+44207946")
        );
        assert_eq!(normalize_phone_for_tel("n/a", "+39"), None);
        assert_eq!(normalize_phone_for_tel("+", "+39"), None);
    }

    #[test]
    fn place_link_falls_back_to_name_and_city() {
        let swap = SwapHeuristic::default();
        let located = place_at(1, "Forno", None, "41,117", 16.871);
        assert_eq!(
            place_maps_url(&located, &swap),
            "https://www.google.com/maps/search/?api=1&query=41.117000%2C16.871000"
        );
        let unlocated = place(2, "Da Nino", "Bari", None);
        assert_eq!(
            place_maps_url(&unlocated, &swap),
            "https://www.google.com/maps/search/?api=1&query=Da%20Nino%20Bari"
        );
    }

    #[test]
    fn route_link_ends_at_last_located_stop() {
        let swap = SwapHeuristic::default();
        let a = place_at(1, "A", None, 41.1, 16.8);
        let b = place(2, "B", "Bari", None);
        let c = place_at(3, "C", None, 41.2, 16.9);
        let origin = GeoPoint::new(41.0, 16.7);
        let url = route_maps_url(&[&a, &b, &c], origin, &swap).expect("url");
        assert_eq!(
            url,
            "https://www.google.com/maps/dir/?api=1&destination=41.200000%2C16.900000&origin=41.000000%2C16.700000&waypoints=41.100000%2C16.800000&travelmode=walking"
        );
        assert_eq!(route_maps_url(&[&b], None, &swap), None);
    }

    #[test]
    fn page_envelope_snapshot() {
        let store = MemoryPlaces(vec![
            place(1, "Uno", "Bari", Some(4.8)),
            place(2, "Due", "Bari", None),
            place(3, "Tre", "Bari", Some(4.1)),
        ]);
        let opts = ListingOptions {
            engine: EngineOptions::default(),
            page_size: NonZeroUsize::new(2).expect("non-zero"),
        };
        let listing = list(&store, &opts, &city_request("Bari", FilterSettings::default()), 1)
            .expect("list");
        insta::assert_json_snapshot!(page_out(&listing), @r#"
        {
          "index": 1,
          "page_size": 2,
          "total_items": 3,
          "total_pages": 2,
          "has_prev": true,
          "has_next": false
        }
        "#);
        let names: Vec<&str> = listing
            .page
            .items
            .iter()
            .map(|s| s.place.name.as_str())
            .collect();
        assert_eq!(names, vec!["Due"]);
    }
}
