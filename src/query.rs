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

use std::cmp::Ordering;

use anyhow::Result;
use tracing::debug;

use crate::config::Config;
use crate::coords::SwapHeuristic;
use crate::coords::normalize_point;
use crate::coords::normalize_position;
use crate::distance::distance_km;
use crate::model::FilterSettings;
use crate::model::GeoPoint;
use crate::model::Place;
use crate::model::ScoredPlace;
use crate::model::SearchRequest;
use crate::model::city_key;
use crate::store::PlaceSource;

pub const DEFAULT_MAX_RADIUS_RESULTS: usize = 200;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub swap: SwapHeuristic,
    pub max_radius_results: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            swap: SwapHeuristic::default(),
            max_radius_results: DEFAULT_MAX_RADIUS_RESULTS,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            swap: config.coordinate_swap.clone(),
            max_radius_results: config.max_radius_results,
        }
    }
}

/// Evaluates a request into a fully filtered, fully ordered result list.
///
/// Malformed data never fails a search; it only shrinks the result. Errors
/// come from the backing store.
pub fn search(
    source: &dyn PlaceSource,
    opts: &EngineOptions,
    request: &SearchRequest,
) -> Result<Vec<ScoredPlace>> {
    match request {
        SearchRequest::City { city, filters } => city_search(source, city, filters),
        SearchRequest::Radius {
            origin,
            radius_km,
            filters,
        } => radius_search(source, opts, *origin, *radius_km, filters),
    }
}

pub fn city_search(
    source: &dyn PlaceSource,
    city: &str,
    filters: &FilterSettings,
) -> Result<Vec<ScoredPlace>> {
    let key = city_key(city);
    let candidates = source.places_in_city(&key)?;
    let candidate_count = candidates.len();

    let mut places: Vec<Place> = candidates
        .into_iter()
        .filter(|place| city_key(&place.city) == key)
        .filter(|place| passes_filters(place, filters))
        .collect();
    places.sort_by(city_order);

    debug!(
        city = %key,
        candidates = candidate_count,
        matched = places.len(),
        "city search"
    );
    Ok(places
        .into_iter()
        .map(|place| ScoredPlace {
            place,
            distance_km: None,
        })
        .collect())
}

pub fn radius_search(
    source: &dyn PlaceSource,
    opts: &EngineOptions,
    origin: GeoPoint,
    radius_km: f64,
    filters: &FilterSettings,
) -> Result<Vec<ScoredPlace>> {
    let Some(origin) = normalize_point(origin, &opts.swap) else {
        debug!(lat = origin.lat, lon = origin.lon, "radius search origin is invalid");
        return Ok(Vec::new());
    };

    let candidates = source.places_with_position()?;
    let candidate_count = candidates.len();

    let mut scored: Vec<ScoredPlace> = candidates
        .into_iter()
        .filter_map(|place| {
            let position = normalize_position(&place.position, &opts.swap)?;
            let distance = distance_km(Some(origin), Some(position))?;
            (distance <= radius_km).then_some(ScoredPlace {
                place,
                distance_km: Some(distance),
            })
        })
        .filter(|scored| passes_filters(&scored.place, filters))
        .collect();

    // stable: equal distances keep store order
    scored.sort_by(|a, b| distance_order(a.distance_km, b.distance_km));
    let matched = scored.len();
    scored.truncate(opts.max_radius_results);

    debug!(
        lat = origin.lat,
        lon = origin.lon,
        radius_km,
        candidates = candidate_count,
        matched,
        kept = scored.len(),
        "radius search"
    );
    Ok(scored)
}

pub fn passes_filters(place: &Place, filters: &FilterSettings) -> bool {
    passes_rating(place.rating, filters.min_rating)
        && passes_category(&place.categories, filters.category.as_deref())
}

/// An absent rating never fails the threshold.
pub fn passes_rating(rating: Option<f64>, min_rating: Option<f64>) -> bool {
    match (rating, min_rating) {
        (Some(rating), Some(min)) => rating >= min,
        _ => true,
    }
}

pub fn passes_category(categories: &[String], wanted: Option<&str>) -> bool {
    let Some(wanted) = wanted.map(str::trim).filter(|w| !w.is_empty()) else {
        return true;
    };
    let wanted = wanted.to_lowercase();
    categories
        .iter()
        .any(|label| label.trim().to_lowercase() == wanted)
}

/// Rated before unrated, rating descending, then name ascending (byte order).
pub fn city_order(a: &Place, b: &Place) -> Ordering {
    let by_rating = match (a.rating, b.rating) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_rating
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

fn distance_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::MemoryPlaces;
    use super::fixtures::place;
    use super::fixtures::place_at;
    use super::*;
    use crate::distance::haversine_km;

    fn names(results: &[ScoredPlace]) -> Vec<&str> {
        results.iter().map(|s| s.place.name.as_str()).collect()
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(41.125, 16.862).expect("origin")
    }

    #[test]
    fn city_search_orders_by_rating_then_name_with_unrated_last() {
        let store = MemoryPlaces(vec![
            place(1, "Bravo", "Bari", Some(4.2)),
            place(2, "Charlie", "Bari", None),
            place(3, "Alpha", "Bari", Some(4.2)),
        ]);
        let results = city_search(&store, "Bari", &FilterSettings::default()).expect("search");
        assert_eq!(names(&results), vec!["Alpha", "Bravo", "Charlie"]);
        assert!(results.iter().all(|s| s.distance_km.is_none()));
    }

    #[test]
    fn city_match_is_case_insensitive_and_exact() {
        let store = MemoryPlaces(vec![
            place(1, "A", "bari", Some(4.0)),
            place(2, "B", "BARI", Some(3.0)),
            place(3, "C", "Bari Vecchia", Some(5.0)),
            place(4, "D", "Roma", Some(5.0)),
        ]);
        let results = city_search(&store, "Bari", &FilterSettings::default()).expect("search");
        assert_eq!(names(&results), vec!["A", "B"]);
    }

    #[test]
    fn name_tiebreak_is_case_sensitive() {
        let store = MemoryPlaces(vec![
            place(1, "alpha", "Bari", Some(4.0)),
            place(2, "Zeta", "Bari", Some(4.0)),
        ]);
        let results = city_search(&store, "Bari", &FilterSettings::default()).expect("search");
        assert_eq!(names(&results), vec!["Zeta", "alpha"]);
    }

    #[test]
    fn rating_filter_keeps_unrated_places() {
        let store = MemoryPlaces(vec![
            place(1, "Low", "Bari", Some(4.2)),
            place(2, "High", "Bari", Some(4.5)),
            place(3, "Unknown", "Bari", None),
        ]);
        let filters = FilterSettings {
            min_rating: Some(4.5),
            category: None,
        };
        let results = city_search(&store, "Bari", &filters).expect("search");
        assert_eq!(names(&results), vec!["High", "Unknown"]);
    }

    #[test]
    fn category_filter_matches_any_label_case_insensitively() {
        let mut pizzeria = place(1, "Pizza", "Bari", Some(4.0));
        pizzeria.categories = vec!["Restaurant".to_string(), "Pizzeria".to_string()];
        let mut bakery = place(2, "Forno", "Bari", Some(4.5));
        bakery.categories = vec!["bakery".to_string()];
        let untagged = place(3, "Bar", "Bari", Some(5.0));
        let store = MemoryPlaces(vec![pizzeria, bakery, untagged]);

        let filters = FilterSettings {
            min_rating: None,
            category: Some(" pizzeria ".to_string()),
        };
        let results = city_search(&store, "bari", &filters).expect("search");
        assert_eq!(names(&results), vec!["Pizza"]);
    }

    #[test]
    fn radius_search_sorts_by_distance_and_skips_bad_coordinates() {
        let store = MemoryPlaces(vec![
            place_at(1, "Far", Some(4.0), 41.140, 16.880),
            place_at(2, "Near", Some(3.0), "41,126", "16,863"),
            place_at(3, "Broken", Some(5.0), "n/a", 16.87),
            place_at(4, "Swapped", None, 16.871, 41.117),
            place(5, "Nowhere", "Bari", Some(5.0)),
        ]);
        let results = radius_search(
            &store,
            &EngineOptions::default(),
            origin(),
            5.0,
            &FilterSettings::default(),
        )
        .expect("search");
        assert_eq!(names(&results), vec!["Near", "Swapped", "Far"]);
        let distances: Vec<f64> = results.iter().filter_map(|s| s.distance_km).collect();
        assert_eq!(distances.len(), 3);
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let target = GeoPoint::new(41.117, 16.871).expect("target");
        let exact = haversine_km(origin(), target).expect("distance");
        let store = MemoryPlaces(vec![place_at(1, "Center", None, target.lat, target.lon)]);
        let opts = EngineOptions::default();
        let filters = FilterSettings::default();

        let hit = radius_search(&store, &opts, origin(), exact, &filters).expect("search");
        assert_eq!(hit.len(), 1);
        let miss = radius_search(&store, &opts, origin(), exact - 1e-6, &filters).expect("search");
        assert!(miss.is_empty());
    }

    #[test]
    fn radius_search_applies_filters_and_truncates_after_sorting() {
        let mut places = Vec::new();
        for i in 0..10 {
            let offset = 0.001 * f64::from(i);
            places.push(place_at(i64::from(i), &format!("P{i}"), Some(4.0), 41.125 + offset, 16.862));
        }
        places.push(place_at(100, "Poor", Some(2.0), 41.125, 16.862));
        let store = MemoryPlaces(places);
        let opts = EngineOptions {
            max_radius_results: 3,
            ..EngineOptions::default()
        };
        let filters = FilterSettings {
            min_rating: Some(3.0),
            category: None,
        };
        let results = radius_search(&store, &opts, origin(), 50.0, &filters).expect("search");
        assert_eq!(names(&results), vec!["P0", "P1", "P2"]);
    }

    #[test]
    fn radius_search_applies_category_filter() {
        let mut bakery = place_at(1, "Forno", Some(4.0), 41.126, 16.863);
        bakery.categories = vec!["Bakery".to_string()];
        let mut pizzeria = place_at(2, "Pizza", Some(4.5), 41.127, 16.864);
        pizzeria.categories = vec!["Restaurant".to_string(), "Pizzeria".to_string()];
        let untagged = place_at(3, "Bar", Some(5.0), 41.125, 16.862);
        let store = MemoryPlaces(vec![bakery, pizzeria, untagged]);

        let filters = FilterSettings {
            min_rating: None,
            category: Some("PIZZERIA".to_string()),
        };
        let results = radius_search(&store, &EngineOptions::default(), origin(), 5.0, &filters)
            .expect("search");
        assert_eq!(names(&results), vec!["Pizza"]);
        assert!(results[0].distance_km.is_some());
    }

    #[test]
    fn invalid_origin_yields_empty_result() {
        let store = MemoryPlaces(vec![place_at(1, "A", None, 41.125, 16.862)]);
        let origin = GeoPoint {
            lat: 200.0,
            lon: 200.0,
        };
        let results = radius_search(
            &store,
            &EngineOptions::default(),
            origin,
            10.0,
            &FilterSettings::default(),
        )
        .expect("search");
        assert!(results.is_empty());
    }

    #[test]
    fn bari_end_to_end_city_order() {
        let store = MemoryPlaces(vec![
            place(1, "Uno", "Bari", Some(4.8)),
            place(2, "Due", "Bari", None),
            place(3, "Tre", "Bari", Some(4.1)),
        ]);
        let request = SearchRequest::City {
            city: "Bari".to_string(),
            filters: FilterSettings::default(),
        };
        let results = search(&store, &EngineOptions::default(), &request).expect("search");
        let ratings: Vec<Option<f64>> = results.iter().map(|s| s.place.rating).collect();
        assert_eq!(ratings, vec![Some(4.8), Some(4.1), None]);
    }

    #[test]
    fn bari_center_within_two_kilometers() {
        let store = MemoryPlaces(vec![place_at(1, "Bari center", None, 41.117, 16.871)]);
        let request = SearchRequest::Radius {
            origin: origin(),
            radius_km: 2.0,
            filters: FilterSettings::default(),
        };
        let results = search(&store, &EngineOptions::default(), &request).expect("search");
        assert_eq!(results.len(), 1);
        let d = results[0].distance_km.expect("distance");
        assert!((1.0..=1.3).contains(&d), "got {d}");
    }
}
