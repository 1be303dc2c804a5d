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

//! The request interface exposed to front-ends: one page of a search plus
//! tokens that reproduce the same search at neighbouring pages.

use std::num::NonZeroUsize;

use anyhow::Result;
use tracing::debug;

use crate::config::Config;
use crate::error::RequestError;
use crate::model::FilterSettings;
use crate::model::GeoPoint;
use crate::model::ScoredPlace;
use crate::model::SearchRequest;
use crate::page::Page;
use crate::page::paginate;
use crate::query::EngineOptions;
use crate::query::search;
use crate::store::PlaceSource;
use crate::token::NavigationToken;
use crate::token::canonical_request;

#[derive(Debug, Clone)]
pub struct ListingOptions {
    pub engine: EngineOptions,
    pub page_size: NonZeroUsize,
}

impl ListingOptions {
    pub fn from_config(config: &Config) -> Result<Self, RequestError> {
        Ok(Self {
            engine: EngineOptions::from_config(config),
            page_size: config.checked_page_size()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Listing {
    /// The canonical request the page was computed from.
    pub request: SearchRequest,
    pub page: Page<ScoredPlace>,
    /// Token for the page being shown.
    pub token: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Boundary checks for caller-built requests.
pub fn validate_request(request: &SearchRequest) -> Result<(), RequestError> {
    match request {
        SearchRequest::City { city, filters } => {
            if city.trim().is_empty() {
                return Err(RequestError::EmptyCity);
            }
            validate_filters(filters)
        }
        SearchRequest::Radius {
            origin,
            radius_km,
            filters,
        } => {
            // out-of-range but finite origins are data, not a contract breach:
            // they reach the engine and produce an empty result
            if !origin.lat.is_finite() || !origin.lon.is_finite() {
                return Err(RequestError::NonFiniteOrigin {
                    lat: origin.lat,
                    lon: origin.lon,
                });
            }
            if !radius_km.is_finite() || *radius_km < 0.0 {
                return Err(RequestError::InvalidRadius(*radius_km));
            }
            validate_filters(filters)
        }
    }
}

fn validate_filters(filters: &FilterSettings) -> Result<(), RequestError> {
    match filters.min_rating {
        Some(rating) if !rating.is_finite() => Err(RequestError::InvalidMinRating(rating)),
        _ => Ok(()),
    }
}

pub fn city_request(city: &str, filters: FilterSettings) -> SearchRequest {
    SearchRequest::City {
        city: city.to_string(),
        filters,
    }
}

pub fn radius_request(origin: GeoPoint, radius_km: f64, filters: FilterSettings) -> SearchRequest {
    SearchRequest::Radius {
        origin,
        radius_km,
        filters,
    }
}

/// Runs `request` and returns the page at `page` (clamped).
pub fn list(
    source: &dyn PlaceSource,
    opts: &ListingOptions,
    request: &SearchRequest,
    page: i64,
) -> Result<Listing> {
    validate_request(request)?;
    let request = canonical_request(request);
    let results = search(source, &opts.engine, &request)?;
    let page = paginate(results, page, opts.page_size);

    let base = NavigationToken::for_request(&request, page.index);
    let token = base.encode()?;
    let prev = if page.has_prev() {
        Some(base.with_page(page.index - 1).encode()?)
    } else {
        None
    };
    let next = if page.has_next() {
        Some(base.with_page(page.index + 1).encode()?)
    } else {
        None
    };

    debug!(
        page = page.index,
        total_pages = page.total_pages,
        total_items = page.total_items,
        "listing built"
    );
    Ok(Listing {
        request,
        page,
        token,
        prev,
        next,
    })
}

/// Recomputes the search carried by `token` and returns its target page.
pub fn list_from_token(
    source: &dyn PlaceSource,
    opts: &ListingOptions,
    token: &str,
) -> Result<Listing> {
    let token = NavigationToken::decode(token)?;
    let page = i64::from(token.page);
    list(source, opts, &token.to_request(), page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures::MemoryPlaces;
    use crate::query::fixtures::place;
    use crate::query::fixtures::place_at;

    fn opts() -> ListingOptions {
        ListingOptions {
            engine: EngineOptions::default(),
            page_size: NonZeroUsize::new(5).expect("non-zero"),
        }
    }

    fn ids(listing: &Listing) -> Vec<i64> {
        listing.page.items.iter().map(|s| s.place.id).collect()
    }

    fn bari_store() -> MemoryPlaces {
        let places = (0..13)
            .map(|i| {
                let rating = if i % 4 == 0 {
                    None
                } else {
                    Some(3.0 + f64::from(i % 3) * 0.5)
                };
                place(i64::from(i) + 1, &format!("Place {i:02}"), "Bari", rating)
            })
            .collect();
        MemoryPlaces(places)
    }

    #[test]
    fn city_page_two_round_trips_through_token() {
        let store = bari_store();
        let request = city_request("Bari", FilterSettings::default());
        let direct = list(&store, &opts(), &request, 2).expect("list");
        assert_eq!(direct.page.index, 2);
        assert_eq!(direct.page.total_pages, 3);
        assert_eq!(direct.page.items.len(), 3);
        assert!(direct.next.is_none());

        let via_token = list_from_token(&store, &opts(), &direct.token).expect("list");
        assert_eq!(ids(&via_token), ids(&direct));
        assert_eq!(via_token.token, direct.token);
    }

    #[test]
    fn back_then_forward_reproduces_pages() {
        let store = bari_store();
        let request = city_request("bari", FilterSettings::default());
        let first = list(&store, &opts(), &request, 0).expect("list");
        assert!(first.prev.is_none());

        let second = list_from_token(&store, &opts(), first.next.as_deref().expect("next"))
            .expect("list");
        assert_eq!(second.page.index, 1);
        let back = list_from_token(&store, &opts(), second.prev.as_deref().expect("prev"))
            .expect("list");
        assert_eq!(ids(&back), ids(&first));
    }

    #[test]
    fn filters_travel_inside_the_token() {
        let store = bari_store();
        let filters = FilterSettings {
            min_rating: Some(3.5),
            category: None,
        };
        let first = list(&store, &opts(), &city_request("Bari", filters), 0).expect("list");
        let again = list_from_token(&store, &opts(), &first.token).expect("list");
        assert_eq!(again.request.filters().min_rating, Some(3.5));
        assert_eq!(ids(&again), ids(&first));
        assert!(
            again
                .page
                .items
                .iter()
                .all(|s| s.place.rating.is_none_or(|r| r >= 3.5))
        );
    }

    #[test]
    fn radius_listing_round_trips_with_quantized_origin() {
        let store = MemoryPlaces(vec![
            place_at(1, "A", Some(4.0), 41.1251, 16.8621),
            place_at(2, "B", Some(4.0), 41.1300, 16.8700),
            place_at(3, "C", None, 41.1400, 16.8800),
        ]);
        let request = radius_request(
            GeoPoint {
                lat: 41.1250012,
                lon: 16.8619987,
            },
            2.004,
            FilterSettings::default(),
        );
        let direct = list(&store, &opts(), &request, 0).expect("list");
        let via_token = list_from_token(&store, &opts(), &direct.token).expect("list");
        assert_eq!(ids(&direct), ids(&via_token));
        assert_eq!(ids(&direct), vec![1, 2]);
    }

    #[test]
    fn empty_result_is_a_single_empty_page() {
        let store = MemoryPlaces(Vec::new());
        let listing = list(
            &store,
            &opts(),
            &city_request("Nowhere", FilterSettings::default()),
            4,
        )
        .expect("list");
        assert_eq!(listing.page.total_items, 0);
        assert_eq!(listing.page.total_pages, 1);
        assert_eq!(listing.page.index, 0);
        assert!(listing.prev.is_none() && listing.next.is_none());
    }

    #[test]
    fn stale_page_in_token_is_clamped() {
        let store = bari_store();
        let token = NavigationToken::for_request(&city_request("Bari", FilterSettings::default()), 40)
            .encode()
            .expect("encode");
        let listing = list_from_token(&store, &opts(), &token).expect("list");
        assert_eq!(listing.page.index, 2);
    }

    #[test]
    fn contract_violations_are_rejected() {
        let store = MemoryPlaces(Vec::new());
        let origin = GeoPoint::new(41.0, 16.0).expect("origin");
        let err = list(
            &store,
            &opts(),
            &radius_request(origin, -1.0, FilterSettings::default()),
            0,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RequestError>(),
            Some(RequestError::InvalidRadius(_))
        ));
        let err = list(&store, &opts(), &city_request("  ", FilterSettings::default()), 0)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RequestError>(),
            Some(RequestError::EmptyCity)
        ));
    }

    #[test]
    fn rating_threshold_is_not_rounded() {
        let store = MemoryPlaces(vec![
            place(1, "Just below", "Bari", Some(4.331)),
            place(2, "Just above", "Bari", Some(4.334)),
        ]);
        let filters = FilterSettings {
            min_rating: Some(4.333),
            category: None,
        };
        let first = list(&store, &opts(), &city_request("Bari", filters), 0).expect("list");
        assert_eq!(ids(&first), vec![2]);
        assert_eq!(first.request.filters().min_rating, Some(4.333));

        let again = list_from_token(&store, &opts(), &first.token).expect("list");
        assert_eq!(ids(&again), vec![2]);
        assert_eq!(again.token, first.token);
    }

    #[test]
    fn non_finite_origin_is_rejected() {
        let store = MemoryPlaces(vec![place_at(1, "Null Island", None, 0.0, 0.0)]);
        for (lat, lon) in [(f64::NAN, f64::NAN), (0.0, f64::INFINITY), (f64::NEG_INFINITY, 0.0)] {
            let request = radius_request(GeoPoint { lat, lon }, 5.0, FilterSettings::default());
            let err = list(&store, &opts(), &request, 0).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<RequestError>(),
                Some(RequestError::NonFiniteOrigin { .. })
            ));
        }
    }

    #[test]
    fn out_of_range_origin_lists_nothing() {
        let store = MemoryPlaces(vec![place_at(1, "A", None, 41.125, 16.862)]);
        let request = radius_request(
            GeoPoint {
                lat: 200.0,
                lon: 200.0,
            },
            10.0,
            FilterSettings::default(),
        );
        let listing = list(&store, &opts(), &request, 0).expect("list");
        assert_eq!(listing.page.total_items, 0);
        let again = list_from_token(&store, &opts(), &listing.token).expect("list");
        assert_eq!(again.page.total_items, 0);
    }

    #[test]
    fn radius_listing_carries_category_through_the_token() {
        let mut pizzeria = place_at(1, "Pizza", Some(4.0), 41.126, 16.863);
        pizzeria.categories = vec!["Pizzeria".to_string()];
        let bakeries = (2..9).map(|id| {
            let mut bakery = place_at(id, &format!("Forno {id}"), Some(4.0), 41.125, 16.862);
            bakery.categories = vec!["Bakery".to_string()];
            bakery
        });
        let store = MemoryPlaces(std::iter::once(pizzeria).chain(bakeries).collect());
        let filters = FilterSettings {
            min_rating: None,
            category: Some("bakery".to_string()),
        };
        let origin = GeoPoint::new(41.125, 16.862).expect("origin");
        let first = list(&store, &opts(), &radius_request(origin, 2.0, filters), 0).expect("list");
        assert_eq!(first.page.total_items, 7);
        let second = list_from_token(&store, &opts(), first.next.as_deref().expect("next"))
            .expect("list");
        assert_eq!(ids(&second), vec![7, 8]);
        assert!(
            second
                .page
                .items
                .iter()
                .all(|s| s.place.categories == vec!["Bakery".to_string()])
        );
    }
}
