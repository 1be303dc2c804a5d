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

mod cli;
mod config;
mod coords;
mod distance;
mod error;
mod listing;
mod model;
mod output;
mod page;
mod query;
mod store;
mod token;
mod transfer;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::FilterArgs;
use crate::cli::ListArgs;
use crate::config::Config;
use crate::config::ConfigCtx;
use crate::coords::normalize_point;
use crate::coords::normalize_position;
use crate::error::RequestError;
use crate::listing::Listing;
use crate::listing::ListingOptions;
use crate::model::FilterSettings;
use crate::model::GeoPoint;
use crate::model::SearchRequest;
use crate::output::JsonResponse;
use crate::output::StatsOut;
use crate::output::print_json;
use crate::store::SettingsSource;
use crate::store::Store;
use crate::store::StoreMode;
use crate::transfer::ImportFormat;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr so `--json` output stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("PLACEFINDER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Import(args) => {
            handle_result(cmd_import(args.path, args.format, &args.source, args.json), args.json)
        }
        Commands::Export(args) => handle_result(cmd_export(args.out, args.json), args.json),
        Commands::City(args) => {
            let json = args.list.json;
            handle_result(cmd_city(&args.city, &args.list), json)
        }
        Commands::Near(args) => {
            let json = args.list.json;
            handle_result(cmd_near(args.lat, args.lon, args.radius, &args.list), json)
        }
        Commands::Page(args) => {
            handle_result(cmd_page(&args.token, args.maps, args.json), args.json)
        }
        Commands::Show(args) => handle_result(
            cmd_show(args.id, args.lat.zip(args.lon), args.json),
            args.json,
        ),
        Commands::Filter(args) => {
            let json = args.json;
            handle_result(cmd_filter(args), json)
        }
        Commands::Stats { json } => handle_result(cmd_stats(json), json),
        Commands::Doctor { json } => handle_result(cmd_doctor(json), json),
    }
}

fn handle_result(result: Result<()>, json: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if json {
                let resp = JsonResponse::error(error_code(&err), &err.to_string());
                print_json(&resp)?;
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<RequestError>().is_some() {
        "invalid_request"
    } else if err.downcast_ref::<error::TokenError>().is_some() {
        "invalid_token"
    } else {
        "error"
    }
}

fn cmd_init(path: Option<PathBuf>) -> Result<()> {
    let root = path.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&root).with_context(|| format!("create dir {root:?}"))?;

    let config = config::load_global_config()?;
    let store_path = if config.store_path.is_absolute() {
        config.store_path.clone()
    } else {
        root.join(&config.store_path)
    };
    Store::init(&store_path)?;

    println!("Initialized place store at {}", store_path.display());
    Ok(())
}

fn cmd_import(
    path: PathBuf,
    format: Option<ImportFormat>,
    source: &str,
    json: bool,
) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadWrite)?;
    let file = std::fs::File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let started = Instant::now();
    let format = format.unwrap_or_else(|| ImportFormat::from_path(&path));
    let report = transfer::import_places(&store, &ctx.config, source, format, file)?;

    if json {
        let stats = store.stats()?;
        let resp = JsonResponse::ok()
            .with_stats(StatsOut {
                took_ms: started.elapsed().as_millis() as i64,
                total_hits: report.inserted as i64,
                place_count: Some(stats.place_count),
                positioned_count: Some(report.with_coordinates as i64),
                snapshot: store.snapshot_token().ok(),
                ..Default::default()
            })
            .with_warnings(report.warnings);
        print_json(&resp)?;
    } else {
        println!(
            "Imported {} places from {} ({} with coordinates, {} skipped, {} replaced)",
            report.inserted,
            path.display(),
            report.with_coordinates,
            report.skipped,
            report.replaced
        );
        for warn in report.warnings {
            eprintln!("warning: {warn}");
        }
    }
    Ok(())
}

fn cmd_export(out: Option<PathBuf>, json: bool) -> Result<()> {
    if json && out.is_none() {
        anyhow::bail!("--json requires --out for export");
    }
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;

    let stats = if let Some(path) = out {
        let file =
            std::fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
        transfer::export_store(&store, file)?
    } else {
        let stdout = std::io::stdout();
        let handle = stdout.lock();
        transfer::export_store(&store, handle)?
    };

    if json {
        let resp = JsonResponse::ok().with_stats(StatsOut {
            total_hits: stats.places as i64,
            place_count: Some(stats.places as i64),
            snapshot: store.snapshot_token().ok(),
            ..Default::default()
        });
        print_json(&resp)?;
    }
    Ok(())
}

fn user_filters(store: &Store, user: Option<i64>) -> Result<FilterSettings> {
    match user {
        Some(user_id) => store.filter_settings(user_id),
        None => Ok(FilterSettings::default()),
    }
}

fn cmd_city(city: &str, args: &ListArgs) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let filters = user_filters(&store, args.user)?;
    let opts = ListingOptions::from_config(&ctx.config)?;
    let started = Instant::now();
    let listing = listing::list(
        &store,
        &opts,
        &listing::city_request(city, filters),
        args.page,
    )?;
    emit_listing(&listing, &ctx.config, started, args.maps, args.json)
}

fn cmd_near(lat: f64, lon: f64, radius: Option<f64>, args: &ListArgs) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let filters = user_filters(&store, args.user)?;
    let opts = ListingOptions::from_config(&ctx.config)?;
    let radius_km = radius.unwrap_or(ctx.config.default_radius_km);
    let started = Instant::now();
    let listing = listing::list(
        &store,
        &opts,
        &listing::radius_request(GeoPoint { lat, lon }, radius_km, filters),
        args.page,
    )?;
    emit_listing(&listing, &ctx.config, started, args.maps, args.json)
}

fn cmd_page(token: &str, maps: bool, json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let opts = ListingOptions::from_config(&ctx.config)?;
    let started = Instant::now();
    let listing = listing::list_from_token(&store, &opts, token)?;
    emit_listing(&listing, &ctx.config, started, maps, json)
}

fn emit_listing(
    listing: &Listing,
    config: &Config,
    started: Instant,
    maps: bool,
    json: bool,
) -> Result<()> {
    let swap = &config.coordinate_swap;
    let route = if maps {
        let origin = match &listing.request {
            SearchRequest::Radius { origin, .. } => normalize_point(*origin, swap),
            SearchRequest::City { .. } => None,
        };
        let places: Vec<_> = listing.page.items.iter().map(|s| &s.place).collect();
        output::route_maps_url(&places, origin, swap)
    } else {
        None
    };

    if json {
        let resp = JsonResponse::ok()
            .with_listing(listing, swap)
            .with_maps_url(route)
            .with_stats(StatsOut {
                took_ms: started.elapsed().as_millis() as i64,
                total_hits: listing.page.total_items as i64,
                ..Default::default()
            });
        print_json(&resp)?;
    } else {
        output::print_listing(listing);
        if maps {
            match route {
                Some(url) => println!("route: {url}"),
                None => println!("route: no place on this page has coordinates"),
            }
        }
    }
    Ok(())
}

fn cmd_show(id: i64, from: Option<(f64, f64)>, json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let place = store
        .place_by_id(id)?
        .ok_or_else(|| anyhow::anyhow!("place {id} not found"))?;

    let swap = &ctx.config.coordinate_swap;
    let position = normalize_position(&place.position, swap);
    let distance_km = from.and_then(|(lat, lon)| {
        distance::distance_km(normalize_point(GeoPoint { lat, lon }, swap), position)
    });
    let maps_url = output::place_maps_url(&place, swap);

    if json {
        let tel = place
            .phone
            .as_deref()
            .and_then(|phone| output::normalize_phone_for_tel(phone, &ctx.config.phone_prefix));
        let resp = JsonResponse::ok()
            .with_place(json!({
                "id": place.id,
                "name": place.name,
                "city": place.city,
                "address": place.address,
                "notes": place.notes,
                "rating": place.rating,
                "categories": place.categories,
                "position": position,
                "distance_km": distance_km,
                "phone": place.phone,
                "tel": tel,
                "source": place.source,
                "last_update": place.last_update,
            }))
            .with_maps_url(Some(maps_url));
        print_json(&resp)?;
    } else {
        output::print_place(&place, distance_km, &ctx.config.phone_prefix, &maps_url);
    }
    Ok(())
}

fn cmd_filter(args: FilterArgs) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadWrite)?;

    if let Some(rating) = args.min_rating {
        if !rating.is_finite() {
            return Err(RequestError::InvalidMinRating(rating).into());
        }
        store.set_min_rating(args.user, Some(rating))?;
    } else if args.clear_rating {
        store.set_min_rating(args.user, None)?;
    }

    if let Some(category) = args.category.as_deref() {
        let category = category.trim();
        store.set_category(args.user, (!category.is_empty()).then_some(category))?;
    } else if args.clear_category {
        store.set_category(args.user, None)?;
    }

    let settings = store.filter_settings(args.user)?;
    if args.json {
        print_json(&JsonResponse::ok().with_settings(settings))?;
    } else {
        let rating = settings
            .min_rating
            .map(|r| format!("at least {}", output::format_rating(Some(r))))
            .unwrap_or_else(|| "any".to_string());
        let category = settings.category.as_deref().unwrap_or("any");
        println!("User {}: rating {rating}, category {category}", args.user);
    }
    Ok(())
}

fn cmd_stats(json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let stats = store.stats()?;

    if json {
        let resp = JsonResponse::ok().with_stats(StatsOut {
            place_count: Some(stats.place_count),
            positioned_count: Some(stats.positioned_count),
            city_count: Some(stats.city_count),
            db_size_bytes: Some(stats.db_size_bytes),
            snapshot: store.snapshot_token().ok(),
            ..Default::default()
        });
        print_json(&resp)?;
    } else {
        println!("Places: {}", stats.place_count);
        println!("With coordinates: {}", stats.positioned_count);
        println!("Cities: {}", stats.city_count);
        println!("DB size: {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn cmd_doctor(json: bool) -> Result<()> {
    let ctx = ConfigCtx::load_from_cwd()?;
    let store = Store::open(&ctx.store_path(), StoreMode::ReadOnly)?;
    let report = store.integrity_check()?;
    let invalid = store
        .all_places()?
        .iter()
        .filter(|place| {
            !place.position.is_absent()
                && normalize_position(&place.position, &ctx.config.coordinate_swap).is_none()
        })
        .count();
    let mut warnings = Vec::new();
    if invalid > 0 {
        warnings.push(format!("{invalid} places have unusable coordinates"));
    }

    if json {
        let resp = JsonResponse::ok()
            .with_stats(StatsOut {
                place_count: Some(report.stats.place_count),
                positioned_count: Some(report.stats.positioned_count),
                city_count: Some(report.stats.city_count),
                db_size_bytes: Some(report.stats.db_size_bytes),
                snapshot: store.snapshot_token().ok(),
                ..Default::default()
            })
            .with_warnings(warnings);
        print_json(&resp)?;
    } else {
        println!("Integrity: {}", report.status);
        for warn in warnings {
            println!("warning: {warn}");
        }
    }
    Ok(())
}
