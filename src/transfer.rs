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

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::coords::RawCoord;
use crate::coords::normalize_position;
use crate::coords::parse_number;
use crate::model::NewPlace;
use crate::model::RawPosition;
use crate::model::split_categories;
use crate::store::Store;

#[derive(Debug, Serialize)]
struct ExportPlace<'a> {
    id: i64,
    name: &'a str,
    city: &'a str,
    address: Option<&'a str>,
    notes: Option<&'a str>,
    source: &'a str,
    lat: &'a RawCoord,
    lon: &'a RawCoord,
    rating: Option<f64>,
    last_update: Option<&'a str>,
    types: &'a [String],
    phone: Option<&'a str>,
}

/// Categories arrive either as one delimited string or as a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypesField {
    List(Vec<String>),
    Text(String),
}

/// One line of an import feed. Field names vary between feeds.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    #[serde(default, alias = "Name", alias = "nome", alias = "Nome")]
    name: Option<String>,
    #[serde(
        default,
        alias = "City",
        alias = "città",
        alias = "Città",
        alias = "citta",
        alias = "Citta"
    )]
    city: Option<String>,
    #[serde(default, alias = "Address", alias = "indirizzo", alias = "Indirizzo")]
    address: Option<String>,
    #[serde(
        default,
        alias = "Notes",
        alias = "note",
        alias = "Note",
        alias = "descrizione",
        alias = "Descrizione"
    )]
    notes: Option<String>,
    #[serde(default, alias = "Lat", alias = "LAT", alias = "latitude", alias = "Latitude")]
    lat: RawCoord,
    #[serde(
        default,
        alias = "Lon",
        alias = "LON",
        alias = "lng",
        alias = "Lng",
        alias = "longitude",
        alias = "Longitude"
    )]
    lon: RawCoord,
    #[serde(
        default,
        alias = "Rating",
        alias = "stars",
        alias = "Stars",
        alias = "valutazione",
        alias = "Valutazione"
    )]
    rating: RawCoord,
    #[serde(
        default,
        alias = "Types",
        alias = "type",
        alias = "Type",
        alias = "tipo",
        alias = "Tipo",
        alias = "tipologia",
        alias = "Tipologia",
        alias = "categories"
    )]
    types: Option<TypesField>,
    #[serde(default, alias = "Phone", alias = "telefono", alias = "Telefono")]
    phone: Option<String>,
    #[serde(
        default,
        alias = "LastUpdate",
        alias = "lastUpdate",
        alias = "aggiornato",
        alias = "Aggiornato"
    )]
    last_update: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ImportRecord {
    fn into_new_place(self, imported_at: &str) -> Option<NewPlace> {
        let name = clean(self.name)?;
        let city = clean(self.city)?;
        let categories = match self.types {
            Some(TypesField::List(labels)) => labels
                .iter()
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect(),
            Some(TypesField::Text(text)) => split_categories(&text),
            None => Vec::new(),
        };
        Some(NewPlace {
            name,
            city,
            address: clean(self.address),
            notes: clean(self.notes),
            rating: parse_number(&self.rating),
            categories,
            position: RawPosition {
                lat: self.lat,
                lon: self.lon,
            },
            phone: clean(self.phone),
            last_update: clean(self.last_update).or_else(|| Some(imported_at.to_string())),
        })
    }
}

/// Column aliases for CSV feeds, most preferred first. A row takes the first
/// non-empty cell among a field's aliases.
const CSV_COLUMNS: &[(&str, &[&str])] = &[
    ("name", &["name", "Name", "nome", "Nome"]),
    ("city", &["city", "City", "città", "Città", "citta", "Citta"]),
    ("address", &["address", "Address", "indirizzo", "Indirizzo"]),
    (
        "notes",
        &["notes", "Notes", "note", "Note", "descrizione", "Descrizione"],
    ),
    ("lat", &["lat", "Lat", "LAT", "latitude", "Latitude"]),
    (
        "lon",
        &["lon", "Lon", "LON", "lng", "Lng", "longitude", "Longitude"],
    ),
    (
        "rating",
        &["rating", "Rating", "stars", "Stars", "valutazione", "Valutazione"],
    ),
    (
        "types",
        &[
            "types",
            "Types",
            "type",
            "Type",
            "tipo",
            "Tipo",
            "tipologia",
            "Tipologia",
            "categories",
        ],
    ),
    ("phone", &["phone", "Phone", "telefono", "Telefono"]),
    (
        "last_update",
        &["last_update", "LastUpdate", "lastUpdate", "aggiornato", "Aggiornato"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportFormat {
    Jsonl,
    Csv,
}

impl ImportFormat {
    /// `.csv` files are read as CSV, anything else as JSONL.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ImportFormat::Csv,
            _ => ImportFormat::Jsonl,
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub inserted: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub with_coordinates: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct TransferStats {
    pub places: usize,
}

pub fn export_store(store: &Store, mut writer: impl Write) -> Result<TransferStats> {
    let mut places = 0usize;
    for place in store.all_places()? {
        let line = serde_json::to_string(&ExportPlace {
            id: place.id,
            name: &place.name,
            city: &place.city,
            address: place.address.as_deref(),
            notes: place.notes.as_deref(),
            source: &place.source,
            lat: &place.position.lat,
            lon: &place.position.lon,
            rating: place.rating,
            last_update: place.last_update.as_deref(),
            types: &place.categories,
            phone: place.phone.as_deref(),
        })?;
        writeln!(writer, "{}", line)?;
        places += 1;
    }
    Ok(TransferStats { places })
}

/// Imports a feed, replacing every place previously imported under
/// `source`. The whole file lands in one transaction or not at all.
pub fn import_places(
    store: &Store,
    config: &Config,
    source: &str,
    format: ImportFormat,
    reader: impl Read,
) -> Result<ImportReport> {
    let imported_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format import timestamp")?;
    let mut batch = ImportBatch {
        store,
        config,
        source,
        imported_at,
        report: ImportReport::default(),
    };

    store.conn.execute_batch("BEGIN IMMEDIATE")?;
    let res = (|| -> Result<()> {
        batch.report.replaced = store.delete_source(source)?;
        match format {
            ImportFormat::Jsonl => read_jsonl(&mut batch, reader),
            ImportFormat::Csv => read_csv(&mut batch, reader),
        }
    })();

    if let Err(err) = res {
        store.conn.execute_batch("ROLLBACK")?;
        return Err(err);
    }

    store.conn.execute_batch("COMMIT")?;
    let report = batch.report;
    info!(
        source,
        ?format,
        inserted = report.inserted,
        replaced = report.replaced,
        skipped = report.skipped,
        with_coordinates = report.with_coordinates,
        "import complete"
    );
    Ok(report)
}

struct ImportBatch<'a> {
    store: &'a Store,
    config: &'a Config,
    source: &'a str,
    imported_at: String,
    report: ImportReport,
}

impl ImportBatch<'_> {
    fn ingest(&mut self, record: ImportRecord, label: &str) -> Result<()> {
        let Some(place) = record.into_new_place(&self.imported_at) else {
            warn!(at = label, "import record without name or city");
            self.report
                .warnings
                .push(format!("{label}: missing name or city; skipped"));
            self.report.skipped += 1;
            return Ok(());
        };
        if normalize_position(&place.position, &self.config.coordinate_swap).is_some() {
            self.report.with_coordinates += 1;
        }
        self.store.insert_place(self.source, &place)?;
        self.report.inserted += 1;
        Ok(())
    }
}

fn read_jsonl(batch: &mut ImportBatch<'_>, reader: impl Read) -> Result<()> {
    let mut buf = BufReader::new(reader);
    let mut line = String::new();
    let mut line_no = 0usize;
    loop {
        line.clear();
        let bytes = buf.read_line(&mut line)?;
        if bytes == 0 {
            break;
        }
        line_no += 1;
        let trimmed = line.trim().trim_start_matches('\u{feff}');
        if trimmed.is_empty() {
            continue;
        }
        let record: ImportRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parse import line {line_no}: {trimmed}"))?;
        batch.ingest(record, &format!("line {line_no}"))?;
    }
    Ok(())
}

fn read_csv(batch: &mut ImportBatch<'_>, reader: impl Read) -> Result<()> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = csv
        .headers()
        .context("read csv header row")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("csv import has no header row");
    }
    // field name -> candidate column indices, in alias order
    let columns: Vec<(&str, Vec<usize>)> = CSV_COLUMNS
        .iter()
        .map(|(field, aliases)| {
            let found = aliases
                .iter()
                .filter_map(|alias| headers.iter().position(|h| h == alias))
                .collect();
            (*field, found)
        })
        .collect();

    for row in csv.records() {
        let row = row.context("read csv row")?;
        let line_no = row.position().map_or(0, |pos| pos.line());
        let mut fields = serde_json::Map::new();
        for (field, candidates) in &columns {
            let value = candidates
                .iter()
                .filter_map(|&idx| row.get(idx))
                .map(str::trim)
                .find(|cell| !cell.is_empty());
            if let Some(value) = value {
                fields.insert((*field).to_string(), value.into());
            }
        }
        let record: ImportRecord = serde_json::from_value(fields.into())
            .with_context(|| format!("parse import row {line_no}"))?;
        batch.ingest(record, &format!("row {line_no}"))?;
    }
    Ok(())
}
