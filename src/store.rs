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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use anyhow::Result;
use fs2::FileExt;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use sha2::Digest;
use sha2::Sha256;
use tracing::debug;
use tracing::info;

use crate::coords::RawCoord;
use crate::coords::parse_number;
use crate::model::FilterSettings;
use crate::model::NewPlace;
use crate::model::Place;
use crate::model::RawPosition;
use crate::model::city_key;
use crate::model::split_categories;

/// Read side of the place store, as the search engine sees it.
pub trait PlaceSource {
    /// Places whose city equals `city`, compared case-insensitively.
    fn places_in_city(&self, city: &str) -> Result<Vec<Place>>;

    /// Places with any non-absent raw position, valid or not.
    fn places_with_position(&self) -> Result<Vec<Place>>;
}

/// Saved per-user filter preferences; unknown users get no constraint.
pub trait SettingsSource {
    fn filter_settings(&self, user_id: i64) -> Result<FilterSettings>;
}

pub struct Store {
    pub conn: Connection,
    pub path: PathBuf,
    lock: Option<StoreLock>,
}

struct StoreLock {
    _file: File,
    path: PathBuf,
    mode: StoreMode,
}

impl StoreLock {
    fn new(file: File, path: PathBuf, mode: StoreMode) -> Self {
        Self {
            _file: file,
            path,
            mode,
        }
    }
}

const SCHEMA_VERSION: i64 = 1;

const PLACE_COLUMNS: &str =
    "id, name, city, address, notes, source, lat, lon, rating, last_update, types, phone";

#[derive(Debug, Clone, Copy)]
pub enum StoreMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub place_count: i64,
    pub positioned_count: i64,
    pub city_count: i64,
    pub db_size_bytes: u64,
}

#[derive(Debug)]
pub struct IntegrityReport {
    pub status: String,
    pub stats: StoreStats,
}

impl Store {
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("store already exists at {}", path.display());
        }
        let _lock = Self::acquire_lock(path, StoreMode::ReadWrite)?;
        let conn = Self::open_connection(path, StoreMode::ReadWrite)?;
        Self::apply_pragmas(&conn, StoreMode::ReadWrite)?;
        Self::create_schema(&conn)?;
        Self::set_meta(&conn, "schema_version", &SCHEMA_VERSION.to_string())?;
        Ok(())
    }

    pub fn open(path: &Path, mode: StoreMode) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("store not found at {}", path.display());
        }
        let mut lock = Self::acquire_lock(path, mode)?;
        let mut conn = Self::open_connection(path, mode)?;
        Self::apply_pragmas(&conn, mode)?;
        if matches!(mode, StoreMode::ReadWrite) {
            Self::create_schema(&conn)?;
            Self::migrate(&conn)?;
            return Ok(Self {
                conn,
                path: path.to_path_buf(),
                lock: Some(lock),
            });
        }

        let version = Self::schema_version(&conn)?;
        if version != SCHEMA_VERSION {
            debug!(version, "store schema is out of date; upgrading");
            drop(conn);
            drop(lock);
            let lock_rw = Self::acquire_lock(path, StoreMode::ReadWrite)?;
            let conn_rw = Self::open_connection(path, StoreMode::ReadWrite)?;
            Self::apply_pragmas(&conn_rw, StoreMode::ReadWrite)?;
            Self::create_schema(&conn_rw)?;
            Self::migrate(&conn_rw)?;
            drop(conn_rw);
            drop(lock_rw);

            lock = Self::acquire_lock(path, StoreMode::ReadOnly)?;
            conn = Self::open_connection(path, StoreMode::ReadOnly)?;
            Self::apply_pragmas(&conn, StoreMode::ReadOnly)?;
        }

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            lock: Some(lock),
        })
    }

    fn open_connection(path: &Path, mode: StoreMode) -> Result<Connection> {
        let flags = match mode {
            StoreMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            StoreMode::ReadWrite => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        };
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("open {}", path.display()))?;
        conn.busy_timeout(Duration::from_millis(5000))
            .context("set busy timeout")?;
        Ok(conn)
    }

    fn apply_pragmas(conn: &Connection, mode: StoreMode) -> Result<()> {
        if matches!(mode, StoreMode::ReadWrite) {
            conn.execute_batch("PRAGMA journal_mode=DELETE;\nPRAGMA synchronous=NORMAL;")
                .context("apply pragmas")?;
        }
        Ok(())
    }

    fn lock_path_for(path: &Path) -> Result<PathBuf> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string_lossy().as_bytes());
        let hash = hex::encode(hasher.finalize());
        let mut dir = std::env::temp_dir();
        dir.push("placefinder");
        fs::create_dir_all(&dir).with_context(|| format!("create lock dir {}", dir.display()))?;
        Ok(dir.join(format!("placefinder-{hash}.lock")))
    }

    fn acquire_lock(path: &Path, mode: StoreMode) -> Result<StoreLock> {
        let lock_path = Self::lock_path_for(path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("open lock file {}", lock_path.display()))?;
        let deadline = Instant::now() + Duration::from_millis(5000);
        loop {
            let locked = match mode {
                StoreMode::ReadOnly => {
                    FileExt::try_lock_shared(&file).map_err(|err| err.to_string())
                }
                StoreMode::ReadWrite => {
                    FileExt::try_lock_exclusive(&file).map_err(|err| err.to_string())
                }
            };
            match locked {
                Ok(()) => return Ok(StoreLock::new(file, lock_path, mode)),
                Err(_) if Instant::now() >= deadline => {
                    let mode_label = match mode {
                        StoreMode::ReadOnly => "read",
                        StoreMode::ReadWrite => "write",
                    };
                    anyhow::bail!(
                        "store is locked for {mode_label} access; another process may be using {}",
                        path.display()
                    );
                }
                Err(_) => {
                    sleep(Duration::from_millis(50));
                }
            }
        }
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (\n  key TEXT PRIMARY KEY,\n  value TEXT\n);\n\nCREATE TABLE IF NOT EXISTS place (\n  id INTEGER PRIMARY KEY AUTOINCREMENT,\n  name TEXT NOT NULL,\n  city TEXT NOT NULL,\n  city_key TEXT NOT NULL,\n  address TEXT,\n  notes TEXT,\n  source TEXT NOT NULL,\n  lat,\n  lon,\n  rating REAL,\n  last_update TEXT,\n  types TEXT,\n  phone TEXT\n);\n\nCREATE INDEX IF NOT EXISTS idx_place_city_key ON place(city_key);\nCREATE INDEX IF NOT EXISTS idx_place_source ON place(source);\n\nCREATE TABLE IF NOT EXISTS user_settings (\n  user_id INTEGER PRIMARY KEY,\n  min_rating REAL,\n  category TEXT\n);",
        )
        .context("create schema")?;
        Ok(())
    }

    fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .context("set meta")?;
        Ok(())
    }

    fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                params![name],
                |row| row.get(0),
            )
            .context("check table")?;
        Ok(count > 0)
    }

    fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .context("table info")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for row in rows {
            if row?.eq_ignore_ascii_case(column) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn schema_version(conn: &Connection) -> Result<i64> {
        if !Self::table_exists(conn, "meta")? {
            return Ok(0);
        }
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key='schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("read schema_version")?;
        Ok(value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0))
    }

    fn ensure_settings_category_column(conn: &Connection) -> Result<()> {
        if !Self::column_exists(conn, "user_settings", "category")? {
            conn.execute("ALTER TABLE user_settings ADD COLUMN category TEXT", [])
                .context("add user_settings.category column")?;
        }
        Ok(())
    }

    /// Copies rows of the legacy `restaurants` table into `place`. Historical
    /// variants stored coordinates as REAL or TEXT and may lack `types` or
    /// `phone`; missing columns become NULL.
    fn import_legacy_restaurants(conn: &Connection) -> Result<usize> {
        if !Self::table_exists(conn, "restaurants")? {
            return Ok(0);
        }
        let optional = |column: &str| -> Result<&'static str> {
            Ok(match (column, Self::column_exists(conn, "restaurants", column)?) {
                ("types", true) => "types",
                ("phone", true) => "phone",
                ("last_update", true) => "last_update",
                ("source", true) => "source",
                _ => "NULL",
            })
        };
        let sql = format!(
            "SELECT id, name, city, address, notes, {source}, lat, lon, rating, {last_update}, {types}, {phone} FROM restaurants ORDER BY id ASC",
            source = optional("source")?,
            last_update = optional("last_update")?,
            types = optional("types")?,
            phone = optional("phone")?,
        );

        let mut stmt = conn.prepare(&sql).context("read legacy restaurants")?;
        let rows = stmt.query_map([], |row| {
            let mut place = map_place_row(row)?;
            if place.source.is_empty() {
                place.source = "legacy".to_string();
            }
            Ok(place)
        })?;
        let mut copied = 0usize;
        for row in rows {
            let place = row?;
            if place.name.trim().is_empty() || place.city.trim().is_empty() {
                continue;
            }
            conn.execute(
                "INSERT OR IGNORE INTO place (id, name, city, city_key, address, notes, source, lat, lon, rating, last_update, types, phone) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    place.id,
                    place.name,
                    place.city,
                    city_key(&place.city),
                    place.address,
                    place.notes,
                    place.source,
                    raw_to_sql(&place.position.lat),
                    raw_to_sql(&place.position.lon),
                    place.rating,
                    place.last_update,
                    join_categories(&place.categories),
                    place.phone,
                ],
            )?;
            copied += 1;
        }
        Ok(copied)
    }

    fn migrate(conn: &Connection) -> Result<()> {
        let version = Self::schema_version(conn)?;
        if version > SCHEMA_VERSION {
            anyhow::bail!(
                "store schema version {} is newer than supported {}",
                version,
                SCHEMA_VERSION
            );
        }
        if version == SCHEMA_VERSION {
            return Ok(());
        }

        Self::create_schema(conn)?;
        Self::ensure_settings_category_column(conn)?;
        let copied = Self::import_legacy_restaurants(conn)?;
        if copied > 0 {
            info!(copied, "migrated legacy restaurants into place table");
        }
        Self::set_meta(conn, "schema_version", &SCHEMA_VERSION.to_string())?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let place_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM place", [], |row| row.get(0))
            .context("count places")?;
        let positioned_count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM place WHERE lat IS NOT NULL AND lon IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .context("count positioned places")?;
        let city_count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT city_key) FROM place", [], |row| {
                row.get(0)
            })
            .context("count cities")?;
        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        Ok(StoreStats {
            place_count,
            positioned_count,
            city_count,
            db_size_bytes,
        })
    }

    /// Latest `last_update` in the store; changes whenever an import lands.
    pub fn snapshot_token(&self) -> Result<String> {
        let token: Option<String> = self
            .conn
            .query_row("SELECT MAX(last_update) FROM place", [], |row| row.get(0))
            .context("snapshot token")?;
        Ok(token.unwrap_or_default())
    }

    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let status: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .context("integrity_check")?;
        let stats = self.stats()?;
        Ok(IntegrityReport { status, stats })
    }

    pub fn place_by_id(&self, id: i64) -> Result<Option<Place>> {
        self.conn
            .query_row(
                &format!("SELECT {PLACE_COLUMNS} FROM place WHERE id = ?1"),
                params![id],
                map_place_row,
            )
            .optional()
            .context("read place")
    }

    pub fn all_places(&self) -> Result<Vec<Place>> {
        self.query_places(&format!("SELECT {PLACE_COLUMNS} FROM place ORDER BY id ASC"), [])
    }

    fn query_places(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Place>> {
        let mut stmt = self.conn.prepare(sql).context("prepare place query")?;
        let rows = stmt.query_map(args, map_place_row)?;
        let mut places = Vec::new();
        for row in rows {
            places.push(row?);
        }
        Ok(places)
    }

    pub fn insert_place(&self, source: &str, place: &NewPlace) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO place (name, city, city_key, address, notes, source, lat, lon, rating, last_update, types, phone) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    place.name,
                    place.city,
                    city_key(&place.city),
                    place.address,
                    place.notes,
                    source,
                    raw_to_sql(&place.position.lat),
                    raw_to_sql(&place.position.lon),
                    place.rating,
                    place.last_update,
                    join_categories(&place.categories),
                    place.phone,
                ],
            )
            .context("insert place")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_source(&self, source: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM place WHERE source = ?1", params![source])
            .context("delete places by source")
    }

    pub fn set_min_rating(&self, user_id: i64, min_rating: Option<f64>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO user_settings (user_id, min_rating) VALUES (?1, ?2)\n                 ON CONFLICT(user_id) DO UPDATE SET min_rating = excluded.min_rating",
                params![user_id, min_rating],
            )
            .context("set min rating")?;
        self.drop_empty_settings(user_id)
    }

    pub fn set_category(&self, user_id: i64, category: Option<&str>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO user_settings (user_id, category) VALUES (?1, ?2)\n                 ON CONFLICT(user_id) DO UPDATE SET category = excluded.category",
                params![user_id, category],
            )
            .context("set category")?;
        self.drop_empty_settings(user_id)
    }

    fn drop_empty_settings(&self, user_id: i64) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM user_settings WHERE user_id = ?1 AND min_rating IS NULL AND category IS NULL",
                params![user_id],
            )
            .context("clear user settings")?;
        Ok(())
    }
}

impl PlaceSource for Store {
    fn places_in_city(&self, city: &str) -> Result<Vec<Place>> {
        self.query_places(
            &format!("SELECT {PLACE_COLUMNS} FROM place WHERE city_key = ?1 ORDER BY id ASC"),
            params![city_key(city)],
        )
    }

    fn places_with_position(&self) -> Result<Vec<Place>> {
        self.query_places(
            &format!(
                "SELECT {PLACE_COLUMNS} FROM place WHERE lat IS NOT NULL AND lon IS NOT NULL ORDER BY id ASC"
            ),
            [],
        )
    }
}

impl SettingsSource for Store {
    fn filter_settings(&self, user_id: i64) -> Result<FilterSettings> {
        let row: Option<(Option<f64>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT min_rating, category FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("read user settings")?;
        let (min_rating, category) = row.unwrap_or_default();
        Ok(FilterSettings {
            min_rating,
            category: category.filter(|c| !c.trim().is_empty()),
        })
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Some(lock) = self.lock.take() {
            let path = lock.path.clone();
            let mode = lock.mode;
            drop(lock);
            if matches!(mode, StoreMode::ReadWrite) {
                let _ = fs::remove_file(path);
            }
        }
    }
}

fn map_place_row(row: &Row) -> rusqlite::Result<Place> {
    let types: Option<String> = row.get(10)?;
    Ok(Place {
        id: row.get(0)?,
        name: row.get(1)?,
        city: row.get(2)?,
        address: non_empty(row.get(3)?),
        notes: non_empty(row.get(4)?),
        source: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        position: RawPosition {
            lat: row.get(6)?,
            lon: row.get(7)?,
        },
        rating: parse_number(&row.get::<_, RawCoord>(8)?),
        last_update: non_empty(row.get(9)?),
        categories: types.as_deref().map(split_categories).unwrap_or_default(),
        phone: non_empty(row.get(11)?),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn raw_to_sql(raw: &RawCoord) -> rusqlite::types::Value {
    use rusqlite::types::Value;
    match raw {
        RawCoord::Number(n) => Value::Real(*n),
        RawCoord::Text(text) if !text.trim().is_empty() => Value::Text(text.clone()),
        _ => Value::Null,
    }
}

fn join_categories(categories: &[String]) -> Option<String> {
    (!categories.is_empty()).then(|| categories.join(", "))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection as SqlConnection;
    use tempfile::tempdir;

    use super::*;

    fn new_place(name: &str, city: &str, rating: Option<f64>, lat: RawCoord, lon: RawCoord) -> NewPlace {
        NewPlace {
            name: name.to_string(),
            city: city.to_string(),
            address: None,
            notes: None,
            rating,
            categories: vec!["Pizzeria".to_string()],
            position: RawPosition { lat, lon },
            phone: None,
            last_update: None,
        }
    }

    #[test]
    fn shared_lock_allows_multiple_readers() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("places.db");
        Store::init(&db_path)?;

        let store_a = Store::open(&db_path, StoreMode::ReadOnly)?;
        let store_b = Store::open(&db_path, StoreMode::ReadOnly)?;

        store_a.stats()?;
        store_b.stats()?;
        Ok(())
    }

    #[test]
    fn city_lookup_ignores_case_and_keeps_raw_positions() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("places.db");
        Store::init(&db_path)?;
        let store = Store::open(&db_path, StoreMode::ReadWrite)?;
        store.insert_place(
            "app",
            &new_place("Uno", "Città", Some(4.5), "41,117".into(), RawCoord::Number(16.871)),
        )?;
        store.insert_place(
            "app",
            &new_place("Due", "Roma", None, RawCoord::Missing, RawCoord::Missing),
        )?;

        let found = store.places_in_city("CITTÀ")?;
        assert_eq!(found.len(), 1);
        let place = &found[0];
        assert_eq!(place.name, "Uno");
        assert_eq!(place.categories, vec!["Pizzeria"]);
        assert_eq!(place.position.lat, RawCoord::Text("41,117".to_string()));
        assert_eq!(place.position.lon, RawCoord::Number(16.871));

        let positioned = store.places_with_position()?;
        assert_eq!(positioned.len(), 1);
        assert_eq!(store.stats()?.city_count, 2);
        Ok(())
    }

    #[test]
    fn settings_default_to_no_constraint() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("places.db");
        Store::init(&db_path)?;
        let store = Store::open(&db_path, StoreMode::ReadWrite)?;

        assert_eq!(store.filter_settings(7)?, FilterSettings::default());
        store.set_min_rating(7, Some(4.0))?;
        store.set_category(7, Some("bakery"))?;
        assert_eq!(
            store.filter_settings(7)?,
            FilterSettings {
                min_rating: Some(4.0),
                category: Some("bakery".to_string()),
            }
        );
        store.set_min_rating(7, None)?;
        store.set_category(7, None)?;
        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM user_settings", [], |row| row.get(0))?;
        assert_eq!(rows, 0);
        Ok(())
    }

    #[test]
    fn migrates_legacy_restaurants_table() -> Result<()> {
        let dir = tempdir()?;
        let db_path = dir.path().join("places.db");
        let conn = SqlConnection::open(&db_path)?;
        conn.execute_batch(
            "CREATE TABLE restaurants (\n  id INTEGER PRIMARY KEY AUTOINCREMENT,\n  name TEXT NOT NULL,\n  city TEXT NOT NULL,\n  address TEXT,\n  notes TEXT,\n  source TEXT NOT NULL,\n  lat REAL,\n  lon REAL,\n  rating REAL,\n  last_update TEXT\n);\n\nCREATE TABLE user_settings (\n  user_id INTEGER PRIMARY KEY,\n  min_rating REAL\n);\n\nINSERT INTO restaurants (name, city, address, notes, source, lat, lon, rating, last_update)\nVALUES ('Panificio', 'BARI', 'Via Sparano 1', NULL, 'app', 41.117, 16.871, 4.6, '2025-01-01');\nINSERT INTO restaurants (name, city, address, notes, source, lat, lon, rating, last_update)\nVALUES ('Trattoria', 'Lecce', NULL, NULL, 'manual', NULL, NULL, NULL, NULL);\nINSERT INTO user_settings (user_id, min_rating) VALUES (42, 4.0);",
        )?;
        drop(conn);

        let store = Store::open(&db_path, StoreMode::ReadOnly)?;
        let version: String = store
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key='schema_version'",
                [],
                |row| row.get(0),
            )
            .context("schema_version")?;
        assert_eq!(version, SCHEMA_VERSION.to_string());

        let bari = store.places_in_city("bari")?;
        assert_eq!(bari.len(), 1);
        assert_eq!(bari[0].name, "Panificio");
        assert_eq!(bari[0].position.lat, RawCoord::Number(41.117));
        assert!(bari[0].phone.is_none());
        assert!(bari[0].categories.is_empty());
        assert_eq!(store.stats()?.place_count, 2);

        let settings = store.filter_settings(42)?;
        assert_eq!(settings.min_rating, Some(4.0));
        assert_eq!(settings.category, None);
        Ok(())
    }
}
