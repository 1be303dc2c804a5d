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

use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::coords::SwapHeuristic;
use crate::error::RequestError;
use crate::page::DEFAULT_PAGE_SIZE;
use crate::query::DEFAULT_MAX_RADIUS_RESULTS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub page_size: usize,
    pub max_radius_results: usize,
    pub default_radius_km: f64,
    pub phone_prefix: String,
    pub coordinate_swap: SwapHeuristic,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("places.db"),
            page_size: DEFAULT_PAGE_SIZE,
            max_radius_results: DEFAULT_MAX_RADIUS_RESULTS,
            default_radius_km: 5.0,
            phone_prefix: "+39".to_string(),
            coordinate_swap: SwapHeuristic::default(),
        }
    }
}

impl Config {
    pub fn checked_page_size(&self) -> Result<NonZeroUsize, RequestError> {
        NonZeroUsize::new(self.page_size).ok_or(RequestError::InvalidPageSize)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigCtx {
    pub root: PathBuf,
    pub config: Config,
}

impl ConfigCtx {
    pub fn load_from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("get current dir")?;
        Self::load_from(&cwd)
    }

    pub fn load_from(start: &Path) -> Result<Self> {
        let config = load_global_config()?;
        let root = find_store_root(start, &config.store_path)
            .ok_or_else(|| anyhow::anyhow!("store not found; run `placefinder init` first"))?;
        Ok(Self { root, config })
    }

    pub fn store_path(&self) -> PathBuf {
        if self.config.store_path.is_absolute() {
            self.config.store_path.clone()
        } else {
            self.root.join(&self.config.store_path)
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            return Some(PathBuf::from(profile).join("AppData").join("Roaming"));
        }
        return None;
    }

    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").ok()?;
        return Some(
            PathBuf::from(home)
                .join("Library")
                .join("Application Support"),
        );
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config"))
}

pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("placefinder").join("placefinder.toml"))
}

pub fn load_global_config() -> Result<Config> {
    let Some(path) = global_config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    read_config(&path)
}

pub fn find_store_root(start: &Path, store_path: &Path) -> Option<PathBuf> {
    if store_path.is_absolute() {
        return store_path
            .exists()
            .then(|| store_path.parent().unwrap_or(store_path).to_path_buf());
    }

    let mut cur = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    loop {
        let candidate = cur.join(store_path);
        if candidate.exists() {
            return Some(cur);
        }
        match cur.parent() {
            Some(parent) => cur = parent.to_path_buf(),
            None => return None,
        }
    }
}

pub fn read_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut config: Config = toml::from_str(&text).context("parse placefinder.toml")?;
    if config.page_size == 0 {
        warn!(path = %path.display(), "page_size must be at least 1; using default");
        config.page_size = DEFAULT_PAGE_SIZE;
    }
    if !config.default_radius_km.is_finite() || config.default_radius_km < 0.0 {
        warn!(path = %path.display(), "default_radius_km is invalid; using default");
        config.default_radius_km = Config::default().default_radius_km;
    }
    Ok(config)
}
