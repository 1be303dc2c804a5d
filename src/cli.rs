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

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use crate::transfer::ImportFormat;

#[derive(Parser, Debug)]
#[command(
    name = "placefinder",
    version,
    about = "Find places by city or distance, one page at a time"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new place store
    Init {
        /// Directory that will hold the store
        path: Option<PathBuf>,
    },

    /// Import places from a JSONL or CSV feed
    Import(ImportArgs),

    /// Export every place as JSONL
    Export(ExportArgs),

    /// List places in a city
    City(CityArgs),

    /// List places around a point
    Near(NearArgs),

    /// Follow a navigation token
    Page(PageArgs),

    /// Show one place
    Show(ShowArgs),

    /// Read or change a user's filter settings
    Filter(FilterArgs),

    /// Show stats
    Stats {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Run integrity checks
    Doctor {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Input file (JSONL or CSV)
    pub path: PathBuf,

    /// Feed format; inferred from the file extension when omitted
    #[arg(long, value_enum)]
    pub format: Option<ImportFormat>,

    /// Feed label; places from an earlier import with the same label are replaced
    #[arg(long, default_value = "default")]
    pub source: String,

    /// Output JSON stats
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file (defaults to stdout)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output JSON stats (requires --out)
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Apply this user's saved filters
    #[arg(long)]
    pub user: Option<i64>,

    /// Zero-based page index
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub page: i64,

    /// Print a walking route through the page
    #[arg(long)]
    pub maps: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CityArgs {
    /// City name
    pub city: String,

    #[command(flatten)]
    pub list: ListArgs,
}

#[derive(Args, Debug)]
pub struct NearArgs {
    /// Latitude of the origin
    #[arg(allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the origin
    #[arg(allow_negative_numbers = true)]
    pub lon: f64,

    /// Search radius in kilometers (defaults to the configured radius)
    #[arg(long, allow_negative_numbers = true)]
    pub radius: Option<f64>,

    #[command(flatten)]
    pub list: ListArgs,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// Token printed by a previous listing
    pub token: String,

    /// Print a walking route through the page
    #[arg(long)]
    pub maps: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Place id
    pub id: i64,

    /// Latitude to measure distance from
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude to measure distance from
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// User id
    #[arg(long)]
    pub user: i64,

    /// Hide places rated below this value
    #[arg(long, conflicts_with = "clear_rating", allow_negative_numbers = true)]
    pub min_rating: Option<f64>,

    /// Remove the rating filter
    #[arg(long)]
    pub clear_rating: bool,

    /// Only list places with this category
    #[arg(long, conflicts_with = "clear_category")]
    pub category: Option<String>,

    /// Remove the category filter
    #[arg(long)]
    pub clear_category: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}
