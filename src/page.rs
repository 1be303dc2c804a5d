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

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// One fixed-size window over an ordered result list.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub index: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.total_pages
    }

    /// 1-based position of the first item on this page within the full list.
    pub fn first_ordinal(&self) -> usize {
        self.index * self.page_size + 1
    }
}

/// Slices `items` into the page at `requested`, clamped into
/// `[0, total_pages - 1]`. An empty list still has one (empty) page.
pub fn paginate<T>(items: Vec<T>, requested: i64, page_size: NonZeroUsize) -> Page<T> {
    let page_size = page_size.get();
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let last = i64::try_from(total_pages - 1).unwrap_or(i64::MAX);
    // clamped into [0, last], so the cast back is lossless
    let index = requested.clamp(0, last) as usize;

    let items = items
        .into_iter()
        .skip(index * page_size)
        .take(page_size)
        .collect();
    Page {
        items,
        index,
        page_size,
        total_items,
        total_pages,
    }
}
