// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ClientRecord, RecordError};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_SIZE_OPTIONS: [usize; 3] = [5, 10, 25];

/// Records whose owner name, license number, or phone contain `query`,
/// ignoring case. Whitespace in the query is matched as typed; only the empty
/// query keeps everything. Order is preserved.
pub fn search_filter<'a>(records: &'a [ClientRecord], query: &str) -> Vec<&'a ClientRecord> {
    if query.is_empty() {
        return records.iter().collect();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| record.matches_lowercase(&needle))
        .collect()
}

/// The `[page * size, page * size + size)` slice of `rows`, clamped.
pub fn page_window<T>(rows: &[T], page: usize, size: usize) -> &[T] {
    let start = page.saturating_mul(size).min(rows.len());
    let end = start.saturating_add(size).min(rows.len());
    &rows[start..end]
}

pub fn page_count(len: usize, size: usize) -> usize {
    if size == 0 {
        return 0;
    }
    len.div_ceil(size)
}

/// Query and page position of the client table. Rows are derived on every
/// read, so a changed query or record set is never served stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientListView {
    query: String,
    page: usize,
    page_size: usize,
}

impl Default for ClientListView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ClientListView {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: String::new(),
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_owned();
        self.page = 0;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), RecordError> {
        if page_size == 0 {
            return Err(RecordError::validation(
                "page size must be at least 1 -- pick 5, 10, or 25",
            ));
        }
        self.page_size = page_size;
        self.page = 0;
        Ok(())
    }

    pub fn filtered<'a>(&self, records: &'a [ClientRecord]) -> Vec<&'a ClientRecord> {
        search_filter(records, &self.query)
    }

    pub fn rows<'a>(&self, records: &'a [ClientRecord]) -> Vec<&'a ClientRecord> {
        let filtered = self.filtered(records);
        page_window(&filtered, self.page, self.page_size).to_vec()
    }

    pub fn page_count(&self, records: &[ClientRecord]) -> usize {
        page_count(self.filtered(records).len(), self.page_size)
    }

    /// Moves back to the last non-empty page after the set shrank.
    pub fn clamp_page(&mut self, records: &[ClientRecord]) -> bool {
        let last = self.page_count(records).saturating_sub(1);
        if self.page > last {
            self.page = last;
            return true;
        }
        false
    }
}
