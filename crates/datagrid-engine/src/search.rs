//! The filter pass: rebuilds the filtered row order from the master order.
//!
//! Matching always runs on cached search keys, never on raw data, so custom
//! renderers and type search formatters (markup stripping, diacritic folding)
//! are applied exactly once per cache lifetime.

use crate::grid::{Grid, GridError};
use crate::types::normalize;
use datagrid_model::{RowData, SearchState};
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

/// A named row predicate applied on every filter pass, alongside the search
/// queries. Receives the row's store index and raw data.
pub type FixedFilter = Arc<dyn Fn(usize, &RowData) -> bool>;

/// A search query compiled for the current pass.
enum CompiledSearch {
    /// Empty query: every row passes.
    Everything,
    /// Every term must match somewhere in the haystack.
    Terms(Vec<Regex>),
    /// Invalid pattern: nothing matches (rather than erroring the pass).
    Never,
}

impl CompiledSearch {
    fn build(state: &SearchState) -> Self {
        if state.is_empty() {
            return CompiledSearch::Everything;
        }
        // Queries are folded like the search keys were, so either spelling
        // of an accented word matches.
        let text = normalize(&state.text, false);

        if state.regex {
            return match RegexBuilder::new(&text)
                .case_insensitive(state.case_insensitive)
                .build()
            {
                Ok(re) => CompiledSearch::Terms(vec![re]),
                Err(err) => {
                    log::warn!("invalid search pattern {:?}: {err}", state.text);
                    CompiledSearch::Never
                }
            };
        }

        let terms = if state.smart {
            tokenize(&text)
        } else {
            vec![text]
        };
        let compiled: Option<Vec<Regex>> = terms
            .iter()
            .map(|term| {
                RegexBuilder::new(&regex::escape(term))
                    .case_insensitive(state.case_insensitive)
                    .build()
                    .ok()
            })
            .collect();
        match compiled {
            Some(terms) if !terms.is_empty() => CompiledSearch::Terms(terms),
            Some(_) => CompiledSearch::Everything,
            None => CompiledSearch::Never,
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        match self {
            CompiledSearch::Everything => true,
            CompiledSearch::Terms(terms) => terms.iter().all(|t| t.is_match(haystack)),
            CompiledSearch::Never => false,
        }
    }
}

/// Splits a smart query into terms: whitespace-separated words, with
/// double-quoted phrases kept whole (quotes stripped).
fn tokenize(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut in_phrase = false;
    for c in text.chars() {
        match c {
            '"' => {
                if in_phrase && !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
                in_phrase = !in_phrase;
            }
            c if c.is_whitespace() && !in_phrase => {
                if !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        terms.push(current);
    }
    terms
}

impl Grid {
    /// Replaces the global search. Takes effect on the next draw.
    pub fn set_search(&mut self, state: SearchState) {
        self.search_state = state;
    }

    pub fn search(&self) -> &SearchState {
        &self.search_state
    }

    /// Sets or clears a per-column search, ANDed with the global one.
    pub fn set_column_search(
        &mut self,
        column: usize,
        state: Option<SearchState>,
    ) -> Result<(), GridError> {
        let col = self
            .columns
            .get_mut(column)
            .ok_or(GridError::ColumnNotFound(column))?;
        col.search = state;
        Ok(())
    }

    pub fn column_search(&self, column: usize) -> Option<&SearchState> {
        self.columns.get(column).and_then(|c| c.search.as_ref())
    }

    /// Registers, replaces or (with `None`) removes a named fixed filter.
    pub fn set_fixed_filter(&mut self, name: impl Into<String>, filter: Option<FixedFilter>) {
        let name = name.into();
        match filter {
            Some(filter) => {
                match self.fixed_filters.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = filter,
                    None => self.fixed_filters.push((name, filter)),
                }
            }
            None => self.fixed_filters.retain(|(n, _)| *n != name),
        }
    }

    /// Fills the cached per-column search keys and the joined row blob.
    /// Non-searchable columns get empty keys and stay out of the blob.
    pub(crate) fn ensure_search_data(&mut self, row: usize) {
        if self.row(row).map_or(true, |r| r.caches.search.is_some()) {
            return;
        }

        let mut keys = Vec::with_capacity(self.columns.len());
        for column in 0..self.columns.len() {
            let key = if self.columns[column].searchable() {
                self.search_key(row, column)
            } else {
                String::new()
            };
            keys.push(key);
        }
        let blob = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.searchable())
            .map(|(i, _)| keys[i].as_str())
            .collect::<Vec<_>>()
            .join("  ");

        if let Some(record) = self.row_mut(row) {
            record.caches.search = Some(keys);
            record.caches.search_row = Some(blob);
        }
    }

    /// Rebuilds the filtered order from the master order: global search over
    /// the row blob, per-column searches over column keys, then the fixed
    /// filters, all ANDed. Ends by clamping the page window.
    pub(crate) fn filter_pass(&mut self) {
        let global = CompiledSearch::build(&self.search_state);
        let column_filters: Vec<(usize, CompiledSearch)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.search.as_ref().map(|s| (i, CompiledSearch::build(s))))
            .collect();
        let fixed: Vec<FixedFilter> = self.fixed_filters.iter().map(|(_, f)| f.clone()).collect();

        let mut display = Vec::with_capacity(self.master.len());
        for row in self.master.clone() {
            self.ensure_search_data(row);
            let Some(record) = self.row(row) else {
                continue;
            };

            let blob = record.caches.search_row.as_deref().unwrap_or("");
            if !global.matches(blob) {
                continue;
            }
            let keys = record.caches.search.as_ref();
            let columns_pass = column_filters.iter().all(|(column, search)| {
                let key = keys
                    .and_then(|k| k.get(*column))
                    .map(String::as_str)
                    .unwrap_or("");
                search.matches(key)
            });
            if !columns_pass {
                continue;
            }
            if !fixed.iter().all(|filter| filter(row, &record.data)) {
                continue;
            }
            display.push(row);
        }

        self.display = display;
        self.page_overflow();
    }
}
