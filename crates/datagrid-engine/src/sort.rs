//! The sort pass: multi-key stable ordering of the master row order.
//!
//! Sorting never touches raw data. Each key column's values are pre-formatted
//! once per cache lifetime into [`SortKey`]s, and the comparison pass runs on
//! those cached keys only.

use crate::cache::Representation;
use crate::grid::{Grid, GridError};
use crate::types::SortKey;
use ahash::AHashMap;
use datagrid_model::{SortDirection, SortEntry};
use std::cmp::Ordering;

/// Reference to a sort key column, by store position or by column name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortKeyRef {
    Column(usize),
    Name(String),
}

impl From<usize> for SortKeyRef {
    fn from(column: usize) -> Self {
        SortKeyRef::Column(column)
    }
}

impl From<&str> for SortKeyRef {
    fn from(name: &str) -> Self {
        SortKeyRef::Name(name.to_string())
    }
}

/// One requested sort key. Unlike [`SortEntry`] the column may be referred to
/// by name; resolution happens when the request is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortRequest {
    pub key: SortKeyRef,
    pub direction: SortDirection,
}

impl SortRequest {
    pub fn new(key: impl Into<SortKeyRef>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    pub fn asc(key: impl Into<SortKeyRef>) -> Self {
        Self::new(key, SortDirection::Asc)
    }

    pub fn desc(key: impl Into<SortKeyRef>) -> Self {
        Self::new(key, SortDirection::Desc)
    }
}

/// Fixed sort keys applied around the caller-controlled spec: `pre` keys
/// always sort first, `post` keys always sort last. Used for grouping rows
/// regardless of the interactive sort.
#[derive(Clone, Debug, Default)]
pub struct SortFixed {
    pub pre: Vec<SortEntry>,
    pub post: Vec<SortEntry>,
}

/// Sort plan entry with its directional comparator resolved.
struct PlanKey {
    column: usize,
    direction: SortDirection,
    custom: Option<crate::types::CompareFn>,
}

impl Grid {
    /// Replaces the sort spec. Name references that match no column are
    /// dropped; the remaining keys apply in request order on the next draw.
    pub fn set_sort(&mut self, requests: impl IntoIterator<Item = SortRequest>) {
        self.sort_spec = requests
            .into_iter()
            .filter_map(|request| {
                let column = match &request.key {
                    SortKeyRef::Column(column) => {
                        if *column < self.columns.len() {
                            Some(*column)
                        } else {
                            None
                        }
                    }
                    SortKeyRef::Name(name) => self
                        .columns
                        .iter()
                        .position(|c| c.name() == Some(name.as_str())),
                };
                match column {
                    Some(column) => Some(SortEntry::new(column, request.direction)),
                    None => {
                        log::debug!("dropping unresolvable sort key {:?}", request.key);
                        None
                    }
                }
            })
            .collect();
    }

    /// The active sort spec, fixed keys excluded.
    pub fn sort_spec(&self) -> &[SortEntry] {
        &self.sort_spec
    }

    /// Sets the fixed pre/post sort keys.
    pub fn set_sort_fixed(&mut self, fixed: SortFixed) {
        self.sort_fixed = fixed;
    }

    pub fn sort_fixed(&self) -> &SortFixed {
        &self.sort_fixed
    }

    /// Advances a column through its configured direction cycle, as a header
    /// activation would.
    ///
    /// With `append` the column is added to (or advanced within) the existing
    /// multi-key spec; without it the spec is replaced by this column alone.
    /// A `None` step in the cycle removes the column from the spec.
    pub fn cycle_sort(&mut self, column: usize, append: bool) -> Result<(), GridError> {
        let col = self
            .columns
            .get(column)
            .ok_or(GridError::ColumnNotFound(column))?;
        if !col.orderable() {
            return Err(GridError::ColumnNotOrderable(column));
        }
        let directions = col.spec.directions.clone();
        if directions.is_empty() {
            return Ok(());
        }

        let existing = self.sort_spec.iter().position(|e| e.column == column);
        let solo = self.sort_spec.len() == 1 && existing == Some(0);

        let next_after = |current: SortDirection| {
            let at = directions
                .iter()
                .position(|d| *d == Some(current))
                .unwrap_or(0);
            directions[(at + 1) % directions.len()]
        };

        if append && self.options.multi_sort {
            match existing {
                Some(at) => match next_after(self.sort_spec[at].direction) {
                    Some(direction) => self.sort_spec[at].direction = direction,
                    None => {
                        self.sort_spec.remove(at);
                    }
                },
                None => {
                    if let Some(direction) = directions[0] {
                        self.sort_spec.push(SortEntry::new(column, direction));
                    }
                }
            }
        } else if solo {
            match next_after(self.sort_spec[0].direction) {
                Some(direction) => self.sort_spec[0].direction = direction,
                None => self.sort_spec.clear(),
            }
        } else {
            match directions[0] {
                Some(direction) => self.sort_spec = vec![SortEntry::new(column, direction)],
                None => self.sort_spec.clear(),
            }
        }
        Ok(())
    }

    /// The effective sort keys for the next pass: fixed pre keys, the spec,
    /// fixed post keys, each expanded through the key column's `order_data`
    /// indirection. Out-of-range columns are dropped.
    pub(crate) fn flatten_sort(&self) -> Vec<SortEntry> {
        let mut flat = Vec::new();
        let parts = self
            .sort_fixed
            .pre
            .iter()
            .chain(self.sort_spec.iter())
            .chain(self.sort_fixed.post.iter());
        for entry in parts {
            let Some(column) = self.columns.get(entry.column) else {
                log::debug!("dropping sort key on missing column {}", entry.column);
                continue;
            };
            for data_column in column.sort_columns(entry.column) {
                if data_column < self.columns.len() {
                    flat.push(SortEntry::new(data_column, entry.direction));
                }
            }
        }
        flat
    }

    /// Fills the cached sort key for `column` on every row of `rows` that
    /// lacks one.
    pub(crate) fn ensure_sort_keys(&mut self, column: usize, rows: &[usize]) {
        let type_name = self.columns[column].type_name().to_string();
        let pre = self.types.get(&type_name).and_then(|t| t.order_pre.clone());
        let columns = self.columns.len();

        for &row in rows {
            let cached = self
                .row(row)
                .is_some_and(|r| matches!(r.caches.sort.get(column), Some(Some(_))));
            if cached {
                continue;
            }
            let value = self.accessor_value(row, column, Representation::Sort);
            let key = match &pre {
                Some(pre) => pre(&value, &self.options),
                None => SortKey::from_value(&value),
            };
            if let Some(record) = self.row_mut(row) {
                if record.caches.sort.len() < columns {
                    record.caches.sort.resize(columns, None);
                }
                record.caches.sort[column] = Some(key);
            }
        }
    }

    pub(crate) fn cached_sort_key(&self, row: usize, column: usize) -> &SortKey {
        static NULL: SortKey = SortKey::Null;
        self.row(row)
            .and_then(|r| r.caches.sort.get(column))
            .and_then(Option::as_ref)
            .unwrap_or(&NULL)
    }

    /// Multi-key sort of `base` under `spec`.
    ///
    /// Ties fall back to raw store position, read in reverse when the first
    /// key descends and `order_desc_reverse` is set, so a descending sort is
    /// the exact mirror of its ascending counterpart and repeated reversal
    /// round-trips tied rows.
    fn sorted_order(&mut self, spec: &[SortEntry], mut base: Vec<usize>) -> Vec<usize> {
        if spec.is_empty() {
            base.sort_unstable();
            return base;
        }

        for entry in spec {
            self.ensure_sort_keys(entry.column, &base);
        }

        let reverse_ties =
            self.options.order_desc_reverse && spec[0].direction == SortDirection::Desc;

        let plan: Vec<PlanKey> = spec
            .iter()
            .map(|entry| {
                let type_name = self.columns[entry.column].type_name();
                let custom = self.types.get(type_name).and_then(|t| match entry.direction {
                    SortDirection::Asc => t.order_asc.clone(),
                    SortDirection::Desc => t.order_desc.clone(),
                });
                PlanKey {
                    column: entry.column,
                    direction: entry.direction,
                    custom,
                }
            })
            .collect();

        base.sort_by(|&a, &b| {
            for key in &plan {
                let ka = self.cached_sort_key(a, key.column);
                let kb = self.cached_sort_key(b, key.column);
                let ordering = match &key.custom {
                    Some(compare) => compare(ka, kb),
                    None => match key.direction {
                        SortDirection::Asc => ka.cmp(kb),
                        SortDirection::Desc => kb.cmp(ka),
                    },
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            if reverse_ties {
                b.cmp(&a)
            } else {
                a.cmp(&b)
            }
        });
        base
    }

    /// Reorders the master row order under the effective sort keys and keeps
    /// the filtered order consistent with it.
    pub(crate) fn sort_pass(&mut self) {
        let spec = self.flatten_sort();
        let base = std::mem::take(&mut self.master);
        self.master = self.sorted_order(&spec, base);
        self.reorder_display();
    }

    /// Reorders the filtered row set to follow the master order without
    /// re-running the filter pass.
    pub(crate) fn reorder_display(&mut self) {
        let positions: AHashMap<usize, usize> = self
            .master
            .iter()
            .enumerate()
            .map(|(position, &row)| (row, position))
            .collect();
        self.display
            .sort_by_key(|row| positions.get(row).copied().unwrap_or(usize::MAX));
    }

    /// The master order as it would look sorted by one column, without
    /// changing the active spec, the master order, or the filtered order.
    pub fn sort_preview(
        &mut self,
        column: usize,
        direction: SortDirection,
    ) -> Result<Vec<usize>, GridError> {
        let col = self
            .columns
            .get(column)
            .ok_or(GridError::ColumnNotFound(column))?;
        let spec: Vec<SortEntry> = col
            .sort_columns(column)
            .into_iter()
            .filter(|&c| c < self.columns.len())
            .map(|c| SortEntry::new(c, direction))
            .collect();
        let base = self.master.clone();
        Ok(self.sorted_order(&spec, base))
    }
}
