use crate::types::SortKey;
use datagrid_model::RowData;

/// Where a row's raw data originated.
///
/// Externally sourced rows can have their raw data re-read through the
/// structural index when invalidated with [`crate::InvalidateSource::Auto`]
/// or [`crate::InvalidateSource::External`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowSource {
    /// Raw data supplied directly by the caller.
    Data,
    /// Raw data mirrored from an external structural source.
    External,
}

/// Per-row derived value caches, owned exclusively by the row record.
///
/// Invalidation always clears from this single owner, so the three consumers
/// (sort, search, display) never need external cache-coherence tracking.
#[derive(Clone, Debug, Default)]
pub(crate) struct RowCaches {
    /// Pre-formatted sort key per column, populated lazily one column at a
    /// time by the sort engine.
    pub sort: Vec<Option<SortKey>>,
    /// Search key per searchable column (empty strings for non-searchable
    /// columns), plus the joined row blob used by the filter pass.
    pub search: Option<Vec<String>>,
    pub search_row: Option<String>,
    /// Rendered display string per column.
    pub display: Option<Vec<String>>,
}

impl RowCaches {
    pub fn clear(&mut self) {
        self.sort.clear();
        self.search = None;
        self.search_row = None;
        self.display = None;
    }
}

/// One live row record: the raw data plus its derived caches.
#[derive(Clone, Debug)]
pub(crate) struct RowRecord {
    pub data: RowData,
    pub source: RowSource,
    /// Optional caller-defined identifier, unique within the store.
    pub id: Option<String>,
    pub caches: RowCaches,
}

impl RowRecord {
    pub fn new(data: RowData, source: RowSource, id: Option<String>) -> Self {
        Self {
            data,
            source,
            id,
            caches: RowCaches::default(),
        }
    }
}
