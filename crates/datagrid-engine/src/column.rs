use crate::cache::Representation;
use datagrid_model::{RowData, SearchState, SortDirection, Value};
use std::sync::Arc;

/// How a column reads (and optionally writes) its value from a row's raw data.
#[derive(Clone)]
pub enum DataSource {
    /// Positional slot in a sequence row.
    Position(usize),
    /// Key in a keyed row.
    Key(String),
    /// Caller-supplied accessor pair. The getter receives the requested
    /// representation so a single raw field can expose distinct sort, search
    /// and display values. A `None` setter makes the column read-only.
    Custom {
        get: Arc<dyn Fn(&RowData, Representation) -> Option<Value>>,
        set: Option<Arc<dyn Fn(&mut RowData, Value)>>,
    },
}

impl DataSource {
    pub(crate) fn get(&self, data: &RowData, representation: Representation) -> Option<Value> {
        match self {
            DataSource::Position(index) => data.position(*index).cloned(),
            DataSource::Key(key) => data.key(key).cloned(),
            DataSource::Custom { get, .. } => get(data, representation),
        }
    }

    /// Writes into the raw data. Returns false when the column has no write
    /// path (custom accessor without a setter, or a shape mismatch).
    pub(crate) fn set(&self, data: &mut RowData, value: Value) -> bool {
        match self {
            DataSource::Position(index) => data.set_position(*index, value).is_ok(),
            DataSource::Key(key) => data.set_key(key, value).is_ok(),
            DataSource::Custom { set, .. } => match set {
                Some(set) => {
                    set(data, value);
                    true
                }
                None => false,
            },
        }
    }
}

/// Descriptor for one column, supplied when the column is appended to the
/// store.
#[derive(Clone)]
pub struct ColumnSpec {
    /// Stable identifier independent of position.
    pub name: Option<String>,
    /// Human-readable title, matchable by column selectors.
    pub title: Option<String>,
    pub data: DataSource,
    /// Declared type name. When set, automatic detection is skipped.
    pub declared_type: Option<String>,
    pub visible: bool,
    /// Whether the filter pass considers this column.
    pub searchable: bool,
    /// Whether sort requests on this column are honored.
    pub orderable: bool,
    /// Direction cycle walked by [`crate::Grid::cycle_sort`]. A `None` step
    /// removes the column from the sort spec.
    pub directions: Vec<Option<SortDirection>>,
    /// Columns whose data actually drives a sort on this column. Defaults to
    /// the column itself.
    pub order_data: Option<Vec<usize>>,
    /// Value substituted when the accessor finds no data.
    pub default_content: Option<Value>,
    /// Display renderer. Defaults to the value's plain string form.
    pub render: Option<Arc<dyn Fn(&Value) -> String>>,
}

impl ColumnSpec {
    pub fn new(data: DataSource) -> Self {
        Self {
            name: None,
            title: None,
            data,
            declared_type: None,
            visible: true,
            searchable: true,
            orderable: true,
            directions: vec![Some(SortDirection::Asc), Some(SortDirection::Desc)],
            order_data: None,
            default_content: None,
            render: None,
        }
    }

    /// Column reading positional slot `index`.
    pub fn positional(index: usize) -> Self {
        Self::new(DataSource::Position(index))
    }

    /// Column reading key `key` from keyed rows.
    pub fn keyed(key: impl Into<String>) -> Self {
        Self::new(DataSource::Key(key.into()))
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn declared_type(mut self, type_name: impl Into<String>) -> Self {
        self.declared_type = Some(type_name.into());
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn orderable(mut self, orderable: bool) -> Self {
        self.orderable = orderable;
        self
    }

    pub fn directions(mut self, directions: Vec<Option<SortDirection>>) -> Self {
        self.directions = directions;
        self
    }

    pub fn order_data(mut self, columns: Vec<usize>) -> Self {
        self.order_data = Some(columns);
        self
    }

    pub fn default_content(mut self, value: Value) -> Self {
        self.default_content = Some(value);
        self
    }

    pub fn render(mut self, render: Arc<dyn Fn(&Value) -> String>) -> Self {
        self.render = Some(render);
        self
    }
}

/// A column in the store: its descriptor plus runtime state.
#[derive(Clone)]
pub struct Column {
    pub(crate) spec: ColumnSpec,
    /// Automatically detected type name; cleared whenever cell content may
    /// have changed.
    pub(crate) detected_type: Option<String>,
    /// Longest rendered display value; cleared with `detected_type`.
    pub(crate) widest_display: Option<String>,
    /// Active per-column search, if any.
    pub(crate) search: Option<SearchState>,
}

impl Column {
    pub(crate) fn new(spec: ColumnSpec) -> Self {
        Self {
            spec,
            detected_type: None,
            widest_display: None,
            search: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.spec.name.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.spec.title.as_deref()
    }

    pub fn visible(&self) -> bool {
        self.spec.visible
    }

    pub fn searchable(&self) -> bool {
        self.spec.searchable
    }

    pub fn orderable(&self) -> bool {
        self.spec.orderable
    }

    /// Resolved type name: declared, then detected, then the `string`
    /// fallback.
    pub fn type_name(&self) -> &str {
        self.spec
            .declared_type
            .as_deref()
            .or(self.detected_type.as_deref())
            .unwrap_or("string")
    }

    /// The columns a sort on this column reads its keys from.
    pub(crate) fn sort_columns(&self, own_index: usize) -> Vec<usize> {
        match &self.spec.order_data {
            Some(columns) => columns.clone(),
            None => vec![own_index],
        }
    }
}
