use crate::grid::{Grid, GridError};
use crate::row::RowSource;
use crate::types::strip_html;
use datagrid_model::Value;

/// Which derived form of a cell to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Representation {
    /// The accessor's value, unprocessed.
    Raw,
    /// Rendered display string (cached per row).
    Display,
    /// The comparable sort key: the column type's pre-formatter output,
    /// cached per row.
    Sort,
    /// Search key: rendered text run through the column type's search
    /// formatter, cached per row. Non-searchable columns have an empty key,
    /// matching what the filter pass sees.
    Search,
    /// The value handed to type detection.
    Type,
}

/// What to do with a row's raw data during invalidation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InvalidateSource {
    /// Re-read externally sourced rows through the structural index; keep
    /// caller-supplied data as is.
    #[default]
    Auto,
    /// Keep the existing raw data, only clear derived caches.
    Data,
    /// Force a re-read through the structural index.
    External,
}

impl Grid {
    /// Reads a cell in the requested representation.
    ///
    /// Returns `None` for tombstoned rows and out-of-range columns. Absent
    /// fields in the raw data map to the column's configured default content,
    /// never an error.
    ///
    /// `Display`, `Sort` and `Search` values are computed once per cache
    /// lifetime; subsequent reads return the cached value until the row is
    /// invalidated.
    pub fn cell_value(
        &mut self,
        row: usize,
        column: usize,
        representation: Representation,
    ) -> Option<Value> {
        if self.row(row).is_none() || column >= self.columns.len() {
            return None;
        }

        match representation {
            Representation::Raw | Representation::Type => {
                Some(self.accessor_value(row, column, representation))
            }
            Representation::Sort => {
                self.ensure_sort_keys(column, &[row]);
                Some(self.cached_sort_key(row, column).to_value())
            }
            Representation::Display => {
                self.ensure_row_display(row);
                let cached = self
                    .row(row)
                    .and_then(|r| r.caches.display.as_ref())
                    .and_then(|d| d.get(column))?;
                Some(Value::Text(cached.clone()))
            }
            Representation::Search => {
                self.ensure_search_data(row);
                let cached = self
                    .row(row)
                    .and_then(|r| r.caches.search.as_ref())
                    .and_then(|k| k.get(column))?;
                Some(Value::Text(cached.clone()))
            }
        }
    }

    /// Accessor output with default-content fallback.
    pub(crate) fn accessor_value(
        &self,
        row: usize,
        column: usize,
        representation: Representation,
    ) -> Value {
        let col = &self.columns[column];
        let record = match self.row(row) {
            Some(record) => record,
            None => return Value::Null,
        };

        let value = col.spec.data.get(&record.data, representation);
        match value {
            Some(Value::Null) | None => col.spec.default_content.clone().unwrap_or(Value::Null),
            Some(value) => value,
        }
    }

    pub(crate) fn render_cell(&self, column: usize, value: &Value) -> String {
        match &self.columns[column].spec.render {
            Some(render) => render(value),
            None => value.to_string(),
        }
    }

    /// Renders and caches a row's display values for every column.
    pub(crate) fn ensure_row_display(&mut self, row: usize) {
        if self.row(row).map_or(true, |r| r.caches.display.is_some()) {
            return;
        }

        let mut rendered = Vec::with_capacity(self.columns.len());
        for column in 0..self.columns.len() {
            let value = self.accessor_value(row, column, Representation::Display);
            rendered.push(self.render_cell(column, &value));
        }
        if let Some(record) = self.row_mut(row) {
            record.caches.display = Some(rendered);
        }
    }

    /// A row's cached rendered display values.
    pub fn row_display(&mut self, row: usize) -> Option<&[String]> {
        self.ensure_row_display(row);
        self.row(row)
            .and_then(|r| r.caches.display.as_deref())
    }

    pub(crate) fn search_key(&self, row: usize, column: usize) -> String {
        let value = self.accessor_value(row, column, Representation::Search);
        let text = self.render_cell(column, &value);
        match self
            .types
            .get(self.columns[column].type_name())
            .and_then(|t| t.search.clone())
        {
            Some(format) => format(&text),
            None => text,
        }
    }

    /// Clears a row's derived caches (all three: sort, search, display).
    ///
    /// With `column` given, only that column's detected type and widest
    /// rendered value are also cleared; otherwise every column's are, since
    /// both depend on cell content.
    ///
    /// Invalidating a tombstoned row is a no-op, not an error, so batch
    /// invalidation is idempotent.
    pub fn invalidate(&mut self, row: usize, column: Option<usize>, source: InvalidateSource) {
        let Some(record) = self.row_mut(row) else {
            return;
        };
        record.caches.clear();

        let reread = match source {
            InvalidateSource::External => true,
            InvalidateSource::Auto => record.source == RowSource::External,
            InvalidateSource::Data => false,
        };
        if reread {
            match self.structural.as_ref().and_then(|s| s.read_row(row)) {
                Some(data) => {
                    if let Some(record) = self.row_mut(row) {
                        record.data = data;
                    }
                }
                None => {
                    log::debug!("no structural read-back for row {row}; keeping existing data")
                }
            }
        }

        match column {
            Some(col) => {
                if let Some(col) = self.columns.get_mut(col) {
                    col.detected_type = None;
                    col.widest_display = None;
                }
            }
            None => {
                for col in &mut self.columns {
                    col.detected_type = None;
                    col.widest_display = None;
                }
            }
        }
    }

    /// The column's longest rendered display value, measured on the
    /// markup-stripped string but returned with markup intact. Cached until
    /// invalidation. Consumed by layout collaborators for width estimation.
    pub fn widest_display(&mut self, column: usize) -> Result<String, GridError> {
        if column >= self.columns.len() {
            return Err(GridError::ColumnNotFound(column));
        }
        if let Some(widest) = &self.columns[column].widest_display {
            return Ok(widest.clone());
        }

        let mut widest = String::new();
        let mut widest_len = 0usize;
        for row in self.master.clone() {
            self.ensure_row_display(row);
            let Some(cell) = self
                .row(row)
                .and_then(|r| r.caches.display.as_ref())
                .and_then(|d| d.get(column))
            else {
                continue;
            };
            let stripped = strip_html(cell).replace("&nbsp;", " ");
            if stripped.chars().count() > widest_len || widest_len == 0 && widest.is_empty() {
                widest_len = stripped.chars().count();
                widest = cell.clone();
            }
        }

        self.columns[column].widest_display = Some(widest.clone());
        Ok(widest)
    }
}
