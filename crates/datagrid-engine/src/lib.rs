#![forbid(unsafe_code)]

//! In-memory tabular data engine.
//!
//! The engine maintains a set of row records and column descriptors and
//! produces, on demand, ordered and filtered views over them:
//!
//! - the display pipeline derives master order (all live rows) then filtered
//!   order (rows passing the active searches) then display order (arranged by
//!   the active sort spec);
//! - derived per-cell values (sort keys, search keys, rendered display) are
//!   cached on the owning row and invalidated precisely on mutation;
//! - a selector resolution system turns heterogeneous row/column/cell
//!   addressing (index, predicate, external id, structural reference) into
//!   concrete index sets under a shared `{record set, order, page}` view
//!   options vocabulary.
//!
//! The engine is single-threaded and synchronous: every operation runs to
//! completion before the next begins. Hosts with true parallelism must
//! serialize access to a [`Grid`] instance.
//!
//! Rendering, input wiring, remote data retrieval and state persistence are
//! external collaborators; they consume the engine through the narrow
//! interfaces on [`Grid`].

mod cache;
mod column;
mod grid;
mod page;
mod row;
mod search;
mod select;
mod sort;
mod types;

pub use cache::{InvalidateSource, Representation};
pub use column::{Column, ColumnSpec, DataSource};
pub use grid::{Grid, GridError, GridOptions, NodeRef, StructuralIndex};
pub use page::PageInfo;
pub use row::RowSource;
pub use search::FixedFilter;
pub use select::{
    CellIndex, CellSelector, CellSelectorPlugin, ColumnOrder, ColumnSelector, ColumnSelectorPlugin,
    PageScope, RecordSet, RowSelector, RowSelectorPlugin, SelectOrder, ViewOptions,
};
pub use sort::{SortFixed, SortKeyRef, SortRequest};
pub use types::{Detect, SortKey, TypeDef, TypeRegistry};

pub use datagrid_model::{
    PageLength, PageState, RowData, RowDataError, SearchState, SortDirection, SortEntry, Value,
};
