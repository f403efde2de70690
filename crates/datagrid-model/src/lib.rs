//! `datagrid-model` defines the serializable data vocabulary for the datagrid
//! engine.
//!
//! The crate is intentionally small and self-contained so it can be reused by:
//! - the engine itself (store, sort, search, pagination)
//! - state persistence layers that round-trip view state via `serde`
//! - host/IPC boundaries that ship raw row data in and out

mod data;
mod state;
mod value;

pub use data::{RowData, RowDataError};
pub use state::{PageLength, PageState, SearchState, SortDirection, SortEntry};
pub use value::Value;
