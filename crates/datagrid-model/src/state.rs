use serde::{Deserialize, Serialize};

/// Direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// One entry of an active multi-key sort: a store column position and a
/// direction.
///
/// `column` always refers to the column's position in the store, never its
/// visible position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub column: usize,
    pub direction: SortDirection,
}

impl SortEntry {
    pub fn new(column: usize, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

/// A search request: query text plus matching flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    /// Query text. Empty matches everything.
    pub text: String,
    /// Treat `text` as a regular expression instead of literal text.
    #[serde(default)]
    pub regex: bool,
    /// Split `text` into words and double-quoted phrases, all of which must
    /// match somewhere in the row.
    #[serde(default = "default_true")]
    pub smart: bool,
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            text: String::new(),
            regex: false,
            smart: true,
            case_insensitive: true,
        }
    }
}

impl SearchState {
    /// Plain smart search for the given text, with default flags.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// True when the query matches everything and the filter pass can skip it.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Number of rows per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLength {
    /// No paging: every filtered row is on the single page.
    All,
    Rows(usize),
}

impl Default for PageLength {
    fn default() -> Self {
        PageLength::All
    }
}

/// The active page window over the filtered row set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageState {
    /// Offset of the first displayed row within the filtered order.
    pub start: usize,
    pub length: PageLength,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn search_state_defaults_apply_on_deserialize() {
        let s: SearchState = serde_json::from_str(r#"{"text":"london"}"#).unwrap();
        assert_eq!(s, SearchState::text("london"));
        assert!(s.smart);
        assert!(s.case_insensitive);
        assert!(!s.regex);
    }

    #[test]
    fn sort_entry_round_trip() {
        let spec = vec![
            SortEntry::new(2, SortDirection::Asc),
            SortEntry::new(0, SortDirection::Desc),
        ];
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(serde_json::from_str::<Vec<SortEntry>>(&json).unwrap(), spec);
    }
}
