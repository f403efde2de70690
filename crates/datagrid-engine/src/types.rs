use crate::cache::Representation;
use crate::column::Column;
use crate::grid::{Grid, GridOptions};
use chrono::{NaiveDate, NaiveDateTime};
use datagrid_model::Value;
use ordered_float::OrderedFloat;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::{Arc, OnceLock};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// A cached, comparable sort key derived from a cell value.
///
/// The variant order gives the default comparison: empty cells sort before
/// numbers, numbers before text. `OrderedFloat` keeps the ordering total when
/// pre-formatters produce infinities.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Null,
    Number(OrderedFloat<f64>),
    Text(String),
}

impl SortKey {
    pub fn number(n: f64) -> Self {
        SortKey::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        SortKey::Text(s.into())
    }

    /// Default key for columns whose type has no pre-formatter.
    pub(crate) fn from_value(value: &Value) -> SortKey {
        match value {
            Value::Null => SortKey::Null,
            Value::Number(n) => SortKey::number(*n),
            Value::DateTime(dt) => SortKey::number(dt.and_utc().timestamp_millis() as f64),
            Value::Bool(b) => SortKey::text(b.to_string()),
            Value::Text(s) => SortKey::text(s.clone()),
        }
    }

    /// The key as a plain value, for cache reads.
    pub(crate) fn to_value(&self) -> Value {
        match self {
            SortKey::Null => Value::Null,
            SortKey::Number(n) => Value::Number(n.0),
            SortKey::Text(s) => Value::Text(s.clone()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            SortKey::Text(s) => s,
            _ => "",
        }
    }
}

pub type OrderPreFn = Arc<dyn Fn(&Value, &GridOptions) -> SortKey>;
pub type CompareFn = Arc<dyn Fn(&SortKey, &SortKey) -> Ordering>;
pub type SearchFormatFn = Arc<dyn Fn(&str) -> String>;
pub type DetectValueFn = Arc<dyn Fn(&Value, &GridOptions) -> bool>;

/// Detection tests for one type.
#[derive(Clone)]
pub struct Detect {
    /// Must hold for every live cell in the column.
    pub all_of: DetectValueFn,
    /// When present, must additionally hold for at least one cell. Guards
    /// against all-empty columns claiming a specific type.
    pub one_of: Option<DetectValueFn>,
    /// Fast path claiming a column from its descriptor alone, without
    /// scanning data.
    pub init: Option<Arc<dyn Fn(&Column) -> bool>>,
    /// Scan every row instead of rejecting on the first `all_of` failure.
    /// Used by markup detection, where mixed plain/markup columns still
    /// count as markup.
    pub scan_all: bool,
}

/// A named type plug-in: detection tests plus sort and search formatting.
///
/// `order_pre` is applied once per cell and cached; `order_asc`/`order_desc`
/// override the default key comparison when present.
#[derive(Clone)]
pub struct TypeDef {
    pub name: String,
    /// `None` marks a pure fallback type that never claims a column through
    /// detection.
    pub detect: Option<Detect>,
    pub order_pre: Option<OrderPreFn>,
    pub order_asc: Option<CompareFn>,
    pub order_desc: Option<CompareFn>,
    pub search: Option<SearchFormatFn>,
}

/// Per-engine-instance registry of type plug-ins, in detection priority order
/// (first entry wins).
///
/// Owned by the grid rather than process-wide so multiple grids never share
/// or corrupt each other's registered types.
#[derive(Clone)]
pub struct TypeRegistry {
    defs: Vec<TypeDef>,
}

impl TypeRegistry {
    /// Empty registry with no types at all.
    pub fn empty() -> Self {
        Self { defs: Vec::new() }
    }

    /// Registry with the built-in types, highest detection priority first:
    /// `num`, `num-fmt`, `html-num`, `html-num-fmt`, `date`, `html`,
    /// `string-utf8`, `string`.
    pub fn with_builtins() -> Self {
        Self {
            defs: vec![
                builtin_num(),
                builtin_num_fmt(),
                builtin_html_num(),
                builtin_html_num_fmt(),
                builtin_date(),
                builtin_html(),
                builtin_string_utf8(),
                builtin_string(),
            ],
        }
    }

    /// Registers a type. A new name is inserted at the front of the detection
    /// order (newest wins); an existing name is replaced in place.
    pub fn register(&mut self, def: TypeDef) {
        match self.defs.iter().position(|d| d.name == def.name) {
            Some(idx) => self.defs[idx] = def,
            None => self.defs.insert(0, def),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    /// Registered type names in detection priority order.
    pub fn names(&self) -> Vec<&str> {
        self.defs.iter().map(|d| d.name.as_str()).collect()
    }

    pub(crate) fn defs(&self) -> &[TypeDef] {
        &self.defs
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Grid {
    /// Runs type detection for every column without a resolved type.
    ///
    /// Manual (declared) types always win. Otherwise detectors run in
    /// registry priority order over every live row's `type`-representation
    /// value, which is fetched once per pass and shared between detectors.
    /// Columns nothing claims fall back to `string`.
    pub(crate) fn detect_types(&mut self) {
        for col in 0..self.columns.len() {
            if self.columns[col].spec.declared_type.is_some()
                || self.columns[col].detected_type.is_some()
            {
                continue;
            }
            if !self.options.type_detection {
                continue;
            }

            let detected = self.detect_column_type(col);
            self.columns[col].detected_type =
                Some(detected.unwrap_or_else(|| "string".to_string()));
        }
    }

    fn detect_column_type(&mut self, col: usize) -> Option<String> {
        let defs = self.types.defs().to_vec();
        let mut cache: Vec<Option<Value>> = vec![None; self.rows.len()];

        'defs: for def in &defs {
            let Some(detect) = &def.detect else { continue };

            if let Some(init) = &detect.init {
                if init(&self.columns[col]) {
                    return Some(def.name.clone());
                }
            }

            let mut one = detect.one_of.is_none();
            let mut any_row = false;

            for row in 0..self.rows.len() {
                if self.rows[row].is_none() {
                    continue;
                }
                any_row = true;

                if cache[row].is_none() {
                    let value = self
                        .cell_value(row, col, Representation::Type)
                        .unwrap_or(Value::Null);
                    cache[row] = Some(value);
                }
                let Some(value) = &cache[row] else { continue };

                if !one {
                    if let Some(one_of) = &detect.one_of {
                        if one_of(value, &self.options) {
                            one = true;
                        }
                    }
                }

                if !(detect.all_of)(value, &self.options) && !detect.scan_all {
                    continue 'defs;
                }
            }

            if any_row && one {
                return Some(def.name.clone());
            }
        }

        None
    }
}

// ---------------------------------------------------------------------------
// Built-in types
// ---------------------------------------------------------------------------

fn builtin_num() -> TypeDef {
    TypeDef {
        name: "num".to_string(),
        detect: Some(Detect {
            all_of: Arc::new(|v, opts| is_number(v, opts.decimal, false, true)),
            one_of: Some(Arc::new(|v, opts| is_number(v, opts.decimal, false, false))),
            init: None,
            scan_all: false,
        }),
        order_pre: Some(Arc::new(|v, opts| numeric_key(v, opts.decimal, false, false))),
        order_asc: None,
        order_desc: None,
        search: None,
    }
}

fn builtin_num_fmt() -> TypeDef {
    TypeDef {
        name: "num-fmt".to_string(),
        detect: Some(Detect {
            all_of: Arc::new(|v, opts| is_number(v, opts.decimal, true, true)),
            one_of: Some(Arc::new(|v, opts| is_number(v, opts.decimal, true, false))),
            init: None,
            scan_all: false,
        }),
        order_pre: Some(Arc::new(|v, opts| numeric_key(v, opts.decimal, true, false))),
        order_asc: None,
        order_desc: None,
        search: None,
    }
}

fn builtin_html_num() -> TypeDef {
    TypeDef {
        name: "html-num".to_string(),
        detect: Some(Detect {
            all_of: Arc::new(|v, opts| html_numeric(v, opts.decimal, false, true)),
            one_of: Some(Arc::new(|v, opts| html_numeric(v, opts.decimal, false, false))),
            init: None,
            scan_all: false,
        }),
        order_pre: Some(Arc::new(|v, opts| numeric_key(v, opts.decimal, false, true))),
        order_asc: None,
        order_desc: None,
        search: Some(filter_string(true)),
    }
}

fn builtin_html_num_fmt() -> TypeDef {
    TypeDef {
        name: "html-num-fmt".to_string(),
        detect: Some(Detect {
            all_of: Arc::new(|v, opts| html_numeric(v, opts.decimal, true, true)),
            one_of: Some(Arc::new(|v, opts| html_numeric(v, opts.decimal, true, false))),
            init: None,
            scan_all: false,
        }),
        order_pre: Some(Arc::new(|v, opts| numeric_key(v, opts.decimal, true, true))),
        order_asc: None,
        order_desc: None,
        search: Some(filter_string(true)),
    }
}

fn builtin_date() -> TypeDef {
    TypeDef {
        name: "date".to_string(),
        detect: Some(Detect {
            all_of: Arc::new(|v, _| match v {
                Value::DateTime(_) => true,
                Value::Text(s) => is_blank(v) || parse_iso_datetime(s).is_some(),
                _ => is_blank(v),
            }),
            one_of: Some(Arc::new(|v, _| match v {
                Value::DateTime(_) => true,
                Value::Text(s) => parse_iso_datetime(s).is_some(),
                _ => false,
            })),
            init: None,
            scan_all: false,
        }),
        order_pre: Some(Arc::new(|v, _| match v {
            Value::DateTime(dt) => SortKey::number(dt.and_utc().timestamp_millis() as f64),
            Value::Text(s) => match parse_iso_datetime(s) {
                Some(dt) => SortKey::number(dt.and_utc().timestamp_millis() as f64),
                None => SortKey::number(f64::NEG_INFINITY),
            },
            _ => SortKey::number(f64::NEG_INFINITY),
        })),
        order_asc: None,
        order_desc: None,
        search: None,
    }
}

fn builtin_html() -> TypeDef {
    TypeDef {
        name: "html".to_string(),
        detect: Some(Detect {
            all_of: Arc::new(|v, _| {
                is_blank(v) || matches!(v, Value::Text(s) if s.contains('<'))
            }),
            one_of: Some(Arc::new(|v, _| {
                !is_blank(v) && matches!(v, Value::Text(s) if s.contains('<'))
            })),
            init: None,
            // Mixed markup/plain columns still count as markup.
            scan_all: true,
        }),
        order_pre: Some(Arc::new(|v, _| match v {
            Value::Text(s) => SortKey::text(strip_html(s).trim().to_lowercase()),
            v if is_blank(v) => SortKey::text(""),
            v => SortKey::text(v.to_string().to_lowercase()),
        })),
        order_asc: None,
        order_desc: None,
        search: Some(filter_string(true)),
    }
}

fn builtin_string_utf8() -> TypeDef {
    let asc: CompareFn = Arc::new(|a, b| diacritic_cmp(a.as_str(), b.as_str()));
    let desc: CompareFn = Arc::new(|a, b| diacritic_cmp(a.as_str(), b.as_str()).reverse());

    TypeDef {
        name: "string-utf8".to_string(),
        detect: Some(Detect {
            all_of: Arc::new(|_, _| true),
            one_of: Some(Arc::new(|v, _| {
                !is_blank(v) && matches!(v, Value::Text(s) if !s.is_ascii())
            })),
            init: None,
            scan_all: false,
        }),
        // No pre-formatter: the explicit comparators fold at compare time.
        order_pre: None,
        order_asc: Some(asc),
        order_desc: Some(desc),
        search: Some(filter_string(false)),
    }
}

fn builtin_string() -> TypeDef {
    TypeDef {
        name: "string".to_string(),
        // Pure fallback: never claims a column, applied when nothing matched.
        detect: None,
        order_pre: Some(Arc::new(|v, _| match v {
            Value::Bool(b) => SortKey::text(b.to_string()),
            v if is_blank(v) => SortKey::text(""),
            v => SortKey::text(v.to_string().to_lowercase()),
        })),
        order_asc: None,
        order_desc: None,
        search: Some(filter_string(false)),
    }
}

/// Search formatter shared by the text types: collapses newlines, optionally
/// strips markup, and folds diacritics.
fn filter_string(strip: bool) -> SearchFormatFn {
    Arc::new(move |s: &str| {
        let mut out = s.replace(['\r', '\n', '\u{2028}'], " ");
        if strip {
            out = strip_html(&out);
        }
        normalize(&out, false)
    })
}

// ---------------------------------------------------------------------------
// Value tests and text helpers
// ---------------------------------------------------------------------------

/// "Empty" for detection and pre-formatting purposes: null, the empty string,
/// or a bare `-` placeholder.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.is_empty() || s == "-",
        _ => false,
    }
}

// Currency/grouping characters tolerated by the `num-fmt` family. Thin and
// narrow no-break spaces are used as thousands separators in many standards.
const FORMATTED_NUMERIC_CHARS: &[char] = &[
    '\'', '\u{00A0}', ',', '$', '£', '€', '¥', '%', '\u{2009}', '\u{202F}', '₽', '₩', '₺', '₹',
    'r', 'R', 'f', 'F', 'k', 'K', 'Ƀ', 'Ξ',
];

fn strip_formatted(s: &str) -> String {
    s.chars().filter(|c| !FORMATTED_NUMERIC_CHARS.contains(c)).collect()
}

/// Converts from a formatted number using `decimal` as the decimal point to
/// a plain `.`-decimal string.
fn to_plain_decimal(s: &str, decimal: Option<char>) -> String {
    match decimal {
        Some(dp) if dp != '.' => s.replace('.', "").replace(dp, "."),
        _ => s.to_string(),
    }
}

fn parse_full_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub(crate) fn is_number(
    value: &Value,
    decimal: Option<char>,
    formatted: bool,
    allow_empty: bool,
) -> bool {
    match value {
        Value::Number(_) => true,
        // Empty is checked before stripping format characters, so a bare
        // currency string like "kr" is not detected as a formatted number.
        v if is_blank(v) => allow_empty,
        Value::Text(s) => {
            let mut text = to_plain_decimal(s, decimal);
            if formatted {
                text = strip_formatted(&text);
            }
            parse_full_number(&text).is_some()
        }
        _ => false,
    }
}

/// Is the value a number wrapped in markup? Strings containing interactive
/// elements never match.
pub(crate) fn html_numeric(
    value: &Value,
    decimal: Option<char>,
    formatted: bool,
    allow_empty: bool,
) -> bool {
    if is_blank(value) {
        return allow_empty;
    }
    match value {
        Value::Text(s) => {
            if interactive_markup_re().is_match(s) {
                return false;
            }
            is_number(
                &Value::Text(strip_html(s)),
                decimal,
                formatted,
                allow_empty,
            )
        }
        _ => false,
    }
}

/// Numeric pre-formatter: empty cells sort below every number, unparseable
/// text with them.
pub(crate) fn numeric_key(
    value: &Value,
    decimal: Option<char>,
    formatted: bool,
    strip_markup: bool,
) -> SortKey {
    match value {
        Value::Number(n) => SortKey::number(*n),
        v if is_blank(v) => SortKey::number(f64::NEG_INFINITY),
        Value::Text(s) => {
            let mut text = if strip_markup { strip_html(s) } else { s.clone() };
            text = to_plain_decimal(&text, decimal);
            if formatted {
                text = strip_formatted(&text);
            }
            SortKey::number(parse_full_number(&text).unwrap_or(f64::NEG_INFINITY))
        }
        _ => SortKey::number(f64::NEG_INFINITY),
    }
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

fn interactive_markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<(input|select)").expect("static regex"))
}

fn open_script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<script").expect("static regex"))
}

/// Removes complete markup tags, then any dangling `<script` fragments that
/// an unterminated tag could leave behind.
pub(crate) fn strip_html(input: &str) -> String {
    let mut out = html_tag_re().replace_all(input, "").into_owned();
    while open_script_re().is_match(&out) {
        out = open_script_re().replace(&out, "").into_owned();
    }
    out
}

/// NFD diacritic folding. With `both`, the original string is kept alongside
/// the folded form so either spelling matches a search.
pub(crate) fn normalize(s: &str, both: bool) -> String {
    let folded: String = s.nfd().filter(|c| !is_combining_mark(*c)).collect();
    if folded != s && both {
        let mut out = String::with_capacity(s.len() + 1 + folded.len());
        out.push_str(s);
        out.push(' ');
        out.push_str(&folded);
        out
    } else {
        folded
    }
}

fn diacritic_cmp(a: &str, b: &str) -> Ordering {
    normalize(&a.to_lowercase(), false).cmp(&normalize(&b.to_lowercase(), false))
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Restrict to ISO-8601 style strings; lenient host date parsing would
    // otherwise claim far too much.
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{2,4})[./-](\d{1,2})[./-](\d{1,2})(?:[T ](\d{1,2})[:.](\d{2})(?:[.:](\d{2}))?)?$",
        )
        .expect("static regex")
    })
}

/// Parses an ISO-8601-style date or date-time string.
pub(crate) fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let caps = iso_date_re().captures(s.trim())?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let hour: u32 = match caps.get(4) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let minute: u32 = match caps.get(5) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let second: u32 = match caps.get(6) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    date.and_hms_opt(hour, minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn opts() -> GridOptions {
        GridOptions::default()
    }

    #[test]
    fn blank_values() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&Value::Text("".into())));
        assert!(is_blank(&Value::Text("-".into())));
        assert!(!is_blank(&Value::Number(0.0)));
        assert!(!is_blank(&Value::Bool(false)));
    }

    #[test]
    fn plain_number_detection() {
        let o = opts();
        assert!(is_number(&Value::from(3.5), o.decimal, false, false));
        assert!(is_number(&Value::from("42"), o.decimal, false, false));
        assert!(is_number(&Value::from(" -1.5 "), o.decimal, false, false));
        assert!(!is_number(&Value::from("1x"), o.decimal, false, false));
        // Empty only passes when allowed.
        assert!(is_number(&Value::Null, o.decimal, false, true));
        assert!(!is_number(&Value::Null, o.decimal, false, false));
    }

    #[test]
    fn formatted_number_detection_requires_digits() {
        let o = opts();
        assert!(is_number(&Value::from("$1,200"), o.decimal, true, false));
        // Bare currency suffix is not a number.
        assert!(!is_number(&Value::from("kr"), o.decimal, true, false));
    }

    #[test]
    fn comma_decimal_point() {
        let decimal = Some(',');
        assert!(is_number(&Value::from("1.234,5"), decimal, false, false));
        assert_eq!(
            numeric_key(&Value::from("1.234,5"), decimal, false, false),
            SortKey::number(1234.5)
        );
    }

    #[test]
    fn html_numeric_rejects_interactive_markup() {
        let o = opts();
        assert!(html_numeric(&Value::from("<b>12</b>"), o.decimal, false, false));
        assert!(!html_numeric(
            &Value::from("<input value='12'>"),
            o.decimal,
            false,
            false
        ));
    }

    #[test]
    fn numeric_key_empty_sorts_lowest() {
        let o = opts();
        let empty = numeric_key(&Value::Null, o.decimal, false, false);
        let zero = numeric_key(&Value::from(0.0), o.decimal, false, false);
        assert!(empty < zero);
    }

    #[test]
    fn strip_html_removes_tags_and_script_fragments() {
        assert_eq!(strip_html("<a href='#'>x</a>"), "x");
        assert_eq!(strip_html("a <script b"), "a  b");
    }

    #[test]
    fn normalize_folds_diacritics() {
        assert_eq!(normalize("Crème Brûlée", false), "Creme Brulee");
        assert_eq!(normalize("abc", true), "abc");
        assert_eq!(normalize("é", true), "é e");
    }

    #[test]
    fn iso_datetime_parsing() {
        assert_eq!(
            parse_iso_datetime("2024-03-09"),
            NaiveDate::from_ymd_opt(2024, 3, 9).map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        );
        assert!(parse_iso_datetime("2024/3/9 14:30").is_some());
        assert!(parse_iso_datetime("2024-03-09T14:30:05").is_some());
        assert!(parse_iso_datetime("not a date").is_none());
        assert!(parse_iso_datetime("2024-13-40").is_none());
    }

    #[test]
    fn registry_register_prepends_new_and_replaces_existing() {
        let mut reg = TypeRegistry::with_builtins();
        let names_before = reg.names().len();

        reg.register(TypeDef {
            name: "currency".to_string(),
            detect: None,
            order_pre: None,
            order_asc: None,
            order_desc: None,
            search: None,
        });
        assert_eq!(reg.names()[0], "currency");
        assert_eq!(reg.names().len(), names_before + 1);

        // Re-registration replaces in place.
        reg.register(TypeDef {
            name: "currency".to_string(),
            detect: None,
            order_pre: Some(Arc::new(|_, _| SortKey::Null)),
            order_asc: None,
            order_desc: None,
            search: None,
        });
        assert_eq!(reg.names().len(), names_before + 1);
        assert!(reg.get("currency").unwrap().order_pre.is_some());
    }
}
