use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngageError, Result};

/// Raw strings treated as missing values when inferring cell types.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#NA", "N/A", "NA", "n/a", "NULL", "null", "NaN", "nan", "-NaN", "-nan", "None",
    "<NA>",
];

// ── CellValue ─────────────────────────────────────────────────────────────────

/// A single typed cell in a [`Table`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Infer a typed value from a raw text cell.
    ///
    /// Empty and NA-like tokens become [`CellValue::Null`]; booleans, integers
    /// and floats are recognised on the trimmed text; everything else is kept
    /// verbatim as [`CellValue::Text`].
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NA_TOKENS.contains(&trimmed) {
            return Self::Null;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Int(i);
        }
        // `parse::<f64>` also accepts "inf" and "nan" spellings.
        if trimmed.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return Self::Float(f);
            }
        }
        Self::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value, when it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Exact-match comparison used by [`FilterSpec`].
    ///
    /// Numbers compare numerically (`Int(3)` matches `Float(3.0)`), text
    /// compares case-sensitively, and text is compared against a number or a
    /// boolean by parsing it. `Null` never matches anything.
    pub fn matches(&self, other: &CellValue) -> bool {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(s), Self::Bool(b)) | (Self::Bool(b), Self::Text(s)) => {
                s.trim().eq_ignore_ascii_case(if *b { "true" } else { "false" })
            }
            (Self::Text(s), num) | (num, Self::Text(s)) => match (s.trim().parse::<f64>(), num.as_f64()) {
                (Ok(parsed), Some(n)) => parsed == n,
                _ => false,
            },
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// Total "natural" order: nulls, booleans, numbers (numerically), then
    /// text (lexicographically).
    pub fn cmp_natural(&self, other: &CellValue) -> Ordering {
        fn rank(v: &CellValue) -> u8 {
            match v {
                CellValue::Null => 0,
                CellValue::Bool(_) => 1,
                CellValue::Int(_) | CellValue::Float(_) => 2,
                CellValue::Text(_) => 3,
            }
        }

        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => rank(a).cmp(&rank(b)),
            },
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// One row of a [`Table`], aligned with the table's columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    values: Vec<CellValue>,
}

impl Record {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Ordered collection of [`Record`]s sharing one column schema.
///
/// Every transformation returns a new table; a `Table` is never mutated once
/// built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A table with the given schema and no rows.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table, checking that every row matches the column count.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let expected = columns.len();
        let mut records = Vec::with_capacity(rows.len());
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != expected {
                return Err(EngageError::RowWidth {
                    row,
                    expected,
                    found: values.len(),
                });
            }
            records.push(Record::new(values));
        }
        Ok(Self {
            columns,
            rows: records,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when the table holds no rows (it may still carry a schema).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Position of `name` in the schema.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| EngageError::ColumnNotFound(name.to_string()))
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Result<Vec<&CellValue>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r.values[idx]).collect())
    }

    /// Restrict the table to `names`, keeping the table's own column order.
    pub fn select(&self, names: &[String]) -> Result<Table> {
        for name in names {
            self.column_index(name)?;
        }
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| names.contains(c))
            .map(|(i, _)| i)
            .collect();

        Ok(self.project(&keep))
    }

    /// Rows matching every condition of `spec`.
    pub fn filter(&self, spec: &FilterSpec) -> Result<Table> {
        if spec.is_empty() {
            return Ok(self.clone());
        }
        let conditions: Vec<(usize, &CellValue)> = spec
            .iter()
            .map(|(col, value)| Ok((self.column_index(col)?, value)))
            .collect::<Result<_>>()?;

        let rows = self
            .rows
            .iter()
            .filter(|r| conditions.iter().all(|(idx, v)| r.values[*idx].matches(v)))
            .cloned()
            .collect();

        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Add `name` holding `value` on every row, replacing an existing column of
    /// the same name in place.
    pub fn with_constant_column(&self, name: &str, value: CellValue) -> Table {
        let mut columns = self.columns.clone();
        let existing = columns.iter().position(|c| c == name);
        if existing.is_none() {
            columns.push(name.to_string());
        }

        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut values = r.values.clone();
                match existing {
                    Some(idx) => values[idx] = value.clone(),
                    None => values.push(value.clone()),
                }
                Record::new(values)
            })
            .collect();

        Table { columns, rows }
    }

    /// Reorder columns to `order` when both schemas hold the same set of
    /// names. Returns `None` if the sets differ.
    pub fn aligned_to(&self, order: &[String]) -> Option<Table> {
        if order.len() != self.columns.len() {
            return None;
        }
        if order == self.columns.as_slice() {
            return Some(self.clone());
        }
        let mapping: Option<Vec<usize>> = order
            .iter()
            .map(|name| self.columns.iter().position(|c| c == name))
            .collect();
        mapping.map(|idx| self.project(&idx))
    }

    /// Concatenate tables in order. All parts must share the first part's
    /// column set; columns of later parts are reordered to match.
    pub fn concat(parts: Vec<Table>) -> Result<Table> {
        let mut iter = parts.into_iter();
        let Some(first) = iter.next() else {
            return Ok(Table::empty());
        };

        let mut merged = first;
        for (i, part) in iter.enumerate() {
            let aligned = part.aligned_to(&merged.columns).ok_or_else(|| {
                EngageError::SchemaMismatch {
                    path: PathBuf::from(format!("part {}", i + 1)),
                    expected: merged.columns.join(", "),
                    found: part.columns.join(", "),
                }
            })?;
            merged.rows.extend(aligned.rows);
        }
        Ok(merged)
    }

    fn project(&self, indices: &[usize]) -> Table {
        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| Record::new(indices.iter().map(|&i| r.values[i].clone()).collect()))
            .collect();
        Table { columns, rows }
    }
}

// ── FilterSpec ────────────────────────────────────────────────────────────────

/// Conjunctive exact-match predicate over named columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    conditions: BTreeMap<String, CellValue>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.conditions.insert(column.into(), value.into());
    }

    /// Parse `COLUMN=VALUE` assignments from the command line. Values are kept
    /// as text; [`CellValue::matches`] compares them against numeric cells.
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self> {
        let mut spec = Self::new();
        for raw in assignments {
            let raw = raw.as_ref();
            let (col, value) = raw.split_once('=').ok_or_else(|| {
                EngageError::Config(format!("filter '{}' must have the form COLUMN=VALUE", raw))
            })?;
            let col = col.trim();
            if col.is_empty() {
                return Err(EngageError::Config(format!(
                    "filter '{}' has an empty column name",
                    raw
                )));
            }
            spec.insert(col, CellValue::Text(value.to_string()));
        }
        Ok(spec)
    }

    /// Combine two specs; entries from `other` win on conflicting columns.
    pub fn merged(&self, other: &FilterSpec) -> FilterSpec {
        let mut conditions = self.conditions.clone();
        conditions.extend(other.conditions.iter().map(|(k, v)| (k.clone(), v.clone())));
        FilterSpec { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CellValue)> {
        self.conditions.iter()
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.conditions.keys()
    }
}

// ── Grouping ──────────────────────────────────────────────────────────────────

/// Iteration order of the keys in a [`GroupResult`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum GroupOrder {
    /// Natural order of the keys: numbers numerically, then text.
    #[default]
    Sorted,
    /// Order in which keys first appear in the table.
    FirstSeen,
    /// Aggregate value descending; ties keep first-seen order.
    #[value(name = "value")]
    #[serde(rename = "value")]
    ValueDescending,
}

/// One group of a [`GroupResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry<V> {
    /// First value observed for the group.
    pub key: CellValue,
    /// Display form of the key; the group's identity.
    pub label: String,
    pub value: V,
}

/// Mapping from group key to an aggregate value, in an explicit order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResult<V> {
    group_column: String,
    entries: Vec<GroupEntry<V>>,
}

impl<V> GroupResult<V> {
    pub fn new(group_column: impl Into<String>, entries: Vec<GroupEntry<V>>) -> Self {
        Self {
            group_column: group_column.into(),
            entries,
        }
    }

    pub fn group_column(&self) -> &str {
        &self.group_column
    }

    pub fn entries(&self) -> &[GroupEntry<V>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn get(&self, label: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| &e.value)
    }

    /// `(label, value)` pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|e| (e.label.as_str(), &e.value))
    }

    /// Transform every value, keeping keys and order.
    pub fn map_values<W>(self, mut f: impl FnMut(V) -> W) -> GroupResult<W> {
        GroupResult {
            group_column: self.group_column,
            entries: self
                .entries
                .into_iter()
                .map(|e| GroupEntry {
                    key: e.key,
                    label: e.label,
                    value: f(e.value),
                })
                .collect(),
        }
    }
}

impl<V: PartialOrd> GroupResult<V> {
    /// Reorder the entries. Results are built in first-seen order, so
    /// [`GroupOrder::FirstSeen`] leaves them untouched.
    pub fn ordered(mut self, order: GroupOrder) -> Self {
        match order {
            GroupOrder::FirstSeen => {}
            GroupOrder::Sorted => self.entries.sort_by(|a, b| a.key.cmp_natural(&b.key)),
            GroupOrder::ValueDescending => self
                .entries
                .sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal)),
        }
        self
    }
}

impl GroupResult<u64> {
    /// Sum of all group counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.value).sum()
    }
}

/// Accumulates per-group state in first-seen order.
///
/// Groups are identified by the display label of their key so that `Int(3)`
/// and `Float(3.0)` land in the same group.
#[derive(Debug)]
pub struct GroupAccumulator<S> {
    index: HashMap<String, usize>,
    entries: Vec<GroupEntry<S>>,
}

impl<S: Default> GroupAccumulator<S> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// State for the group of `key`, created on first sight.
    pub fn entry(&mut self, key: &CellValue) -> &mut S {
        let label = key.to_string();
        let pos = match self.index.get(&label) {
            Some(&pos) => pos,
            None => {
                let pos = self.entries.len();
                self.index.insert(label.clone(), pos);
                self.entries.push(GroupEntry {
                    key: key.clone(),
                    label,
                    value: S::default(),
                });
                pos
            }
        };
        &mut self.entries[pos].value
    }

    pub fn finish(self, group_column: impl Into<String>) -> GroupResult<S> {
        GroupResult::new(group_column, self.entries)
    }
}

impl<S: Default> Default for GroupAccumulator<S> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Histogram ─────────────────────────────────────────────────────────────────

/// One equal-width histogram bin. `upper` is exclusive except for the last
/// bin of a histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

impl HistogramBin {
    /// Short axis label such as `"1.0-1.5"`.
    pub fn label(&self) -> String {
        format!("{:.1}-{:.1}", self.lower, self.upper)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
