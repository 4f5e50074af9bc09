//! Tabular file discovery and loading.
//!
//! Resolves file, directory and glob sources into an ordered file list, reads
//! each file (CSV, TSV or spreadsheet) into a [`Table`] fragment, and merges
//! the fragments into one filtered table.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use calamine::{Data, Reader};
use engage_core::error::{EngageError, Result};
use engage_core::models::{CellValue, Table, NA_TOKENS};
use engage_core::settings::{expand_home, ErrorPolicy, LoadOptions};
use tracing::{debug, warn};

// ── Public types ──────────────────────────────────────────────────────────────

/// A file that was dropped under [`ErrorPolicy::Skip`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of [`load`]: the merged table plus provenance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadedTable {
    pub table: Table,
    /// Files that contributed rows, in load order.
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedSource>,
}

/// Ordered file list produced by [`resolve_sources`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedSources {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedSource>,
}

/// How a file's contents are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text with the given field separator.
    Delimited(u8),
    /// Workbook read through calamine.
    Spreadsheet,
}

impl SourceFormat {
    /// Detect the format from the file extension (case-insensitive).
    pub fn detect(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Delimited(b',')),
            "tsv" | "tab" => Ok(Self::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Spreadsheet),
            _ => Err(EngageError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

// ── Source resolution ─────────────────────────────────────────────────────────

/// Expand `sources` into an ordered, de-duplicated file list.
///
/// * directory → files inside it whose name matches `file_pattern`
///   (recursively with `recursive`), sorted by path;
/// * glob pattern → matching files, sorted by path;
/// * anything else → a literal file path, which must exist.
pub fn resolve_sources(sources: &[String], options: &LoadOptions) -> Result<ResolvedSources> {
    let name_pattern = glob::Pattern::new(&options.file_pattern).map_err(|e| {
        EngageError::Config(format!("invalid file pattern '{}': {}", options.file_pattern, e))
    })?;

    let mut resolved = ResolvedSources::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for source in sources {
        let path = expand_home(source);
        let matched = if path.is_dir() {
            let files = scan_directory(&path, &name_pattern, options.recursive);
            if files.is_empty() {
                warn!(
                    "No files matching '{}' found in {}",
                    options.file_pattern,
                    path.display()
                );
            }
            files
        } else if path.is_file() {
            vec![path]
        } else if is_glob(source) {
            let files = expand_glob(&path.to_string_lossy())?;
            if files.is_empty() {
                warn!("Pattern '{}' matched no files", source);
            }
            files
        } else {
            match options.on_error {
                ErrorPolicy::Fail => return Err(EngageError::SourceNotFound(path)),
                ErrorPolicy::Skip => {
                    warn!("Skipping missing source {}", path.display());
                    resolved.skipped.push(SkippedSource {
                        reason: EngageError::SourceNotFound(path.clone()).to_string(),
                        path,
                    });
                    continue;
                }
            }
        };

        for file in matched {
            if seen.insert(file.clone()) {
                resolved.files.push(file);
            }
        }
    }

    Ok(resolved)
}

fn is_glob(source: &str) -> bool {
    source.contains(['*', '?', '['])
}

fn scan_directory(dir: &Path, name_pattern: &glob::Pattern, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(max_depth)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| name_pattern.matches(name))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| EngageError::Config(format!("invalid glob '{}': {}", pattern, e)))?;

    let mut files: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Unreadable glob match: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();

    files.sort();
    Ok(files)
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load every source into one table.
///
/// Fragments are concatenated in resolved order and must share one column
/// set; a fragment whose columns differ only in order is reordered to match
/// the first. `options.filters` apply to the merged table. When nothing was
/// loaded the result is an empty table and filters are not applied.
pub fn load(sources: &[String], options: &LoadOptions) -> Result<LoadedTable> {
    let resolved = resolve_sources(sources, options)?;
    let mut loaded = LoadedTable {
        skipped: resolved.skipped,
        ..LoadedTable::default()
    };

    if resolved.files.is_empty() {
        warn!("No files found for the given sources");
        return Ok(loaded);
    }

    let mut merged: Option<Table> = None;
    for path in &resolved.files {
        let outcome = read_file(path, options).and_then(|fragment| match &merged {
            // A file without even a header row adds nothing.
            _ if fragment.columns().is_empty() => Ok(None),
            Some(base) => align_fragment(path, base, fragment).map(Some),
            None => Ok(Some(fragment)),
        });

        match outcome {
            Ok(None) => continue,
            Ok(Some(fragment)) => {
                debug!(
                    "Loaded {} rows, {} columns from {}",
                    fragment.len(),
                    fragment.columns().len(),
                    path.display()
                );
                merged = Some(match merged.take() {
                    Some(base) => Table::concat(vec![base, fragment])?,
                    None => fragment,
                });
                loaded.files.push(path.clone());
            }
            Err(e) => match options.on_error {
                ErrorPolicy::Fail => return Err(e),
                ErrorPolicy::Skip => {
                    warn!("Skipping {}: {}", path.display(), e);
                    loaded.skipped.push(SkippedSource {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
            },
        }
    }

    let Some(table) = merged else {
        return Ok(loaded);
    };

    loaded.table = table.filter(&options.filters).map_err(|e| match e {
        EngageError::ColumnNotFound(col) => EngageError::schema(
            loaded.files.first().cloned().unwrap_or_default(),
            format!("filter column '{}' not found in loaded data", col),
        ),
        other => other,
    })?;

    debug!(
        "Loaded {} rows from {} files ({} skipped)",
        loaded.table.len(),
        loaded.files.len(),
        loaded.skipped.len()
    );

    Ok(loaded)
}

/// Read a single file into a table: skip rows, header, column selection and
/// source tagging. Filters are not applied here.
pub fn read_file(path: &Path, options: &LoadOptions) -> Result<Table> {
    let raw = match SourceFormat::detect(path)? {
        SourceFormat::Delimited(delimiter) => read_delimited(path, delimiter, options.skip_rows)?,
        SourceFormat::Spreadsheet => {
            read_spreadsheet(path, options.sheet.as_deref(), options.skip_rows)?
        }
    };

    let mut table = Table::from_rows(raw.header, raw.rows)?;

    if let Some(columns) = &options.columns {
        if let Some(missing) = columns.iter().find(|c| !table.has_column(c)) {
            return Err(EngageError::schema(
                path,
                format!("column '{}' not found", missing),
            ));
        }
        table = table.select(columns)?;
    }

    if let Some(tag) = &options.source_tag {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        table = table.with_constant_column(tag, CellValue::Text(name));
    }

    Ok(table)
}

fn align_fragment(path: &Path, base: &Table, fragment: Table) -> Result<Table> {
    fragment
        .aligned_to(base.columns())
        .ok_or_else(|| EngageError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: base.columns().join(", "),
            found: fragment.columns().join(", "),
        })
}

// ── Raw readers ───────────────────────────────────────────────────────────────

/// Header plus data rows padded to the header width.
#[derive(Debug, Default)]
struct RawSheet {
    header: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    /// Push one data row. Short rows are padded with nulls; long rows are an
    /// error. Rows with no values at all are dropped.
    fn push_row(&mut self, path: &Path, row: usize, mut values: Vec<CellValue>) -> Result<()> {
        if values.iter().all(CellValue::is_null) {
            return Ok(());
        }
        let expected = self.header.len();
        if values.len() > expected {
            // Trailing empty cells beyond the header are harmless.
            while values.len() > expected && values.last().is_some_and(CellValue::is_null) {
                values.pop();
            }
            if values.len() > expected {
                return Err(EngageError::MalformedRow {
                    path: path.to_path_buf(),
                    row,
                    expected,
                    found: values.len(),
                });
            }
        }
        values.resize(expected, CellValue::Null);
        self.rows.push(values);
        Ok(())
    }
}

fn read_delimited(path: &Path, delimiter: u8, skip_rows: usize) -> Result<RawSheet> {
    let read_error = |source| EngageError::FileRead {
        path: path.to_path_buf(),
        source,
    };
    let mut input = BufReader::new(std::fs::File::open(path).map_err(read_error)?);

    // Skipped rows are raw lines, blank ones included; csv would drop those.
    let mut skipped = 0usize;
    let mut line = Vec::new();
    while skipped < skip_rows {
        line.clear();
        if input.read_until(b'\n', &mut line).map_err(read_error)? == 0 {
            break;
        }
        skipped += 1;
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(input);

    let mut raw = RawSheet::default();
    let mut header_seen = false;

    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = skipped
            + record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(index + 1);

        if !header_seen {
            let names: Vec<String> = record
                .iter()
                .map(|field| field.trim_start_matches('\u{feff}').to_string())
                .collect();
            raw.header = normalize_header(names);
            header_seen = true;
            continue;
        }

        let values = record.iter().map(CellValue::infer).collect();
        raw.push_row(path, line, values)?;
    }

    if !header_seen {
        warn!("{} has no header row", path.display());
    }

    Ok(raw)
}

fn read_spreadsheet(path: &Path, sheet: Option<&str>, skip_rows: usize) -> Result<RawSheet> {
    let mut workbook = calamine::open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| EngageError::schema(path, "workbook has no sheets"))?,
    };
    let range = workbook.worksheet_range(&sheet_name)?;

    // The range starts at the first used cell; skip counts from row 1.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let skip_in_range = skip_rows.saturating_sub(first_row);

    let mut raw = RawSheet::default();
    let mut header_seen = false;

    for (offset, cells) in range.rows().enumerate().skip(skip_in_range) {
        let values: Vec<CellValue> = cells.iter().map(spreadsheet_cell).collect();
        if !header_seen {
            if values.iter().all(CellValue::is_null) {
                continue;
            }
            raw.header = normalize_header(values.iter().map(|v| v.to_string()).collect());
            header_seen = true;
            continue;
        }
        raw.push_row(path, first_row + offset + 1, values)?;
    }

    if !header_seen {
        warn!("Sheet '{}' of {} has no header row", sheet_name, path.display());
    }

    Ok(raw)
}

/// Map a native spreadsheet cell onto a [`CellValue`].
fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => {
            if NA_TOKENS.contains(&s.trim()) {
                CellValue::Null
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::DateTime(dt) if dt.is_duration() => dt
            .as_duration()
            .map(|d| CellValue::Text(duration_text(d)))
            .unwrap_or(CellValue::Float(dt.as_f64())),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|stamp| CellValue::Text(datetime_text(stamp)))
            .unwrap_or(CellValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// ISO-8601 text for a spreadsheet date; midnight prints as a bare date.
fn datetime_text(stamp: chrono::NaiveDateTime) -> String {
    if stamp.time() == chrono::NaiveTime::MIN {
        stamp.format("%Y-%m-%d").to_string()
    } else {
        stamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// `[-]HH:MM:SS` text for a spreadsheet duration.
fn duration_text(duration: chrono::Duration) -> String {
    let seconds = duration.num_seconds();
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.abs();
    format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Give blank headers a positional name and de-duplicate repeated names by
/// appending `.1`, `.2`, and so on.
fn normalize_header(names: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut header = Vec::with_capacity(names.len());

    for (i, name) in names.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name
        };

        let mut candidate = base.clone();
        while used.contains(&candidate) {
            let n = counters.entry(base.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{}.{}", base, n);
        }
        used.insert(candidate.clone());
        header.push(candidate);
    }

    header
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use engage_core::models::FilterSpec;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("write test file");
        path
    }

    fn src(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn text(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::from(*v)).collect()
    }

    const BOOK1: &str = "missile_type,target_id,hit_result\n\
                         AIM-9,T1,Destroyed\n\
                         AIM-9,T1,Missed\n\
                         AGM-88,T2,Destroyed\n";

    const BOOK2: &str = "missile_type,target_id,hit_result\n\
                         AIM-120,T3,Destroyed\n";

    // ── SourceFormat ──────────────────────────────────────────────────────────

    #[test]
    fn test_detect_format() {
        assert_eq!(
            SourceFormat::detect(Path::new("a.CSV")).unwrap(),
            SourceFormat::Delimited(b',')
        );
        assert_eq!(
            SourceFormat::detect(Path::new("a.tsv")).unwrap(),
            SourceFormat::Delimited(b'\t')
        );
        assert_eq!(
            SourceFormat::detect(Path::new("Book1.xlsx")).unwrap(),
            SourceFormat::Spreadsheet
        );
        assert!(matches!(
            SourceFormat::detect(Path::new("notes.txt")),
            Err(EngageError::UnsupportedFormat(_))
        ));
    }

    // ── resolve_sources ───────────────────────────────────────────────────────

    #[test]
    fn test_resolve_directory_uses_pattern_and_sorts() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "c.csv", BOOK2);
        write_file(dir.path(), "a.csv", BOOK1);
        write_file(dir.path(), "notes.txt", "x");
        let sub = dir.path().join("nested");
        std::fs::create_dir_all(&sub).unwrap();
        write_file(&sub, "b.csv", BOOK2);

        let flat = resolve_sources(&[src(dir.path())], &LoadOptions::default()).unwrap();
        let names: Vec<String> = flat
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.csv", "c.csv"]);

        let opts = LoadOptions {
            recursive: true,
            ..LoadOptions::default()
        };
        let deep = resolve_sources(&[src(dir.path())], &opts).unwrap();
        assert_eq!(deep.files.len(), 3);
    }

    #[test]
    fn test_resolve_glob_and_dedup() {
        let dir = TempDir::new().unwrap();
        let a = write_file(dir.path(), "a.csv", BOOK1);
        write_file(dir.path(), "b.csv", BOOK2);

        let pattern = src(&dir.path().join("*.csv"));
        let resolved = resolve_sources(&[src(&a), pattern], &LoadOptions::default()).unwrap();
        assert_eq!(resolved.files.len(), 2);
        assert_eq!(resolved.files[0], a);
    }

    #[test]
    fn test_resolve_missing_source() {
        let missing = "/tmp/engage-missing-source-xyz/book.csv".to_string();
        let err = resolve_sources(&[missing.clone()], &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, EngageError::SourceNotFound(_)));

        let opts = LoadOptions::default().with_policy(ErrorPolicy::Skip);
        let resolved = resolve_sources(&[missing], &opts).unwrap();
        assert!(resolved.files.is_empty());
        assert_eq!(resolved.skipped.len(), 1);
    }

    #[test]
    fn test_resolve_empty_directory_contributes_nothing() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_sources(&[src(dir.path())], &LoadOptions::default()).unwrap();
        assert!(resolved.files.is_empty());
        assert!(resolved.skipped.is_empty());
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_single_file_with_filter() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", BOOK1);

        let opts = LoadOptions::default()
            .with_filters(FilterSpec::new().with("hit_result", "Destroyed"));
        let loaded = load(&[src(&path)], &opts).unwrap();

        assert_eq!(loaded.table.len(), 2);
        assert_eq!(loaded.files, vec![path]);
        assert!(loaded
            .table
            .column_values("hit_result")
            .unwrap()
            .iter()
            .all(|v| v.as_str() == Some("Destroyed")));
    }

    #[test]
    fn test_load_merges_directory_with_source_tag() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", BOOK1);
        write_file(dir.path(), "b.csv", BOOK2);

        let loaded = load(&[src(dir.path())], &LoadOptions::default().tagged()).unwrap();
        let table = &loaded.table;

        // Row count is conserved across the merge.
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.columns().to_vec(),
            vec!["missile_type", "target_id", "hit_result", "source_file"]
        );
        let tags: Vec<String> = table
            .column_values("source_file")
            .unwrap()
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(tags, vec!["a.csv", "a.csv", "a.csv", "b.csv"]);
    }

    #[test]
    fn test_load_source_tag_overwrites_existing_column() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", "w,source_file\nAIM-9,old\n");

        let loaded = load(&[src(&path)], &LoadOptions::default().tagged()).unwrap();
        assert_eq!(loaded.table.columns().to_vec(), vec!["w", "source_file"]);
        assert_eq!(
            loaded.table.rows()[0].values().to_vec(),
            text(&["AIM-9", "a.csv"])
        );
    }

    #[test]
    fn test_load_column_selection_keeps_file_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", BOOK1);

        let opts = LoadOptions::default().with_columns(["hit_result", "missile_type"]);
        let loaded = load(&[src(&path)], &opts).unwrap();
        assert_eq!(
            loaded.table.columns().to_vec(),
            vec!["missile_type", "hit_result"]
        );
    }

    #[test]
    fn test_load_unknown_column_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", BOOK1);

        let opts = LoadOptions::default().with_columns(["missing_col"]);
        let err = load(&[src(&path)], &opts).unwrap_err();
        assert!(matches!(err, EngageError::Schema { .. }));
        assert!(err.to_string().contains("missing_col"));
    }

    #[test]
    fn test_load_unknown_filter_column_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", BOOK1);

        let opts = LoadOptions::default().with_filters(FilterSpec::new().with("nope", "x"));
        let err = load(&[src(&path)], &opts).unwrap_err();
        assert!(matches!(err, EngageError::Schema { .. }));
    }

    #[test]
    fn test_load_skip_rows_before_header() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "report.csv",
            "Exercise summary\nGenerated 2024-05-01\nWeaponName,WeaponTarget,WeaponEffect\nAIM-9,T1,HIT\n",
        );

        let loaded = load(&[src(&path)], &LoadOptions::default().with_skip_rows(2)).unwrap();
        assert_eq!(
            loaded.table.columns().to_vec(),
            vec!["WeaponName", "WeaponTarget", "WeaponEffect"]
        );
        assert_eq!(loaded.table.len(), 1);
    }

    #[test]
    fn test_load_skip_rows_counts_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "report.csv",
            "Exercise summary\n\nWeaponName,WeaponTarget,WeaponEffect\nAIM-9,T1,HIT\nAGM-88,T2,MISS\n",
        );

        let options = LoadOptions::default().with_skip_rows(2);
        let loaded = load(&[src(&path)], &options).unwrap();
        assert_eq!(
            loaded.table.columns().to_vec(),
            vec!["WeaponName", "WeaponTarget", "WeaponEffect"]
        );
        assert_eq!(loaded.table.len(), 2);

        let selected = load(
            &[src(&path)],
            &options.with_columns(["WeaponName", "WeaponEffect"]),
        )
        .unwrap();
        assert_eq!(
            selected.table.column_values("WeaponEffect").unwrap(),
            vec![&CellValue::from("HIT"), &CellValue::from("MISS")]
        );
    }

    #[test]
    fn test_malformed_row_reports_file_line_after_skip() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "report.csv", "title\n\na,b\n1,2\n1,2,3\n");

        let err = load(&[src(&path)], &LoadOptions::default().with_skip_rows(2)).unwrap_err();
        assert!(
            matches!(err, EngageError::MalformedRow { row: 5, .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_load_header_only_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", "w,t,o\n");

        let loaded = load(&[src(&path)], &LoadOptions::default()).unwrap();
        assert!(loaded.table.is_empty());
        assert_eq!(loaded.table.columns().len(), 3);
    }

    #[test]
    fn test_load_ignores_completely_empty_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", BOOK1);
        write_file(dir.path(), "b.csv", "");

        let loaded = load(&[src(dir.path())], &LoadOptions::default()).unwrap();
        assert_eq!(loaded.table.len(), 3);
        assert_eq!(loaded.files.len(), 1);
        assert!(loaded.skipped.is_empty());
    }

    #[test]
    fn test_load_no_files_returns_empty_table() {
        let dir = TempDir::new().unwrap();
        // Filters on a column that does not exist must not fail here.
        let opts = LoadOptions::default().with_filters(FilterSpec::new().with("nope", "x"));
        let loaded = load(&[src(dir.path())], &opts).unwrap();
        assert_eq!(loaded.table, Table::empty());
        assert!(loaded.files.is_empty());
    }

    #[test]
    fn test_load_reorders_columns_to_first_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", "w,t\nAIM-9,T1\n");
        write_file(dir.path(), "b.csv", "t,w\nT2,AGM-88\n");

        let loaded = load(&[src(dir.path())], &LoadOptions::default()).unwrap();
        assert_eq!(loaded.table.columns().to_vec(), vec!["w", "t"]);
        assert_eq!(
            loaded.table.rows()[1].values().to_vec(),
            text(&["AGM-88", "T2"])
        );
    }

    #[test]
    fn test_load_schema_mismatch() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.csv", "w,t\nAIM-9,T1\n");
        write_file(dir.path(), "b.csv", "w,o\nAIM-9,HIT\n");

        let err = load(&[src(dir.path())], &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, EngageError::SchemaMismatch { .. }));

        let opts = LoadOptions::default().with_policy(ErrorPolicy::Skip);
        let loaded = load(&[src(dir.path())], &opts).unwrap();
        assert_eq!(loaded.table.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.skipped[0].path.ends_with("b.csv"));
    }

    #[test]
    fn test_load_malformed_row() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", "w,t\nAIM-9,T1,extra\n");

        let err = load(&[src(&path)], &LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            EngageError::MalformedRow {
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_load_short_rows_padded_with_null() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.csv", "w,t,o\nAIM-9,T1\n");

        let loaded = load(&[src(&path)], &LoadOptions::default()).unwrap();
        assert!(loaded.table.rows()[0].get(2).unwrap().is_null());
    }

    #[test]
    fn test_load_tsv_and_type_inference() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "a.tsv", "w\tshots\tok\nAIM-9\t3\ttrue\nAGM-88\t2.5\t\n");

        let loaded = load(&[src(&path)], &LoadOptions::default().with_pattern("*.tsv")).unwrap();
        let row0 = loaded.table.rows()[0].values().to_vec();
        assert_eq!(row0[1], CellValue::Int(3));
        assert_eq!(row0[2], CellValue::Bool(true));
        let row1 = loaded.table.rows()[1].values().to_vec();
        assert_eq!(row1[1], CellValue::Float(2.5));
        assert!(row1[2].is_null());
    }

    #[test]
    fn test_load_unreadable_file_is_skipped_under_skip_policy() {
        let dir = TempDir::new().unwrap();
        let good = write_file(dir.path(), "a.csv", BOOK1);
        let bad = write_file(dir.path(), "b.xlsx", "not a workbook");

        let err = load(&[src(&good), src(&bad)], &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, EngageError::Spreadsheet(_)));

        let opts = LoadOptions::default().with_policy(ErrorPolicy::Skip);
        let loaded = load(&[src(&good), src(&bad)], &opts).unwrap();
        assert_eq!(loaded.table.len(), 3);
        assert_eq!(loaded.files, vec![good]);
        assert_eq!(loaded.skipped[0].path, bad);
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_header() {
        let header = normalize_header(vec![
            "a".to_string(),
            "".to_string(),
            "a".to_string(),
            "a".to_string(),
            "a.1".to_string(),
        ]);
        assert_eq!(header, vec!["a", "Unnamed: 1", "a.1", "a.2", "a.1.1"]);
    }

    #[test]
    fn test_spreadsheet_dates() {
        use calamine::{ExcelDateTime, ExcelDateTimeType};

        let date = |serial: f64, is_1904: bool| {
            spreadsheet_cell(&Data::DateTime(ExcelDateTime::new(
                serial,
                ExcelDateTimeType::DateTime,
                is_1904,
            )))
        };
        assert_eq!(date(45_413.0, false), CellValue::from("2024-05-01"));
        assert_eq!(date(45_413.5, false), CellValue::from("2024-05-01T12:00:00"));
        // Mac workbooks count from 1904-01-01.
        assert_eq!(date(45_413.0, true), CellValue::from("2028-05-02"));
        // Serials before the phantom 1900-02-29 are not shifted by it.
        assert_eq!(date(59.0, false), CellValue::from("1900-02-28"));

        let duration = spreadsheet_cell(&Data::DateTime(ExcelDateTime::new(
            1.5,
            ExcelDateTimeType::TimeDelta,
            false,
        )));
        assert_eq!(duration, CellValue::from("36:00:00"));
    }

    #[test]
    fn test_spreadsheet_cell_mapping() {
        assert_eq!(spreadsheet_cell(&Data::Empty), CellValue::Null);
        assert_eq!(spreadsheet_cell(&Data::Int(4)), CellValue::Int(4));
        assert_eq!(
            spreadsheet_cell(&Data::String("HIT".to_string())),
            CellValue::Text("HIT".to_string())
        );
        assert_eq!(spreadsheet_cell(&Data::String("N/A".to_string())), CellValue::Null);
    }

    // ── Workbooks ─────────────────────────────────────────────────────────────

    /// Sheet "Engagements": title in A2, header in row 3, two data rows with a
    /// dated column. Sheet "Spare" holds an unrelated table from row 1.
    fn write_workbook(dir: &Path) -> PathBuf {
        use rust_xlsxwriter::{ExcelDateTime as XlsxDate, Format, Workbook};

        let path = dir.join("Book1.xlsx");
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        let sheet = workbook.add_worksheet();
        sheet.set_name("Engagements").unwrap();
        sheet.write_string(1, 0, "Exercise summary").unwrap();
        for (col, name) in ["WeaponName", "WeaponTarget", "WeaponEffect", "Shots", "Date"]
            .iter()
            .enumerate()
        {
            sheet.write_string(2, col as u16, *name).unwrap();
        }
        let rows = [("AIM-9", "T1", "HIT", 2.0), ("AGM-88", "T2", "MISS", 1.0)];
        for (i, (weapon, target, effect, shots)) in rows.iter().enumerate() {
            let row = 3 + i as u32;
            sheet.write_string(row, 0, *weapon).unwrap();
            sheet.write_string(row, 1, *target).unwrap();
            sheet.write_string(row, 2, *effect).unwrap();
            sheet.write_number(row, 3, *shots).unwrap();
            sheet
                .write_datetime_with_format(
                    row,
                    4,
                    &XlsxDate::from_ymd(2024, 5, 1 + i as u8).unwrap(),
                    &date_format,
                )
                .unwrap();
        }

        let spare = workbook.add_worksheet();
        spare.set_name("Spare").unwrap();
        spare.write_string(0, 0, "Note").unwrap();
        spare.write_string(1, 0, "unused").unwrap();

        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_workbook_skips_rows_from_sheet_top() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(dir.path());

        // Row 1 is outside the used range; row 2 is the title.
        let loaded = load(&[src(&path)], &LoadOptions::default().with_skip_rows(2)).unwrap();
        let table = &loaded.table;
        assert_eq!(
            table.columns().to_vec(),
            vec!["WeaponName", "WeaponTarget", "WeaponEffect", "Shots", "Date"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column_values("WeaponName").unwrap(),
            vec![&CellValue::from("AIM-9"), &CellValue::from("AGM-88")]
        );
        assert_eq!(table.rows()[0].get(3).and_then(CellValue::as_f64), Some(2.0));
        assert_eq!(
            table.column_values("Date").unwrap(),
            vec![&CellValue::from("2024-05-01"), &CellValue::from("2024-05-02")]
        );
    }

    #[test]
    fn test_load_workbook_without_skip_uses_first_used_row() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(dir.path());

        // The title becomes the header and the real header a data row.
        let table = read_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(
            table.columns().to_vec(),
            vec!["Exercise summary", "Unnamed: 1", "Unnamed: 2", "Unnamed: 3", "Unnamed: 4"]
        );
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0].get(0), Some(&CellValue::from("WeaponName")));
    }

    #[test]
    fn test_load_workbook_named_sheet() {
        let dir = TempDir::new().unwrap();
        let path = write_workbook(dir.path());

        let mut options = LoadOptions::default();
        options.sheet = Some("Spare".to_string());
        let table = read_file(&path, &options).unwrap();
        assert_eq!(table.columns().to_vec(), vec!["Note"]);
        assert_eq!(table.column_values("Note").unwrap(), vec![&CellValue::from("unused")]);

        options.sheet = Some("Missing".to_string());
        assert!(read_file(&path, &options).is_err());
    }
}
