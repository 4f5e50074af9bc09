use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::chart::{ChartKind, ChartSpec};
use crate::error::{EngageError, Result};
use crate::models::{CellValue, FilterSpec, GroupOrder};

/// Default file-name pattern for directory sources.
pub const DEFAULT_FILE_PATTERN: &str = "*.csv";

/// Default name of the provenance column added by source tagging.
pub const DEFAULT_SOURCE_COLUMN: &str = "source_file";

// ── Load options ───────────────────────────────────────────────────────────────

/// What the loader does when one source file cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Abort the whole load.
    #[default]
    Fail,
    /// Drop the file, log a warning and record it in the load result.
    Skip,
}

/// Options for one load operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Columns to keep; `None` keeps every column.
    pub columns: Option<Vec<String>>,
    /// Raw rows skipped before the header row.
    pub skip_rows: usize,
    /// Row filters applied to the merged table.
    pub filters: FilterSpec,
    /// Name of the provenance column; `None` disables tagging.
    pub source_tag: Option<String>,
    /// File-name pattern used when a source is a directory.
    pub file_pattern: String,
    /// Descend into sub-directories of directory sources.
    pub recursive: bool,
    /// Worksheet to read from spreadsheets; the first sheet when unset.
    pub sheet: Option<String>,
    pub on_error: ErrorPolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            columns: None,
            skip_rows: 0,
            filters: FilterSpec::default(),
            source_tag: None,
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            recursive: false,
            sheet: None,
            on_error: ErrorPolicy::Fail,
        }
    }
}

impl LoadOptions {
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_filters(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    /// Tag every row with its source file under [`DEFAULT_SOURCE_COLUMN`].
    pub fn tagged(mut self) -> Self {
        self.source_tag = Some(DEFAULT_SOURCE_COLUMN.to_string());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }
}

// ── ReportConfig ───────────────────────────────────────────────────────────────

/// A JSON report file: where to read from, how to load, what to draw.
///
/// ```json
/// {
///   "sources": ["Book1.xlsx", "Book2.xlsx"],
///   "load": { "columns": ["WeaponName", "WeaponTarget", "WeaponEffect"], "skip_rows": 2 },
///   "charts": [ { "kind": "bar", "group": "WeaponName", "title": "Missile Usage Count" } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub sources: Vec<String>,
    pub load: LoadOptions,
    pub charts: Vec<ChartSpec>,
}

impl ReportConfig {
    /// Load a report file. A missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| EngageError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let report: Self = serde_json::from_str(&content)?;
        debug!(
            "Loaded report {} ({} sources, {} charts)",
            path.display(),
            report.sources.len(),
            report.charts.len()
        );
        Ok(report)
    }

    /// Atomically write the report to `path`, creating parent directories if
    /// needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        debug!("Saved report to {}", path.display());
        Ok(())
    }
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Which chart(s) to produce from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartChoice {
    Bar,
    Histogram,
    Pie,
    Scatter,
    /// The standard six-chart weapon engagement report.
    Report,
}

impl ChartChoice {
    pub fn kind(self) -> Option<ChartKind> {
        match self {
            ChartChoice::Bar => Some(ChartKind::Bar),
            ChartChoice::Histogram => Some(ChartKind::Histogram),
            ChartChoice::Pie => Some(ChartKind::Pie),
            ChartChoice::Scatter => Some(ChartKind::Scatter),
            ChartChoice::Report => None,
        }
    }
}

/// Chart weapon usage and effectiveness from engagement records
#[derive(Parser, Debug, Clone)]
#[command(
    name = "engage-charts",
    about = "Chart weapon usage and effectiveness from engagement records",
    version
)]
pub struct Settings {
    /// Source files, directories or glob patterns (CSV, TSV, XLSX, XLS, ODS)
    pub sources: Vec<String>,

    /// JSON report file with sources, load options and chart definitions
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the effective report configuration to this file
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// File-name pattern for directory sources
    #[arg(long, default_value = DEFAULT_FILE_PATTERN)]
    pub pattern: String,

    /// Descend into sub-directories of directory sources
    #[arg(long)]
    pub recursive: bool,

    /// Comma-separated list of columns to load
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,

    /// Rows to skip at the top of every file, before the header
    #[arg(long, default_value_t = 0)]
    pub skip_rows: usize,

    /// Keep only rows where COLUMN equals VALUE (repeatable)
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    pub filters: Vec<String>,

    /// Add a column naming the file each row came from
    #[arg(long)]
    pub tag_source: bool,

    /// Name of the provenance column (implies --tag-source when given)
    #[arg(long, default_value = DEFAULT_SOURCE_COLUMN)]
    pub source_column: String,

    /// Worksheet to read from spreadsheet files
    #[arg(long)]
    pub sheet: Option<String>,

    /// What to do when a source file cannot be loaded
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Fail)]
    pub on_error: ErrorPolicy,

    /// Chart to draw
    #[arg(long, value_enum, default_value_t = ChartChoice::Report)]
    pub chart: ChartChoice,

    /// Grouping column for a single chart
    #[arg(long)]
    pub group: Option<String>,

    /// Measured or predicate column for a single chart
    #[arg(long)]
    pub measure: Option<String>,

    /// Value the measured column must equal (scatter, histogram)
    #[arg(long)]
    pub match_value: Option<String>,

    /// Histogram bin count
    #[arg(long)]
    pub bins: Option<usize>,

    /// Chart title
    #[arg(long)]
    pub title: Option<String>,

    /// Bar / point colour (e.g. skyblue, green, red, purple)
    #[arg(long)]
    pub color: Option<String>,

    /// Group ordering
    #[arg(long, value_enum)]
    pub order: Option<GroupOrder>,

    /// Weapon column used by --chart report
    #[arg(long, default_value = "WeaponName")]
    pub weapon_column: String,

    /// Target column used by --chart report
    #[arg(long, default_value = "WeaponTarget")]
    pub target_column: String,

    /// Outcome column used by --chart report
    #[arg(long, default_value = "WeaponEffect")]
    pub effect_column: String,

    /// Outcome value counted as a kill
    #[arg(long, default_value = "HIT")]
    pub hit_value: String,

    /// Chart width in terminal columns
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u16).range(20..=500))]
    pub width: u16,

    /// Chart height in terminal rows
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u16).range(5..=200))]
    pub height: u16,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Print charts as plain text without terminal styling
    #[arg(long)]
    pub plain: bool,

    /// Also write every chart as a text file into this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Argument ids supplied explicitly on the command line.
    #[arg(skip)]
    pub explicit_args: HashSet<String>,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Self {
        let matches = Settings::command().get_matches_from(args);
        let mut settings = match Settings::from_arg_matches(&matches) {
            Ok(s) => s,
            Err(e) => e.exit(),
        };

        settings.explicit_args = matches
            .ids()
            .map(|id| id.as_str())
            .filter(|id| is_arg_explicitly_set(&matches, id))
            .map(str::to_string)
            .collect();

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    fn is_explicit(&self, id: &str) -> bool {
        self.explicit_args.contains(id)
    }

    /// A CLI value applies when there is no report file to defer to, or when
    /// the user typed it.
    fn overrides(&self, id: &str) -> bool {
        self.config.is_none() || self.is_explicit(id)
    }

    /// Build the effective report: the `--config` file (if any) with explicit
    /// command-line values layered on top.
    pub fn resolve_report(&self) -> Result<ReportConfig> {
        let mut report = match &self.config {
            Some(path) => ReportConfig::load_from(&expand_home(&path.to_string_lossy()))?,
            None => ReportConfig::default(),
        };

        if !self.sources.is_empty() {
            report.sources = self.sources.clone();
        }

        let load = &mut report.load;
        // NOTE: clap stores the arg id using the *field name* (underscores),
        // not the long-flag spelling (hyphens).
        if self.overrides("pattern") {
            load.file_pattern = self.pattern.clone();
        }
        if self.recursive {
            load.recursive = true;
        }
        if self.columns.is_some() {
            load.columns = self.columns.clone();
        }
        if self.overrides("skip_rows") {
            load.skip_rows = self.skip_rows;
        }
        if !self.filters.is_empty() {
            load.filters = load
                .filters
                .merged(&FilterSpec::from_assignments(&self.filters)?);
        }
        if self.tag_source || self.is_explicit("source_column") {
            load.source_tag = Some(self.source_column.clone());
        }
        if self.sheet.is_some() {
            load.sheet = self.sheet.clone();
        }
        if self.overrides("on_error") {
            load.on_error = self.on_error;
        }

        if report.charts.is_empty() || self.is_explicit("chart") {
            report.charts = self.chart_specs()?;
        }

        Ok(report)
    }

    /// Chart definitions requested on the command line.
    pub fn chart_specs(&self) -> Result<Vec<ChartSpec>> {
        let Some(kind) = self.chart.kind() else {
            return Ok(ChartSpec::engagement_report(
                &self.weapon_column,
                &self.target_column,
                &self.effect_column,
                &self.hit_value,
            ));
        };

        let group = self.group.clone().ok_or_else(|| {
            EngageError::Config(format!("--group is required for --chart {}", kind))
        })?;

        let mut spec = ChartSpec::new(kind, group);
        spec.title = self.title.clone();
        spec.bins = self.bins;
        spec.color = self.color.clone();
        spec.order = self.order;
        spec.measure = self.measure.clone();
        spec.match_value = self.match_value.clone().map(CellValue::Text);

        if kind == ChartKind::Scatter {
            if spec.measure.is_none() {
                spec.measure = Some(self.effect_column.clone());
            }
            if spec.match_value.is_none() {
                spec.match_value = Some(CellValue::Text(self.hit_value.clone()));
            }
        }
        if kind == ChartKind::Histogram && spec.measure.is_some() && spec.match_value.is_none() {
            spec.match_value = Some(CellValue::Text(self.hit_value.clone()));
        }

        Ok(vec![spec])
    }
}

// ── Path helpers ───────────────────────────────────────────────────────────────

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = if raw == "~" {
        Some("")
    } else {
        raw.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
