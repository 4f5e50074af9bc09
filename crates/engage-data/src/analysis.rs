//! Chart pipeline.
//!
//! Loads the report's sources once, then turns every [`ChartSpec`] into a
//! [`PreparedChart`] by running the matching aggregation.

use chrono::Utc;
use engage_core::chart::{ChartData, ChartKind, ChartSpec, PreparedChart};
use engage_core::error::{EngageError, Result};
use engage_core::models::{FilterSpec, GroupOrder, Table};
use engage_core::settings::ReportConfig;
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::reader::{load, SkippedSource};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReportMetadata {
    /// ISO-8601 timestamp when this report was generated.
    pub generated_at: String,
    pub files_loaded: usize,
    pub files_skipped: usize,
    /// Rows in the loaded table after load-time filters.
    pub rows_loaded: usize,
    pub charts_prepared: usize,
    /// Charts whose aggregation produced no groups.
    pub charts_empty: usize,
    /// Wall-clock seconds spent loading the sources.
    pub load_time_seconds: f64,
}

/// What became of one requested chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Ready(PreparedChart),
    /// Nothing to draw; carries the chart title.
    Empty(String),
}

/// The complete output of [`analyze_report`].
#[derive(Debug, Clone)]
pub struct ReportResult {
    pub table: Table,
    pub charts: Vec<ChartOutcome>,
    pub skipped: Vec<SkippedSource>,
    pub metadata: ReportMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full report pipeline.
///
/// 1. Load and filter the report's sources.
/// 2. Prepare every chart, recording empty ones instead of failing.
/// 3. Return a [`ReportResult`].
pub fn analyze_report(report: &ReportConfig) -> Result<ReportResult> {
    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let loaded = load(&report.sources, &report.load)?;
    let load_time = load_start.elapsed().as_secs_f64();

    info!(
        "Loaded {} rows from {} files",
        loaded.table.len(),
        loaded.files.len()
    );

    // ── Step 2: Charts ────────────────────────────────────────────────────────
    let mut charts = Vec::with_capacity(report.charts.len());
    for spec in &report.charts {
        match prepare_chart(&loaded.table, spec) {
            Ok(chart) => charts.push(ChartOutcome::Ready(chart)),
            Err(EngageError::EmptyResult(title)) => {
                warn!("No data available for {}", title);
                charts.push(ChartOutcome::Empty(title));
            }
            Err(e) => return Err(e),
        }
    }

    // ── Step 3: Build result ──────────────────────────────────────────────────
    let charts_empty = charts
        .iter()
        .filter(|c| matches!(c, ChartOutcome::Empty(_)))
        .count();

    let metadata = ReportMetadata {
        generated_at: Utc::now().to_rfc3339(),
        files_loaded: loaded.files.len(),
        files_skipped: loaded.skipped.len(),
        rows_loaded: loaded.table.len(),
        charts_prepared: charts.len() - charts_empty,
        charts_empty,
        load_time_seconds: load_time,
    };

    Ok(ReportResult {
        table: loaded.table,
        charts,
        skipped: loaded.skipped,
        metadata,
    })
}

/// Aggregate `table` for one chart.
///
/// The chart's own filters apply on top of the table. An aggregation with no
/// groups (or no bins) is [`EngageError::EmptyResult`].
pub fn prepare_chart(table: &Table, spec: &ChartSpec) -> Result<PreparedChart> {
    let title = spec.display_title();

    // Nothing was loaded at all.
    if table.columns().is_empty() {
        return Err(EngageError::EmptyResult(title));
    }

    let rows = table.filter(&spec.filters)?;
    let order = spec.group_order();

    let data = match spec.kind {
        ChartKind::Bar => ChartData::Counts(Aggregator::count_by(
            &rows,
            &spec.group,
            spec.measure_column(),
            order,
        )?),
        ChartKind::Pie => ChartData::Counts(match order {
            GroupOrder::ValueDescending => Aggregator::value_counts(&rows, &spec.group)?,
            other => Aggregator::size_by(&rows, &spec.group, other)?,
        }),
        ChartKind::Scatter => {
            let (predicate, match_value) = match (&spec.measure, &spec.match_value) {
                (Some(p), Some(v)) => (p, v),
                _ => {
                    return Err(EngageError::Config(format!(
                        "scatter chart '{}' needs a measure column and a match value",
                        title
                    )))
                }
            };
            ChartData::Rates(Aggregator::ratio_by(
                &rows,
                &spec.group,
                predicate,
                match_value,
                order,
            )?)
        }
        ChartKind::Histogram => {
            let selected = match (&spec.measure, &spec.match_value) {
                (Some(column), Some(value)) => {
                    rows.filter(&FilterSpec::new().with(column.as_str(), value.clone()))?
                }
                _ => rows,
            };
            let sizes = Aggregator::size_by(&selected, &spec.group, GroupOrder::FirstSeen)?;
            let values: Vec<f64> = sizes.iter().map(|(_, n)| *n as f64).collect();
            ChartData::Bins(Aggregator::histogram(&values, spec.bin_count()))
        }
    };

    if data.is_empty() {
        return Err(EngageError::EmptyResult(title));
    }

    debug!("Prepared {} chart '{}' with {} entries", spec.kind, title, data.len());

    Ok(PreparedChart::new(spec, data))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
